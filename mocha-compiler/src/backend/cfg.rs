//! Function partitioning and intra-procedural control-flow construction.
//!
//! Instructions between a `BeginFunc`/`EndFunc` pair form a window; each
//! instruction in the window is linked to its statically reachable
//! successors through the global label table built by a single linear scan.

use std::collections::HashMap;

use crate::tac::Instr;

/// Map every label to the index of its `Label` instruction.
pub fn collect_labels(instrs: &[Instr]) -> HashMap<String, usize> {
    let mut labels = HashMap::new();
    for (i, instr) in instrs.iter().enumerate() {
        if let Instr::Label(name) = instr {
            labels.insert(name.clone(), i);
        }
    }
    labels
}

/// Indices of each `(BeginFunc, EndFunc)` pair.  Everything outside the
/// returned windows is top-level data (vtables and the function labels
/// themselves).
pub fn function_windows(instrs: &[Instr]) -> Vec<(usize, usize)> {
    let mut windows = Vec::new();
    let mut begin = None;
    for (i, instr) in instrs.iter().enumerate() {
        match instr {
            Instr::BeginFunc { .. } => {
                assert!(begin.is_none(), "nested BeginFunc at instruction {i}");
                begin = Some(i);
            }
            Instr::EndFunc => {
                let b = begin.take().unwrap_or_else(|| {
                    panic!("EndFunc without matching BeginFunc at instruction {i}")
                });
                windows.push((b, i));
            }
            _ => {}
        }
    }
    assert!(begin.is_none(), "BeginFunc without matching EndFunc");
    windows
}

/// Successor lists for one function window.  Indices are absolute positions
/// in the instruction stream.
#[derive(Debug)]
pub struct Cfg {
    pub offset: usize,
    pub succs: Vec<Vec<usize>>,
}

impl Cfg {
    /// Build the flow graph for `instrs[begin..=end]`.
    ///
    /// Fallthrough goes to the textually next instruction except after
    /// `Goto`, `Return` and `EndFunc`; `Goto` and `IfZ` additionally reach
    /// the instruction bound to their target label.
    pub fn build(
        instrs: &[Instr],
        begin: usize,
        end: usize,
        labels: &HashMap<String, usize>,
    ) -> Cfg {
        let mut succs = Vec::with_capacity(end - begin + 1);
        for i in begin..=end {
            let instr = &instrs[i];
            let mut next = Vec::new();
            if instr.falls_through() && i + 1 <= end {
                next.push(i + 1);
            }
            if let Some(target) = instr.branch_target() {
                let t = *labels
                    .get(target)
                    .unwrap_or_else(|| panic!("branch to undefined label '{target}'"));
                next.push(t);
            }
            succs.push(next);
        }
        Cfg {
            offset: begin,
            succs,
        }
    }

    pub fn len(&self) -> usize {
        self.succs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succs.is_empty()
    }

    pub fn succs_at(&self, abs_index: usize) -> &[usize] {
        &self.succs[abs_index - self.offset]
    }
}
