//! Target backend: partitions the TAC stream into function windows, runs
//! the per-function analyses and emits MIPS-style assembly.
//!
//! Module layout:
//! - `cfg`      — label table, function windows, successor lists
//! - `liveness` — iterative backward live-variable analysis
//! - `regalloc` — interference graph and graph-coloring allocation
//! - `mips`     — ABI constants and the instruction emitter

pub mod cfg;
pub mod liveness;
pub mod mips;
pub mod regalloc;

use log::debug;

use crate::tac::TacProgram;

use cfg::Cfg;
use liveness::Liveness;
use mips::Emitter;
use regalloc::RegAssignment;

/// Translate a lowered program to assembly text.
///
/// Top-level instructions (function labels, vtables) are emitted without any
/// register context; each `[BeginFunc, EndFunc]` window gets its own flow
/// graph, liveness fixed point and register assignment first.
pub fn emit_assembly(tac: &TacProgram) -> String {
    let labels = cfg::collect_labels(&tac.instrs);
    let windows = cfg::function_windows(&tac.instrs);
    debug!("emitting {} function window(s)", windows.len());

    let mut emitter = Emitter::new(tac);
    emitter.preamble();

    let no_regs = RegAssignment::new();
    let mut cursor = 0;
    for &(begin, end) in &windows {
        emitter.emit_range(cursor..begin, &no_regs, None);

        let graph = Cfg::build(&tac.instrs, begin, end, &labels);
        let live = Liveness::compute(&tac.instrs, &graph);
        let regs = regalloc::allocate(&tac.instrs, begin, end, &live, &tac.locations);
        emitter.emit_range(begin..end + 1, &regs, Some(&live));

        cursor = end + 1;
    }
    emitter.emit_range(cursor..tac.instrs.len(), &no_regs, None);
    emitter.finish()
}
