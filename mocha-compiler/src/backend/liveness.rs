//! Live-variable analysis over one function window.
//!
//! Standard backward dataflow at instruction granularity:
//!
//! ```text
//! out[i] = union of in[s] over the successors of i
//! in[i]  = gen[i] ∪ (out[i] − kill[i])
//! ```
//!
//! Iterates to a fixed point; sets only grow and the location universe is
//! finite, so termination follows from monotonicity.

use std::collections::BTreeSet;

use crate::tac::{Instr, LocationId};

use super::cfg::Cfg;

#[derive(Debug)]
pub struct Liveness {
    pub offset: usize,
    pub live_in: Vec<BTreeSet<LocationId>>,
    pub live_out: Vec<BTreeSet<LocationId>>,
}

impl Liveness {
    pub fn compute(instrs: &[Instr], cfg: &Cfg) -> Liveness {
        let n = cfg.len();
        let offset = cfg.offset;

        // Gen and kill are fixed per opcode; cache them up front.
        let gens: Vec<BTreeSet<LocationId>> =
            (0..n).map(|i| instrs[offset + i].gen_set()).collect();
        let kills: Vec<BTreeSet<LocationId>> =
            (0..n).map(|i| instrs[offset + i].kill_set()).collect();

        let mut live_in: Vec<BTreeSet<LocationId>> = vec![BTreeSet::new(); n];
        let mut live_out: Vec<BTreeSet<LocationId>> = vec![BTreeSet::new(); n];

        let mut changed = true;
        while changed {
            changed = false;
            for i in (0..n).rev() {
                let mut out = BTreeSet::new();
                for &succ in cfg.succs_at(offset + i) {
                    out.extend(live_in[succ - offset].iter().copied());
                }

                let mut inn = gens[i].clone();
                for &loc in &out {
                    if !kills[i].contains(&loc) {
                        inn.insert(loc);
                    }
                }

                if inn != live_in[i] || out != live_out[i] {
                    changed = true;
                    live_in[i] = inn;
                    live_out[i] = out;
                }
            }
        }

        Liveness {
            offset,
            live_in,
            live_out,
        }
    }

    pub fn live_out_at(&self, abs_index: usize) -> &BTreeSet<LocationId> {
        &self.live_out[abs_index - self.offset]
    }
}
