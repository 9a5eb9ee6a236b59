//! TAC to MIPS translation.
//!
//! Each TAC instruction expands through a short template.  Operands with an
//! allocated register use it directly; everything else is materialized from
//! its home slot (fp- or gp-relative) through the `$v0`/`$v1` scratch pair.
//! Every template is preceded by the TAC it implements, echoed as a comment.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use crate::tac::{BinOpCode, Instr, LocationId, Segment, TacProgram};

use super::super::liveness::Liveness;
use super::super::regalloc::RegAssignment;
use super::abi::{Reg, RESULT_REG, SCRATCH_A, SCRATCH_B};
use super::item::{flatten, AsmItem};

pub struct Emitter<'a> {
    tac: &'a TacProgram,
    items: Vec<AsmItem>,
    /// Function metadata keyed by the index of its `BeginFunc`.
    fn_by_begin: HashMap<usize, usize>,
    string_counter: usize,
}

enum CallTarget<'t> {
    Direct(&'t str),
    Indirect(Reg),
}

impl<'a> Emitter<'a> {
    pub fn new(tac: &'a TacProgram) -> Self {
        let fn_by_begin = tac
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.begin, i))
            .collect();
        Emitter {
            tac,
            items: Vec::new(),
            fn_by_begin,
            string_counter: 0,
        }
    }

    pub fn finish(self) -> String {
        flatten(&self.items)
    }

    pub fn preamble(&mut self) {
        self.items.push(AsmItem::Comment("standard preamble".into()));
        self.directive(".text");
        self.directive(".align 2");
        self.directive(".globl main");
    }

    /// Translate `instrs[range]` with the given register assignment.
    /// `liveness` is present for function windows and drives the
    /// caller-save protocol at call sites.
    pub fn emit_range(
        &mut self,
        range: Range<usize>,
        regs: &RegAssignment,
        liveness: Option<&Liveness>,
    ) {
        for i in range {
            self.emit_instr(i, regs, liveness);
        }
    }

    fn emit_instr(&mut self, i: usize, regs: &RegAssignment, liveness: Option<&Liveness>) {
        let instr = &self.tac.instrs[i];
        if !matches!(instr, Instr::Label(_) | Instr::VTable { .. }) {
            let echo = self.tac.render(instr);
            self.items.push(AsmItem::Comment(echo));
        }

        match instr {
            Instr::LoadConst { dst, value } => {
                let d = self.dest(regs, *dst);
                self.instr(format!("li {d}, {value}"));
                self.flush(regs, *dst, d);
            }

            Instr::LoadStrLit { dst, value } => {
                self.string_counter += 1;
                let label = format!("_string{}", self.string_counter);
                self.directive(".data");
                self.items.push(AsmItem::Label(label.clone()));
                self.directive(format!(".asciiz {}", escape_asm_string(value)));
                self.directive(".text");
                let d = self.dest(regs, *dst);
                self.instr(format!("la {d}, {label}"));
                self.flush(regs, *dst, d);
            }

            Instr::LoadLabel { dst, label } => {
                let d = self.dest(regs, *dst);
                self.instr(format!("la {d}, {label}"));
                self.flush(regs, *dst, d);
            }

            Instr::Assign { dst, src } => {
                let s = self.operand(regs, *src, SCRATCH_A);
                match regs.get(dst) {
                    Some(&d) => {
                        if d != s {
                            self.instr(format!("move {d}, {s}"));
                        }
                    }
                    None => {
                        let home = self.home(*dst);
                        self.instr(format!("sw {s}, {home}"));
                    }
                }
            }

            Instr::Load { dst, base, offset } => {
                let b = self.operand(regs, *base, SCRATCH_A);
                let d = self.dest(regs, *dst);
                self.instr(format!("lw {d}, {offset}({b})"));
                self.flush(regs, *dst, d);
            }

            Instr::Store { base, src, offset } => {
                let b = self.operand(regs, *base, SCRATCH_A);
                let s = self.operand(regs, *src, SCRATCH_B);
                self.instr(format!("sw {s}, {offset}({b})"));
            }

            Instr::BinOp {
                op,
                dst,
                left,
                right,
            } => {
                let l = self.operand(regs, *left, SCRATCH_A);
                let r = self.operand(regs, *right, SCRATCH_B);
                let d = self.dest(regs, *dst);
                self.instr(format!("{} {d}, {l}, {r}", mnemonic(*op)));
                self.flush(regs, *dst, d);
            }

            Instr::Label(name) => self.items.push(AsmItem::Label(name.clone())),

            Instr::Goto { target } => self.instr(format!("b {target}")),

            Instr::IfZ { cond, target } => {
                let c = self.operand(regs, *cond, SCRATCH_A);
                self.instr(format!("beqz {c}, {target}"));
            }

            Instr::BeginFunc { frame_size } => {
                self.instr_c("subu $sp, $sp, 8", "create activation record");
                self.instr_c("sw $fp, 8($sp)", "save caller's fp");
                self.instr_c("sw $ra, 4($sp)", "save return address");
                self.instr_c("addiu $fp, $sp, 8", "set up new fp");
                if *frame_size > 0 {
                    self.instr_c(
                        format!("subu $sp, $sp, {frame_size}"),
                        "reserve space for locals and temps",
                    );
                }
                // Parameters assigned a register are seeded from their slots.
                if let Some(&f) = self.fn_by_begin.get(&i) {
                    let params = self.tac.functions[f].params.clone();
                    for p in params {
                        if let Some(&r) = regs.get(&p) {
                            let offset = self.tac.locations[p].offset;
                            self.instr(format!("lw {r}, {offset}($fp)"));
                        }
                    }
                }
            }

            Instr::EndFunc => self.epilogue(),

            Instr::Return { value } => {
                if let Some(v) = value {
                    let r = self.operand(regs, *v, SCRATCH_A);
                    if r != RESULT_REG {
                        self.instr(format!("move {RESULT_REG}, {r}"));
                    }
                }
                self.epilogue();
            }

            Instr::PushParam { src } => {
                let s = self.operand(regs, *src, SCRATCH_A);
                self.instr("subu $sp, $sp, 4".to_string());
                self.instr(format!("sw {s}, 4($sp)"));
            }

            Instr::PopParams { bytes } => {
                self.instr(format!("add $sp, $sp, {bytes}"));
            }

            Instr::LCall { label, dst } => {
                self.emit_call(i, regs, liveness, CallTarget::Direct(label), *dst);
            }

            Instr::ACall { addr, dst } => {
                let a = self.operand(regs, *addr, SCRATCH_A);
                self.emit_call(i, regs, liveness, CallTarget::Indirect(a), *dst);
            }

            Instr::VTable { class, methods } => {
                self.directive(".data");
                self.directive(".align 2");
                self.items.push(AsmItem::Label(class.clone()));
                for method in methods {
                    self.directive(format!(".word {method}"));
                }
                self.directive(".text");
            }
        }
    }

    /// Caller side of the calling convention: park every register-resident
    /// location that survives the call in its home slot, jump and link, then
    /// reload and deliver the result.
    fn emit_call(
        &mut self,
        i: usize,
        regs: &RegAssignment,
        liveness: Option<&Liveness>,
        target: CallTarget<'_>,
        dst: Option<LocationId>,
    ) {
        let empty = BTreeSet::new();
        let live_out = liveness.map_or(&empty, |l| l.live_out_at(i));
        let saves: Vec<(LocationId, Reg)> = live_out
            .iter()
            .filter_map(|loc| regs.get(loc).map(|&r| (*loc, r)))
            .collect();

        for &(loc, r) in &saves {
            let home = self.home(loc);
            let name = self.tac.locations.name(loc).to_string();
            self.instr_c(format!("sw {r}, {home}"), format!("save {name} across call"));
        }
        match target {
            CallTarget::Direct(label) => self.instr(format!("jal {label}")),
            CallTarget::Indirect(r) => self.instr(format!("jalr {r}")),
        }
        for &(loc, r) in &saves {
            let home = self.home(loc);
            let name = self.tac.locations.name(loc).to_string();
            self.instr_c(format!("lw {r}, {home}"), format!("restore {name}"));
        }
        if let Some(d) = dst {
            match regs.get(&d) {
                Some(&r) => self.instr(format!("move {r}, {RESULT_REG}")),
                None => {
                    let home = self.home(d);
                    self.instr(format!("sw {RESULT_REG}, {home}"));
                }
            }
        }
    }

    fn epilogue(&mut self) {
        self.instr_c("move $sp, $fp", "pop callee frame");
        self.instr_c("lw $ra, -4($fp)", "restore return address");
        self.instr_c("lw $fp, 0($fp)", "restore caller's fp");
        self.instr("jr $ra".to_string());
    }

    // ── Operand plumbing ────────────────────────────────────────────────

    /// Register holding the value of `loc`, loading it into `scratch` when
    /// the location lives only in memory.
    fn operand(&mut self, regs: &RegAssignment, loc: LocationId, scratch: Reg) -> Reg {
        match regs.get(&loc) {
            Some(&r) => r,
            None => {
                let home = self.home(loc);
                self.instr(format!("lw {scratch}, {home}"));
                scratch
            }
        }
    }

    /// Register a write to `loc` should target.
    fn dest(&self, regs: &RegAssignment, loc: LocationId) -> Reg {
        regs.get(&loc).copied().unwrap_or(SCRATCH_A)
    }

    /// Complete a write: memory-resident destinations are stored back to
    /// their home slot.
    fn flush(&mut self, regs: &RegAssignment, loc: LocationId, from: Reg) {
        if regs.get(&loc).is_none() {
            let home = self.home(loc);
            self.instr(format!("sw {from}, {home}"));
        }
    }

    fn home(&self, loc: LocationId) -> String {
        let l = &self.tac.locations[loc];
        let base = match l.segment {
            Segment::FpRelative => "$fp",
            Segment::GpRelative => "$gp",
        };
        format!("{}({})", l.offset, base)
    }

    fn instr(&mut self, text: impl Into<String>) {
        self.items.push(AsmItem::Instr {
            text: text.into(),
            comment: None,
        });
    }

    fn instr_c(&mut self, text: impl Into<String>, comment: impl Into<String>) {
        self.items.push(AsmItem::Instr {
            text: text.into(),
            comment: Some(comment.into()),
        });
    }

    fn directive(&mut self, text: impl Into<String>) {
        self.items.push(AsmItem::Directive(text.into()));
    }
}

fn mnemonic(op: BinOpCode) -> &'static str {
    match op {
        BinOpCode::Add => "add",
        BinOpCode::Sub => "sub",
        BinOpCode::Mul => "mul",
        BinOpCode::Div => "div",
        BinOpCode::Mod => "rem",
        BinOpCode::Eq => "seq",
        BinOpCode::Lt => "slt",
        BinOpCode::And => "and",
        BinOpCode::Or => "or",
    }
}

/// Quote a string literal for `.asciiz`.
fn escape_asm_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
