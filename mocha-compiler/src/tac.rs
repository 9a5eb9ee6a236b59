//! Three-address code: the linear IR between lowering and the target backend.
//!
//! Operands are [`Location`]s interned in a [`LocationTable`]; the interned
//! [`LocationId`] is the key for every dataflow set and graph downstream.
//! Ids are totally ordered, so `BTreeSet`/`BTreeMap` iteration over them is
//! deterministic and the backend's output is reproducible.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;

/// Size in bytes of every operand; all offsets are multiples of this.
pub const VAR_SIZE: i32 = 4;
/// Frame offset of the first parameter (the receiver slot for methods).
pub const OFFSET_FIRST_PARAM: i32 = 4;
/// Frame offset of the first local or temporary; later slots grow downward.
pub const OFFSET_FIRST_LOCAL: i32 = -8;
/// Offset of the first global in the static segment.
pub const OFFSET_FIRST_GLOBAL: i32 = 0;

// ── Locations ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationId(pub u32);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// In the current activation record, offset relative to `fp`.
    FpRelative,
    /// In the static segment, offset relative to `gp`.
    GpRelative,
}

/// A named runtime operand with a fixed home address.  Created exactly once
/// during lowering and immutable afterwards; register assignments live in a
/// per-function side table, not here.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    pub segment: Segment,
    pub offset: i32,
}

#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    locs: Vec<Location>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: impl Into<String>, segment: Segment, offset: i32) -> LocationId {
        let id = LocationId(self.locs.len() as u32);
        self.locs.push(Location {
            name: name.into(),
            segment,
            offset,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.locs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    pub fn name(&self, id: LocationId) -> &str {
        &self.locs[id.0 as usize].name
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocationId, &Location)> {
        self.locs
            .iter()
            .enumerate()
            .map(|(i, l)| (LocationId(i as u32), l))
    }
}

impl Index<LocationId> for LocationTable {
    type Output = Location;

    fn index(&self, id: LocationId) -> &Location {
        &self.locs[id.0 as usize]
    }
}

// ── Instructions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpCode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Lt,
    And,
    Or,
}

impl BinOpCode {
    pub fn token(self) -> &'static str {
        match self {
            BinOpCode::Add => "+",
            BinOpCode::Sub => "-",
            BinOpCode::Mul => "*",
            BinOpCode::Div => "/",
            BinOpCode::Mod => "%",
            BinOpCode::Eq => "==",
            BinOpCode::Lt => "<",
            BinOpCode::And => "&&",
            BinOpCode::Or => "||",
        }
    }
}

impl fmt::Display for BinOpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[derive(Debug, Clone)]
pub enum Instr {
    LoadConst {
        dst: LocationId,
        value: i32,
    },
    LoadStrLit {
        dst: LocationId,
        value: String,
    },
    LoadLabel {
        dst: LocationId,
        label: String,
    },
    Assign {
        dst: LocationId,
        src: LocationId,
    },
    /// `dst = *(base + offset)`
    Load {
        dst: LocationId,
        base: LocationId,
        offset: i32,
    },
    /// `*(base + offset) = src`
    Store {
        base: LocationId,
        src: LocationId,
        offset: i32,
    },
    BinOp {
        op: BinOpCode,
        dst: LocationId,
        left: LocationId,
        right: LocationId,
    },
    Label(String),
    Goto {
        target: String,
    },
    /// Branch to `target` when `cond` is zero; falls through otherwise.
    IfZ {
        cond: LocationId,
        target: String,
    },
    /// Frame size is backpatched by the lowering context once the function's
    /// locals and temporaries are all known.
    BeginFunc {
        frame_size: i32,
    },
    EndFunc,
    Return {
        value: Option<LocationId>,
    },
    PushParam {
        src: LocationId,
    },
    PopParams {
        bytes: i32,
    },
    LCall {
        label: String,
        dst: Option<LocationId>,
    },
    ACall {
        addr: LocationId,
        dst: Option<LocationId>,
    },
    /// Read-only dispatch table: one word per method label.
    VTable {
        class: String,
        methods: Vec<String>,
    },
}

impl Instr {
    /// Locations written by this instruction.
    pub fn kill(&self) -> Vec<LocationId> {
        match self {
            Instr::LoadConst { dst, .. }
            | Instr::LoadStrLit { dst, .. }
            | Instr::LoadLabel { dst, .. }
            | Instr::Assign { dst, .. }
            | Instr::Load { dst, .. }
            | Instr::BinOp { dst, .. } => vec![*dst],
            Instr::LCall { dst, .. } | Instr::ACall { dst, .. } => dst.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Locations read by this instruction.
    pub fn gen(&self) -> Vec<LocationId> {
        match self {
            Instr::Assign { src, .. } => vec![*src],
            Instr::Load { base, .. } => vec![*base],
            Instr::Store { base, src, .. } => vec![*base, *src],
            Instr::BinOp { left, right, .. } => vec![*left, *right],
            Instr::IfZ { cond, .. } => vec![*cond],
            Instr::PushParam { src } => vec![*src],
            Instr::Return { value } => value.iter().copied().collect(),
            Instr::ACall { addr, .. } => vec![*addr],
            _ => Vec::new(),
        }
    }

    pub fn kill_set(&self) -> BTreeSet<LocationId> {
        self.kill().into_iter().collect()
    }

    pub fn gen_set(&self) -> BTreeSet<LocationId> {
        self.gen().into_iter().collect()
    }

    /// Branch target label, for `Goto` and `IfZ`.
    pub fn branch_target(&self) -> Option<&str> {
        match self {
            Instr::Goto { target } | Instr::IfZ { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether control can continue to the textually next instruction.
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Instr::Goto { .. } | Instr::Return { .. } | Instr::EndFunc
        )
    }
}

// ── Program ─────────────────────────────────────────────────────────────

/// Per-function metadata recorded during lowering.  The backend rediscovers
/// the `[BeginFunc, EndFunc]` window by scanning, but the parameter list is
/// needed to seed registers in the prologue.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub label: String,
    /// Index of the function's `BeginFunc` instruction.
    pub begin: usize,
    /// Parameter locations in stack order (`this` first for methods).
    pub params: Vec<LocationId>,
}

#[derive(Debug, Default)]
pub struct TacProgram {
    pub instrs: Vec<Instr>,
    pub locations: LocationTable,
    pub functions: Vec<FunctionInfo>,
}

impl TacProgram {
    /// Render one instruction in the textual TAC form.  Multi-line for
    /// vtables.
    pub fn render(&self, instr: &Instr) -> String {
        let name = |id: LocationId| self.locations.name(id).to_string();
        let deref = |base: LocationId, offset: i32| match offset {
            0 => format!("*({})", name(base)),
            o if o > 0 => format!("*({} + {o})", name(base)),
            o => format!("*({} - {})", name(base), -o),
        };
        match instr {
            Instr::LoadConst { dst, value } => format!("{} = {value}", name(*dst)),
            Instr::LoadStrLit { dst, value } => format!("{} = {value:?}", name(*dst)),
            Instr::LoadLabel { dst, label } => format!("{} = {label}", name(*dst)),
            Instr::Assign { dst, src } => format!("{} = {}", name(*dst), name(*src)),
            Instr::Load { dst, base, offset } => {
                format!("{} = {}", name(*dst), deref(*base, *offset))
            }
            Instr::Store { base, src, offset } => {
                format!("{} = {}", deref(*base, *offset), name(*src))
            }
            Instr::BinOp {
                op,
                dst,
                left,
                right,
            } => format!("{} = {} {op} {}", name(*dst), name(*left), name(*right)),
            Instr::Label(label) => format!("{label}:"),
            Instr::Goto { target } => format!("Goto {target}"),
            Instr::IfZ { cond, target } => format!("IfZ {} Goto {target}", name(*cond)),
            Instr::BeginFunc { frame_size } => format!("BeginFunc {frame_size}"),
            Instr::EndFunc => "EndFunc".to_string(),
            Instr::Return { value: Some(v) } => format!("Return {}", name(*v)),
            Instr::Return { value: None } => "Return".to_string(),
            Instr::PushParam { src } => format!("PushParam {}", name(*src)),
            Instr::PopParams { bytes } => format!("PopParams {bytes}"),
            Instr::LCall { label, dst: None } => format!("LCall {label}"),
            Instr::LCall {
                label,
                dst: Some(d),
            } => format!("{} = LCall {label}", name(*d)),
            Instr::ACall { addr, dst: None } => format!("ACall {}", name(*addr)),
            Instr::ACall {
                addr,
                dst: Some(d),
            } => format!("{} = ACall {}", name(*d), name(*addr)),
            Instr::VTable { class, methods } => {
                let mut s = format!("VTable {class} =");
                for m in methods {
                    s.push_str(&format!("\n  {m}"));
                }
                s
            }
        }
    }

    pub fn to_lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.instrs.len());
        for instr in &self.instrs {
            let rendered = self.render(instr);
            for line in rendered.split('\n') {
                if matches!(instr, Instr::Label(_) | Instr::VTable { .. }) {
                    out.push(line.to_string());
                } else {
                    out.push(format!("  {line}"));
                }
            }
        }
        out
    }

    pub fn to_text(&self) -> String {
        let mut text = self.to_lines().join("\n");
        text.push('\n');
        text
    }
}
