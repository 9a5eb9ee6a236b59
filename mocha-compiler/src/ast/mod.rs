//! The checked abstract syntax tree.
//!
//! This is the input boundary of the back end: a front end (lexer, parser,
//! semantic checker) produces a `Program` in which every name use has been
//! resolved and every type-bearing expression carries its type.  Declarations
//! live in arenas and are referenced by index, so the tree serializes cleanly
//! and resolution never happens again during lowering.

pub mod types;

pub use types::Type;

use serde::{Deserialize, Serialize};

/// Index into [`Program::classes`].
pub type ClassId = usize;
/// Index into [`Program::functions`].
pub type FnId = usize;
/// Index into [`Program::globals`].
pub type GlobalId = usize;
/// Function-unique index for a block-scoped local, minted by the checker.
pub type LocalId = usize;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub functions: Vec<FnDecl>,
    pub globals: Vec<VarDecl>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id]
    }

    /// Look up a method by name, walking the inheritance chain upward.
    pub fn find_method(&self, class: ClassId, name: &str) -> Option<&FnDecl> {
        let mut cur = Some(class);
        while let Some(id) = cur {
            let decl = &self.classes[id];
            if let Some(m) = decl.methods.iter().find(|m| m.name == name) {
                return Some(m);
            }
            cur = decl.base;
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    /// Base class, already resolved by the checker.  Cycles are rejected
    /// upstream.
    pub base: Option<ClassId>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<FnDecl>,
}

/// Interfaces are carried through for completeness but produce no layout and
/// no code; only classes get vtables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub prototypes: Vec<Prototype>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prototype {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Type>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub ret: Type,
    pub params: Vec<VarDecl>,
    pub body: Block,
}

impl FnDecl {
    pub fn has_return_value(&self) -> bool {
        self.ret != Type::Void
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
}

/// A block-scoped variable declaration.  The checker assigns each local in a
/// function a distinct [`LocalId`] so shadowed names stay distinguishable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDecl {
    pub var: VarDecl,
    pub id: LocalId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub decls: Vec<LocalDecl>,
    pub stmts: Vec<Stmt>,
}

/// A resolved identifier use.  Fields are not symbols: an identifier that
/// resolves to a field becomes an [`Expr::Field`] with no base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    Global(GlobalId),
    /// The n-th formal parameter of the enclosing function.
    Param(usize),
    Local(LocalId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Block(Block),
    If {
        cond: Expr,
        then_body: Box<Stmt>,
        else_body: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Expr>,
        cond: Expr,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Break,
    Return(Option<Expr>),
    Print(Vec<PrintArg>),
    Expr(Expr),
}

/// A `Print` argument together with its checked type, which selects the
/// runtime print routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintArg {
    pub expr: Expr,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    IntLit(i32),
    DoubleLit(f64),
    BoolLit(bool),
    StrLit(String),
    NullLit,
    This,
    Var(Symbol),
    /// Field access.  `base` is `None` for implicit-`this` access from inside
    /// a method; `class` is the static type of the receiver, which fixes the
    /// field offset.
    Field {
        base: Option<Box<Expr>>,
        class: ClassId,
        name: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg(Box<Expr>),
    Rel {
        op: RelOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `==` / `!=`.  `operand_ty` is the checked type of the operands; string
    /// equality dispatches to the runtime instead of a compare instruction.
    Eq {
        negated: bool,
        left: Box<Expr>,
        right: Box<Expr>,
        operand_ty: Type,
    },
    Logic {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    FnCall {
        func: FnId,
        args: Vec<Expr>,
    },
    /// Dynamically dispatched call.  `class` is the static receiver class;
    /// `base` is `None` for implicit-`this` calls.
    MethodCall {
        base: Option<Box<Expr>>,
        class: ClassId,
        method: String,
        args: Vec<Expr>,
    },
    /// `arr.length()`, already recognized by the checker.
    ArrayLength {
        base: Box<Expr>,
    },
    New {
        class: ClassId,
    },
    NewArray {
        size: Box<Expr>,
        elem_ty: Type,
    },
    ReadInteger,
    ReadLine,
}
