//! Builders for checked-AST fragments, shared by the integration tests.
//!
//! The back end consumes what a front end would produce, so tests construct
//! resolved trees directly; these helpers keep that from drowning in
//! `Box::new`.

#![allow(dead_code)]

use mocha_compiler::ast::*;

pub fn int(v: i32) -> Expr {
    Expr::IntLit(v)
}

pub fn string(s: &str) -> Expr {
    Expr::StrLit(s.to_string())
}

pub fn boolean(v: bool) -> Expr {
    Expr::BoolLit(v)
}

pub fn local(id: LocalId) -> Expr {
    Expr::Var(Symbol::Local(id))
}

pub fn param(index: usize) -> Expr {
    Expr::Var(Symbol::Param(index))
}

pub fn global(id: GlobalId) -> Expr {
    Expr::Var(Symbol::Global(id))
}

pub fn field(class: ClassId, name: &str) -> Expr {
    Expr::Field {
        base: None,
        class,
        name: name.to_string(),
    }
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    Stmt::Expr(Expr::Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn arith(op: ArithOp, left: Expr, right: Expr) -> Expr {
    Expr::Arith {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn rel(op: RelOp, left: Expr, right: Expr) -> Expr {
    Expr::Rel {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn neg(operand: Expr) -> Expr {
    Expr::Neg(Box::new(operand))
}

pub fn not(operand: Expr) -> Expr {
    Expr::Not(Box::new(operand))
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    Expr::Index {
        base: Box::new(base),
        index: Box::new(idx),
    }
}

pub fn new_array(size: Expr, elem_ty: Type) -> Expr {
    Expr::NewArray {
        size: Box::new(size),
        elem_ty,
    }
}

pub fn array_len(base: Expr) -> Expr {
    Expr::ArrayLength {
        base: Box::new(base),
    }
}

pub fn fn_call(func: FnId, args: Vec<Expr>) -> Expr {
    Expr::FnCall { func, args }
}

pub fn method_call(base: Option<Expr>, class: ClassId, method: &str, args: Vec<Expr>) -> Expr {
    Expr::MethodCall {
        base: base.map(Box::new),
        class,
        method: method.to_string(),
        args,
    }
}

pub fn print_one(expr: Expr, ty: Type) -> Stmt {
    Stmt::Print(vec![PrintArg { expr, ty }])
}

pub fn var_decl(name: &str, ty: Type) -> VarDecl {
    VarDecl {
        name: name.to_string(),
        ty,
    }
}

pub fn local_decl(id: LocalId, name: &str, ty: Type) -> LocalDecl {
    LocalDecl {
        var: var_decl(name, ty),
        id,
    }
}

pub fn block(decls: Vec<LocalDecl>, stmts: Vec<Stmt>) -> Block {
    Block { decls, stmts }
}

pub fn fn_decl(name: &str, ret: Type, params: Vec<VarDecl>, body: Block) -> FnDecl {
    FnDecl {
        name: name.to_string(),
        ret,
        params,
        body,
    }
}

pub fn void_method(name: &str, body: Block) -> FnDecl {
    fn_decl(name, Type::Void, Vec::new(), body)
}

pub fn class(
    name: &str,
    base: Option<ClassId>,
    fields: Vec<VarDecl>,
    methods: Vec<FnDecl>,
) -> ClassDecl {
    ClassDecl {
        name: name.to_string(),
        base,
        fields,
        methods,
    }
}

/// A program whose only function is `main` with the given body.
pub fn main_program(body: Block) -> Program {
    Program {
        functions: vec![fn_decl("main", Type::Void, Vec::new(), body)],
        ..Program::default()
    }
}

/// Index of the line matching `pred`, panicking with context otherwise.
pub fn line_index(lines: &[&str], pred: impl Fn(&str) -> bool, what: &str) -> usize {
    lines
        .iter()
        .position(|l| pred(l))
        .unwrap_or_else(|| panic!("no line matching {what} in:\n{}", lines.join("\n")))
}
