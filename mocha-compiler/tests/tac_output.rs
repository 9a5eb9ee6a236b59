//! Structural checks on the textual TAC produced by lowering.

mod common;

use common::*;
use mocha_compiler::ast::*;
use mocha_compiler::{compile_to_tac, CompileError};

// ── Entry point and built-in calls ───────────────────────────────────────

#[test]
fn hello_world_calls_print_string() {
    let program = main_program(block(
        vec![],
        vec![print_one(string("hi"), Type::Str)],
    ));
    let tac = compile_to_tac(&program).expect("lowering failed");
    let lines: Vec<&str> = tac.lines().collect();

    let label = line_index(&lines, |l| l == "main:", "the entry label");
    let lit = line_index(&lines, |l| l.contains("= \"hi\""), "the string literal");
    let push = line_index(&lines, |l| l.contains("PushParam"), "the argument push");
    let call = line_index(&lines, |l| l.contains("LCall _PrintString"), "the call");
    assert!(label < lit && lit < push && push < call);
    assert!(tac.contains("PopParams 4"));
    assert!(tac.contains("EndFunc"));
}

#[test]
fn main_keeps_its_bare_label_and_others_are_mangled() {
    let mut program = main_program(block(vec![], vec![]));
    program
        .functions
        .push(fn_decl("helper", Type::Void, vec![], block(vec![], vec![])));
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("main:"));
    assert!(tac.contains("_helper:"));
    assert!(!tac.contains("_main:"));
}

#[test]
fn pop_params_is_suppressed_for_zero_argument_calls() {
    let mut program = main_program(block(
        vec![],
        vec![Stmt::Expr(fn_call(1, vec![]))],
    ));
    program
        .functions
        .push(fn_decl("nop", Type::Void, vec![], block(vec![], vec![])));
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("LCall _nop"));
    assert!(!tac.contains("PopParams 0"));
}

// ── Arrays ───────────────────────────────────────────────────────────────

#[test]
fn new_array_stores_length_below_element_zero() {
    // int[] a; a = NewArray(3, int); Print(a.length());
    let program = main_program(block(
        vec![local_decl(0, "a", Type::array_of(Type::Int))],
        vec![
            assign(local(0), new_array(int(3), Type::Int)),
            print_one(array_len(local(0)), Type::Int),
        ],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();

    // Allocation reserves length + elements and writes the length at word 0.
    assert!(tac.contains("LCall _Alloc"));
    let store = line_index(
        &lines,
        |l| l.trim_start().starts_with("*(") && l.contains(") = "),
        "the length store",
    );
    // .length() reads one word below the element base.
    let read = line_index(&lines, |l| l.contains("*(a - 4)"), "the length read");
    assert!(store < read);
}

#[test]
fn array_access_emits_a_bounds_check_that_halts() {
    // int[] a; a = NewArray(2, int); a[5] = 0;
    let program = main_program(block(
        vec![local_decl(0, "a", Type::array_of(Type::Int))],
        vec![
            assign(local(0), new_array(int(2), Type::Int)),
            assign(index(local(0), int(5)), int(0)),
        ],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();

    let test = line_index(
        &lines,
        |l| l.contains("&&"),
        "the combined bounds test",
    );
    let branch = lines[test..]
        .iter()
        .position(|l| l.contains("IfZ"))
        .expect("IfZ after the bounds test")
        + test;
    let message = line_index(
        &lines,
        |l| l.contains("out of bounds"),
        "the fault literal",
    );
    let halt = lines[message..]
        .iter()
        .position(|l| l.contains("LCall _Halt"))
        .expect("halt after the fault literal")
        + message;
    assert!(branch < message && message < halt);

    // The happy path jumps over the fault handler.
    let goto = lines[branch..message]
        .iter()
        .any(|l| l.trim_start().starts_with("Goto "));
    assert!(goto, "no jump past the fault handler");
}

#[test]
fn negative_array_size_faults_at_runtime() {
    let program = main_program(block(
        vec![local_decl(0, "a", Type::array_of(Type::Int))],
        vec![assign(local(0), new_array(int(0), Type::Int))],
    ));
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("size is <= 0"));
    assert!(tac.contains("LCall _Halt"));
}

// ── Classes, dispatch and the calling convention ─────────────────────────

fn two_class_program() -> Program {
    // class A { void f() {} void g() {} }  class B extends A { void f() {} }
    let a = class(
        "A",
        None,
        vec![],
        vec![
            void_method("f", block(vec![], vec![])),
            void_method("g", block(vec![], vec![])),
        ],
    );
    let b = class("B", Some(0), vec![], vec![void_method("f", block(vec![], vec![]))]);
    let mut program = main_program(block(vec![], vec![]));
    program.classes = vec![a, b];
    program
}

#[test]
fn override_keeps_vtable_slots_in_order() {
    let tac = compile_to_tac(&two_class_program()).unwrap();
    let lines: Vec<&str> = tac.lines().collect();

    let a = line_index(&lines, |l| l == "VTable A =", "A's vtable");
    assert_eq!(lines[a + 1].trim(), "_A.f");
    assert_eq!(lines[a + 2].trim(), "_A.g");

    let b = line_index(&lines, |l| l == "VTable B =", "B's vtable");
    assert_eq!(lines[b + 1].trim(), "_B.f");
    assert_eq!(lines[b + 2].trim(), "_A.g");
}

#[test]
fn method_call_pushes_receiver_last_and_pops_everything() {
    // class C { void m(int x, int y) {} }
    // main: C c; c = new C; c.m(1, 2);
    let c = class(
        "C",
        None,
        vec![],
        vec![fn_decl(
            "m",
            Type::Void,
            vec![var_decl("x", Type::Int), var_decl("y", Type::Int)],
            block(vec![], vec![]),
        )],
    );
    let mut program = main_program(block(
        vec![local_decl(0, "c", Type::Named(0))],
        vec![
            assign(local(0), Expr::New { class: 0 }),
            Stmt::Expr(method_call(Some(local(0)), 0, "m", vec![int(1), int(2)])),
        ],
    ));
    program.classes = vec![c];

    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();
    let call = line_index(&lines, |l| l.contains("ACall"), "the dynamic call");

    // k + 1 pushes immediately before the call: both actuals, receiver last.
    for i in (call - 3)..call {
        assert!(
            lines[i].contains("PushParam"),
            "expected PushParam at line {i}, got: {}",
            lines[i]
        );
    }
    assert!(lines[call - 1].contains("PushParam c"));
    assert_eq!(lines[call + 1].trim(), "PopParams 12");

    // Dispatch went through the vtable at object offset 0.
    let vload = line_index(&lines, |l| l.contains("= *(c)"), "the vtable load");
    assert!(vload < call);
}

#[test]
fn new_installs_the_vtable_pointer() {
    let mut program = main_program(block(
        vec![local_decl(0, "c", Type::Named(0))],
        vec![assign(local(0), Expr::New { class: 0 })],
    ));
    program.classes = vec![class("C", None, vec![var_decl("n", Type::Int)], vec![])];
    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();

    // Size of C: vtable pointer word plus one field.
    let size = line_index(&lines, |l| l.ends_with("= 8"), "the size constant");
    let alloc = line_index(&lines, |l| l.contains("LCall _Alloc"), "the allocation");
    let label = line_index(&lines, |l| l.ends_with("= C"), "the vtable label load");
    let install = line_index(
        &lines,
        |l| l.trim_start().starts_with("*(") && l.contains(") = "),
        "the vtable install",
    );
    assert!(size < alloc && alloc < label && label < install);
}

#[test]
fn implicit_this_field_access_goes_through_the_frame_receiver() {
    // class Counter { int count; void bump() { count = count + 1; } }
    let counter = class(
        "Counter",
        None,
        vec![var_decl("count", Type::Int)],
        vec![void_method(
            "bump",
            block(
                vec![],
                vec![assign(
                    field(0, "count"),
                    arith(ArithOp::Add, field(0, "count"), int(1)),
                )],
            ),
        )],
    );
    let mut program = main_program(block(vec![], vec![]));
    program.classes = vec![counter];
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("_Counter.bump:"));
    assert!(tac.contains("*(this + 4)"));
}

// ── Control flow ─────────────────────────────────────────────────────────

#[test]
fn while_with_break_jumps_to_the_loop_exit() {
    let program = main_program(block(
        vec![],
        vec![Stmt::While {
            cond: boolean(true),
            body: Box::new(Stmt::Break),
        }],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();

    let ifz = line_index(&lines, |l| l.contains("IfZ"), "the loop test");
    let exit_label = lines[ifz].rsplit(' ').next().unwrap();
    assert!(
        lines.iter().any(|l| l.trim() == format!("Goto {exit_label}")),
        "break does not target the loop exit {exit_label}"
    );
    // The backedge targets the loop head.
    assert!(lines.iter().any(|l| l.trim() == "Goto _L0"));
}

#[test]
fn if_else_branches_around_the_else_body() {
    let program = main_program(block(
        vec![local_decl(0, "x", Type::Int)],
        vec![Stmt::If {
            cond: rel(RelOp::Lt, local(0), int(10)),
            then_body: Box::new(assign(local(0), int(1))),
            else_body: Some(Box::new(assign(local(0), int(2)))),
        }],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();
    let ifz = line_index(&lines, |l| l.contains("IfZ"), "the branch");
    let goto = lines[ifz..]
        .iter()
        .position(|l| l.trim().starts_with("Goto"))
        .unwrap()
        + ifz;
    // Then-branch ends by jumping over the else-branch.
    assert!(goto > ifz);
    assert!(tac.contains("_L1:"));
}

// ── Operator desugarings ─────────────────────────────────────────────────

#[test]
fn greater_than_is_swapped_less_than() {
    let program = main_program(block(
        vec![local_decl(0, "x", Type::Int)],
        vec![print_one(rel(RelOp::Gt, local(0), int(3)), Type::Bool)],
    ));
    let tac = compile_to_tac(&program).unwrap();
    // x > 3 becomes tmp < x with the constant on the left.
    assert!(tac.contains("< x"));
    assert!(!tac.contains("x >"));
}

#[test]
fn string_equality_uses_the_runtime_helper() {
    let program = main_program(block(
        vec![],
        vec![print_one(
            Expr::Eq {
                negated: false,
                left: Box::new(string("a")),
                right: Box::new(string("b")),
                operand_ty: Type::Str,
            },
            Type::Bool,
        )],
    ));
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("LCall _StringEqual"));
    assert!(tac.contains("PopParams 8"));
}

#[test]
fn less_equal_combines_less_and_equal() {
    let program = main_program(block(
        vec![local_decl(0, "x", Type::Int)],
        vec![print_one(rel(RelOp::Le, local(0), int(3)), Type::Bool)],
    ));
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("<"));
    assert!(tac.contains("=="));
    assert!(tac.contains("||"));
}

#[test]
fn unary_minus_subtracts_from_zero() {
    let program = main_program(block(
        vec![local_decl(0, "x", Type::Int)],
        vec![print_one(neg(local(0)), Type::Int)],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();
    let zero = line_index(&lines, |l| l.ends_with("= 0"), "the zero constant");
    let sub = line_index(&lines, |l| l.contains("- x"), "the subtraction");
    assert!(zero < sub);
}

#[test]
fn logical_not_compares_to_zero() {
    let program = main_program(block(
        vec![local_decl(0, "b", Type::Bool)],
        vec![print_one(not(local(0)), Type::Bool)],
    ));
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("b == "));
}

#[test]
fn assignment_yields_the_assigned_value() {
    // a = b = 3;  — both stores read the same temporary.
    let program = main_program(block(
        vec![
            local_decl(0, "a", Type::Int),
            local_decl(1, "b", Type::Int),
        ],
        vec![Stmt::Expr(Expr::Assign {
            target: Box::new(local(0)),
            value: Box::new(Expr::Assign {
                target: Box::new(local(1)),
                value: Box::new(int(3)),
            }),
        })],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let lines: Vec<&str> = tac.lines().collect();
    let inner = line_index(&lines, |l| l.trim() == "b = _tmp0", "the inner store");
    let outer = line_index(&lines, |l| l.trim() == "a = _tmp0", "the outer store");
    assert!(inner < outer);
}

#[test]
fn read_builtins_return_values() {
    let program = main_program(block(
        vec![local_decl(0, "x", Type::Int)],
        vec![assign(local(0), Expr::ReadInteger)],
    ));
    let tac = compile_to_tac(&program).unwrap();
    assert!(tac.contains("= LCall _ReadInteger"));
}

#[test]
fn interfaces_produce_no_code() {
    let mut program = main_program(block(vec![], vec![]));
    program.interfaces = vec![InterfaceDecl {
        name: "Printable".to_string(),
        prototypes: vec![Prototype {
            name: "print".to_string(),
            ret: Type::Void,
            params: vec![],
        }],
    }];
    let tac = compile_to_tac(&program).unwrap();
    assert!(!tac.contains("Printable"));
}

#[test]
fn not_equal_compares_the_equality_against_zero() {
    let program = main_program(block(
        vec![local_decl(0, "x", Type::Int)],
        vec![print_one(
            Expr::Eq {
                negated: true,
                left: Box::new(local(0)),
                right: Box::new(int(3)),
                operand_ty: Type::Int,
            },
            Type::Bool,
        )],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let eq_lines = tac.lines().filter(|l| l.contains("==")).count();
    // One for x == 3 and one for the negation against zero.
    assert_eq!(eq_lines, 2);
}

// ── Frames ───────────────────────────────────────────────────────────────

#[test]
fn frame_size_is_backpatched_after_the_body() {
    let program = main_program(block(
        vec![local_decl(0, "x", Type::Int)],
        vec![assign(local(0), int(1))],
    ));
    let tac = compile_to_tac(&program).unwrap();
    let begin = tac
        .lines()
        .find(|l| l.contains("BeginFunc"))
        .expect("BeginFunc missing");
    // One local plus one constant temporary.
    assert_eq!(begin.trim(), "BeginFunc 8");
}

#[test]
fn frame_counters_reset_between_functions() {
    let mut program = main_program(block(vec![], vec![]));
    program.functions.insert(
        0,
        fn_decl(
            "first",
            Type::Void,
            vec![],
            block(
                vec![local_decl(0, "x", Type::Int)],
                vec![assign(local(0), int(1))],
            ),
        ),
    );
    let tac = compile_to_tac(&program).unwrap();
    let sizes: Vec<&str> = tac
        .lines()
        .filter(|l| l.contains("BeginFunc"))
        .map(str::trim)
        .collect();
    assert_eq!(sizes, vec!["BeginFunc 8", "BeginFunc 0"]);
}

// ── Unsupported constructs ───────────────────────────────────────────────

#[test]
fn double_literals_fail_loudly() {
    let program = main_program(block(
        vec![],
        vec![Stmt::Expr(Expr::Assign {
            target: Box::new(local(0)),
            value: Box::new(Expr::DoubleLit(1.5)),
        })],
    ));
    let err = compile_to_tac(&program).unwrap_err();
    assert!(matches!(err, CompileError::Unsupported(_)));
}
