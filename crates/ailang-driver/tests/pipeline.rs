//! End-to-end tests driving the full pipeline — elaborate, infer, resolve
//! overloads, dictionary-elaborate, lower, link, evaluate — from a hand-built
//! [`File`] through to either an evaluated [`Value`] or a specific failure.
//! There is no parser in this workspace, so every test builds its `File` by
//! constructing surface AST nodes directly.

use ailang_core::{ConstructorInfo, ConstructorMap};
use ailang_driver::{Config, Session};
use ailang_rt::Value;
use ailang_syntax::{BinOpKind, Expr, ExprKind, File, FuncDecl, Literal, MatchArm, Param, Pattern, PatternKind};
use ailang_util::{Pos, Symbol};

fn pos() -> Pos {
    Pos::new(Symbol::intern("pipeline.ail"), 1, 1)
}

fn lit_int(n: i64) -> Expr {
    Expr::new(ExprKind::Lit(Literal::Int(n)), pos())
}

fn var(name: &str) -> Expr {
    Expr::new(ExprKind::Var(Symbol::intern(name)), pos())
}

fn binop(op: BinOpKind, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::BinOp(op, Box::new(lhs), Box::new(rhs)), pos())
}

fn file_with_stmts(stmts: Vec<Expr>) -> File {
    File { module: None, imports: vec![], type_decls: vec![], func_decls: vec![], stmts }
}

/// S1: straight-line arithmetic over int literals, no functions at all —
/// the shortest possible path through every stage.
#[test]
fn s1_arithmetic_over_int_literals() {
    let session = Session::new(Config::default());
    let ctors = ConstructorMap::new();
    let expr = binop(BinOpKind::Mul, binop(BinOpKind::Add, lit_int(2), lit_int(3)), lit_int(4));
    let value = session.compile_and_run(&file_with_stmts(vec![expr]), &ctors).expect("pipeline should succeed");
    assert!(matches!(value, Value::Int(20)));
}

/// S2: a recursive function computing a factorial, exercised through
/// `LetRec` grouping, `If`, and nested `App`s.
#[test]
fn s2_recursive_function_computes_factorial() {
    let session = Session::new(Config::default());
    let ctors = ConstructorMap::new();
    let n = Symbol::intern("n");

    let base_case = binop(BinOpKind::Lte, var("n"), lit_int(1));
    let recursive_step = binop(
        BinOpKind::Mul,
        var("n"),
        Expr::new(
            ExprKind::App(
                Box::new(var("factorial")),
                vec![binop(BinOpKind::Sub, var("n"), lit_int(1))],
            ),
            pos(),
        ),
    );
    let body = Expr::new(ExprKind::If(Box::new(base_case), Box::new(lit_int(1)), Box::new(recursive_step)), pos());

    let decl = FuncDecl {
        name: Symbol::intern("factorial"),
        params: vec![Param { name: n, type_annot: None, pos: pos() }],
        ret_type: None,
        effect_annot: None,
        body,
        is_export: false,
        pos: pos(),
    };
    let call = Expr::new(ExprKind::App(Box::new(var("factorial")), vec![lit_int(5)]), pos());
    let file = File { module: None, imports: vec![], type_decls: vec![], func_decls: vec![decl], stmts: vec![call] };

    let value = session.compile_and_run(&file, &ctors).expect("pipeline should succeed");
    assert!(matches!(value, Value::Int(120)));
}

/// S3: pattern matching over a nullary/unary ADT (`Option`-shaped),
/// exercising `ConstructorMap`, the elaborator's constructor rewriting, and
/// the evaluator's structural pattern binding.
#[test]
fn s3_match_over_an_adt_constructor() {
    let session = Session::new(Config::default());
    let mut ctors = ConstructorMap::new();
    ctors
        .register(ConstructorInfo {
            type_name: Symbol::intern("Option"),
            ctor_name: Symbol::intern("Some"),
            arity: 1,
            tag: 0,
        })
        .unwrap();
    ctors
        .register(ConstructorInfo {
            type_name: Symbol::intern("Option"),
            ctor_name: Symbol::intern("None"),
            arity: 0,
            tag: 1,
        })
        .unwrap();

    let some_five = Expr::new(ExprKind::App(Box::new(var("Some")), vec![lit_int(5)]), pos());
    let arm_some = MatchArm {
        pattern: Pattern::new(
            PatternKind::Constructor(Symbol::intern("Some"), vec![Pattern::new(PatternKind::Var(Symbol::intern("x")), pos())]),
            pos(),
        ),
        guard: None,
        body: binop(BinOpKind::Add, var("x"), lit_int(1)),
    };
    let arm_none =
        MatchArm { pattern: Pattern::new(PatternKind::Wildcard, pos()), guard: None, body: lit_int(0) };
    let matched = Expr::new(ExprKind::Match(Box::new(some_five), vec![arm_some, arm_none]), pos());

    let value = session.compile_and_run(&file_with_stmts(vec![matched]), &ctors).expect("pipeline should succeed");
    assert!(matches!(value, Value::Int(6)));
}

/// S4: records and record access, so `Type::Record`/row inference and the
/// evaluator's `RecordAccess` path both run.
#[test]
fn s4_record_field_access() {
    let session = Session::new(Config::default());
    let ctors = ConstructorMap::new();
    let record = Expr::new(
        ExprKind::Record(vec![(Symbol::intern("x"), lit_int(10)), (Symbol::intern("y"), lit_int(32))]),
        pos(),
    );
    let access = Expr::new(ExprKind::RecordAccess(Box::new(record), Symbol::intern("y")), pos());
    let value = session.compile_and_run(&file_with_stmts(vec![access]), &ctors).expect("pipeline should succeed");
    assert!(matches!(value, Value::Int(32)));
}

/// S5: calling a builtin under a declared effect succeeds; granting no
/// capability for that effect surfaces as a runtime capability fault rather
/// than a link or type error.
#[test]
fn s5_missing_capability_fails_at_evaluation_not_at_link_time() {
    let ctors = ConstructorMap::new();
    let call_trace = Expr::new(
        ExprKind::App(Box::new(var("_trace_log")), vec![Expr::new(ExprKind::Lit(Literal::String("hi".into())), pos())]),
        pos(),
    );
    let decl = FuncDecl {
        name: Symbol::intern("f"),
        params: vec![],
        ret_type: None,
        effect_annot: Some(vec![Symbol::intern("Trace")]),
        body: call_trace,
        is_export: false,
        pos: pos(),
    };
    let call_f = Expr::new(ExprKind::App(Box::new(var("f")), vec![]), pos());
    let file = File { module: None, imports: vec![], type_decls: vec![], func_decls: vec![decl], stmts: vec![call_f] };

    let permissive = Session::new(Config::default());
    assert!(permissive.compile_and_run(&file, &ctors).is_ok());

    let restrictive = Session::new(Config { capabilities: vec![], ..Config::default() });
    assert!(restrictive.compile_and_run(&file, &ctors).is_err());
}

/// S6: referencing a name that is neither a local binding, a builtin, nor a
/// constructor fails the pipeline cleanly as an `Err` rather than panicking.
#[test]
fn s6_unresolved_global_reference_fails_cleanly() {
    let session = Session::new(Config::default());
    let ctors = ConstructorMap::new();
    let call_unknown = Expr::new(ExprKind::App(Box::new(var("totally_unbound_name")), vec![lit_int(1)]), pos());
    let result = session.compile_and_run(&file_with_stmts(vec![call_unknown]), &ctors);
    assert!(result.is_err());
}
