//! Source (as a hand-built AST) through the full pipeline to an
//! interpreter result, covering every end-to-end scenario plus the
//! structural claims each one makes about its post-pipeline IR.

use talus_ast::build;
use talus_ir::{CompileOptions, InstKind, Module};
use talus_support::Arena;
use talus_vm::Runtime;

fn run(program: &talus_ast::Node) -> f64 {
    let arena = Arena::new();
    let mut runtime = Runtime::compile(&arena, program, CompileOptions::default()).unwrap();
    runtime.run(&[]).unwrap().as_number()
}

#[test]
fn scenario_1_arithmetic_returns_three() {
    let program = build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![build::return_stmt(Some(build::binary("+", build::num(1.0), build::num(2.0))))]),
        None,
    )]);
    assert_eq!(run(&program), 3.0);
}

#[test]
fn scenario_2_if_else_takes_the_true_branch() {
    let program = build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![
            build::var_stmt(vec![build::var_decl("x", Some(build::num(10.0)))]),
            build::if_stmt(
                build::binary("==", build::ident("x"), build::num(10.0)),
                build::block(vec![build::return_stmt(Some(build::num(1.0)))]),
                Some(build::block(vec![build::return_stmt(Some(build::num(0.0)))])),
            ),
        ]),
        None,
    )]);
    assert_eq!(run(&program), 1.0);
}

#[test]
fn scenario_3_modulo_after_multiply() {
    let program = build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![
            build::var_stmt(vec![build::var_decl("a", Some(build::num(0.0)))]),
            build::expr_stmt(build::assign("a", build::binary("*", build::num(5.0), build::num(6.0)))),
            build::expr_stmt(build::assign("a", build::binary("%", build::ident("a"), build::num(7.0)))),
            build::return_stmt(Some(build::ident("a"))),
        ]),
        None,
    )]);
    assert_eq!(run(&program), 2.0);
}

#[test]
fn scenario_4_call_between_functions() {
    let program = build::program(vec![
        build::func_decl(
            "add",
            vec![build::param("a"), build::param("b")],
            build::block(vec![build::return_stmt(Some(build::binary("+", build::ident("a"), build::ident("b"))))]),
            None,
        ),
        build::func_decl(
            "main",
            vec![],
            build::block(vec![build::return_stmt(Some(build::call(build::ident("add"), vec![build::num(40.0), build::num(2.0)])))]),
            None,
        ),
    ]);
    assert_eq!(run(&program), 42.0);
}

/// `var a=1; var b=2; var c=a; a=b; b=c; return a-b;` swaps `a`/`b`
/// through `c`, leaving `a-b == 1`. After Mem2Reg every slot this
/// function ever allocated is promoted away: no `AllocStack`,
/// `LoadStack`, or `StoreStack` survives the pipeline.
#[test]
fn scenario_5_swap_through_a_temporary_and_mem2reg_clears_the_stack() {
    let program = build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![
            build::var_stmt(vec![build::var_decl("a", Some(build::num(1.0)))]),
            build::var_stmt(vec![build::var_decl("b", Some(build::num(2.0)))]),
            build::var_stmt(vec![build::var_decl("c", Some(build::ident("a")))]),
            build::expr_stmt(build::assign("a", build::ident("b"))),
            build::expr_stmt(build::assign("b", build::ident("c"))),
            build::return_stmt(Some(build::binary("-", build::ident("a"), build::ident("b")))),
        ]),
        None,
    )]);
    assert_eq!(run(&program), 1.0);

    let arena = Arena::new();
    let mut module = Module::new(&arena);
    let main = talus_irgen::lower_program(&mut module, &program).unwrap().expect("main declared");
    let mut pipeline = talus_pass::PassManager::default_pipeline(talus_ir::OptLevel::Default);
    pipeline.run(&mut module, &CompileOptions::default()).unwrap();
    let func = &module.functions[main];
    assert!(
        func.insts.values().all(|data| !matches!(data.kind, InstKind::AllocStack | InstKind::LoadStack(_) | InstKind::StoreStack(_, _))),
        "a promoted slot survived Mem2Reg: {:?}",
        func.insts.values().map(|d| &d.kind).collect::<Vec<_>>()
    );
}

/// `if (true) { return 7; } return 8;` never reaches the `return 8`
/// block; after DCE that block is gone entirely, not merely unreachable
/// in the layout.
#[test]
fn scenario_6_dead_branch_is_removed_by_dce() {
    let program = build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![
            build::if_stmt(build::boolean(true), build::block(vec![build::return_stmt(Some(build::num(7.0)))]), None),
            build::return_stmt(Some(build::num(8.0))),
        ]),
        None,
    )]);
    assert_eq!(run(&program), 7.0);

    let arena = Arena::new();
    let mut module = Module::new(&arena);
    let main = talus_irgen::lower_program(&mut module, &program).unwrap().expect("main declared");
    let mut pipeline = talus_pass::PassManager::default_pipeline(talus_ir::OptLevel::Default);
    pipeline.run(&mut module, &CompileOptions::default()).unwrap();
    let func = &module.functions[main];
    let returns_eight = func.insts.values().any(|data| matches!(&data.kind, InstKind::LoadConst(lit) if matches!(module.literal_pool.get(*lit), talus_ir::Literal::Number(n) if *n == 8.0)));
    assert!(!returns_eight, "the dead `return 8` survived DCE");
}
