//! A handful of bundled demo programs, built directly as AST trees rather
//! than parsed from source (the lexer/parser are out of scope for this
//! workspace). Each demo pairs a name with the `Node` `run`/`disasm` act on.

use talus_ast::{build, Node};

pub fn lookup(name: &str) -> Option<Node> {
    Some(match name {
        "arithmetic" => arithmetic(),
        "if-else" => if_else(),
        "modulo" => modulo(),
        "call" => call(),
        "swap" => swap(),
        "dead-branch" => dead_branch(),
        _ => return None,
    })
}

pub fn names() -> &'static [&'static str] {
    &["arithmetic", "if-else", "modulo", "call", "swap", "dead-branch"]
}

/// `function main() { return 1 + 2; }`
fn arithmetic() -> Node {
    build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![build::return_stmt(Some(build::binary("+", build::num(1.0), build::num(2.0))))]),
        None,
    )])
}

/// `function main() { var x = 10; if (x == 10) { return 1; } else { return 0; } }`
fn if_else() -> Node {
    build::program(vec![build::func_decl(
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
    )])
}

/// `function main() { var a = 0; a = 5 * 6; a = a % 7; return a; }`
fn modulo() -> Node {
    build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![
            build::var_stmt(vec![build::var_decl("a", Some(build::num(0.0)))]),
            build::expr_stmt(build::assign("a", build::binary("*", build::num(5.0), build::num(6.0)))),
            build::expr_stmt(build::assign("a", build::binary("%", build::ident("a"), build::num(7.0)))),
            build::return_stmt(Some(build::ident("a"))),
        ]),
        None,
    )])
}

/// `function add(a, b) { return a + b; } function main() { return add(40, 2); }`
fn call() -> Node {
    build::program(vec![
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
    ])
}

/// `function main() { var a = 1; var b = 2; var c = a; a = b; b = c; return a - b; }`
fn swap() -> Node {
    build::program(vec![build::func_decl(
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
    )])
}

/// `function main() { if (true) { return 7; } return 8; }`
fn dead_branch() -> Node {
    build::program(vec![build::func_decl(
        "main",
        vec![],
        build::block(vec![
            build::if_stmt(build::boolean(true), build::block(vec![build::return_stmt(Some(build::num(7.0)))]), None),
            build::return_stmt(Some(build::num(8.0))),
        ]),
        None,
    )])
}
