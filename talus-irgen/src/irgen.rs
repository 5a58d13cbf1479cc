//! AST traversal emitting IR, per the translation rules of the IR-gen
//! component: functions are pre-declared in one pass so calls can resolve
//! forward references, then each body is lowered in a second pass.

use crate::builder::IrBuilder;
use std::collections::HashMap;
use talus_ast::{Node, ParamDecl, SourceRange, VariableDecl};
use talus_ir::{BinOp, Diagnostic, FuncId, Function, Literal, LiteralPool, Module, TypeSet, UnOp, Value};
use talus_support::StringTable;

/// A stack of name -> slot-`Value` scopes. Captured-variable semantics are
/// out of scope; every scope is function-local, so a simple stack of flat
/// maps (rather than a real nested scope tree) is sufficient.
struct Scopes(Vec<HashMap<String, Value>>);

impl Scopes {
    fn new() -> Self {
        Self(vec![HashMap::new()])
    }

    fn push(&mut self) {
        self.0.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.0.last_mut().expect("scope stack is never empty").insert(name.to_string(), value);
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.0.iter().rev().find_map(|scope| scope.get(name).copied())
    }
}

/// Lower a whole program (a list of top-level `FuncDecl`s) into `module`.
/// Returns the `FuncId` of a function named `main`, if the program declared
/// one — the entry point `talus-cli` runs.
pub fn lower_program<'a>(module: &mut Module<'a>, program: &Node) -> Result<Option<FuncId>, Diagnostic> {
    let Node::Program { body, .. } = program else {
        return Err(Diagnostic::error(program.range(), "expected a Program node at the root"));
    };

    let mut functions_by_name = HashMap::new();
    for stmt in body {
        if let Node::FuncDecl { id, params, .. } = stmt {
            let name = module.strings.intern(id);
            let placeholder = Function::new(name, params.len() as u32, TypeSet::ANY);
            let func_id = module.declare_function(placeholder);
            functions_by_name.insert(id.clone(), func_id);
        }
    }

    for stmt in body {
        if let Node::FuncDecl { id, params, body: fn_body, return_type, range } = stmt {
            let func_id = functions_by_name[id];
            lower_function(module, &functions_by_name, func_id, params, fn_body, return_type.is_some(), *range)?;
        }
    }

    Ok(functions_by_name.get("main").copied())
}

fn lower_function<'a>(
    module: &mut Module<'a>,
    functions_by_name: &HashMap<String, FuncId>,
    func_id: FuncId,
    params: &[ParamDecl],
    body: &Node,
    _has_return_type: bool,
    range: SourceRange,
) -> Result<(), Diagnostic> {
    // Destructured rather than held as `&mut Module` so the builder's
    // borrow of `functions[func_id]` and the literal pool's borrow stay
    // disjoint — both are needed live at once while lowering expressions.
    let Module { functions, strings, literal_pool, .. } = module;
    let func = &mut functions[func_id];
    let entry = func.make_block();
    let mut builder = IrBuilder::new(func, entry);
    let mut scopes = Scopes::new();

    for (i, param) in params.iter().enumerate() {
        // Bound through a stack slot, like any other local, rather than
        // binding the raw `LoadParam` value directly: a parameter can be
        // reassigned in the body, and assignment only knows how to target
        // a slot. Mem2Reg promotes it straight back to a register when the
        // parameter is never reassigned.
        let value = builder.load_param(i as u32, param.range);
        let slot = builder.alloc_stack(param.range);
        builder.store_stack(slot, value, param.range);
        scopes.bind(&param.id, slot);
    }

    let mut ctx = FnCtx { strings, literal_pool, functions_by_name, scopes: &mut scopes };
    lower_block_body(&mut ctx, &mut builder, body)?;

    if !builder.is_terminated() {
        // Falling off the end of a function returns `undefined`, lowered
        // via the module's constant pool like any other literal load.
        let undef = ctx.literal_pool.intern(Literal::Undefined);
        let value = builder.load_const(undef, TypeSet::UNDEFINED, range);
        builder.return_(Some(value), range);
    }

    Ok(())
}

/// Threaded through statement/expression lowering. Holds the module's
/// literal pool and string table (rather than all of `Module`) so it stays
/// disjoint from the `IrBuilder`'s borrow of the function being built.
struct FnCtx<'m, 'a> {
    strings: &'m mut StringTable<'a>,
    literal_pool: &'m mut LiteralPool<'a>,
    functions_by_name: &'m HashMap<String, FuncId>,
    scopes: &'m mut Scopes,
}

fn lower_block_body(ctx: &mut FnCtx, b: &mut IrBuilder, body: &Node) -> Result<(), Diagnostic> {
    let Node::BlockStmt { body, .. } = body else {
        return lower_stmt(ctx, b, body);
    };
    for stmt in body {
        if b.is_terminated() {
            break;
        }
        lower_stmt(ctx, b, stmt)?;
    }
    Ok(())
}

fn lower_stmt(ctx: &mut FnCtx, b: &mut IrBuilder, node: &Node) -> Result<(), Diagnostic> {
    match node {
        Node::BlockStmt { .. } => {
            ctx.scopes.push();
            lower_block_body(ctx, b, node)?;
            ctx.scopes.pop();
            Ok(())
        }
        Node::VariableStmt { decls, .. } => {
            for decl in decls {
                lower_var_decl(ctx, b, decl)?;
            }
            Ok(())
        }
        Node::IfStmt { test, consequent, alternate, range } => {
            let cond = lower_expr(ctx, b, test)?;
            let then_block = b.create_block();
            let else_block = b.create_block();
            let join_block = b.create_block();
            b.cond_branch(cond, then_block, else_block, *range);

            b.switch_to_block(then_block);
            lower_stmt(ctx, b, consequent)?;
            if !b.is_terminated() {
                b.branch(join_block, *range);
            }

            b.switch_to_block(else_block);
            if let Some(alt) = alternate {
                lower_stmt(ctx, b, alt)?;
            }
            if !b.is_terminated() {
                b.branch(join_block, *range);
            }

            b.switch_to_block(join_block);
            Ok(())
        }
        Node::ReturnStmt { argument, range } => {
            let value = match argument {
                Some(expr) => Some(lower_expr(ctx, b, expr)?),
                None => None,
            };
            b.return_(value, *range);
            Ok(())
        }
        Node::ExpressionStmt { expression, .. } => {
            lower_expr(ctx, b, expression)?;
            Ok(())
        }
        other => Err(Diagnostic::error(other.range(), "unsupported statement form")),
    }
}

fn lower_var_decl(ctx: &mut FnCtx, b: &mut IrBuilder, decl: &VariableDecl) -> Result<(), Diagnostic> {
    let slot = b.alloc_stack(decl.range);
    ctx.scopes.bind(&decl.id, slot);
    // `let x;` with no initializer still assigns `undefined`, both to match
    // surface-language semantics and so every stack slot has exactly one
    // definition dominating all of its reads before any later assignment —
    // Mem2Reg's renaming pass relies on that to never need a reaching
    // definition it wasn't given.
    let value = match &decl.init {
        Some(init) => lower_expr(ctx, b, init)?,
        None => {
            let undef = ctx.literal_pool.intern(Literal::Undefined);
            b.load_const(undef, TypeSet::UNDEFINED, decl.range)
        }
    };
    b.store_stack(slot, value, decl.range);
    Ok(())
}

fn lower_expr(ctx: &mut FnCtx, b: &mut IrBuilder, node: &Node) -> Result<Value, Diagnostic> {
    match node {
        Node::NumericLiteral { value, range } => {
            let id = ctx.literal_pool.intern(Literal::Number(*value));
            Ok(b.load_const(id, TypeSet::NUMBER, *range))
        }
        Node::BooleanLiteral { value, range } => {
            let id = ctx.literal_pool.intern(Literal::Bool(*value));
            Ok(b.load_const(id, TypeSet::BOOLEAN, *range))
        }
        Node::StringLiteral { value, range } => {
            let interned = ctx.strings.intern(value);
            let id = ctx.literal_pool.intern(Literal::String(interned));
            Ok(b.load_const(id, TypeSet::STRING, *range))
        }
        Node::IdentifierExpr { name, range, .. } => {
            if let Some(slot) = ctx.scopes.lookup(name) {
                Ok(b.load_stack(slot, *range))
            } else if let Some(&func_id) = ctx.functions_by_name.get(name) {
                Ok(b.load_global_func(func_id, *range))
            } else {
                Err(Diagnostic::error(*range, format!("unresolved identifier `{name}`")))
            }
        }
        Node::BinaryExpr { left, right, operator, range } => {
            if operator == "=" {
                let Node::IdentifierExpr { name, .. } = left.as_ref() else {
                    return Err(Diagnostic::error(*range, "left side of assignment must be an identifier"));
                };
                let slot = ctx
                    .scopes
                    .lookup(name)
                    .ok_or_else(|| Diagnostic::error(*range, format!("unresolved identifier `{name}`")))?;
                let value = lower_expr(ctx, b, right)?;
                b.store_stack(slot, value, *range);
                return Ok(value);
            }
            let lhs = lower_expr(ctx, b, left)?;
            let rhs = lower_expr(ctx, b, right)?;
            let op = binary_operator(operator)
                .ok_or_else(|| Diagnostic::error(*range, format!("unsupported operator `{operator}`")))?;
            Ok(b.binary_op(op, lhs, rhs, *range))
        }
        Node::UnaryExpr { operator, argument, range, .. } => {
            let value = lower_expr(ctx, b, argument)?;
            let op = unary_operator(operator)
                .ok_or_else(|| Diagnostic::error(*range, format!("unsupported operator `{operator}`")))?;
            Ok(b.unary_op(op, value, *range))
        }
        Node::CallExpr { callee, arguments, range } => {
            let callee_value = lower_expr(ctx, b, callee)?;
            let mut args = Vec::with_capacity(arguments.len());
            for arg in arguments {
                args.push(lower_expr(ctx, b, arg)?);
            }
            Ok(b.call(callee_value, &args, *range))
        }
        Node::MemberExpr { range, .. } => {
            // Member access requires a constructed object/class, which is a
            // non-goal here (no `ClassLinker`, no object literals). Surfaced
            // as a diagnostic rather than silently miscompiling.
            Err(Diagnostic::error(*range, "member access is not supported without an object model"))
        }
        other => Err(Diagnostic::error(other.range(), "unsupported expression form")),
    }
}

fn binary_operator(op: &str) -> Option<BinOp> {
    Some(match op {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Mod,
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "<" => BinOp::Lt,
        "<=" => BinOp::Le,
        ">" => BinOp::Gt,
        ">=" => BinOp::Ge,
        "&&" => BinOp::And,
        "||" => BinOp::Or,
        "===" => BinOp::StrictEq,
        "!==" => BinOp::StrictNe,
        _ => return None,
    })
}

fn unary_operator(op: &str) -> Option<UnOp> {
    Some(match op {
        "-" => UnOp::Neg,
        "!" => UnOp::Not,
        "typeof" => UnOp::TypeOf,
        _ => return None,
    })
}
