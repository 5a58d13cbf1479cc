//! Ties IR-gen, the pass pipeline, register allocation, and emission
//! together into one `compile` entry point, then owns everything a
//! compiled program needs to run: its functions, its heap, and its
//! object table.
//!
//! `Runtime` is not `Sync`: `ObjectTable` borrows from the caller's arena
//! and the heap hands out raw addresses, so one `Runtime` is meant to be
//! driven from a single thread. Nothing stops several `Runtime`s from
//! coexisting in one process; they share no state with each other.

use talus_ast::Node;
use talus_entity::EntityRef;
use talus_ir::{CompileOptions, Module};
use talus_pass::PassManager;
use talus_support::Arena;

use crate::error::Error;
use crate::heap::HeapRegionSpace;
use crate::interpreter::{CompiledFunction, Interpreter};
use crate::objects::ObjectTable;
use crate::value::Value;

pub struct Runtime<'a> {
    functions: Vec<CompiledFunction>,
    entry: usize,
    heap: HeapRegionSpace,
    objects: ObjectTable<'a>,
}

impl<'a> Runtime<'a> {
    /// Lowers `program` to IR, runs the default optimization pipeline,
    /// allocates registers, and emits bytecode for every declared
    /// function. `arena` backs the IR and string data the compile step
    /// builds; it must outlive the returned `Runtime` (its object table
    /// can carry class/field names allocated from it).
    pub fn compile(arena: &'a Arena, program: &Node, options: CompileOptions) -> Result<Runtime<'a>, Error> {
        let mut module = Module::new(arena);
        let entry_id = talus_irgen::lower_program(&mut module, program).map_err(|d| Error::IrGen(d.message))?.ok_or(Error::NoEntryPoint)?;

        let mut pipeline = PassManager::default_pipeline(options.opt_level);
        pipeline.run(&mut module, &options)?;

        let Module { functions, literal_pool, .. } = &mut module;
        let mut compiled = Vec::with_capacity(functions.len());
        for func in functions.values_mut() {
            let allocation = talus_regalloc::allocate(func);
            let encoded = talus_bytecode::emit(func, literal_pool, &allocation)?;
            compiled.push(CompiledFunction { bytes: encoded.bytes, register_count: allocation.register_count(), param_count: func.param_count });
        }

        Ok(Runtime { functions: compiled, entry: entry_id.index(), heap: HeapRegionSpace::new()?, objects: ObjectTable::new() })
    }

    /// Runs the entry point (`main`) to completion with `args` as its
    /// initial parameters. A fresh `Interpreter` is built for every call:
    /// its frame stack holds no state worth keeping between runs.
    pub fn run(&mut self, args: &[Value]) -> Result<Value, Error> {
        let mut interpreter = Interpreter::new(&self.functions);
        interpreter.run(self.entry, args, &mut self.heap, &mut self.objects)
    }

    /// Disassembles every compiled function, in declaration order.
    pub fn disassemble(&self) -> Vec<String> {
        self.functions.iter().map(|f| talus_bytecode::Disassembly(&f.bytes).to_string()).collect()
    }

    /// Runs a full mark-sweep collection rooted at `roots` (typically the
    /// live register windows of whatever call is in progress), returning
    /// the number of objects reclaimed.
    pub fn collect_garbage(&mut self, roots: &[Value]) -> usize {
        crate::gc::collect(&mut self.heap, &mut self.objects, roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talus_ast::build;

    fn run_source(program: talus_ast::Node) -> Value {
        let arena = Arena::new();
        let mut runtime = Runtime::compile(&arena, &program, CompileOptions::default()).unwrap();
        runtime.run(&[]).unwrap()
    }

    #[test]
    fn scenario_one_arithmetic() {
        let program = build::program(vec![build::func_decl(
            "main",
            vec![],
            build::block(vec![build::return_stmt(Some(build::binary("+", build::num(1.0), build::num(2.0))))]),
            None,
        )]);
        assert_eq!(run_source(program).as_number(), 3.0);
    }

    #[test]
    fn scenario_four_calls_between_functions() {
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
        assert_eq!(run_source(program).as_number(), 42.0);
    }

    #[test]
    fn a_program_with_no_main_is_a_compile_error() {
        let arena = Arena::new();
        let program = build::program(vec![build::func_decl("helper", vec![], build::block(vec![build::return_stmt(None)]), None)]);
        let err = Runtime::compile(&arena, &program, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NoEntryPoint));
    }
}
