//! The pass manager and the IR transformations it runs between IR-gen and
//! register allocation.

mod dce;
mod fold_const_branch;
mod lowering;
mod mem2reg;
mod simplify_cfg;

pub use dce::Dce;
pub use fold_const_branch::FoldConstantBranches;
pub use lowering::{LoadConstants, LoadParameters};
pub use mem2reg::Mem2Reg;
pub use simplify_cfg::SimplifyCfg;

use talus_ir::{CompileOptions, Function, Module, OptLevel};

/// A transformation that runs once per function.
pub trait FunctionPass {
    fn name(&self) -> &'static str;

    /// Apply the pass to `func`, returning whether it changed anything.
    fn run_on_function(&mut self, func: &mut Function) -> bool;
}

/// A transformation that runs once per module, visiting whatever functions
/// (or module-wide state) it needs itself rather than having the manager
/// iterate for it.
pub trait ModulePass {
    fn name(&self) -> &'static str;

    fn run_on_module(&mut self, module: &mut Module) -> bool;
}

/// One entry in a `PassManager`'s pipeline.
enum Pass {
    Function(Box<dyn FunctionPass>),
    Module(Box<dyn ModulePass>),
}

/// Runs an ordered pipeline of passes over every function in a module,
/// re-verifying after each pass when `CompileOptions::verify` is set.
pub struct PassManager {
    passes: Vec<Pass>,
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn add_function_pass(&mut self, pass: impl FunctionPass + 'static) -> &mut Self {
        self.passes.push(Pass::Function(Box::new(pass)));
        self
    }

    pub fn add_module_pass(&mut self, pass: impl ModulePass + 'static) -> &mut Self {
        self.passes.push(Pass::Module(Box::new(pass)));
        self
    }

    /// The default pipeline: fold branches on a literal condition to
    /// unconditional jumps, `SimplifyCfg`, `Mem2Reg`, `SimplifyCfg` again
    /// (promoting stack slots can expose further dead blocks), `Dce`, then
    /// the two lowering passes every function needs regardless of
    /// optimization level.
    pub fn default_pipeline(opt_level: OptLevel) -> Self {
        let mut mgr = Self::new();
        if opt_level == OptLevel::Default {
            mgr.add_module_pass(FoldConstantBranches)
                .add_function_pass(SimplifyCfg)
                .add_function_pass(Mem2Reg)
                .add_function_pass(SimplifyCfg)
                .add_function_pass(Dce);
        }
        mgr.add_function_pass(LoadParameters).add_function_pass(LoadConstants);
        mgr
    }

    /// Run every pass in order over `module`. With `options.verify` set,
    /// the structural verifier runs after each function pass's visit to
    /// each function and after each module pass; the first function found
    /// to violate an invariant aborts the run.
    pub fn run(&mut self, module: &mut Module, options: &CompileOptions) -> Result<(), talus_ir::CompileError> {
        for pass in &mut self.passes {
            match pass {
                Pass::Function(pass) => {
                    for func in module.functions.values_mut() {
                        let changed = pass.run_on_function(func);
                        log::debug!("{}: changed {changed}", pass.name());
                        if options.verify {
                            verify(pass.name(), func)?;
                        }
                    }
                }
                Pass::Module(pass) => {
                    let changed = pass.run_on_module(module);
                    log::debug!("{}: changed {changed}", pass.name());
                    if options.verify {
                        for func in module.functions.values() {
                            verify(pass.name(), func)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

fn verify(pass_name: &str, func: &Function) -> Result<(), talus_ir::CompileError> {
    let errors = talus_ir::verify_function(func);
    if errors.is_empty() {
        return Ok(());
    }
    Err(talus_ir::CompileError::Malformed(format!(
        "{pass_name} on `{}` left the IR malformed: {errors:?}",
        func.name
    )))
}
