//! `talus run <demo-name>` compiles and runs one of the bundled demo
//! programs; `talus disasm <demo-name>` dumps its emitted bytecode.
//! `--verify` turns on the structural verifier between passes.

mod demos;

use clap::{Parser, Subcommand};
use talus_ir::CompileOptions;
use talus_support::Arena;
use talus_vm::Runtime;

#[derive(Parser)]
#[command(name = "talus", about = "Runs and disassembles the bundled Talus demo programs")]
struct Cli {
    /// Run the structural verifier after IR-gen and after every pass.
    #[arg(long, global = true)]
    verify: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and run a demo program, printing its return value.
    Run {
        demo: String,
    },
    /// Compile a demo program and print its emitted bytecode.
    Disasm {
        demo: String,
    },
    /// List the bundled demo program names.
    List,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            for name in demos::names() {
                println!("{name}");
            }
        }
        Command::Run { demo } => run(&demo, cli.verify),
        Command::Disasm { demo } => disasm(&demo, cli.verify),
    }
}

fn options(verify: bool) -> CompileOptions {
    CompileOptions { verify, ..CompileOptions::default() }
}

fn load_demo(name: &str) -> talus_ast::Node {
    demos::lookup(name).unwrap_or_else(|| {
        eprintln!("error: unknown demo `{name}` (try `talus list`)");
        std::process::exit(2);
    })
}

fn run(name: &str, verify: bool) {
    let program = load_demo(name);
    let arena = Arena::new();
    let mut runtime = match Runtime::compile(&arena, &program, options(verify)) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("compile error: {e}");
            std::process::exit(1);
        }
    };

    match runtime.run(&[]) {
        Ok(value) => {
            if value.is_number() {
                println!("{}", value.as_number());
            } else {
                println!("{}", value.type_name());
            }
        }
        Err(e) => {
            eprintln!("runtime error: {e}");
            std::process::exit(1);
        }
    }
}

fn disasm(name: &str, verify: bool) {
    let program = load_demo(name);
    let arena = Arena::new();
    let runtime = match Runtime::compile(&arena, &program, options(verify)) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("compile error: {e}");
            std::process::exit(1);
        }
    };

    for (i, function) in runtime.disassemble().into_iter().enumerate() {
        println!("function {i}:");
        println!("{function}");
    }
}
