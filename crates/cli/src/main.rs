//! `pipeline-ir` binary entry point.

// CLI binary needs to output to stderr from the panic hook
#![allow(clippy::print_stderr)]

use pipeline_ir_cli::cli::parse;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let code = pipeline_ir_cli::run(parse());
    std::process::exit(code);
}
