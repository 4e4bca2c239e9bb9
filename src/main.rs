//! Stencil CLI — render templates from the command line.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "stencil",
    version,
    about = "Compile-once, render-many text templates"
)]
struct Cli {
    /// Log at debug level (overridden by STENCIL_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: stencil::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = stencil::cli::init_logging(cli.verbose) {
        eprintln!("warning: {}", e);
    }
    if let Err(e) = stencil::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
