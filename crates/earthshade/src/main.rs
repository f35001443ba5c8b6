mod check;
mod cli;
mod config;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Check(args)) => check::check(args),
        Some(Command::Run(args)) => run::run(args),
        None => run::run(cli.run),
    }
}
