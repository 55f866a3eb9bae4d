use clap::Parser;
use indexfund::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
