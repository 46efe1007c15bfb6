use clap::Parser;
use esstore::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    run(Cli::parse())
}
