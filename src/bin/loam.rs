extern crate loam;

use std::process;

use clap::Parser;
use loam::driver::options::{Commands, LoamCli};
use loam::driver::script;

pub fn main() {
    env_logger::init();

    let cli = LoamCli::parse();
    match cli.command {
        Commands::Run(args) => match script::run_file(&args) {
            Ok(()) => process::exit(0),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1)
            }
        },
    }
}
