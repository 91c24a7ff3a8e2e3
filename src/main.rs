use clap::Parser;
use log::{warn, LevelFilter};
use snafu::ErrorCompat;

mod args;
mod recon;

use crate::args::Args;
use crate::recon::config_reader::PlanConfig;

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    let res = load_and_run(&args);
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}

fn load_and_run(args: &Args) -> recon::PlanResult<()> {
    let config = match &args.config {
        Some(path) => recon::config_reader::read_config(path)?,
        None => PlanConfig::default(),
    };
    let settings = recon::resolve_settings(args, config)?;
    recon::run_plan(&settings)
}
