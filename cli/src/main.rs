use clap::{ArgAction, Parser};
use cli::Emit;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "jackc", version, about, long_about = None)]
struct Args {
    /// A .jack file, or a directory whose .jack files are compiled one by one
    path: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    /// What to write next to each source file
    emit: Emit,

    #[arg(short, long, action = ArgAction::Count)]
    /// Raise the log level, -vv for debug output
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    if let Err(err) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("warning: logging is unavailable: {err}");
    }

    match cli::compile_path(&args.path, args.emit) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
