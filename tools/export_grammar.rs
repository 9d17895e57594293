//! Exports the SML grammar as the JSON document an editor host loads.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(name = "export-grammar", about = "Export the SML grammar as JSON")]
struct Args {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the editor word pattern instead of the grammar
    #[arg(long)]
    word_pattern: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.word_pattern {
        println!("{}", smeraldo::sml::word_pattern());
        return ExitCode::SUCCESS;
    }

    let raw = smeraldo::sml::grammar();
    // refuse to export a grammar that does not compile
    if let Err(err) = raw.clone().compile() {
        eprintln!("grammar failed to compile: {err}");
        return ExitCode::FAILURE;
    }

    let json = match raw.to_json() {
        Ok(json) => json,
        Err(err) => {
            eprintln!("serialization failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    match args.output {
        Some(path) => {
            if let Err(err) = fs::write(&path, json) {
                eprintln!("could not write {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        }
        None => println!("{json}"),
    }

    ExitCode::SUCCESS
}
