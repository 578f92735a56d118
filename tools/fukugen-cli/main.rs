use clap::Parser;
use fukugen::prelude::*;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// A decompiler for published Codemao works
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Numeric id of the published work to decompile
    work_id: Option<i64>,

    /// Directory the reconstructed project is written into
    #[arg(short, long, default_value = "decompiled")]
    output: PathBuf,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Run in interactive mode to be prompted for inputs
    #[arg(short = 'i', long, help = "Run in interactive 'human' mode")]
    human: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let work_id = if cli.human {
        prompt_for_work_id()
    } else {
        cli.work_id
            .unwrap_or_else(|| exit_with_error("A work id is required in non-interactive mode."))
    };

    let decompiler = Decompiler::new();
    match decompiler.decompile(work_id, &cli.output) {
        Ok(path) => println!("Decompiled work {} -> {}", work_id, path.display()),
        Err(err) => exit_with_error(&err.to_string()),
    }
}

/// A helper function to prompt the user and read a work id.
fn prompt_for_work_id() -> i64 {
    loop {
        print!("> Enter work id: ");
        io::stdout().flush().expect("Failed to flush stdout");

        let mut line = String::new();
        io::stdin()
            .read_line(&mut line)
            .expect("Failed to read line");

        match line.trim().parse() {
            Ok(id) => break id,
            Err(_) => println!("Invalid id. Please enter a number."),
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
