//! heapdb Shell Binary
//!
//! Reads SQL lines from stdin and echoes them back as canonical SQL.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use heapdb::config::{Backend, Config};
use heapdb::shell::{Outcome, Shell};
use heapdb::storage::StoreEnv;
use tracing_subscriber::{fmt, EnvFilter};

/// heapdb shell
#[derive(Parser, Debug)]
#[command(name = "heapdb")]
#[command(about = "Slotted-page heap storage with a SQL echo prompt")]
#[command(version)]
struct Args {
    /// Data directory for relation files
    #[arg(default_value = "./heapdb_data")]
    data_dir: PathBuf,

    /// Keep relations in memory instead of on disk
    #[arg(long)]
    memory: bool,
}

fn main() {
    // Logs go to stderr so they never mix with replies
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,heapdb=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let backend = if args.memory {
        Backend::Memory
    } else {
        Backend::File
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .backend(backend)
        .build();

    tracing::info!("heapdb v{}", heapdb::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    let env = match StoreEnv::open(config) {
        Ok(env) => env,
        Err(e) => {
            tracing::error!("Failed to open store environment: {}", e);
            std::process::exit(1);
        }
    };

    let mut shell = Shell::new(env);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("SQL> ");
        if let Err(e) = stdout.flush() {
            tracing::error!("Failed to write prompt: {}", e);
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        }

        match shell.execute(&line) {
            Outcome::Reply(reply) => println!("{}", reply),
            Outcome::Nothing => {}
            Outcome::Quit => break,
        }
    }
}
