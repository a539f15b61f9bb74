//! NanoStore CLI
//!
//! Inspect and edit a store file between server restarts.

use std::io::{self, BufRead};

use clap::{Parser, Subcommand};
use nanostore::command::DEFAULT_TOP_LIMIT;
use nanostore::{Command, Config, CorruptPolicy, Number, Result, Store, StoreError, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// NanoStore CLI
#[derive(Parser, Debug)]
#[command(name = "nanostore")]
#[command(about = "Inspect and edit NanoStore files")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./nanostore_data")]
    data_dir: String,

    /// Store name (file is {data_dir}/{store}.json)
    #[arg(short, long, default_value = "store")]
    store: String,

    /// Move an unreadable store file aside and start empty
    #[arg(long)]
    fresh: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        key: String,

        /// Printed when the key is absent
        #[arg(long)]
        default: Option<String>,
    },

    /// Check whether a key exists
    Has { key: String },

    /// Set a key (true/false, numbers and ["a","b"] are typed)
    Set { key: String, value: String },

    /// Delete a key
    Del { key: String },

    /// Increment a number
    Incr {
        key: String,
        #[arg(default_value = "1", allow_hyphen_values = true)]
        delta: String,
    },

    /// Decrement a number
    Decr {
        key: String,
        #[arg(default_value = "1", allow_hyphen_values = true)]
        delta: String,
    },

    /// Append to a list
    Push { key: String, item: String },

    /// List keys under a prefix
    Keys {
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Read a list
    Array { key: String },

    /// Highest numeric values under a prefix
    Top {
        prefix: String,
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_LIMIT)]
        limit: usize,
    },

    /// Print the whole store as JSON
    Dump,

    /// Read commands (GET/SET/INCR/...) from stdin, one per line
    Batch,
}

impl Commands {
    /// Map to a store command; `None` for batch mode
    fn into_command(self) -> Result<Option<Command>> {
        let command = match self {
            Commands::Get { key, default } => Command::Get {
                key,
                default: default.as_deref().map(Value::parse_literal),
            },
            Commands::Has { key } => Command::Has { key },
            Commands::Set { key, value } => Command::Set {
                key,
                value: Value::parse_literal(&value),
            },
            Commands::Del { key } => Command::Delete { key },
            Commands::Incr { key, delta } => Command::Increment {
                key,
                delta: parse_number(&delta)?,
            },
            Commands::Decr { key, delta } => Command::Decrement {
                key,
                delta: parse_number(&delta)?,
            },
            Commands::Push { key, item } => Command::Push { key, item },
            Commands::Keys { prefix } => Command::Keys { prefix },
            Commands::Array { key } => Command::GetArray { key },
            Commands::Top { prefix, limit } => Command::Top { prefix, limit },
            Commands::Dump => Command::Dump,
            Commands::Batch => return Ok(None),
        };
        Ok(Some(command))
    }
}

fn main() {
    // Logs go to stderr so replies on stdout stay scriptable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nanostore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let policy = if args.fresh {
        CorruptPolicy::StartFresh
    } else {
        CorruptPolicy::Fail
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .store_name(&args.store)
        .on_corrupt(policy)
        .build();

    let store = Store::open(config)?;
    tracing::debug!("Opened {} ({} keys)", store.path().display(), store.len());

    match args.command.into_command()? {
        Some(command) => {
            let reply = store.execute(command)?;
            println!("{}", reply);
        }
        None => {
            let failed = run_batch(&store)?;
            if failed > 0 {
                flush(&store)?;
                return Err(StoreError::Command(format!("{} command(s) failed", failed)));
            }
        }
    }

    flush(&store)
}

/// Save only if something changed, so read-only runs never touch the file
fn flush(store: &Store) -> Result<()> {
    if store.is_dirty() {
        store.save()?;
    }
    Ok(())
}

/// Execute stdin lines; returns the number of failed commands
fn run_batch(store: &Store) -> Result<usize> {
    let stdin = io::stdin();
    let mut failed = 0;

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match Command::parse(trimmed).and_then(|command| store.execute(command)) {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                failed += 1;
                println!("ERR line {}: {}", line_no + 1, e);
            }
        }
    }

    Ok(failed)
}

fn parse_number(input: &str) -> Result<Number> {
    Value::parse_literal(input)
        .as_number()
        .ok_or_else(|| StoreError::Command(format!("invalid number '{}'", input)))
}
