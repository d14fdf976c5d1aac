//! ormq Command-Line Client
//!
//! Compiles JSON filters into SQL or evaluates them against JSON data sets.

mod commands;
mod formatter;

use clap::{Parser, Subcommand};
use formatter::OutputFormat;
use std::path::PathBuf;

/// ormq Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "ormq")]
#[command(version, about = "Compile and evaluate ormq collection filters")]
pub struct Args {
    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a filter into a SQL query
    Sql {
        /// Schema bundle (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Filter (JSON)
        #[arg(short, long)]
        filter: PathBuf,

        /// Entity to query
        #[arg(short, long)]
        entity: String,
    },

    /// Evaluate a filter against in-memory data
    Eval {
        /// Schema bundle (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Filter (JSON)
        #[arg(short, long)]
        filter: PathBuf,

        /// Entity data keyed by entity name (JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Entity to query
        #[arg(short, long)]
        entity: String,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ormq=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String, commands::CliError> {
    let formatter = formatter::create_formatter(args.format);

    match &args.command {
        Command::Sql {
            schema,
            filter,
            entity,
        } => commands::sql(schema, filter, entity, &*formatter),
        Command::Eval {
            schema,
            filter,
            data,
            entity,
        } => commands::eval(schema, filter, data, entity, &*formatter),
    }
}
