use std::io;
use std::path::Path;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod core;
mod db;
mod error;
mod id;
mod output;
mod types;

use commands::{data, task, DataCommand, TaskCommand};
use output::Printer;

#[derive(Parser)]
#[command(name = "cascade")]
#[command(version)]
#[command(
    about = "Cascade - hierarchical task tracking with status propagation",
    long_about = r#"
Cascade - hierarchical task tracking with status propagation.

Features:
  • Parent/child task tree with cycle rejection
  • DONE auto-upgrades to COMPLETE once every child is COMPLETE
  • A child back IN PROGRESS reverts COMPLETE ancestors to DONE

Environment:
  CASCADE_DB_PATH  Override database location
  CASCADE_LOG      Log filter (e.g. "cascade=debug")
  NO_COLOR         Disable colored output
"#
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output in JSON format (for programmatic use)
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Override database path (default: CWD/.cascade/tasks.db)
    #[arg(long, global = true)]
    db: Option<std::path::PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Task management (CRUD, status cascade, tree queries)
    #[command(subcommand)]
    Task(TaskCommand),

    /// Data import/export
    #[command(subcommand)]
    Data(DataCommand),

    /// Generate shell completions
    #[command(
        about = "Generate shell completions",
        long_about = r#"
Generate shell completions for the cascade CLI.

Examples:
  cascade completions bash > ~/.local/share/bash-completion/completions/cascade
  cascade completions zsh > ~/.zfunc/_cascade
  cascade completions fish > ~/.config/fish/completions/cascade.fish
"#
    )]
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },

    /// Initialize database
    #[command(
        about = "Initialize database",
        long_about = r#"
Initialize the Cascade database.

The database is created at:
  1. --db (if given)
  2. CASCADE_DB_PATH (if set)
  3. CWD/.cascade/tasks.db (fallback)

Usually runs automatically on first command.
"#
    )]
    Init,
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_new(config::log_directive(verbose))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // stderr keeps --json output on stdout clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();

    // PRECONDITION: Completions bypass normal output flow - raw shell script to stdout
    if let Command::Completions { shell } = &cli.command {
        generate(*shell, &mut Cli::command(), "cascade", &mut io::stdout());
        return;
    }

    init_logging(cli.verbose);

    let db_path = cli.db.clone().unwrap_or_else(config::default_db_path);
    tracing::debug!(path = %db_path.display(), "using database");

    match run(&cli.command, &db_path) {
        Ok(output) => {
            if cli.json {
                println!("{}", output);
            } else {
                let printer = Printer::new(cli.no_color);
                printer.print(&cli.command, &output);
            }
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if cli.json {
                let err = serde_json::json!({ "error": e.to_string() });
                eprintln!("{}", err);
            } else {
                let printer = Printer::new_for_stderr(cli.no_color);
                printer.print_error(&format!("Error: {}", e));
            }
            std::process::exit(1);
        }
    }
}

fn run(command: &Command, db_path: &Path) -> error::Result<String> {
    match command {
        Command::Init => {
            db::open_db(db_path)?;
            Ok(serde_json::json!({ "initialized": true, "path": db_path }).to_string())
        }
        Command::Task(cmd) => {
            let conn = db::open_db(db_path)?;
            task::handle(&conn, cmd.clone())?.to_json()
        }
        Command::Data(cmd) => {
            let conn = db::open_db(db_path)?;
            data::handle(&conn, cmd.clone())?.to_json()
        }
        // PRECONDITION: Completions handled in main() before run() is called
        Command::Completions { .. } => unreachable!("completions handled before run()"),
    }
}
