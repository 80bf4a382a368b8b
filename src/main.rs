use std::{
    io::{self, Write},
    process::ExitCode,
};

use clap::Parser;
use litescan::{
    config::{Cli, LogFormat},
    executor::{meta_command::MetaCommand, query::QueryExecutor},
    planner::parser::SqlParser,
    storage::storage_manager::StorageManager,
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const PROMPT: &str = "litescan> ";
const CONTINUATION_PROMPT: &str = "       -> ";

type BoxError = Box<dyn std::error::Error>;

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let layer = fmt::layer().with_writer(io::stderr);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json().flatten_event(true))
            .init(),
        LogFormat::Text => tracing_subscriber::registry().with(env_filter).with(layer).init(),
    }
}

/// Run one `.command` or SELECT and write its output to stdout.
fn run_command(storage: &StorageManager, cli: &Cli, command: &str) -> Result<(), BoxError> {
    let mut stdout = io::stdout().lock();

    if let Some(meta) = MetaCommand::parse(command) {
        for line in meta?.run(storage)? {
            writeln!(stdout, "{line}")?;
        }
        return Ok(());
    }

    let spec = SqlParser::new().parse_query(command)?;
    debug!(?spec, "parsed query");
    let rows = QueryExecutor::new(storage).write_results(
        &spec,
        &mut stdout,
        cli.output,
        &cli.separator,
    )?;
    debug!(rows, "query output written");
    Ok(())
}

fn read_multiline_command(rl: &mut DefaultEditor) -> rustyline::Result<String> {
    let mut input = String::new();
    let mut prompt = PROMPT;

    loop {
        let line = rl.readline(prompt)?;
        let trimmed_line = line.trim_end();

        // trailing backslash continues the command on the next line
        if let Some(partial) = trimmed_line.strip_suffix('\\') {
            input.push_str(partial);
            input.push(' ');
            prompt = CONTINUATION_PROMPT;
        } else {
            input.push_str(trimmed_line);
            return Ok(input);
        }
    }
}

/// Returns false when the session should end.
fn process_command(storage: &StorageManager, cli: &Cli, command: &str) -> bool {
    match command.to_lowercase().as_str() {
        "exit" | "quit" | "q" => return false,
        "help" | "h" => {
            println!(
                r#"
Available commands:
  .dbinfo          - Page size and number of tables
  .tables          - Names of user tables
  SELECT ...       - Query a table
  help, h          - Show this help message
  clear            - Clear the screen
  exit, quit, q    - Exit

Use '\' at the end of a line for multiline input.
"#
            );
        }
        "clear" => {
            print!("\x1B[2J\x1B[1;1H");
            let _ = io::stdout().flush();
        }
        _ => {
            if let Err(e) = run_command(storage, cli, command) {
                eprintln!("error: {e}");
            }
        }
    }
    true
}

fn repl(storage: &StorageManager, cli: &Cli) -> Result<(), BoxError> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match read_multiline_command(&mut rl) {
            Ok(input) => {
                let command = input.trim();
                if command.is_empty() {
                    continue;
                }
                rl.add_history_entry(command)?;
                if !process_command(storage, cli, command) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), BoxError> {
    let storage = StorageManager::open(&cli.database)?;
    match &cli.command {
        Some(command) => run_command(&storage, cli, command),
        None => repl(&storage, cli),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
