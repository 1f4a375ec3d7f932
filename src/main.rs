use std::io::{self, IsTerminal};

use clap::Parser;
use lostfiles::{
    DataDir,
    ModelManager,
    cli::Cli,
    progress::{BarProgress, LogProgress, ProgressObserver},
    session::{self, Console},
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("LOSTFILES_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> lostfiles::Result<()> {
    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    tracing::debug!(data_dir = %data_dir.root().display(), "resolved data directory");

    let manager = match &cli.model {
        Some(model_id) => {
            ModelManager::with_model_id(model_id.clone(), data_dir.models_dir())
        }
        None => ModelManager::new(data_dir.models_dir()),
    };
    tracing::debug!(model = manager.model_id(), "selected embedding model");

    let progress: Box<dyn ProgressObserver> =
        if cli.no_progress || !io::stderr().is_terminal() {
            Box::new(LogProgress)
        } else {
            Box::new(BarProgress::new())
        };

    let mut config = cli.session_config();
    config.corpus_table = Some(data_dir.corpus_table());
    config.embeddings_table = Some(data_dir.embeddings_table());

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());
    let summary = session::run(
        &mut console,
        &config,
        || manager.load(progress.as_ref()),
        progress.as_ref(),
    )?;

    console.say(&format!(
        "Searched {} documents with {} {}. Goodbye!",
        summary.documents,
        summary.queries,
        if summary.queries == 1 { "query" } else { "queries" }
    ))?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
