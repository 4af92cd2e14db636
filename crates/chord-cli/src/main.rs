mod http_backend;
mod queue;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chord_core::{ChordConfig, LexicalBackend, Orchestrator, TurnOutcome};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::io::{AsyncBufReadExt, BufReader};

use http_backend::{AnyBackend, HttpBackend};
use queue::ConversationQueue;

#[derive(Parser)]
#[command(name = "chord", about = "Prime-signature dialogue engine")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CHORD_CONFIG")]
    config: Option<PathBuf>,

    /// Inference backend
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::Lexical)]
    backend: BackendKind,

    /// Base URL of the HTTP inference service
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    backend_url: String,

    /// Seed the response RNG for repeatable replies
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print debug info as JSON to stderr after every turn
    #[arg(long, global = true)]
    debug: bool,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Lexical,
    Http,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation on stdin (/debug, /reset, /quit)
    Chat,

    /// Process each argument as one turn of a single conversation
    Say {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Process a file, one turn per non-empty line
    Batch {
        /// Input file path
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ChordConfig> {
    let Some(path) = path else {
        return Ok(ChordConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ChordConfig::from_toml_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))
}

async fn start(cli: &Cli) -> Result<ConversationQueue> {
    let config = load_config(cli.config.as_deref())?;
    let backend = match cli.backend {
        BackendKind::Lexical => AnyBackend::Lexical(LexicalBackend::default()),
        BackendKind::Http => AnyBackend::Http(HttpBackend::new(&cli.backend_url)),
    };
    let rng = match cli.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let mut orchestrator = Orchestrator::new(config, backend, rng);
    orchestrator
        .initialize()
        .await
        .context("failed to initialize engine")?;

    let (queue, _worker) = ConversationQueue::spawn(orchestrator, 32);
    Ok(queue)
}

async fn print_debug(queue: &ConversationQueue) -> Result<()> {
    let info = queue.debug_info().await??;
    eprintln!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

async fn run_turn(cli: &Cli, queue: &ConversationQueue, text: &str) -> Result<TurnOutcome> {
    let outcome = queue.submit(text).await??;
    if cli.verbose {
        eprintln!(
            "--- intent={}, phase={}, strategy={:?}, coherence={:.3} ---",
            outcome.intent, outcome.phase, outcome.strategy, outcome.coherence
        );
    }
    if cli.debug {
        print_debug(queue).await?;
    }
    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Chat => cmd_chat(&cli).await,
        Commands::Say { texts } => cmd_say(&cli, texts).await,
        Commands::Batch { path } => cmd_batch(&cli, path).await,
    }
}

async fn cmd_chat(cli: &Cli) -> Result<()> {
    let queue = start(cli).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/debug" => print_debug(&queue).await?,
            "/reset" => {
                queue.reset().await??;
                println!("(conversation reset)");
            }
            text => match run_turn(cli, &queue, text).await {
                Ok(outcome) => println!("{}", outcome.response),
                // a failed turn leaves the conversation intact
                Err(e) => eprintln!("error: {e:#}"),
            },
        }
    }
    Ok(())
}

async fn cmd_say(cli: &Cli, texts: &[String]) -> Result<()> {
    let queue = start(cli).await?;
    for text in texts {
        let outcome = run_turn(cli, &queue, text).await?;
        println!("{}", outcome.response);
    }
    Ok(())
}

async fn cmd_batch(cli: &Cli, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let queue = start(cli).await?;

    let mut failed = 0usize;
    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match run_turn(cli, &queue, line).await {
            Ok(outcome) => println!("{}", outcome.response),
            Err(e) => {
                failed += 1;
                eprintln!("line {}: {e:#}", n + 1);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} turn(s) failed");
    }
    Ok(())
}
