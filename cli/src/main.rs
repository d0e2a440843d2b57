//! Command-line client for pdfchat document processing.
//!
//! Uploads PDFs to the backend and follows their ingestion until the document can
//! be chatted with.
//!
//! # Usage
//!
//! ```bash
//! # Supabase project holding the documents table
//! export SUPABASE_URL=https://xyz.supabase.co
//! export SUPABASE_ANON_KEY=xxx
//!
//! # Upload a file and watch it being processed
//! cargo run -p pdfchat-cli -- upload paper.pdf
//!
//! # Upload by link, print the id and exit
//! cargo run -p pdfchat-cli -- upload --url https://arxiv.org/pdf/1706.03762 --no-watch
//!
//! # Follow an existing document
//! cargo run -p pdfchat-cli -- watch 8b7c1f0e-...
//!
//! # One-shot status lookup
//! cargo run -p pdfchat-cli -- status 8b7c1f0e-...
//!
//! # Chat with a processed document
//! cargo run -p pdfchat-cli -- chat 8b7c1f0e-...
//! cargo run -p pdfchat-cli -- chat 8b7c1f0e-... -m "What is the main result?"
//! ```

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use executor_core::tokio::TokioGlobal;
use pdfchat_cli::{
    Conversation, NotificationPrinter, ensure_ready, file_source, format_history_entry,
    format_reply, format_state, link_source,
};
use pdfchat_core::{DocumentId, LifecycleState, StatusReport, StatusSource, Uploader};
use pdfchat_reconciler::{ExecutorScheduler, Reconciler, ReconcilerConfig};
use pdfchat_supabase::{
    BackendChat, BackendUploader, DEFAULT_API_BASE, SupabaseConfig, SupabaseStatusSource,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Upload PDFs and follow their processing.
#[derive(Parser, Debug)]
#[command(name = "pdfchat", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the backend API.
    #[arg(long, env = "PDFCHAT_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    api_base: String,

    /// Seconds between two status polls.
    #[arg(long, default_value_t = 3, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_secs: u64,

    /// Seconds a notification stays visible.
    #[arg(long, default_value_t = 10, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    notification_ttl_secs: u64,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a PDF, then watch it until processing ends.
    Upload {
        /// Path to a local PDF.
        #[arg(required_unless_present = "url", conflicts_with = "url")]
        path: Option<PathBuf>,

        /// Link the backend should download the PDF from.
        #[arg(long)]
        url: Option<String>,

        /// Print the document id and exit without watching.
        #[arg(long)]
        no_watch: bool,
    },
    /// Watch a document until it completes or fails.
    Watch {
        /// Document id returned by the upload.
        document_id: String,
    },
    /// Print the current state of a document.
    Status {
        /// Document id returned by the upload.
        document_id: String,
    },
    /// Chat with a document once its processing completed.
    Chat {
        /// Document id returned by the upload.
        document_id: String,

        /// Single question to ask. Prints the answer and exits.
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Upload {
            path,
            url,
            no_watch,
        } => {
            let source = match (path, url) {
                (Some(path), _) => file_source(path).await?,
                (None, Some(url)) => link_source(url)?,
                (None, None) => bail!("pass a file path or --url"),
            };
            let uploader = BackendUploader::new(&args.api_base)?;
            let ack = uploader.upload(source).await?;
            if ack.deduplicated {
                println!("{} (already uploaded)", ack.document_id);
            } else {
                println!("{}", ack.document_id);
            }
            if *no_watch {
                return Ok(ExitCode::SUCCESS);
            }
            watch(&args, ack.document_id, ack.status).await
        }
        Command::Watch { document_id } => watch(&args, parse_id(document_id)?, None).await,
        Command::Status { document_id } => status(parse_id(document_id)?).await,
        Command::Chat {
            document_id,
            message,
        } => chat(&args, parse_id(document_id)?, message.as_deref()).await,
    }
}

fn parse_id(raw: &str) -> Result<DocumentId> {
    DocumentId::parse(raw).context("document id must not be empty")
}

fn reconciler_config(args: &Args) -> ReconcilerConfig {
    ReconcilerConfig::builder()
        .poll_interval(Duration::from_secs(args.poll_interval_secs))
        .notification_ttl(Duration::from_secs(args.notification_ttl_secs))
        .build()
}

fn status_source() -> Result<SupabaseStatusSource<TokioGlobal>> {
    let config = SupabaseConfig::from_env()
        .context("Set SUPABASE_URL and SUPABASE_ANON_KEY in your environment")?;
    Ok(SupabaseStatusSource::new(config, TokioGlobal))
}

type CliReconciler = Reconciler<SupabaseStatusSource<TokioGlobal>, ExecutorScheduler<TokioGlobal>>;

fn reconciler(args: &Args) -> Result<CliReconciler> {
    Ok(Reconciler::with_config(
        status_source()?,
        ExecutorScheduler::new(TokioGlobal),
        reconciler_config(args),
    ))
}

/// Follows `id` until it reaches a terminal state or the user interrupts.
///
/// `seed` is the status from an upload acknowledgment. It is applied directly and
/// polling takes over from there; without a usable seed the session starts with
/// a fetch and a push subscription.
async fn watch(args: &Args, id: DocumentId, seed: Option<String>) -> Result<ExitCode> {
    let reconciler = reconciler(args)?;
    let mut printer = NotificationPrinter::new(io::stdout().is_terminal());

    debug!(document = %id, seed = ?seed, "watching document");
    if let Some(status) = seed {
        reconciler.bind(id.clone());
        reconciler.on_update(StatusReport::new(status));
    }
    if !reconciler.is_polling() && !reconciler.is_closed() {
        reconciler.start(Some(id)).await;
    }

    loop {
        let changed = reconciler.changed();
        let snapshot = reconciler.snapshot();
        if let Some(line) = printer.observe(snapshot.notification.as_ref()) {
            println!("{line}");
        }
        match snapshot.state {
            Some(LifecycleState::Completed) => return Ok(ExitCode::SUCCESS),
            Some(LifecycleState::Failed) => return Ok(ExitCode::FAILURE),
            _ => {}
        }

        tokio::select! {
            () = changed => {}
            interrupted = tokio::signal::ctrl_c() => {
                interrupted?;
                reconciler.stop();
                eprintln!("Stopped watching.");
                return Ok(ExitCode::from(130));
            }
        }
    }
}

/// Checks that `id` finished processing, then answers one question or runs a
/// conversation on stdin.
async fn chat(args: &Args, id: DocumentId, message: Option<&str>) -> Result<ExitCode> {
    let reconciler = reconciler(args)?;
    reconciler.start(Some(id.clone())).await;
    let snapshot = reconciler.snapshot();
    reconciler.stop();
    if let Err(err) = ensure_ready(&snapshot) {
        eprintln!("Error: {err}");
        return Ok(ExitCode::FAILURE);
    }

    let backend = BackendChat::new(&args.api_base)?;
    let mut conversation = Conversation::new(id);

    if let Some(question) = message {
        return match conversation.ask(&backend, question).await {
            Ok(reply) => {
                println!("{}", format_reply(&reply));
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                eprintln!("Error: {err}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    println!("Document ready. Ask a question, or /quit to leave.\n");
    while let Some(input) = read_line("You> ")? {
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            match input {
                "/quit" | "/exit" | "/q" => break,
                "/clear" => {
                    conversation.clear();
                    println!("History cleared.");
                }
                "/history" => {
                    if conversation.history().is_empty() {
                        println!("No conversation history.");
                    }
                    for message in conversation.history() {
                        println!("{}", format_history_entry(message));
                    }
                }
                cmd => {
                    println!("Unknown command: {cmd}");
                    println!("Available: /quit, /clear, /history");
                }
            }
            continue;
        }

        match conversation.ask(&backend, input).await {
            Ok(reply) => println!("\n{}\n", format_reply(&reply)),
            Err(err) => println!("\x1b[31mError: {err}\x1b[0m\n"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads one line from stdin, `None` at end of input.
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Prints the current state once.
async fn status(id: DocumentId) -> Result<ExitCode> {
    let report = status_source()?.fetch_status(&id).await?;
    match report.parse_state() {
        Ok(state) => {
            println!("{}", format_state(state, report.error_detail.as_deref()));
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
