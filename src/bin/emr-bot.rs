//! EMR bot CLI - interactive driver for the intake conversation
//!
//! Reads lines from stdin as turns for a single conversation, prints the
//! outbound messages, and persists the dialog stack between turns so a
//! restarted process picks up exactly where it left off.

use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use parley::dialog::{ConversationId, FileStore, OutboundMessage};
use parley::emr::document::{DisabledDocumentClient, DocumentClient, HttpDocumentClient};
use parley::emr::EmrBot;

#[derive(Parser)]
#[command(name = "emr-bot")]
#[command(about = "Interactive EMR intake bot over a persisted dialog stack", long_about = None)]
struct Cli {
    /// Root directory for persisted conversation state
    #[arg(short, long, default_value = ".parley")]
    root: PathBuf,

    /// Conversation id to resume (a fresh one is created if omitted)
    #[arg(short, long)]
    conversation: Option<String>,

    /// Document generation API endpoint (attachment delivery is disabled
    /// when omitted)
    #[arg(long)]
    api_url: Option<String>,

    /// Reset the conversation before reading input
    #[arg(long)]
    reset: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let conversation = match &cli.conversation {
        Some(id) => ConversationId::new(id.clone()),
        None => ConversationId::random(),
    };
    println!("conversation: {conversation}");

    match &cli.api_url {
        Some(url) => run(&cli, &conversation, HttpDocumentClient::new(url.clone())),
        None => run(&cli, &conversation, DisabledDocumentClient),
    }
}

fn run<D: DocumentClient>(cli: &Cli, conversation: &ConversationId, documents: D) -> Result<()> {
    let store = FileStore::open(&cli.root)?;
    let bot = EmrBot::new(store, documents)?;

    if cli.reset {
        bot.reset(conversation)?;
        println!("(conversation reset)");
    }

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            print!("> ");
            io::stdout().flush()?;
            continue;
        }
        if text == "/quit" {
            break;
        }
        if text == "/cancel" {
            bot.reset(conversation)?;
            println!("(conversation reset)");
            print!("> ");
            io::stdout().flush()?;
            continue;
        }

        for message in bot.handle_message(conversation, text)? {
            match message {
                OutboundMessage::Text { text } => println!("{text}"),
                OutboundMessage::Attachment {
                    name,
                    content_type,
                    content_url,
                } => println!("[attachment {name} ({content_type}), {} bytes]", content_url.len()),
            }
        }

        print!("> ");
        io::stdout().flush()?;
    }

    Ok(())
}
