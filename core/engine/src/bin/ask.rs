//! Interactive querybot shell - ask questions against a local SQLite database
//!
//! Usage:
//!   cargo run --bin ask [--db-path <path>] [--lexicon <path>] [--demo] [--show-sql] [QUESTION]
//!
//! Options:
//!   --db-path: Path to SQLite database (defaults to QUERYBOT_DB_PATH or querybot.db)
//!   --lexicon: Path to lexicon JSON (defaults to QUERYBOT_LEXICON or config/lexicon.json)
//!   --demo: Install the demo campaign schema before asking
//!   --show-sql: Print the generated SQL with every answer
//!
//! Without QUESTION, reads one question per line from stdin until EOF.
//! All questions share one conversation, so follow-ups may omit the resource.
//! Logging defaults to warn; set RUST_LOG=debug to trace the pipeline.

use anyhow::Result;
use clap::Parser;
use querybot_engine::settings::{DEFAULT_DB_PATH, DEFAULT_LEXICON_PATH};
use querybot_engine::{logging, ConversationMemory, Database, Lexicon, QueryBot};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(about = "Ask querybot questions from the terminal")]
struct Args {
    /// Path to SQLite database file
    #[arg(long, short, env = "QUERYBOT_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// Path to the lexicon JSON file
    #[arg(long, short, env = "QUERYBOT_LEXICON", default_value = DEFAULT_LEXICON_PATH)]
    lexicon: PathBuf,

    /// Install the demo schema and rows first
    #[arg(long)]
    demo: bool,

    /// Print the generated SQL with every answer
    #[arg(long)]
    show_sql: bool,

    /// Ask a single question and exit
    question: Option<String>,
}

fn main() -> Result<()> {
    // Initialize tracing
    logging::init("warn");

    let args = Args::parse();

    let lexicon = Lexicon::from_path(&args.lexicon)?;
    let db = Database::open(&args.db_path)?;
    if args.demo {
        db.install_demo_schema()?;
    }

    let bot = QueryBot::new(Arc::new(lexicon), db);
    let mut memory = ConversationMemory::new();
    debug!("Using database {}", args.db_path.display());

    if let Some(question) = args.question {
        ask(&bot, &mut memory, &question, args.show_sql);
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "forget" {
            memory.clear();
            println!("Memory cleared");
            continue;
        }

        ask(&bot, &mut memory, question, args.show_sql);
    }

    Ok(())
}

fn ask(bot: &QueryBot<Database>, memory: &mut ConversationMemory, question: &str, show_sql: bool) {
    match bot.answer(memory, question) {
        Ok(answer) => {
            if show_sql {
                println!("  sql: {}", answer.sql);
            }
            println!("{}", answer.reply());
        }
        Err(e) => {
            debug!("Query failed: {}", e);
            println!("{}", e.user_message());
        }
    }
}
