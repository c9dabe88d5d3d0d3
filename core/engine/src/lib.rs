pub mod builder;
pub mod database;
pub mod error;
pub mod formatter;
pub mod http;
pub mod lexicon;
pub mod logging;
pub mod matcher;
pub mod memory;
pub mod pipeline;
pub mod settings;
pub mod sql;
pub mod tokenizer;

pub use builder::QueryBuilder;
pub use database::{Database, ExecError, QueryExecutor};
pub use error::QueryError;
pub use formatter::ResponseFormatter;
pub use http::{router, AppState};
pub use lexicon::{Lexicon, LexiconError};
pub use matcher::{has_relationship, match_conditions, match_intents, match_resources, Matches};
pub use memory::{ConversationMemory, SessionStore};
pub use pipeline::{Answer, QueryBot, EMPTY_RESULT_MESSAGE};
pub use settings::Settings;
pub use sql::SqlQuery;
pub use tokenizer::Tokenizer;
