use querybot_schemas::Rows;
use std::sync::Arc;
use tracing::{info, warn};

use crate::builder::QueryBuilder;
use crate::database::QueryExecutor;
use crate::error::QueryError;
use crate::formatter::ResponseFormatter;
use crate::lexicon::Lexicon;
use crate::matcher::Matches;
use crate::memory::ConversationMemory;
use crate::sql::SqlQuery;
use crate::tokenizer::Tokenizer;

pub const EMPTY_RESULT_MESSAGE: &str = "No results found or query could not be processed.";

/// Result of one answered question
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub sql: SqlQuery,
    pub rows: Rows,
    pub response: String,
    /// Resources were taken from conversation memory
    pub memory_derived: bool,
}

impl Answer {
    /// What a caller shows: the sentence, or a fixed message when nothing came back
    pub fn reply(&self) -> &str {
        if self.rows.is_empty() {
            EMPTY_RESULT_MESSAGE
        } else {
            &self.response
        }
    }
}

/// Question in, answer out: tokenize, match, recall, build, execute, format
pub struct QueryBot<E> {
    lexicon: Arc<Lexicon>,
    tokenizer: Tokenizer,
    builder: QueryBuilder,
    formatter: ResponseFormatter,
    executor: E,
}

impl<E: QueryExecutor> QueryBot<E> {
    pub fn new(lexicon: Arc<Lexicon>, executor: E) -> Self {
        Self {
            builder: QueryBuilder::new(lexicon.clone()),
            lexicon,
            tokenizer: Tokenizer::new(),
            formatter: ResponseFormatter::new(),
            executor,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Answer one question within a conversation.
    ///
    /// A turn that names its own resources overwrites `memory` before the
    /// query is built, so the write sticks even when the query fails.
    /// A turn without resources only reads it.
    pub fn answer(&self, memory: &mut ConversationMemory, query: &str) -> Result<Answer, QueryError> {
        info!("user query: {}", query);

        let tokens = self.tokenizer.tokenize(query);
        let mut matches = Matches::scan(&self.lexicon, &tokens);

        let memory_derived = matches.resources.is_empty();
        if memory_derived {
            match memory.recall() {
                Some(resource) => {
                    info!("No new resource mentioned, using last resource from memory");
                    matches.resources = vec![resource];
                }
                None => warn!("No resource mentioned and nothing remembered"),
            }
        } else {
            memory.remember(&matches.resources, &matches.conditions, &matches.intents);
        }

        let sql = self.builder.build(
            &matches.intents,
            &matches.resources,
            &matches.conditions,
            matches.relationship,
            &self.executor,
        )?;

        let rows = self.executor.execute(&sql)?;
        let response = self.formatter.render(&matches.resources, &rows);

        info!("Answer: {}", response);
        Ok(Answer {
            sql,
            rows,
            response,
            memory_derived,
        })
    }
}
