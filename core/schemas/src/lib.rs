use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ID Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Session used by callers that never send an id
    pub fn default_session() -> Self {
        SessionId("default".to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Lexicon Schema
// ============================================================================

/// A classified user goal, recognised by a keyword set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDef {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(alias = "conditions")]
    pub templates: IntentTemplates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentTemplates {
    pub simple: SqlTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_relationship: Option<SqlTemplate>,
}

impl IntentTemplates {
    pub fn get(&self, shape: TemplateShape) -> Option<&SqlTemplate> {
        match shape {
            TemplateShape::Simple => Some(&self.simple),
            TemplateShape::WithRelationship => self.with_relationship.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateShape {
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "with_relationship")]
    WithRelationship,
}

impl TemplateShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateShape::Simple => "simple",
            TemplateShape::WithRelationship => "with_relationship",
        }
    }

    /// Placeholders a template of this shape may reference
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            TemplateShape::Simple => &["table"],
            TemplateShape::WithRelationship => &[
                "primary_table",
                "foreign_key_column",
                "secondary_table",
                "secondary_value",
            ],
        }
    }
}

impl fmt::Display for TemplateShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL text with `{placeholder}` slots.
///
/// Accepts either a bare string or `{ "sql": ..., "has_where": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SqlTemplateRepr")]
pub struct SqlTemplate {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_where: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SqlTemplateRepr {
    Plain(String),
    Full {
        sql: String,
        #[serde(default)]
        has_where: Option<bool>,
    },
}

impl From<SqlTemplateRepr> for SqlTemplate {
    fn from(repr: SqlTemplateRepr) -> Self {
        match repr {
            SqlTemplateRepr::Plain(sql) => SqlTemplate { sql, has_where: None },
            SqlTemplateRepr::Full { sql, has_where } => SqlTemplate { sql, has_where },
        }
    }
}

impl SqlTemplate {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            has_where: None,
        }
    }

    /// Whether the rendered template already carries a WHERE clause.
    /// An explicit flag wins over what the text says.
    pub fn has_where(&self) -> bool {
        self.has_where.unwrap_or_else(|| self.mentions_where())
    }

    pub fn mentions_where(&self) -> bool {
        self.sql
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .any(|word| word.eq_ignore_ascii_case("where"))
    }
}

/// An entity the user asks about, backed by one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub name: String,
    pub table: String,
}

/// A filter keyed by a surface word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDef {
    pub name: String,
    pub column: String,
    pub value: String,
}

/// Two-step "agents in <campaign>" resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveAgentsDef {
    #[serde(default = "default_agents_resource")]
    pub resource: String,
    #[serde(default = "default_campaign_table")]
    pub campaign_table: String,
    #[serde(default = "default_live_agents_prefix")]
    pub table_prefix: String,
}

impl Default for LiveAgentsDef {
    fn default() -> Self {
        Self {
            resource: default_agents_resource(),
            campaign_table: default_campaign_table(),
            table_prefix: default_live_agents_prefix(),
        }
    }
}

fn default_agents_resource() -> String {
    "agents".to_string()
}

fn default_campaign_table() -> String {
    "ct_campaign".to_string()
}

fn default_live_agents_prefix() -> String {
    "ct_live_agents".to_string()
}

// ============================================================================
// Match Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedIntent {
    pub name: String,
    pub templates: IntentTemplates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceSource {
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "memory")]
    FromMemory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedResource {
    pub name: String,
    pub table: String,
    /// Token immediately before the match, e.g. a campaign name before "agents"
    pub qualifier: Option<String>,
    pub source: ResourceSource,
}

impl MatchedResource {
    pub fn is_from_memory(&self) -> bool {
        self.source == ResourceSource::FromMemory
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedCondition {
    pub name: String,
    pub column: String,
    pub value: String,
}

// ============================================================================
// SQL Values
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Real(v) => write!(f, "{}", v),
            SqlValue::Text(v) => f.write_str(v),
        }
    }
}

pub type Rows = Vec<Vec<SqlValue>>;

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of the HTML test form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskForm {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn generate_session_id() -> SessionId {
    SessionId(format!("sess_{}", ulid::Ulid::new()))
}
