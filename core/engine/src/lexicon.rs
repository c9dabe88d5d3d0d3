use querybot_schemas::{ConditionDef, IntentDef, LiveAgentsDef, ResourceDef, TemplateShape};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lexicon: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid lexicon: {0}")]
    Invalid(String),
}

/// Intents, resources, conditions and join relations, loaded once at startup.
///
/// Declaration order is significant: intents and conditions are reported
/// in the order they appear in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexicon {
    #[serde(default)]
    pub intents: Vec<IntentDef>,
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
    /// Table -> foreign key column used when joining two resources
    #[serde(default = "default_relations")]
    pub relations: BTreeMap<String, String>,
    #[serde(default)]
    pub live_agents: LiveAgentsDef,
}

fn default_relations() -> BTreeMap<String, String> {
    [
        ("ct_domain", "domainid"),
        ("ct_user_group", "usergroupid"),
        ("ct_campaign", "campid"),
    ]
    .into_iter()
    .map(|(table, column)| (table.to_string(), column.to_string()))
    .collect()
}

impl Lexicon {
    /// Load and validate a lexicon file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LexiconError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let lexicon = Self::from_json_str(&content)?;
        info!(
            "Loaded lexicon from {}: {} intents, {} resources, {} conditions",
            path.display(),
            lexicon.intents.len(),
            lexicon.resources.len(),
            lexicon.conditions.len()
        );
        Ok(lexicon)
    }

    pub fn from_json_str(content: &str) -> Result<Self, LexiconError> {
        let lexicon: Lexicon = serde_json::from_str(content)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn foreign_key_column(&self, table: &str) -> Option<&str> {
        self.relations.get(table).map(String::as_str)
    }

    /// Reject anything the query builder could not use safely.
    ///
    /// Relations are checked from the relation side: every relation table
    /// must belong to a declared resource, and `with_relationship` templates
    /// need at least one relation. A resource table without a relation is
    /// allowed, since counted tables such as `ct_users` are never the joined
    /// side; joining on one fails per request with `UnknownForeignKey`.
    pub fn validate(&self) -> Result<(), LexiconError> {
        if self.intents.is_empty() {
            return Err(invalid("no intents defined"));
        }
        if self.resources.is_empty() {
            return Err(invalid("no resources defined"));
        }

        ensure_unique("intent", self.intents.iter().map(|i| i.name.as_str()))?;
        ensure_unique("resource", self.resources.iter().map(|r| r.name.as_str()))?;
        ensure_unique("condition", self.conditions.iter().map(|c| c.name.as_str()))?;

        let placeholder = Regex::new(r"\{(\w+)\}").unwrap();
        let mut joins_possible = false;

        for intent in &self.intents {
            if intent.keywords.is_empty() {
                warn!("Intent '{}' has no keywords and will match every query", intent.name);
            }

            for shape in [TemplateShape::Simple, TemplateShape::WithRelationship] {
                let Some(template) = intent.templates.get(shape) else {
                    continue;
                };
                if shape == TemplateShape::WithRelationship {
                    joins_possible = true;
                    if !template.has_where() {
                        return Err(invalid(format!(
                            "intent '{}': with_relationship template must contain a WHERE clause",
                            intent.name
                        )));
                    }
                }

                for caps in placeholder.captures_iter(&template.sql) {
                    let name = &caps[1];
                    if !shape.placeholders().iter().any(|p| *p == name) {
                        return Err(invalid(format!(
                            "intent '{}': unknown placeholder {{{}}} in {} template",
                            intent.name, name, shape
                        )));
                    }
                }
            }
        }

        for resource in &self.resources {
            ensure_identifier(&resource.table, &format!("resource '{}' table", resource.name))?;
        }
        for condition in &self.conditions {
            ensure_identifier(&condition.column, &format!("condition '{}' column", condition.name))?;
        }

        if joins_possible && self.relations.is_empty() {
            return Err(invalid(
                "with_relationship templates are defined but no relations are configured",
            ));
        }
        for (table, column) in &self.relations {
            ensure_identifier(column, &format!("relation '{}' column", table))?;
            if !self.resources.iter().any(|r| &r.table == table) {
                return Err(invalid(format!(
                    "relation table '{}' does not belong to any resource",
                    table
                )));
            }
        }

        ensure_identifier(&self.live_agents.campaign_table, "live_agents campaign_table")?;
        ensure_identifier(&self.live_agents.table_prefix, "live_agents table_prefix")?;
        if self.resource(&self.live_agents.resource).is_none() {
            warn!(
                "Live agents resource '{}' is not declared; agent counts are disabled",
                self.live_agents.resource
            );
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> LexiconError {
    LexiconError::Invalid(message.into())
}

fn ensure_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), LexiconError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(invalid(format!("duplicate {} '{}'", kind, name)));
        }
    }
    Ok(())
}

/// Table and column names are spliced into SQL text, so only plain identifiers pass
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn ensure_identifier(name: &str, what: &str) -> Result<(), LexiconError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(invalid(format!("{} '{}' is not a valid SQL identifier", what, name)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const SAMPLE: &str = r#"{
        "intents": [
            {
                "name": "count",
                "keywords": ["how", "many"],
                "templates": {
                    "simple": "SELECT COUNT(*) FROM {table}",
                    "with_relationship": "SELECT COUNT(*) FROM {primary_table} WHERE {foreign_key_column} = (SELECT id FROM {secondary_table} WHERE name = '{secondary_value}')"
                }
            },
            {
                "name": "total",
                "keywords": ["total"],
                "templates": { "simple": "SELECT COUNT(*) FROM {table}" }
            }
        ],
        "resources": [
            { "name": "campaigns", "table": "ct_campaign" },
            { "name": "campaign", "table": "ct_campaign" },
            { "name": "users", "table": "ct_users" },
            { "name": "agents", "table": "ct_live_agents" },
            { "name": "domain", "table": "ct_domain" }
        ],
        "conditions": [
            { "name": "active", "column": "status", "value": "active" },
            { "name": "inactive", "column": "status", "value": "inactive" }
        ],
        "relations": { "ct_campaign": "campid", "ct_domain": "domainid" }
    }"#;

    pub(crate) fn sample() -> Lexicon {
        Lexicon::from_json_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_sample_loads() {
        let lexicon = sample();
        assert_eq!(lexicon.intents.len(), 2);
        assert_eq!(lexicon.intents[0].name, "count");
        assert_eq!(lexicon.foreign_key_column("ct_campaign"), Some("campid"));
        assert_eq!(lexicon.foreign_key_column("ct_users"), None);
        assert_eq!(lexicon.resource("users").unwrap().table, "ct_users");
        assert_eq!(lexicon.live_agents.campaign_table, "ct_campaign");
    }

    #[test]
    fn test_default_relations() {
        let json = r#"{
            "intents": [{"name": "count", "keywords": ["count"], "templates": {"simple": "SELECT COUNT(*) FROM {table}"}}],
            "resources": [{"name": "domains", "table": "ct_domain"}]
        }"#;
        // default relations mention tables this lexicon never declares
        let err = Lexicon::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("does not belong to any resource"));

        let json = r#"{
            "intents": [{"name": "count", "keywords": ["count"], "templates": {"simple": "SELECT COUNT(*) FROM {table}"}}],
            "resources": [
                {"name": "domains", "table": "ct_domain"},
                {"name": "groups", "table": "ct_user_group"},
                {"name": "campaigns", "table": "ct_campaign"}
            ]
        }"#;
        let lexicon = Lexicon::from_json_str(json).unwrap();
        assert_eq!(lexicon.foreign_key_column("ct_user_group"), Some("usergroupid"));
    }

    #[test]
    fn test_rejects_unknown_placeholder() {
        let json = SAMPLE.replace("FROM {table}\"", "FROM {tabel}\"");
        let err = Lexicon::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("unknown placeholder {tabel}"));
    }

    #[test]
    fn test_rejects_missing_simple_template() {
        let json = r#"{
            "intents": [{"name": "count", "keywords": ["count"], "templates": {}}],
            "resources": [{"name": "campaigns", "table": "ct_campaign"}]
        }"#;
        assert!(matches!(Lexicon::from_json_str(json), Err(LexiconError::Parse(_))));
    }

    #[test]
    fn test_rejects_relationship_template_without_where() {
        let json = SAMPLE.replace(
            "FROM {primary_table} WHERE {foreign_key_column} = (SELECT id FROM {secondary_table} WHERE name = '{secondary_value}')",
            "FROM {primary_table}",
        );
        let err = Lexicon::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("must contain a WHERE clause"));
    }

    #[test]
    fn test_rejects_bad_identifier() {
        let json = SAMPLE.replace("\"ct_users\"", "\"ct_users; DROP TABLE x\"");
        let err = Lexicon::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("not a valid SQL identifier"));
    }

    #[test]
    fn test_rejects_duplicates() {
        let json = SAMPLE.replace("\"name\": \"campaign\"", "\"name\": \"campaigns\"");
        let err = Lexicon::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("duplicate resource 'campaigns'"));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let lexicon = Lexicon::from_path(file.path()).unwrap();
        assert_eq!(lexicon.resources.len(), 5);

        let missing = Lexicon::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, LexiconError::Read { .. }));
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("ct_live_agents_42"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("42"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a b"));
    }
}
