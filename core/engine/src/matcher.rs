use querybot_schemas::{MatchedCondition, MatchedIntent, MatchedResource, ResourceSource};
use std::collections::HashSet;
use tracing::debug;

use crate::lexicon::Lexicon;

/// Token that marks two resources as joined ("users in acme campaign")
pub const RELATIONSHIP_TOKEN: &str = "in";

/// Everything recognised in one tokenized query
#[derive(Debug, Clone, PartialEq)]
pub struct Matches {
    pub intents: Vec<MatchedIntent>,
    pub resources: Vec<MatchedResource>,
    pub conditions: Vec<MatchedCondition>,
    pub relationship: bool,
}

impl Matches {
    pub fn scan(lexicon: &Lexicon, tokens: &[String]) -> Self {
        let matches = Self {
            intents: match_intents(lexicon, tokens),
            resources: match_resources(lexicon, tokens),
            conditions: match_conditions(lexicon, tokens),
            relationship: has_relationship(tokens),
        };

        debug!(
            "matched intents={:?} resources={:?} conditions={:?} relationship={}",
            matches.intents.iter().map(|i| &i.name).collect::<Vec<_>>(),
            matches.resources.iter().map(|r| &r.name).collect::<Vec<_>>(),
            matches.conditions.iter().map(|c| &c.name).collect::<Vec<_>>(),
            matches.relationship
        );
        matches
    }
}

/// Intents whose whole keyword set occurs among the tokens, in declaration order
pub fn match_intents(lexicon: &Lexicon, tokens: &[String]) -> Vec<MatchedIntent> {
    let token_set: HashSet<&str> = tokens.iter().map(String::as_str).collect();

    lexicon
        .intents
        .iter()
        .filter(|intent| {
            let matched = intent
                .keywords
                .iter()
                .all(|keyword| token_set.contains(keyword.as_str()));
            if !matched {
                debug!("Intent '{}' not matched", intent.name);
            }
            matched
        })
        .map(|intent| MatchedIntent {
            name: intent.name.clone(),
            templates: intent.templates.clone(),
        })
        .collect()
}

/// Left-to-right scan; every occurrence of a resource name is a match whose
/// qualifier is the token right before it
pub fn match_resources(lexicon: &Lexicon, tokens: &[String]) -> Vec<MatchedResource> {
    let mut matched = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        for resource in lexicon.resources.iter().filter(|r| &r.name == token) {
            let qualifier = i.checked_sub(1).map(|prev| tokens[prev].clone());
            matched.push(MatchedResource {
                name: resource.name.clone(),
                table: resource.table.clone(),
                qualifier,
                source: ResourceSource::Direct,
            });
        }
    }

    matched
}

/// Conditions named anywhere in the query, in declaration order
pub fn match_conditions(lexicon: &Lexicon, tokens: &[String]) -> Vec<MatchedCondition> {
    lexicon
        .conditions
        .iter()
        .filter(|condition| tokens.iter().any(|t| t == &condition.name))
        .map(|condition| MatchedCondition {
            name: condition.name.clone(),
            column: condition.column.clone(),
            value: condition.value.clone(),
        })
        .collect()
}

pub fn has_relationship(tokens: &[String]) -> bool {
    tokens.iter().any(|t| t == RELATIONSHIP_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::tests::sample;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_intent_requires_every_keyword() {
        let lexicon = sample();

        let matched = match_intents(&lexicon, &toks(&["how", "many", "campaigns"]));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "count");

        assert!(match_intents(&lexicon, &toks(&["how", "campaigns"])).is_empty());
    }

    #[test]
    fn test_intent_match_ignores_order_and_extra_tokens() {
        let lexicon = sample();

        let base = match_intents(&lexicon, &toks(&["many", "how"]));
        let padded = match_intents(&lexicon, &toks(&["so", "many", "users", "how", "odd", "?"]));
        assert_eq!(base, padded);
    }

    #[test]
    fn test_intents_follow_declaration_order() {
        let lexicon = sample();

        let matched = match_intents(&lexicon, &toks(&["total", "how", "many"]));
        let names: Vec<_> = matched.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["count", "total"]);
    }

    #[test]
    fn test_intent_match_is_case_sensitive() {
        let lexicon = sample();
        assert!(match_intents(&lexicon, &toks(&["How", "many"])).is_empty());
    }

    #[test]
    fn test_resources_keep_scan_order_and_qualifiers() {
        let lexicon = sample();

        let matched = match_resources(&lexicon, &toks(&["show", "agents", "in", "campaign", "acme"]));
        assert_eq!(matched.len(), 2);

        assert_eq!(matched[0].name, "agents");
        assert_eq!(matched[0].qualifier.as_deref(), Some("show"));
        assert_eq!(matched[1].name, "campaign");
        assert_eq!(matched[1].table, "ct_campaign");
        assert_eq!(matched[1].qualifier.as_deref(), Some("in"));
        assert!(matched.iter().all(|r| r.source == ResourceSource::Direct));
    }

    #[test]
    fn test_resource_at_start_has_no_qualifier() {
        let lexicon = sample();

        let matched = match_resources(&lexicon, &toks(&["users", "users"]));
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].qualifier, None);
        assert_eq!(matched[1].qualifier.as_deref(), Some("users"));
    }

    #[test]
    fn test_conditions_follow_declaration_order() {
        let lexicon = sample();

        let matched = match_conditions(&lexicon, &toks(&["inactive", "or", "active", "users"]));
        let names: Vec<_> = matched.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["active", "inactive"]);
        assert_eq!(matched[0].column, "status");
        assert_eq!(matched[0].value, "active");
    }

    #[test]
    fn test_relationship_token() {
        assert!(has_relationship(&toks(&["users", "in", "acme", "campaign"])));
        assert!(!has_relationship(&toks(&["users", "In", "acme"])));
        assert!(!has_relationship(&toks(&["inside", "campaign"])));
    }

    #[test]
    fn test_scan_collects_everything() {
        let lexicon = sample();

        let matches = Matches::scan(&lexicon, &toks(&["how", "many", "active", "users", "in", "acme", "campaign"]));
        assert_eq!(matches.intents.len(), 1);
        assert_eq!(matches.resources.len(), 2);
        assert_eq!(matches.conditions.len(), 1);
        assert!(matches.relationship);
    }
}
