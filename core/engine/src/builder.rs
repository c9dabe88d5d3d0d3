use querybot_schemas::{
    MatchedCondition, MatchedIntent, MatchedResource, SqlTemplate, SqlValue, TemplateShape,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::database::QueryExecutor;
use crate::error::QueryError;
use crate::lexicon::{is_identifier, Lexicon};
use crate::sql::SqlQuery;

/// Turns matched intents, resources and conditions into one SQL query
pub struct QueryBuilder {
    lexicon: Arc<Lexicon>,
}

impl QueryBuilder {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Build the query for a turn.
    ///
    /// Only the first intent is used. Agent counts need a campaign id first,
    /// which is why the executor is passed in.
    pub fn build(
        &self,
        intents: &[MatchedIntent],
        resources: &[MatchedResource],
        conditions: &[MatchedCondition],
        relationship: bool,
        executor: &dyn QueryExecutor,
    ) -> Result<SqlQuery, QueryError> {
        let intent = intents.first().ok_or(QueryError::NoIntentMatched)?;
        let first = resources
            .first()
            .ok_or_else(|| QueryError::ResourceShape("no resource".to_string()))?;

        debug!(
            "Building '{}' for {} resources, {} conditions, relationship={}",
            intent.name,
            resources.len(),
            conditions.len(),
            relationship
        );

        if first.name == self.lexicon.live_agents.resource {
            return self.live_agents_query(resources, executor);
        }

        let (mut query, template) = match (relationship, resources) {
            (true, [target, scope]) => self.relationship_query(intent, target, scope)?,
            (false, [only]) => {
                let template = &intent.templates.simple;
                let query = SqlQuery::new(fill(&template.sql, &[("table", only.table.as_str())]));
                (query, template)
            }
            _ => {
                return Err(QueryError::ResourceShape(format!(
                    "{} resources with relationship={}",
                    resources.len(),
                    relationship
                )))
            }
        };

        append_conditions(&mut query, template, conditions);

        info!("Final query: {}", query);
        Ok(query)
    }

    /// `target` is counted, `scope` names the row it must belong to,
    /// e.g. "users in acme campaign"
    fn relationship_query<'i>(
        &self,
        intent: &'i MatchedIntent,
        target: &MatchedResource,
        scope: &MatchedResource,
    ) -> Result<(SqlQuery, &'i SqlTemplate), QueryError> {
        let template = intent
            .templates
            .get(TemplateShape::WithRelationship)
            .ok_or_else(|| QueryError::MissingTemplate {
                intent: intent.name.clone(),
                shape: TemplateShape::WithRelationship,
            })?;

        let foreign_key_column = self
            .lexicon
            .foreign_key_column(&scope.table)
            .ok_or_else(|| QueryError::UnknownForeignKey(scope.table.clone()))?;

        let scope_value = scope.qualifier.as_deref().ok_or_else(|| {
            QueryError::ResourceShape(format!("'{}' has no qualifier", scope.name))
        })?;

        let mut query = SqlQuery::default();
        let placeholder = query.bind(scope_value);
        let sql = fill(
            &template.sql.replace("'{secondary_value}'", "{secondary_value}"),
            &[
                ("primary_table", target.table.as_str()),
                ("foreign_key_column", foreign_key_column),
                ("secondary_table", scope.table.as_str()),
                ("secondary_value", placeholder.as_str()),
            ],
        );
        query.push_sql(&sql);

        Ok((query, template))
    }

    /// Resolve the campaign id, then count its per-campaign live agents table
    fn live_agents_query(
        &self,
        resources: &[MatchedResource],
        executor: &dyn QueryExecutor,
    ) -> Result<SqlQuery, QueryError> {
        let live_agents = &self.lexicon.live_agents;
        let campaign = resources
            .get(1)
            .and_then(|r| r.qualifier.as_deref())
            .ok_or(QueryError::CampaignNotSpecified)?;

        let mut lookup = SqlQuery::new(format!(
            "SELECT id FROM {} WHERE name = ",
            live_agents.campaign_table
        ));
        let placeholder = lookup.bind(campaign);
        lookup.push_sql(&placeholder);
        info!("Campaign id query: {}", lookup);

        let rows = executor.execute(&lookup)?;
        let campaign_id = match rows.first().and_then(|row| row.first()) {
            Some(SqlValue::Integer(id)) => id.to_string(),
            Some(SqlValue::Text(id)) if id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                id.clone()
            }
            Some(other) => return Err(QueryError::InvalidIdentifier(other.to_string())),
            None => return Err(QueryError::ResourceNotFound(campaign.to_string())),
        };

        let table = format!("{}_{}", live_agents.table_prefix, campaign_id);
        if !is_identifier(&table) {
            return Err(QueryError::InvalidIdentifier(table));
        }

        let query = SqlQuery::new(format!("SELECT COUNT(*) FROM {}", table));
        info!("Final live agents query: {}", query);
        Ok(query)
    }
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |sql, (name, value)| {
        sql.replace(&format!("{{{}}}", name), value)
    })
}

/// Each condition becomes `column = ?N`, opened with WHERE unless the
/// template already has one
fn append_conditions(query: &mut SqlQuery, template: &SqlTemplate, conditions: &[MatchedCondition]) {
    let mut has_where = template.has_where();

    for condition in conditions {
        let placeholder = query.bind(condition.value.as_str());
        let keyword = if has_where { "AND" } else { "WHERE" };
        query.push_sql(&format!(" {} {} = {}", keyword, condition.column, placeholder));
        has_where = true;
    }
}
