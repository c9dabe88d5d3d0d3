use querybot_schemas::TemplateShape;
use thiserror::Error;

use crate::database::ExecError;

pub const SPECIFY_CAMPAIGN_MESSAGE: &str = "Please specify a campaign";
pub const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Everything that can stop a question from being answered
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no intent identified in the query")]
    NoIntentMatched,

    #[error("resource format incorrect: {0}")]
    ResourceShape(String),

    #[error("no foreign key column found for: {0}")]
    UnknownForeignKey(String),

    #[error("campaign '{0}' not found")]
    ResourceNotFound(String),

    #[error("no campaign specified for agent count")]
    CampaignNotSpecified,

    #[error("intent '{intent}' has no {shape} template")]
    MissingTemplate { intent: String, shape: TemplateShape },

    #[error("'{0}' cannot be used as part of a table name")]
    InvalidIdentifier(String),

    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    #[error("query execution failed: {0}")]
    Execution(String),
}

impl QueryError {
    /// Text safe to show the person asking; never carries internal detail
    pub fn user_message(&self) -> String {
        match self {
            QueryError::TableNotFound(_) | QueryError::CampaignNotSpecified => {
                SPECIFY_CAMPAIGN_MESSAGE.to_string()
            }
            QueryError::ResourceNotFound(name) => {
                format!("Campaign '{}' was not found. {}", name, SPECIFY_CAMPAIGN_MESSAGE)
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<ExecError> for QueryError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::TableNotFound(table) => QueryError::TableNotFound(table),
            ExecError::Sqlite(e) => QueryError::Execution(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_asks_for_campaign() {
        let err = QueryError::from(ExecError::TableNotFound("ct_live_agents_9".into()));
        assert!(matches!(err, QueryError::TableNotFound(_)));
        assert_eq!(err.user_message(), "Please specify a campaign");
        assert_eq!(QueryError::CampaignNotSpecified.user_message(), "Please specify a campaign");
    }

    #[test]
    fn test_not_found_names_the_campaign() {
        let err = QueryError::ResourceNotFound("acme".into());
        assert_eq!(
            err.user_message(),
            "Campaign 'acme' was not found. Please specify a campaign"
        );
    }

    #[test]
    fn test_other_errors_stay_opaque() {
        let errors = [
            QueryError::NoIntentMatched,
            QueryError::ResourceShape("3 resources".into()),
            QueryError::UnknownForeignKey("ct_users".into()),
            QueryError::Execution("disk I/O error at /var/db".into()),
        ];
        for err in errors {
            assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        }
    }
}
