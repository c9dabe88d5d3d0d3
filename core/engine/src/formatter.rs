use querybot_schemas::{MatchedResource, Rows};

pub const NO_RESULTS_MESSAGE: &str = "No results found for your query.";

/// Renders a count result as one sentence
pub struct ResponseFormatter;

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Answers drawn from conversation memory drop the final period,
    /// which lets a client tell the two apart
    pub fn render(&self, resources: &[MatchedResource], rows: &Rows) -> String {
        let from_memory = resources.first().map_or(false, MatchedResource::is_from_memory);
        let terminator = if from_memory { "" } else { "." };

        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(|value| value.as_i64());

        match (count, resources.first()) {
            (Some(count), Some(resource)) if count > -1 => {
                format!("There are {} {}{}", count, resource.name, terminator)
            }
            _ => self.no_results(from_memory),
        }
    }

    fn no_results(&self, from_memory: bool) -> String {
        if from_memory {
            NO_RESULTS_MESSAGE.trim_end_matches('.').to_string()
        } else {
            NO_RESULTS_MESSAGE.to_string()
        }
    }
}
