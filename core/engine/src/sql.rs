use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL text with `?N` placeholders and the text values bound to them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Register a value and return the placeholder that refers to it
    pub fn bind(&mut self, value: impl Into<String>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    pub fn push_sql(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// The query with every bound value inlined as a quoted literal.
    /// For logs and display only; execution always binds.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut chars = self.sql.chars().peekable();
        let mut in_literal = false;

        while let Some(c) = chars.next() {
            if c == '\'' {
                in_literal = !in_literal;
                out.push(c);
                continue;
            }
            if c != '?' || in_literal {
                out.push(c);
                continue;
            }

            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }

            let value = digits
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| self.params.get(idx));
            match value {
                Some(value) => out.push_str(&quote_literal(value)),
                None => {
                    out.push('?');
                    out.push_str(&digits);
                }
            }
        }

        out
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render())
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_numbers_placeholders() {
        let mut query = SqlQuery::new("SELECT COUNT(*) FROM t WHERE a = ");
        let first = query.bind("x");
        query.push_sql(&first);
        query.push_sql(" AND b = ");
        let second = query.bind("y");
        query.push_sql(&second);

        assert_eq!(query.sql, "SELECT COUNT(*) FROM t WHERE a = ?1 AND b = ?2");
        assert_eq!(query.render(), "SELECT COUNT(*) FROM t WHERE a = 'x' AND b = 'y'");
    }

    #[test]
    fn test_render_escapes_quotes() {
        let mut query = SqlQuery::new("SELECT id FROM ct_campaign WHERE name = ");
        let p = query.bind("o'brien");
        query.push_sql(&p);
        assert_eq!(query.render(), "SELECT id FROM ct_campaign WHERE name = 'o''brien'");
    }

    #[test]
    fn test_render_does_not_expand_inside_values() {
        let mut query = SqlQuery::new("SELECT ?1, ?2");
        query.params = vec!["?2".to_string(), "b".to_string()];
        assert_eq!(query.render(), "SELECT '?2', 'b'");
    }

    #[test]
    fn test_render_many_params() {
        let mut query = SqlQuery::new("");
        let placeholders: Vec<String> = (0..11).map(|i| query.bind(i.to_string())).collect();
        query.push_sql(&placeholders.join(","));
        assert!(query.render().ends_with("'9','10'"));
    }

    #[test]
    fn test_render_without_params() {
        let query = SqlQuery::new("SELECT COUNT(*) FROM ct_campaign");
        assert_eq!(query.to_string(), "SELECT COUNT(*) FROM ct_campaign");
    }

    #[test]
    fn test_render_leaves_quoted_question_marks() {
        let mut query = SqlQuery::new("SELECT '?1' WHERE x = ?1");
        query.params.push("v".into());
        assert_eq!(query.render(), "SELECT '?1' WHERE x = 'v'");
    }
}
