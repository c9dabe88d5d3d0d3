use tracing_subscriber::EnvFilter;

/// Directives for the subscriber: `RUST_LOG` when it parses, else `default_level`
fn build_env_filter(rust_log: Option<&str>, default_level: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

/// Install the fmt subscriber for a binary
pub fn init(default_level: &str) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(rust_log.as_deref(), default_level))
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_when_unset() {
        assert_eq!(build_env_filter(None, "warn").to_string(), "warn");
    }

    #[test]
    fn test_rust_log_wins() {
        let filter = build_env_filter(Some("querybot_engine=debug"), "warn");
        assert_eq!(filter.to_string(), "querybot_engine=debug");
    }

    #[test]
    fn test_unparseable_rust_log_falls_back() {
        let filter = build_env_filter(Some("querybot_engine=loud"), "info");
        assert_eq!(filter.to_string(), "info");
    }
}
