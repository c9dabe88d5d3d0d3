use anyhow::Result;
use querybot_engine::{logging, router, AppState, Database, Lexicon, QueryBot, Settings};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    logging::init("info");

    info!("querybot service v0.1.0");

    let settings = Settings::from_env();

    let lexicon = Lexicon::from_path(&settings.lexicon_path)?;

    // Create directory if it doesn't exist
    if let Some(parent) = settings.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::open(&settings.db_path)?;
    info!("Database opened at: {}", settings.db_path.display());

    let bot = QueryBot::new(Arc::new(lexicon), db);
    let app = router(AppState::with_session_limit(bot, settings.max_sessions));

    info!("Starting HTTP server on http://{}", settings.addr);
    info!("Query endpoint: http://{}/test_query", settings.addr);

    let listener = tokio::net::TcpListener::bind(&settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
