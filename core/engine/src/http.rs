use axum::{
    extract::{Form, Json, Path, State},
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use querybot_schemas::{generate_session_id, AskForm, MessageResponse, QueryRequest, SessionId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::database::Database;
use crate::error::QueryError;
use crate::memory::{SessionStore, DEFAULT_MAX_SESSIONS};
use crate::pipeline::{Answer, QueryBot, EMPTY_RESULT_MESSAGE};

#[derive(Clone)]
pub struct AppState {
    bot: Arc<Mutex<QueryBot<Database>>>,
    sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    pub fn new(bot: QueryBot<Database>) -> Self {
        Self::with_session_limit(bot, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_session_limit(bot: QueryBot<Database>, max_sessions: usize) -> Self {
        Self {
            bot: Arc::new(Mutex::new(bot)),
            sessions: Arc::new(Mutex::new(SessionStore::with_limit(max_sessions))),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(form_page))
        .route("/ask", post(ask_form))
        .route("/health", get(health_check))
        .route("/test_query", post(test_query))
        .route("/sessions/:session_id/memory", get(get_memory).delete(clear_memory))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn run_turn(state: &AppState, session: &SessionId, query: &str) -> Result<Answer, QueryError> {
    let mut sessions = state.sessions.lock().await;
    let mut memory = sessions.checkout(session);

    let bot = state.bot.lock().await;
    let result = bot.answer(&mut memory, query);
    sessions.store(session, memory);
    result
}

fn log_failure(err: &QueryError) {
    match err {
        QueryError::TableNotFound(_) | QueryError::CampaignNotSpecified => {
            warn!("Asking for a campaign: {}", err)
        }
        _ => error!("Query failed: {}", err),
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "querybot",
        "status": "healthy",
        "version": "0.1.0"
    }))
}

/// JSON endpoint: the answer sentence on success, `{"message": ...}` otherwise
async fn test_query(State(state): State<AppState>, Json(request): Json<QueryRequest>) -> Response {
    let session = request
        .session_id
        .unwrap_or_else(SessionId::default_session);
    info!("Query request: session={}, query={:?}", session, request.query);

    match run_turn(&state, &session, &request.query).await {
        Ok(answer) if answer.rows.is_empty() => {
            Json(MessageResponse::new(EMPTY_RESULT_MESSAGE)).into_response()
        }
        Ok(answer) => Json(answer.response).into_response(),
        Err(e) => {
            log_failure(&e);
            Json(MessageResponse::new(e.user_message())).into_response()
        }
    }
}

async fn get_memory(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let sessions = state.sessions.lock().await;

    match sessions.get(&SessionId(session_id)) {
        Some(memory) => Json(memory.clone()).into_response(),
        None => unknown_session(),
    }
}

async fn clear_memory(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let mut sessions = state.sessions.lock().await;
    let session = SessionId(session_id);

    if sessions.clear(&session) {
        info!("Cleared memory for session {}", session);
        Json(MessageResponse::new("Memory cleared")).into_response()
    } else {
        unknown_session()
    }
}

fn unknown_session() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse::new("Unknown session")),
    )
        .into_response()
}

// ============================================================================
// HTML test form
// ============================================================================

async fn form_page() -> Html<String> {
    Html(render_page(&generate_session_id().0, None, None, None))
}

async fn ask_form(State(state): State<AppState>, Form(form): Form<AskForm>) -> Html<String> {
    let session = form
        .session_id
        .filter(|id| !id.trim().is_empty())
        .map(SessionId)
        .unwrap_or_else(generate_session_id);

    let page = match run_turn(&state, &session, &form.query).await {
        Ok(answer) => {
            let rows = serde_json::to_string(&answer.rows).unwrap_or_default();
            let result = format!("{}\n\n{}", answer.reply(), rows);
            render_page(&session.0, Some(&form.query), Some(&answer.sql.render()), Some(&result))
        }
        Err(e) => {
            log_failure(&e);
            render_page(&session.0, Some(&form.query), None, Some(&e.user_message()))
        }
    };

    Html(page)
}

fn render_page(session_id: &str, query: Option<&str>, sql: Option<&str>, result: Option<&str>) -> String {
    let mut html = format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <title>querybot</title>
  </head>
  <body>
    <h1>Ask querybot</h1>
    <form method="post" action="/ask">
      <label for="query">Enter your query:</label><br><br>
      <input type="text" id="query" name="query" style="width:500px;" value="{}"><br><br>
      <input type="hidden" name="session_id" value="{}">
      <input type="submit" value="Submit">
    </form>
"#,
        escape_html(query.unwrap_or_default()),
        escape_html(session_id)
    );

    if let Some(sql) = sql {
        html.push_str(&format!(
            "    <h2>Generated SQL Query:</h2>\n    <p>{}</p>\n",
            escape_html(sql)
        ));
    }
    if let Some(result) = result {
        html.push_str(&format!(
            "    <h2>Query Result:</h2>\n    <pre>{}</pre>\n",
            escape_html(result)
        ));
    }

    html.push_str("  </body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::tests::sample;

    fn state(max_sessions: usize) -> AppState {
        let db = Database::open_in_memory().unwrap();
        db.install_demo_schema().unwrap();
        AppState::with_session_limit(QueryBot::new(Arc::new(sample()), db), max_sessions)
    }

    #[tokio::test]
    async fn test_turns_without_resources_leave_no_session() {
        let state = state(10);
        for i in 0..5 {
            let session = generate_session_id();
            let err = run_turn(&state, &session, "how many").await.unwrap_err();
            assert!(matches!(err, QueryError::ResourceShape(_)), "turn {}", i);
        }
        assert!(state.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_count_is_capped() {
        let state = state(2);
        for name in ["a", "b", "c"] {
            run_turn(&state, &SessionId(name.into()), "how many campaigns")
                .await
                .unwrap();
        }
        assert_eq!(state.sessions.lock().await.len(), 2);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"a" & 'b'</b>"#),
            "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_page_sections() {
        let empty = render_page("sess_1", None, None, None);
        assert!(empty.contains(r#"name="session_id" value="sess_1""#));
        assert!(!empty.contains("Generated SQL Query"));

        let full = render_page(
            "sess_1",
            Some("how many campaigns"),
            Some("SELECT COUNT(*) FROM ct_campaign WHERE name = 'x'"),
            Some("There are 3 campaigns."),
        );
        assert!(full.contains("Generated SQL Query"));
        assert!(full.contains("name = &#39;x&#39;"));
        assert!(full.contains("<pre>There are 3 campaigns.</pre>"));
        assert!(full.contains(r#"value="how many campaigns""#));
    }
}
