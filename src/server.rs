use std::sync::{Arc, Mutex};
use axum::{routing::post, Router, Json};
use tower_http::cors::{CorsLayer, Any};
use serde::{Deserialize, Serialize};
use axum::http::StatusCode;
use tracing::{info, warn};
use crate::error::{MontagueError, Result};
use crate::interface::{Session, Status};

#[derive(Deserialize)]
pub struct AskRequest {
    pub sentence: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub status: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn status_name(status: Status) -> &'static str {
    match status {
        Status::Okay => "ok",
        Status::NoParse => "no_parse",
        Status::Ambiguous => "ambiguous",
    }
}

pub fn router(session: Arc<Mutex<Session>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::POST])
        .allow_headers(Any);
    Router::new()
        .route("/v1/ask", post(move |Json(req): Json<AskRequest>| {
        let session = Arc::clone(&session);
        async move {
            // the session is synchronous and owns a SQLite connection
            let started = std::time::Instant::now();
            let sentence = req.sentence;
            let reply = tokio::task::spawn_blocking(move || {
                let mut session = session
                    .lock()
                    .map_err(|e| MontagueError::Lock(e.to_string()))?;
                session.execute(&sentence)
            }).await.map_err(|e| {
                warn!(error=%e, "Join error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Join error")
            })?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match reply {
                Ok(reply) => {
                    info!(ms=elapsed_ms, status=status_name(reply.status), rows=reply.rows.len(), "ask complete");
                    let body = AskResponse {
                        status: status_name(reply.status).into(),
                        elapsed_ms,
                        lines: Some(reply.lines),
                        statements: Some(reply.statements),
                        rows: Some(reply.rows),
                        error: None,
                    };
                    Ok::<_, (StatusCode, &'static str)>((StatusCode::OK, Json(body)))
                }
                Err(e) => {
                    let is_client = matches!(e, MontagueError::Parse { .. } | MontagueError::Translation(_));
                    let status = if is_client { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
                    let msg = format!("{e}");
                    warn!(%msg, code=%status.as_u16(), "ask error");
                    let body = AskResponse { status: "error".into(), elapsed_ms, lines: None, statements: None, rows: None, error: Some(msg) };
                    Ok::<_, (StatusCode, &'static str)>((status, Json(body)))
                }
            }
        }
    }))
    .layer(cors)
}

/// Serves the router until the process is stopped.
pub async fn serve(address: &str, session: Session) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(%address, "listening");
    axum::serve(listener, router(Arc::new(Mutex::new(session)))).await?;
    Ok(())
}
