//! Symptom-checker session registry.
//!
//! Each session owns a spawned external interactive process that reads
//! newline-terminated answers on stdin and writes free-form text on
//! stdout/stderr. The subprocess gives no completion signal, so output
//! is accumulated by background reader tasks and drained after a fixed
//! delay. Sessions are keyed by a uuid token; starting a session with
//! an existing token kills and replaces the old process.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::SymptomCheckerSettings;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Session limit reached (max {0})")]
    AtCapacity(usize),

    #[error("Failed to start symptom checker: {0}")]
    Spawn(std::io::Error),

    #[error("Failed to talk to symptom checker: {0}")]
    Io(#[from] std::io::Error),
}

/// A live subprocess conversation
struct SessionHandle {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    /// Output accumulated by the reader tasks since the last drain
    buffer: Arc<std::sync::Mutex<String>>,
}

impl SessionHandle {
    /// Take everything accumulated so far
    fn drain(&self) -> String {
        std::mem::take(&mut *self.buffer.lock().unwrap())
    }
}

/// Registry of live sessions keyed by session token.
///
/// A session lives until it is explicitly ended or replaced by a
/// start carrying the same token; there is no idle timeout. The
/// registry refuses fresh starts once `max_sessions` processes are
/// live, so an abandoned session occupies a slot until something
/// ends or replaces it.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a subprocess and register it. When `token` names an
    /// existing session, that session's process is killed and replaced
    /// under the same token; otherwise a fresh token is issued, and
    /// the start is refused if `max_sessions` are already live.
    /// Returns the token and whatever the process printed during the
    /// initial delay (its opening prompt).
    pub async fn start(
        &self,
        settings: &SymptomCheckerSettings,
        token: Option<Uuid>,
    ) -> Result<(Uuid, String), SessionError> {
        let mut command = Command::new(&settings.command);
        command
            .args(&settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &settings.dir {
            command.current_dir(dir);
        }

        // The registry lock is held across spawn-and-insert so the
        // session cap cannot be raced past. Replacing an existing
        // token does not count against the cap.
        let (token, handle, replaced) = {
            let mut sessions = self.sessions.lock().await;
            let replacing = token.is_some_and(|t| sessions.contains_key(&t));
            if !replacing && sessions.len() >= settings.max_sessions {
                return Err(SessionError::AtCapacity(settings.max_sessions));
            }

            let mut child = command.spawn().map_err(SessionError::Spawn)?;

            let stdin = child.stdin.take().expect("stdin was piped");
            let stdout = child.stdout.take().expect("stdout was piped");
            let stderr = child.stderr.take().expect("stderr was piped");

            let buffer = Arc::new(std::sync::Mutex::new(String::new()));
            spawn_reader(stdout, Arc::clone(&buffer));
            spawn_reader(stderr, Arc::clone(&buffer));

            let handle = Arc::new(SessionHandle {
                child: Mutex::new(child),
                stdin: Mutex::new(stdin),
                buffer,
            });

            let token = token.unwrap_or_else(Uuid::new_v4);
            let replaced = sessions.insert(token, Arc::clone(&handle));
            (token, handle, replaced)
        };
        if let Some(old) = replaced {
            tracing::info!(session = %token, "Replacing existing symptom-checker session");
            kill_session(old).await;
        }

        // Give the process time to print its opening prompt
        tokio::time::sleep(std::time::Duration::from_millis(settings.answer_delay_ms)).await;
        let prompt = handle.drain();

        tracing::info!(session = %token, "Symptom-checker session started");
        Ok((token, prompt))
    }

    /// Write one answer line and read the output accumulated after the
    /// configured delay.
    pub async fn answer(
        &self,
        settings: &SymptomCheckerSettings,
        token: Uuid,
        answer: &str,
    ) -> Result<String, SessionError> {
        let handle = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(&token)
                .cloned()
                .ok_or(SessionError::NotFound(token))?
        };

        {
            let mut stdin = handle.stdin.lock().await;
            stdin.write_all(answer.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
        }

        tokio::time::sleep(std::time::Duration::from_millis(settings.answer_delay_ms)).await;
        Ok(handle.drain())
    }

    /// Terminate a session and remove it from the registry.
    pub async fn end(&self, token: Uuid) -> bool {
        let removed = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(&token)
        };
        match removed {
            Some(handle) => {
                kill_session(handle).await;
                tracing::info!(session = %token, "Symptom-checker session ended");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

async fn kill_session(handle: Arc<SessionHandle>) {
    let mut child = handle.child.lock().await;
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill symptom-checker process: {}", e);
    }
}

/// Accumulate lines from a subprocess pipe into the shared buffer
fn spawn_reader(
    pipe: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    buffer: Arc<std::sync::Mutex<String>>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut buf = buffer.lock().unwrap();
            buf.push_str(&line);
            buf.push('\n');
        }
    });
}

// ---- HTTP handlers ----

use crate::handlers::{message, ApiError};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

fn session_error(err: SessionError) -> ApiError {
    match err {
        SessionError::NotFound(token) => {
            message(StatusCode::NOT_FOUND, format!("Session not found: {}", token))
        }
        SessionError::AtCapacity(max) => {
            tracing::warn!(max, "Refusing symptom-checker session, registry full");
            message(
                StatusCode::SERVICE_UNAVAILABLE,
                "Too many active symptom-check sessions, try again later",
            )
        }
        SessionError::Spawn(e) => {
            tracing::error!("Failed to spawn symptom checker: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
        SessionError::Io(e) => {
            tracing::error!("Symptom checker I/O error: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Passing an existing token replaces that session's process
    pub session_id: Option<Uuid>,
}

/// POST /start-symptom-check
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartSessionRequest>,
) -> Result<Response, ApiError> {
    let (token, prompt) = state
        .sessions
        .start(&state.config.symptom_checker, body.session_id)
        .await
        .map_err(session_error)?;

    Ok(Json(json!({ "sessionId": token, "output": prompt })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub session_id: Uuid,
    #[serde(default)]
    pub answer: String,
}

/// POST /symptom-check-answer
pub async fn answer_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnswerRequest>,
) -> Result<Response, ApiError> {
    let output = state
        .sessions
        .answer(&state.config.symptom_checker, body.session_id, &body.answer)
        .await
        .map_err(session_error)?;

    Ok(Json(json!({ "output": output })).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    pub session_id: Uuid,
}

/// POST /end-symptom-check
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EndSessionRequest>,
) -> Result<Response, ApiError> {
    if state.sessions.end(body.session_id).await {
        Ok(Json(json!({ "message": "Session ended" })).into_response())
    } else {
        Err(message(
            StatusCode::NOT_FOUND,
            format!("Session not found: {}", body.session_id),
        ))
    }
}
