pub mod config;
pub mod consultation;
pub mod intelligence;
pub mod models;
pub mod pipeline;
pub mod session_store;

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::ConsultationConfig;
use consultation::Orchestrator;
use session_store::{SessionReaper, SessionStore};

/// Interactive driver: one patient line per turn on stdin, one JSON
/// `TurnResult` per turn on stdout.
///
/// `:record` prints the current session's medical record, `:new` starts a
/// fresh session, `:quit` exits.
pub fn run() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = match ConsultationConfig::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(SessionStore::new(settings.session_timeout));
    let _reaper = settings
        .reaper_interval
        .map(|interval| SessionReaper::start(Arc::clone(&store), interval));
    let orchestrator = Orchestrator::with_services(store, Default::default(), settings);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    let mut session_id: Option<String> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                return ExitCode::FAILURE;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let output = match input {
            ":quit" => break,
            ":new" => {
                session_id = None;
                continue;
            }
            ":record" => record_json(&orchestrator, session_id.as_deref()),
            text => match orchestrator.handle_turn(session_id.as_deref(), text) {
                Ok(result) => {
                    session_id = Some(result.session_id.clone());
                    to_json(&result)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Turn failed");
                    error_json(&e.to_string())
                }
            },
        };

        if writeln!(stdout, "{output}").is_err() {
            return ExitCode::FAILURE;
        }

        if let Some(id) = session_id.as_deref() {
            if conversation_cap_reached(&orchestrator, id) {
                tracing::info!(session_id = %id, "Conversation length cap reached; closing session");
                if let Err(e) = orchestrator.store().remove(id) {
                    tracing::warn!(error = %e, "Failed to drop capped session");
                }
                session_id = None;
            }
        }
    }

    tracing::info!("{} shutting down", config::APP_NAME);
    ExitCode::SUCCESS
}

fn conversation_cap_reached(orchestrator: &Orchestrator, session_id: &str) -> bool {
    let cap = orchestrator.config().max_conversation_length;
    orchestrator
        .store()
        .get(session_id)
        .is_ok_and(|session| session.conversation.len() > cap)
}

fn record_json(orchestrator: &Orchestrator, session_id: Option<&str>) -> String {
    let Some(id) = session_id else {
        return error_json("no active session");
    };
    match orchestrator.fetch_record(id) {
        Ok(record) => to_json(&record),
        Err(e) => error_json(&e.to_string()),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&e.to_string()))
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
