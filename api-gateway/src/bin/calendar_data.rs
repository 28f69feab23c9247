//! Calendar Data Lambda - Serves the shared CCR calendar record.
//!
//! Endpoints (single route, dispatched on method):
//! - OPTIONS - CORS preflight
//! - GET - Read settings and calendar data (public)
//! - POST - Replace settings and calendar data (requires `x-admin-key`)
//! - PUT - Check the admin password

use anyhow::Context;
use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{empty_response, error_response, json_response, try_parse_json_body, ADMIN_KEY_HEADER};
use shared::models::{CalendarPayload, CalendarRecord, SaveRequest, SaveResponse, VerifyRequest, VerifyResponse, RECORD_ID};
use shared::{parse_body, Config, RecordStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const WRONG_PASSWORD: &str = "비밀번호가 틀렸습니다.";
const SAVED: &str = "저장되었습니다.";
const SERVER_ERROR: &str = "서버 오류가 발생했습니다.";

/// Application state
struct AppState {
    store: Arc<dyn RecordStore>,
    admin_password: String,
}

impl AppState {
    async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env().context("Failed to load configuration")?;

        if config.admin_password_is_default {
            warn!("ADMIN_PASSWORD not set, falling back to the built-in default");
        }

        let store = shared::connect(&config)
            .await
            .context("Failed to connect record store")?;

        Ok(Self {
            store,
            admin_password: config.admin_password,
        })
    }

    /// Plain string equality, not constant-time.
    fn password_matches(&self, candidate: Option<&str>) -> bool {
        candidate == Some(self.admin_password.as_str())
    }
}

/// Log a store failure and hide its detail from the caller.
fn server_error(err: shared::Error) -> Result<Response<Body>, Error> {
    error!(error = ?err, "API Error");
    error_response(500, SERVER_ERROR)
}

async fn read_calendar(state: &AppState) -> Result<Response<Body>, Error> {
    let payload = match state.store.get(RECORD_ID).await {
        Ok(Some(record)) => CalendarPayload::from(record),
        Ok(None) => CalendarPayload::empty(),
        Err(e) => return server_error(e),
    };

    json_response(200, &payload)
}

async fn save_calendar(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    let admin_key = event
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if !state.password_matches(admin_key) {
        warn!("Rejected calendar save: wrong admin key");
        return error_response(401, WRONG_PASSWORD);
    }

    let request: SaveRequest = parse_body!(event.body());
    let record = CalendarRecord::new(request.settings, request.calendar_data);

    if let Err(e) = state.store.upsert(RECORD_ID, &record).await {
        return server_error(e);
    }

    info!(updated_at = %record.updated_at, "Calendar record saved");

    json_response(
        200,
        &SaveResponse {
            success: true,
            message: SAVED.to_string(),
        },
    )
}

fn verify_password(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    let request: VerifyRequest = try_parse_json_body(event.body()).unwrap_or_default();

    if state.password_matches(request.password.as_deref()) {
        return json_response(200, &VerifyResponse { valid: true, error: None });
    }

    warn!("Password verification failed");
    json_response(
        401,
        &VerifyResponse {
            valid: false,
            error: Some(WRONG_PASSWORD.to_string()),
        },
    )
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    info!("Calendar data request: {} {}", event.method(), event.uri().path());

    match *event.method() {
        Method::OPTIONS => empty_response(200),
        Method::GET => read_calendar(&state).await,
        Method::POST => save_calendar(&state, &event).await,
        Method::PUT => verify_password(&state, &event),
        _ => error_response(405, "Method not allowed"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);
    let state_clone = state.clone();

    run(service_fn(move |event| {
        let state = state_clone.clone();
        async move { handler(state, event).await }
    }))
    .await
}
