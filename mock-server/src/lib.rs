use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const TIME_COOKIE: &str = "gromit-time";
pub const BACKGROUND_HEADER: &str = "x-gromit-background";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub username: String,
    pub password: String,
    pub session_ttl_ms: i64,
    /// Added to the time reported in the time cookie.
    pub clock_offset_ms: i64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "secret".to_string(),
            session_ttl_ms: 30 * 60 * 1000,
            clock_offset_ms: 0,
        }
    }
}

/// Shared server state. Clones share the same stores.
#[derive(Clone)]
pub struct AppState {
    config: Arc<MockConfig>,
    /// Items in creation order.
    items: Arc<RwLock<Vec<Item>>>,
    /// token -> expiry in epoch milliseconds
    sessions: Arc<RwLock<HashMap<String, i64>>>,
}

impl AppState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config: Arc::new(config),
            items: Arc::default(),
            sessions: Arc::default(),
        }
    }

    pub async fn session_expiry(&self, token: &str) -> Option<i64> {
        self.sessions.read().await.get(token).copied()
    }

    /// Drop every issued token; clients holding one get `Expired` next.
    pub async fn expire_sessions(&self) {
        let mut sessions = self.sessions.write().await;
        info!(count = sessions.len(), "expiring all sessions");
        sessions.clear();
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn server_time(&self) -> i64 {
        now_millis() + self.config.clock_offset_ms
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).put(update_item).delete(delete_item))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/login", post(login))
        .route("/sessions/expire", post(expire_sessions))
        .route("/status/{code}", get(status))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), stamp_server_time))
        .with_state(state)
}

pub fn app() -> Router {
    router(AppState::new(MockConfig::default()))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, AppState::new(MockConfig::default())).await
}

pub async fn run_with(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Error body in the fault envelope format the client understands.
pub fn fault(status: StatusCode, code: &str, subcode: &str, reason: &str) -> Response {
    let body = json!({
        "Fault": {
            "Code": {"Value": code, "Subcode": {"Value": subcode}},
            "Reason": {"Text": reason}
        }
    });
    (status, Json(body)).into_response()
}

async fn stamp_server_time(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let cookie = format!("{TIME_COOKIE}={}; Path=/", state.server_time());
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let Some(token) = token else {
        debug!("request without credentials");
        return fault(
            StatusCode::UNAUTHORIZED,
            "Sender",
            "NoCredentials",
            "No credentials were supplied",
        );
    };

    let background = request.headers().contains_key(BACKGROUND_HEADER);
    let now = now_millis();
    {
        let mut sessions = state.sessions.write().await;
        let live = matches!(sessions.get(&token), Some(expiry) if *expiry > now);
        if !live {
            if sessions.remove(&token).is_some() {
                debug!("pruned expired token");
            }
            return fault(
                StatusCode::UNAUTHORIZED,
                "Sender",
                "Expired",
                "The session has expired",
            );
        }
        if !background {
            sessions.insert(token, now + state.config.session_ttl_ms);
        }
    }
    next.run(request).await
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginRequest>) -> Response {
    if input.username != state.config.username || input.password != state.config.password {
        return fault(
            StatusCode::UNAUTHORIZED,
            "Sender",
            "InvalidCredentials",
            "The user name or password is incorrect",
        );
    }
    let token = Uuid::new_v4().simple().to_string();
    state
        .sessions
        .write()
        .await
        .insert(token.clone(), now_millis() + state.config.session_ttl_ms);
    info!(user = %input.username, "issued token");
    Json(LoginResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.session_ttl_ms / 1000,
    })
    .into_response()
}

async fn expire_sessions(State(state): State<AppState>) -> StatusCode {
    state.expire_sessions().await;
    StatusCode::NO_CONTENT
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status code").into_response(),
    }
}

fn invalid_title() -> Response {
    fault(
        StatusCode::BAD_REQUEST,
        "Sender",
        "InvalidInput",
        "The title must not be empty",
    )
}

/// Unknown items answer with a bare 404 and no fault envelope.
fn missing() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

async fn list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.items.read().await.clone())
}

async fn create_item(State(state): State<AppState>, Json(input): Json<CreateItem>) -> Response {
    if input.title.trim().is_empty() {
        return invalid_title();
    }
    let item = Item {
        id: Uuid::new_v4(),
        title: input.title,
        completed: input.completed,
    };
    state.items.write().await.push(item.clone());
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn get_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let items = state.items.read().await;
    match items.iter().find(|item| item.id == id) {
        Some(item) => Json(item.clone()).into_response(),
        None => missing(),
    }
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItem>,
) -> Response {
    if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return invalid_title();
    }
    let mut items = state.items.write().await;
    let Some(item) = items.iter_mut().find(|item| item.id == id) else {
        return missing();
    };
    item.title = input.title.unwrap_or_else(|| item.title.clone());
    item.completed = input.completed.unwrap_or(item.completed);
    Json(item.clone()).into_response()
}

async fn delete_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let mut items = state.items.write().await;
    let before = items.len();
    items.retain(|item| item.id != id);
    if items.len() == before {
        missing()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            id: Uuid::nil(),
            title: "Test".to_string(),
            completed: false,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["title"], "Test");
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn create_item_defaults_completed_to_false() {
        let input: CreateItem = serde_json::from_str(r#"{"title":"No completed field"}"#).unwrap();
        assert_eq!(input.title, "No completed field");
        assert!(!input.completed);
    }

    #[test]
    fn create_item_rejects_missing_title() {
        let result: Result<CreateItem, _> = serde_json::from_str(r#"{"completed":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_item_all_fields_optional() {
        let input: UpdateItem = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.title.is_none());
        assert!(input.completed.is_none());
    }

    #[test]
    fn default_config_matches_documented_credentials() {
        let config = MockConfig::default();
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "secret");
        assert_eq!(config.clock_offset_ms, 0);
    }

    #[tokio::test]
    async fn expire_sessions_drops_every_token() {
        let state = AppState::new(MockConfig::default());
        {
            let mut sessions = state.sessions.write().await;
            sessions.insert("a".to_string(), now_millis() + 60_000);
            sessions.insert("b".to_string(), now_millis() + 60_000);
        }
        state.expire_sessions().await;
        assert_eq!(state.session_count().await, 0);
        assert!(state.session_expiry("a").await.is_none());
    }
}
