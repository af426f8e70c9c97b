use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use pit_core::game::GameState;
use pit_core::types::{STARTING_ASSETS, STARTING_CASH, UserId};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub state: Option<GameState>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub value: u64,
}

/// `POST /api/login` — username/password in headers. First sight of a
/// username creates the account and registers it on every book.
pub async fn login(State(app): State<AppState>, headers: HeaderMap) -> Json<LoginResponse> {
    let (Some(username), Some(password)) = (header(&headers, "username"), header(&headers, "password"))
    else {
        return Json(LoginResponse {
            error: Some("username and password headers required".into()),
            user_id: None,
        });
    };

    match app.registry.login(&username, &password) {
        Ok((user_id, created)) => {
            if created {
                let handles = app.handles.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    for handle in handles.iter() {
                        handle.register(user_id, STARTING_CASH, STARTING_ASSETS);
                    }
                })
                .await;
                if joined.is_err() {
                    return Json(LoginResponse {
                        error: Some("registration failed".into()),
                        user_id: None,
                    });
                }
                tracing::info!(user_id, %username, "new player registered");
            }
            Json(LoginResponse {
                error: None,
                user_id: Some(user_id),
            })
        }
        Err(error) => Json(LoginResponse {
            error: Some(error.to_string()),
            user_id: None,
        }),
    }
}

/// `GET /api/state` — the caller's cash, balances, and resting orders.
/// The user id comes from a `user-id` header.
pub async fn state(State(app): State<AppState>, headers: HeaderMap) -> Json<StateResponse> {
    let Some(user_id) = header(&headers, "user-id").and_then(|v| v.parse::<UserId>().ok()) else {
        return Json(StateResponse {
            error: Some("user-id header not set".into()),
            state: None,
        });
    };

    match app.game.snapshot(user_id) {
        Ok(state) => Json(StateResponse {
            error: None,
            state: Some(state),
        }),
        Err(error) => Json(StateResponse {
            error: Some(error.to_string()),
            state: None,
        }),
    }
}

/// `GET /api/leaderboard` — every named player by portfolio value,
/// highest first.
pub async fn leaderboard(State(app): State<AppState>) -> Json<Vec<LeaderboardEntry>> {
    let entries = app
        .game
        .leaderboard()
        .into_iter()
        .filter_map(|(user_id, value)| {
            app.registry
                .username(user_id)
                .map(|username| LeaderboardEntry { username, value })
        })
        .collect();
    Json(entries)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
