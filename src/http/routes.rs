//! HTTP route definitions

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::game::GameError;
use crate::store::UserStoreError;
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in
    // CLIENT_ORIGIN), or "*" for a fully open API
    let cors = if state.config.client_origin.trim() == "*" {
        CorsLayer::permissive()
    } else {
        let allowed_origins: Vec<header::HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/register", post(register_handler))
        .route("/user/:user_id", get(user_handler))
        .route("/qr/:user_id", get(user_qr_handler))
        .route("/games", post(create_game_handler))
        .route("/games/:game_id/join", post(join_game_handler))
        .route("/games/:game_id/start", post(start_game_handler))
        .route("/kill", post(kill_handler))
        .route("/game/:game_id", get(game_info_handler))
        .route("/game/:game_id/player/:user_id", get(game_info_as_player_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    registered_users: usize,
    active_games: usize,
    players_in_games: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        registered_users: state.users.count(),
        active_games: state.games.active_games(),
        players_in_games: state.games.total_players(),
    })
}

// ============================================================================
// User endpoints
// ============================================================================

#[derive(Deserialize)]
struct RegisterRequest {
    id: String,
    name: String,
    bio: String,
    favourite_location: String,
}

#[derive(Serialize)]
struct RegisterResponse {
    id: String,
    qr_hash: Uuid,
}

async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let user = state
        .users
        .create(req.id, req.name, req.bio, req.favourite_location)?;

    info!(user_id = %user.id, "user registered");

    Ok(Json(RegisterResponse {
        id: user.id,
        qr_hash: user.qr_code,
    }))
}

#[derive(Serialize)]
struct UserResponse {
    id: String,
    name: String,
    bio: String,
    favourite_location: String,
    game_id: Option<String>,
}

async fn user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .get(&user_id)
        .ok_or_else(|| AppError::NotFound("no user with provided id exists".to_string()))?;

    Ok(Json(UserResponse {
        id: user.id,
        name: user.name,
        bio: user.bio,
        favourite_location: user.favourite_location,
        game_id: user.game_id,
    }))
}

#[derive(Serialize)]
struct UserQrResponse {
    id: String,
    qr_hash: Uuid,
}

async fn user_qr_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserQrResponse>, AppError> {
    let user = state
        .users
        .get(&user_id)
        .ok_or_else(|| AppError::NotFound("no user with provided id exists".to_string()))?;

    Ok(Json(UserQrResponse {
        id: user.id,
        qr_hash: user.qr_code,
    }))
}

// ============================================================================
// Game lifecycle endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreateGameRequest {
    name: String,
    location: String,
    end_date: DateTime<Utc>,
    max_players: usize,
}

#[derive(Serialize)]
struct CreateGameResponse {
    id: String,
}

async fn create_game_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, AppError> {
    if req.max_players == 0 {
        return Err(AppError::BadRequest(
            "max_players must be at least 1".to_string(),
        ));
    }

    let id = state
        .games
        .create(req.name, req.location, req.end_date, req.max_players);

    info!(game_id = %id, "game created");

    Ok(Json(CreateGameResponse { id }))
}

#[derive(Deserialize)]
struct JoinGameRequest {
    player_id: String,
}

#[derive(Serialize)]
struct JoinGameResponse {
    success: bool,
}

async fn join_game_handler(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Json(req): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, AppError> {
    let game = state
        .games
        .get(&game_id)
        .ok_or_else(|| AppError::NotFound("no game with provided id exists".to_string()))?;

    let user = state
        .users
        .get(&req.player_id)
        .ok_or_else(|| AppError::NotFound("no user with provided id exists".to_string()))?;

    // Duplicate-join protection lives here, on the identity side: a user is
    // in at most one game at a time.
    if user.game_id.is_some() {
        return Err(AppError::BadRequest(
            "player is already in a game".to_string(),
        ));
    }

    game.write().join(user.id.clone())?;
    state.users.assign_game(&user.id, &game_id);

    info!(game_id = %game_id, player_id = %user.id, "player joined");

    Ok(Json(JoinGameResponse { success: true }))
}

#[derive(Serialize)]
struct StartGameResponse {
    started: bool,
    ended: bool,
    winner: Option<String>,
}

async fn start_game_handler(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<StartGameResponse>, AppError> {
    let game = state
        .games
        .get(&game_id)
        .ok_or_else(|| AppError::NotFound("no game with provided id exists".to_string()))?;

    let mut game = game.write();
    game.start(&mut rand::thread_rng())?;

    info!(game_id = %game_id, players = game.roster().len(), "game started");

    Ok(Json(StartGameResponse {
        started: true,
        ended: game.ended(),
        winner: game.winner().cloned(),
    }))
}

// ============================================================================
// Kill endpoint
// ============================================================================

#[derive(Deserialize)]
struct KillRequest {
    game_id: String,
    killer_id: String,
    victim_qr_hash: Uuid,
}

#[derive(Serialize)]
struct KillResponse {
    success: bool,
    victim_id: String,
    ended: bool,
    winner: Option<String>,
}

async fn kill_handler(
    State(state): State<AppState>,
    Json(req): Json<KillRequest>,
) -> Result<Json<KillResponse>, AppError> {
    let game = state
        .games
        .get(&req.game_id)
        .ok_or_else(|| AppError::NotFound("no game with provided id exists".to_string()))?;

    // One write lock for the whole transition: resolving the victim and
    // applying the elimination must see the same roster.
    let mut game = game.write();

    let victim = state
        .users
        .find_by_qr(game.roster().iter(), &req.victim_qr_hash)
        .ok_or_else(|| {
            AppError::BadRequest("no player in game matches the provided QR code".to_string())
        })?;

    game.eliminate(&req.killer_id, &victim.id)?;

    info!(
        game_id = %req.game_id,
        killer_id = %req.killer_id,
        victim_id = %victim.id,
        "kill recorded"
    );

    if game.ended() {
        info!(game_id = %req.game_id, winner = ?game.winner(), "game over");
    }

    Ok(Json(KillResponse {
        success: true,
        victim_id: victim.id,
        ended: game.ended(),
        winner: game.winner().cloned(),
    }))
}

// ============================================================================
// Game status views
// ============================================================================

#[derive(Serialize)]
struct GameInfoResponse {
    id: String,
    name: String,
    location: String,
    end_date: DateTime<Utc>,
    max_players: usize,
    players: Vec<String>,
    targets: HashMap<String, String>,
    scores: HashMap<String, u32>,
    eliminated: Vec<String>,
    started: bool,
    ended: bool,
    winner: Option<String>,
}

/// Anonymous view: includes the full target ring (used by organizers).
async fn game_info_handler(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameInfoResponse>, AppError> {
    let game = state
        .games
        .get(&game_id)
        .ok_or_else(|| AppError::NotFound("no game with provided id exists".to_string()))?;

    let game = game.read();
    Ok(Json(GameInfoResponse {
        id: game.id().to_string(),
        name: game.name().to_string(),
        location: game.location().to_string(),
        end_date: game.end_date(),
        max_players: game.max_players(),
        players: game.roster().to_vec(),
        targets: game.target_ring().clone(),
        scores: game.scores().clone(),
        eliminated: game.eliminated().to_vec(),
        started: game.started(),
        ended: game.ended(),
        winner: game.winner().cloned(),
    }))
}

#[derive(Serialize)]
struct PlayerGameInfoResponse {
    id: String,
    name: String,
    location: String,
    end_date: DateTime<Utc>,
    max_players: usize,
    players: Vec<String>,
    /// Only the requesting player's own assignment is revealed.
    target: Option<String>,
    scores: HashMap<String, u32>,
    eliminated: Vec<String>,
    started: bool,
    ended: bool,
    winner: Option<String>,
}

/// Player view: the ring stays secret except for the caller's own target.
async fn game_info_as_player_handler(
    State(state): State<AppState>,
    Path((game_id, user_id)): Path<(String, String)>,
) -> Result<Json<PlayerGameInfoResponse>, AppError> {
    let game = state
        .games
        .get(&game_id)
        .ok_or_else(|| AppError::NotFound("no game with provided id exists".to_string()))?;

    let game = game.read();
    if !game.roster().contains(&user_id) {
        return Err(AppError::NotFound(
            "no player with provided id exists in game".to_string(),
        ));
    }

    Ok(Json(PlayerGameInfoResponse {
        id: game.id().to_string(),
        name: game.name().to_string(),
        location: game.location().to_string(),
        end_date: game.end_date(),
        max_players: game.max_players(),
        players: game.roster().to_vec(),
        target: game.target_of(&user_id).cloned(),
        scores: game.scores().clone(),
        eliminated: game.eliminated().to_vec(),
        started: game.started(),
        ended: game.ended(),
        winner: game.winner().cloned(),
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GameError> for AppError {
    // Every game error is a local validation failure, so they all map to 400.
    fn from(err: GameError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<UserStoreError> for AppError {
    fn from(err: UserStoreError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
