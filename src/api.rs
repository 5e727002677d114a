//! API module
//!
//! Defines the REST control surface for the battle server: health and server
//! info, battle lifecycle (start/stop/status/active), and the mutation
//! operations (reinforcements, position updates, retarget).
//!
//! Control and data stay mechanically separated from the event stream: large
//! unit payloads arrive here, while per-tick deltas leave through the
//! websocket broadcast, so a giant start request cannot starve health checks
//! or the tick loop.

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State, get, post, routes};
use serde::{Deserialize, Serialize};

use crate::battle::manager::SharedBattleManager;
use crate::battle::{BattleStatus, BattleSummary};
use crate::error::BattleError;
use crate::models::{PositionUpdate, SystemId, UnitId, UnitRecord};
use crate::websocket;

// ==================== Request/Response Types ====================

/// Request to start a new battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartBattleRequest {
    pub battle_id: String,
    pub system_id: SystemId,
    pub units: Vec<UnitRecord>,
    /// Pins the weapon-stagger RNG for reproducible battles.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Response for battle start
#[derive(Debug, Serialize, Deserialize)]
pub struct StartBattleResponse {
    pub success: bool,
    pub battle_id: String,
}

/// Request to reinforce an existing battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinforcementsRequest {
    pub units: Vec<UnitRecord>,
}

/// Response for reinforcements
#[derive(Debug, Serialize, Deserialize)]
pub struct ReinforcementsResponse {
    pub success: bool,
    pub added: usize,
}

/// Request to overwrite unit positions in bulk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePositionsRequest {
    pub positions: Vec<PositionUpdate>,
}

/// Response for bulk position updates
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePositionsResponse {
    pub success: bool,
    pub updated_count: usize,
}

/// Request to overwrite a single unit position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePositionRequest {
    pub id: UnitId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub clear_target: bool,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error body returned alongside a non-2xx status
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_battles: usize,
    pub uptime_ms: u64,
}

type ApiError = (Status, Json<ErrorResponse>);

fn error_response(error: BattleError) -> ApiError {
    let status = match &error {
        BattleError::InvalidPayload(_) => Status::BadRequest,
        BattleError::BattleNotFound(_) => Status::NotFound,
        BattleError::BattleEnded(_) => Status::Conflict,
        BattleError::StepFailure(_) => Status::InternalServerError,
    };
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
        }),
    )
}

// ==================== API Endpoints ====================

/// GET /health - liveness plus a battle count
#[get("/health")]
pub fn health(manager: &State<SharedBattleManager>) -> Json<HealthResponse> {
    let manager = manager.read().unwrap();
    Json(HealthResponse {
        status: "ok".to_string(),
        active_battles: manager.live_battle_count(),
        uptime_ms: manager.uptime_ms(),
    })
}

/// GET /info - server metadata
#[get("/info")]
pub fn server_info(manager: &State<SharedBattleManager>) -> Json<serde_json::Value> {
    let manager = manager.read().unwrap();
    Json(serde_json::json!({
        "server": "BROADSIDE",
        "version": env!("CARGO_PKG_VERSION"),
        "tick_interval_ms": manager.settings().tick_interval_ms,
        "battle_count": manager.battle_count(),
    }))
}

/// POST /battle/start - register a new battle
#[post("/battle/start", data = "<request>")]
pub fn start_battle(
    request: Json<StartBattleRequest>,
    manager: &State<SharedBattleManager>,
) -> Result<Json<StartBattleResponse>, ApiError> {
    let request = request.into_inner();
    let battle_id = request.battle_id.clone();

    let mut manager = manager.write().unwrap();
    manager
        .start_battle(request.battle_id, request.system_id, request.units, request.seed)
        .map_err(error_response)?;

    Ok(Json(StartBattleResponse {
        success: true,
        battle_id,
    }))
}

/// POST /battle/stop/<id> - stop a battle
#[post("/battle/stop/<id>")]
pub fn stop_battle(
    id: &str,
    manager: &State<SharedBattleManager>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut manager = manager.write().unwrap();
    manager.stop_battle(id).map_err(error_response)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /battle/status/<id> - status and, once ended, final results
#[get("/battle/status/<id>")]
pub fn battle_status(
    id: &str,
    manager: &State<SharedBattleManager>,
) -> Result<Json<BattleStatus>, ApiError> {
    let manager = manager.read().unwrap();
    manager
        .status(id)
        .map(Json)
        .ok_or_else(|| error_response(BattleError::BattleNotFound(id.to_string())))
}

/// GET /battles/active - summaries of all running battles
#[get("/battles/active")]
pub fn active_battles(manager: &State<SharedBattleManager>) -> Json<Vec<BattleSummary>> {
    let manager = manager.read().unwrap();
    Json(manager.active_battles())
}

/// POST /battle/reinforcements/<id> - add units to a running battle
#[post("/battle/reinforcements/<id>", data = "<request>")]
pub fn reinforcements(
    id: &str,
    request: Json<ReinforcementsRequest>,
    manager: &State<SharedBattleManager>,
) -> Result<Json<ReinforcementsResponse>, ApiError> {
    let mut manager = manager.write().unwrap();
    let added = manager
        .reinforce(id, request.into_inner().units)
        .map_err(error_response)?;
    Ok(Json(ReinforcementsResponse {
        success: true,
        added,
    }))
}

/// POST /battle/positions/<id> - bulk position overwrite
#[post("/battle/positions/<id>", data = "<request>")]
pub fn update_positions(
    id: &str,
    request: Json<UpdatePositionsRequest>,
    manager: &State<SharedBattleManager>,
) -> Result<Json<UpdatePositionsResponse>, ApiError> {
    let mut manager = manager.write().unwrap();
    let updated_count = manager
        .update_positions(id, &request.into_inner().positions)
        .map_err(error_response)?;
    Ok(Json(UpdatePositionsResponse {
        success: true,
        updated_count,
    }))
}

/// POST /battle/position/<id> - single position overwrite
#[post("/battle/position/<id>", data = "<request>")]
pub fn update_position(
    id: &str,
    request: Json<UpdatePositionRequest>,
    manager: &State<SharedBattleManager>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request = request.into_inner();
    let mut manager = manager.write().unwrap();
    manager
        .update_single_position(id, request.id, request.x, request.y, request.z, request.clear_target)
        .map_err(error_response)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /battle/retarget/<id> - drop all targets and reacquire
#[post("/battle/retarget/<id>")]
pub fn force_retarget(
    id: &str,
    manager: &State<SharedBattleManager>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut manager = manager.write().unwrap();
    manager.force_retarget(id).map_err(error_response)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Returns all REST API routes
pub fn routes() -> Vec<Route> {
    let mut api_routes = routes![
        health,
        server_info,
        start_battle,
        stop_battle,
        battle_status,
        active_battles,
        reinforcements,
        update_positions,
        update_position,
        force_retarget,
    ];
    api_routes.extend(websocket_routes());
    api_routes
}

/// Returns WebSocket routes
pub fn websocket_routes() -> Vec<Route> {
    routes![websocket::ws_handler, websocket::ws_info]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::manager::BattleManager;
    use crate::config::SimulationSettings;
    use crate::models::WeaponRecord;
    use crate::websocket::WebSocketManager;
    use rocket::local::blocking::Client;
    use serde_json::json;
    use std::sync::Arc;

    fn test_client() -> Client {
        let manager = BattleManager::new_shared(SimulationSettings::default());
        let ws_manager = Arc::new(WebSocketManager::new());
        let rocket = rocket::build()
            .manage(manager)
            .manage(ws_manager)
            .mount("/", routes());
        Client::tracked(rocket).expect("valid rocket instance")
    }

    fn unit_json(id: u64, faction_id: u32, x: f64) -> serde_json::Value {
        json!({
            "id": id,
            "faction_id": faction_id,
            "unit_type": "frigate",
            "max_hp": 100.0,
            "hp": 100.0,
            "pos_x": x,
            "max_speed": 10.0,
            "weapons": [{
                "tag": "laser",
                "dps": 10.0,
                "fire_rate": 1.0,
                "max_range": 100.0,
                "optimal_range": 50.0,
                "target_armor_max": 0.0
            }]
        })
    }

    #[test]
    fn health_reports_ok() {
        let client = test_client();
        let response = client.get("/health").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let health: HealthResponse = response.into_json().unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_battles, 0);
    }

    #[test]
    fn start_status_stop_flow() {
        let client = test_client();

        let response = client
            .post("/battle/start")
            .json(&json!({
                "battle_id": "b-1",
                "system_id": 42,
                "units": [unit_json(1, 1, 0.0), unit_json(2, 2, 10.0)],
                "seed": 7
            }))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: StartBattleResponse = response.into_json().unwrap();
        assert!(body.success);
        assert_eq!(body.battle_id, "b-1");

        let response = client.get("/battle/status/b-1").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let status: BattleStatus = response.into_json().unwrap();
        assert!(status.found);
        assert_eq!(status.unit_count, 2);
        assert!(!status.ended);

        let response = client.get("/battles/active").dispatch();
        let active: Vec<BattleSummary> = response.into_json().unwrap();
        assert_eq!(active.len(), 1);

        let response = client.post("/battle/stop/b-1").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/battle/status/b-1").dispatch();
        let status: BattleStatus = response.into_json().unwrap();
        assert!(status.ended);
        assert!(status.results.is_some());
    }

    #[test]
    fn status_of_unknown_battle_is_404() {
        let client = test_client();
        let response = client.get("/battle/status/ghost").dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn stop_of_unknown_battle_is_404() {
        let client = test_client();
        let response = client.post("/battle/stop/ghost").dispatch();
        assert_eq!(response.status(), Status::NotFound);
        let body: ErrorResponse = response.into_json().unwrap();
        assert!(!body.success);
        assert!(body.error.contains("ghost"));
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let client = test_client();
        let start = json!({
            "battle_id": "b-1",
            "system_id": 42,
            "units": [unit_json(1, 1, 0.0)]
        });
        assert_eq!(
            client.post("/battle/start").json(&start).dispatch().status(),
            Status::Ok
        );
        assert_eq!(
            client.post("/battle/start").json(&start).dispatch().status(),
            Status::BadRequest
        );
    }

    #[test]
    fn reinforcements_flow() {
        let client = test_client();
        client
            .post("/battle/start")
            .json(&json!({
                "battle_id": "b-1",
                "system_id": 42,
                "units": [unit_json(1, 1, 0.0), unit_json(2, 2, 10.0)]
            }))
            .dispatch();

        let response = client
            .post("/battle/reinforcements/b-1")
            .json(&json!({ "units": [unit_json(3, 1, 20.0)] }))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: ReinforcementsResponse = response.into_json().unwrap();
        assert_eq!(body.added, 1);

        let status: BattleStatus = client
            .get("/battle/status/b-1")
            .dispatch()
            .into_json()
            .unwrap();
        assert_eq!(status.unit_count, 3);
    }

    #[test]
    fn reinforcing_ended_battle_conflicts() {
        let client = test_client();
        client
            .post("/battle/start")
            .json(&json!({
                "battle_id": "b-1",
                "system_id": 42,
                "units": [unit_json(1, 1, 0.0)]
            }))
            .dispatch();
        client.post("/battle/stop/b-1").dispatch();

        let response = client
            .post("/battle/reinforcements/b-1")
            .json(&json!({ "units": [unit_json(3, 1, 20.0)] }))
            .dispatch();
        assert_eq!(response.status(), Status::Conflict);
    }

    #[test]
    fn position_updates_flow() {
        let client = test_client();
        client
            .post("/battle/start")
            .json(&json!({
                "battle_id": "b-1",
                "system_id": 42,
                "units": [unit_json(1, 1, 0.0), unit_json(2, 2, 10.0)]
            }))
            .dispatch();

        let response = client
            .post("/battle/positions/b-1")
            .json(&json!({
                "positions": [
                    {"id": 1, "x": 5.0, "y": 0.0, "z": 0.0},
                    {"id": 99, "x": 0.0, "y": 0.0, "z": 0.0}
                ]
            }))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: UpdatePositionsResponse = response.into_json().unwrap();
        assert_eq!(body.updated_count, 1);

        let response = client
            .post("/battle/position/b-1")
            .json(&json!({"id": 2, "x": 50.0, "y": 0.0, "z": 0.0, "clear_target": true}))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let response = client.post("/battle/retarget/b-1").dispatch();
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn malformed_start_payload_is_rejected() {
        let client = test_client();
        let response = client
            .post("/battle/start")
            .json(&json!({ "system_id": 42 }))
            .dispatch();
        assert_ne!(response.status(), Status::Ok);
    }
}
