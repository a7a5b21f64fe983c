use serde::Serialize;

use crate::config::PublicAppConfig;
use crate::cost::CostReport;
use crate::errors::AppError;
use crate::maps::Coordinate;
use crate::pipeline::FuelKind;
use crate::session::{SearchPoll, StationView};
use crate::AppState;

/// Error payload the webview branches on by `kind`, never by message text.
#[derive(Debug, Serialize)]
pub struct ErrorNotice {
    pub kind: String,
    pub message: String,
}

impl From<AppError> for ErrorNotice {
    fn from(err: AppError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

type CommandResult<T> = Result<T, ErrorNotice>;

#[derive(Debug, Serialize)]
pub struct StartupProfile {
    pub config: PublicAppConfig,
    pub maps_enabled: bool,
    pub advisor_enabled: bool,
    pub fuel: FuelKind,
    pub map_center: Coordinate,
    pub map_zoom: u32,
}

#[derive(Debug, Serialize)]
pub struct SearchStarted {
    pub poll_interval_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct FuelSwitched {
    pub searching: bool,
    pub poll_interval_ms: u64,
}

#[tauri::command]
pub async fn startup_profile(
    state: tauri::State<'_, AppState>,
) -> CommandResult<StartupProfile> {
    Ok(state.startup_profile())
}

#[tauri::command]
pub async fn start_search(
    location: String,
    state: tauri::State<'_, AppState>,
) -> CommandResult<SearchStarted> {
    state.launch_search(&location).map_err(ErrorNotice::from)
}

#[tauri::command]
pub async fn poll_search(state: tauri::State<'_, AppState>) -> CommandResult<SearchPoll> {
    Ok(state.poll_search())
}

#[tauri::command]
pub async fn select_station(
    id: u32,
    state: tauri::State<'_, AppState>,
) -> CommandResult<StationView> {
    state.select_station(id).map_err(ErrorNotice::from)
}

#[tauri::command]
pub async fn set_fuel(
    fuel: FuelKind,
    location: String,
    state: tauri::State<'_, AppState>,
) -> CommandResult<FuelSwitched> {
    state.switch_fuel(fuel, &location).map_err(ErrorNotice::from)
}

#[tauri::command]
pub async fn calculate_cost(
    area: String,
    efficiency: String,
    state: tauri::State<'_, AppState>,
) -> CommandResult<CostReport> {
    state
        .calculate_cost(&area, &efficiency)
        .map_err(ErrorNotice::from)
}

#[tauri::command]
pub async fn fuel_tips(
    efficiency: String,
    state: tauri::State<'_, AppState>,
) -> CommandResult<String> {
    state.fuel_tips(&efficiency).await.map_err(ErrorNotice::from)
}
