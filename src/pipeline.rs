use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::maps::{Coordinate, MapsService};

/// Fuel type filter applied to both the search and price matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelKind {
    Gasoline,
    Diesel,
}

impl FuelKind {
    /// Price tag the places provider uses for this fuel type.
    pub fn provider_tag(self) -> &'static str {
        match self {
            FuelKind::Gasoline => "REGULAR_UNLEADED",
            FuelKind::Diesel => "DIESEL",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FuelKind::Gasoline => "Gasoline",
            FuelKind::Diesel => "Diesel",
        }
    }
}

/// One user-initiated search; immutable once dispatched.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub location: String,
    pub fuel: FuelKind,
}

/// A resolved station with a price for the requested fuel kind. `id` is a
/// synthetic per-packet key (assembly index) so duplicate display names
/// cannot collide in selection or marker correlation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    pub id: u32,
    pub name: String,
    pub location: Coordinate,
    pub price: f64,
}

#[derive(Debug)]
pub struct SearchResults {
    pub center: Coordinate,
    pub stations: Vec<StationRecord>,
}

/// The single unit of data produced per pipeline run. Delivered over the
/// handoff channel and consumed exactly once by the UI controller.
#[derive(Debug)]
pub enum ResultPacket {
    Completed(SearchResults),
    Failed(AppError),
}

/// Runs the full geocode -> nearby search -> detail resolution pipeline.
///
/// An empty station list is a valid outcome; only a geocode miss or an
/// unexpected request failure is an error. Partial results are never
/// returned: the first failure aborts the run.
pub async fn execute(
    maps: &MapsService,
    query: &SearchQuery,
    radius_m: f64,
    cap: usize,
) -> AppResult<SearchResults> {
    let center = maps
        .geocode(&query.location)
        .await?
        .ok_or_else(|| AppError::LocationNotFound(query.location.clone()))?;

    let candidates = maps.search_nearby(center, radius_m, cap).await?;
    debug!(
        location = %query.location,
        fuel = query.fuel.label(),
        candidates = candidates.len(),
        "nearby search resolved"
    );

    let mut stations = Vec::new();
    for candidate in candidates.into_iter().take(cap) {
        let details = maps.station_details(&candidate).await?;
        let Some(quote) = details
            .quotes
            .iter()
            .find(|quote| quote.fuel_type == query.fuel.provider_tag())
        else {
            // No price for the requested fuel kind: drop silently.
            debug!(station = %details.name, "no matching fuel price; skipping");
            continue;
        };
        stations.push(StationRecord {
            id: stations.len() as u32,
            name: details.name,
            location: details.location,
            price: round_price(quote.price),
        });
    }

    Ok(SearchResults { center, stations })
}

/// Launches the pipeline on a worker task. Exactly one packet is sent per
/// invocation; the task touches no UI state.
pub fn spawn(
    maps: MapsService,
    query: SearchQuery,
    radius_m: f64,
    cap: usize,
    tx: UnboundedSender<ResultPacket>,
) {
    tokio::spawn(async move {
        let packet = match execute(&maps, &query, radius_m, cap).await {
            Ok(results) => ResultPacket::Completed(results),
            Err(err) => {
                warn!(?err, location = %query.location, "search pipeline failed");
                ResultPacket::Failed(err)
            }
        };
        if tx.send(packet).is_err() {
            warn!("result channel closed before packet delivery");
        }
    });
}

fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
