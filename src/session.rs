use serde::Serialize;
use tracing::debug;

use crate::errors::InputError;
use crate::maps::Coordinate;
use crate::pipeline::{FuelKind, ResultPacket, StationRecord};

/// Fallback map position shown before any search (Hartford area).
pub const DEFAULT_MAP_CENTER: Coordinate = Coordinate {
    lat: 41.6612,
    lng: -72.7798,
};
pub const DEFAULT_MAP_ZOOM: u32 = 12;
/// Zoom applied when recentering on a search result.
pub const RESULT_MAP_ZOOM: u32 = 14;

/// Everything the UI controller owns. Mutated only inside command handlers,
/// never by worker tasks.
#[derive(Debug)]
pub struct SessionState {
    pub fuel: FuelKind,
    pub stations: Vec<StationRecord>,
    pub selected: Option<u32>,
    pub searched_center: Option<Coordinate>,
    pub in_flight: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            fuel: FuelKind::Gasoline,
            stations: Vec::new(),
            selected: None,
            searched_center: None,
            in_flight: false,
        }
    }
}

/// One station as rendered by the webview: selector entry + map marker.
#[derive(Debug, Clone, Serialize)]
pub struct StationView {
    pub id: u32,
    pub name: String,
    pub location: Coordinate,
    pub price: f64,
    pub label: String,
}

impl From<&StationRecord> for StationView {
    fn from(record: &StationRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            location: record.location,
            price: record.price,
            label: format!("{}\n${:.2}", record.name, record.price),
        }
    }
}

/// Outcome of one cooperative poll against the handoff channel.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchPoll {
    /// Channel empty; the webview reschedules another check.
    Pending,
    Failed {
        kind: String,
        message: String,
    },
    /// Valid empty result: recenter the map, clear markers, keep the
    /// selector disabled.
    NoStations {
        center: Coordinate,
        zoom: u32,
        message: String,
    },
    Stations {
        center: Coordinate,
        zoom: u32,
        stations: Vec<StationView>,
        selected: u32,
    },
}

impl SessionState {
    pub fn mark_in_flight(&mut self) {
        self.in_flight = true;
    }

    /// Consumes one packet from the handoff channel and produces the render
    /// instruction for the webview. Controls disabled during flight are
    /// restored on every branch.
    pub fn apply_packet(&mut self, packet: ResultPacket) -> SearchPoll {
        self.in_flight = false;
        match packet {
            ResultPacket::Failed(err) => {
                // Prior stations stay untouched; only the selection is gone.
                self.selected = None;
                SearchPoll::Failed {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }
            }
            ResultPacket::Completed(results) if results.stations.is_empty() => {
                self.stations.clear();
                self.selected = None;
                self.searched_center = Some(results.center);
                SearchPoll::NoStations {
                    center: results.center,
                    zoom: RESULT_MAP_ZOOM,
                    message: format!(
                        "No stations found with {} prices in this area.",
                        self.fuel.label()
                    ),
                }
            }
            ResultPacket::Completed(results) => {
                debug!(stations = results.stations.len(), "rendering search results");
                let views = results.stations.iter().map(StationView::from).collect();
                let first = results.stations[0].id;
                self.stations = results.stations;
                self.selected = Some(first);
                self.searched_center = Some(results.center);
                SearchPoll::Stations {
                    center: results.center,
                    zoom: RESULT_MAP_ZOOM,
                    stations: views,
                    selected: first,
                }
            }
        }
    }

    pub fn select(&mut self, id: u32) -> Result<&StationRecord, InputError> {
        let record = self
            .stations
            .iter()
            .find(|station| station.id == id)
            .ok_or(InputError::NoStationSelected)?;
        self.selected = Some(id);
        Ok(record)
    }

    pub fn selected_station(&self) -> Option<&StationRecord> {
        let id = self.selected?;
        self.stations.iter().find(|station| station.id == id)
    }

    /// Fuel switches always invalidate cached prices and the selection.
    pub fn switch_fuel(&mut self, fuel: FuelKind) {
        self.fuel = fuel;
        self.stations.clear();
        self.selected = None;
    }
}
