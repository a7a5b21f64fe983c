mod advisor;
mod commands;
mod config;
mod cost;
mod errors;
mod maps;
mod pipeline;
mod session;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use advisor::{build_prompt, AdvicePrompt, Advisor, ChatCompletion};
pub use commands::{ErrorNotice, FuelSwitched, SearchStarted, StartupProfile};
pub use config::{AppConfig, PublicAppConfig};
pub use cost::{breakdown, parse_efficiency, CostBreakdown, CostReport};
pub use errors::{AppError, AppResult, InputError};
pub use maps::{Coordinate, FuelQuote, MapsApi, MapsService, StationCandidate, StationDetails};
pub use pipeline::{FuelKind, ResultPacket, SearchQuery, SearchResults, StationRecord};
pub use session::{SearchPoll, SessionState, StationView, DEFAULT_MAP_CENTER, DEFAULT_MAP_ZOOM};

pub struct AppState {
    config: AppConfig,
    maps: Option<MapsService>,
    advisor: Option<Advisor>,
    session: Mutex<SessionState>,
    results_tx: UnboundedSender<ResultPacket>,
    results_rx: Mutex<UnboundedReceiver<ResultPacket>>,
}

impl AppState {
    pub fn initialize() -> Self {
        init_tracing();
        let config = AppConfig::from_env();
        let maps = MapsService::maybe_new(&config);
        let advisor = Advisor::maybe_new(&config);
        Self::with_services(config, maps, advisor)
    }

    pub fn with_services(
        config: AppConfig,
        maps: Option<MapsService>,
        advisor: Option<Advisor>,
    ) -> Self {
        if maps.is_none() {
            warn!("GOOGLE_MAPS_API_KEY not configured; station search is disabled");
        }
        if advisor.is_none() {
            warn!("OPENROUTER_API_KEY not configured; fuel tips are disabled");
        }
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            config,
            maps,
            advisor,
            session: Mutex::new(SessionState::default()),
            results_tx,
            results_rx: Mutex::new(results_rx),
        }
    }

    pub fn startup_profile(&self) -> StartupProfile {
        StartupProfile {
            config: self.config.public_profile(),
            maps_enabled: self.maps.is_some(),
            advisor_enabled: self.advisor.is_some(),
            fuel: self.session.lock().fuel,
            map_center: DEFAULT_MAP_CENTER,
            map_zoom: DEFAULT_MAP_ZOOM,
        }
    }

    /// Validates the location text and launches one pipeline run. The packet
    /// lands on the handoff channel; `poll_search` drains it.
    pub fn launch_search(&self, location: &str) -> AppResult<SearchStarted> {
        let maps = self.maps.clone().ok_or(AppError::ServiceUnavailable {
            service: "station search",
            reason: "GOOGLE_MAPS_API_KEY is not configured".into(),
        })?;
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(InputError::MissingLocation.into());
        }

        let fuel = {
            let mut session = self.session.lock();
            session.mark_in_flight();
            session.fuel
        };
        pipeline::spawn(
            maps,
            SearchQuery {
                location: trimmed.to_string(),
                fuel,
            },
            self.config.search_radius_m,
            self.config.max_stations,
            self.results_tx.clone(),
        );
        Ok(SearchStarted {
            poll_interval_ms: self.config.poll_interval_ms,
        })
    }

    /// One cooperative, non-blocking check against the handoff channel.
    pub fn poll_search(&self) -> SearchPoll {
        let packet = self.results_rx.lock().try_recv().ok();
        match packet {
            Some(packet) => self.session.lock().apply_packet(packet),
            None => SearchPoll::Pending,
        }
    }

    pub fn select_station(&self, id: u32) -> AppResult<StationView> {
        let mut session = self.session.lock();
        let record = session.select(id)?;
        Ok(StationView::from(record))
    }

    /// Clears cached prices for the old fuel kind and, when a location is
    /// still present, immediately relaunches the search.
    pub fn switch_fuel(&self, fuel: FuelKind, location: &str) -> AppResult<FuelSwitched> {
        self.session.lock().switch_fuel(fuel);
        if location.trim().is_empty() || self.maps.is_none() {
            return Ok(FuelSwitched {
                searching: false,
                poll_interval_ms: self.config.poll_interval_ms,
            });
        }
        self.launch_search(location)?;
        Ok(FuelSwitched {
            searching: true,
            poll_interval_ms: self.config.poll_interval_ms,
        })
    }

    pub fn calculate_cost(&self, area: &str, efficiency: &str) -> AppResult<CostReport> {
        let session = self.session.lock();
        let area = area.trim();
        if area.is_empty() || session.searched_center.is_none() {
            return Err(InputError::NoSearchPerformed.into());
        }
        let station = session
            .selected_station()
            .ok_or(InputError::NoStationSelected)?;
        let efficiency = cost::parse_efficiency(efficiency)?;
        Ok(cost::report(
            &station.name,
            area,
            session.fuel,
            station.price,
            efficiency,
        ))
    }

    pub async fn fuel_tips(&self, efficiency: &str) -> AppResult<String> {
        let advisor = self.advisor.clone().ok_or(AppError::ServiceUnavailable {
            service: "fuel tips",
            reason: "OPENROUTER_API_KEY is not configured".into(),
        })?;
        let fuel = self.session.lock().fuel;
        advisor.fuel_tips(fuel, efficiency).await
    }
}

fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,fueltrack_lib=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            use tauri::Manager;
            app.manage(AppState::initialize());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::startup_profile,
            commands::start_search,
            commands::poll_search,
            commands::select_station,
            commands::set_fuel,
            commands::calculate_cost,
            commands::fuel_tips
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
