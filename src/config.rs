use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

const DEFAULT_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_PLACES_API_BASE: &str = "https://places.googleapis.com/v1";
const DEFAULT_OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_ADVISOR_MODEL: &str = "mistralai/mistral-7b-instruct:free";
const DEFAULT_SEARCH_RADIUS_M: f64 = 5_000.0;
const DEFAULT_MAX_STATIONS: usize = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google_maps_api_key: Option<SecretString>,
    pub openrouter_api_key: Option<SecretString>,
    pub geocode_endpoint: String,
    pub places_api_base: String,
    pub openrouter_api_base: String,
    pub advisor_model: String,
    pub search_radius_m: f64,
    pub max_stations: usize,
    pub http_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub has_google_maps_key: bool,
    pub has_openrouter_key: bool,
    pub advisor_model: String,
    pub search_radius_m: f64,
    pub max_stations: usize,
    pub poll_interval_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            google_maps_api_key: read_secret("GOOGLE_MAPS_API_KEY"),
            openrouter_api_key: read_secret("OPENROUTER_API_KEY"),
            geocode_endpoint: parse_string("GEOCODE_ENDPOINT", DEFAULT_GEOCODE_ENDPOINT),
            places_api_base: trim_base(parse_string("PLACES_API_BASE", DEFAULT_PLACES_API_BASE)),
            openrouter_api_base: trim_base(parse_string(
                "OPENROUTER_API_BASE",
                DEFAULT_OPENROUTER_API_BASE,
            )),
            advisor_model: parse_string("ADVISOR_MODEL", DEFAULT_ADVISOR_MODEL),
            search_radius_m: parse_f64("SEARCH_RADIUS_M", DEFAULT_SEARCH_RADIUS_M),
            max_stations: parse_usize("MAX_STATIONS", DEFAULT_MAX_STATIONS).max(1),
            http_timeout_secs: parse_u64("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS).max(1),
            poll_interval_ms: parse_u64("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS).max(10),
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            has_google_maps_key: self.google_maps_api_key.is_some(),
            has_openrouter_key: self.openrouter_api_key.is_some(),
            advisor_model: self.advisor_model.clone(),
            search_radius_m: self.search_radius_m,
            max_stations: self.max_stations,
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn read_secret(key: &str) -> Option<SecretString> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

fn parse_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}
