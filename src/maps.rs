use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};

/// Latitude/longitude pair in floating-point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Opaque resource identifier returned by the nearby search
/// (e.g. `places/ChIJ...`). Only lives until detail resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationCandidate(pub String);

#[derive(Debug, Clone)]
pub struct FuelQuote {
    pub fuel_type: String,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct StationDetails {
    pub name: String,
    pub location: Coordinate,
    pub quotes: Vec<FuelQuote>,
}

#[async_trait]
pub trait MapsApi: Send + Sync {
    /// Best-match coordinate for a free-text location, `None` on a miss.
    async fn geocode(&self, query: &str) -> AppResult<Option<Coordinate>>;

    /// Fuel stations within `radius_m` of `center`, ranked by distance.
    async fn search_nearby(
        &self,
        center: Coordinate,
        radius_m: f64,
        limit: usize,
    ) -> AppResult<Vec<StationCandidate>>;

    async fn station_details(&self, candidate: &StationCandidate) -> AppResult<StationDetails>;
}

#[derive(Clone)]
pub struct MapsService {
    inner: Arc<dyn MapsApi>,
}

impl MapsService {
    /// `None` when no Google Maps key is configured; the search feature is
    /// disabled rather than failing at call time.
    pub fn maybe_new(config: &AppConfig) -> Option<Self> {
        config.google_maps_api_key.clone().map(|key| Self {
            inner: Arc::new(HttpMapsClient::new(
                key,
                config.geocode_endpoint.clone(),
                config.places_api_base.clone(),
                config.http_timeout_secs,
            )),
        })
    }

    pub fn from_api(api: Arc<dyn MapsApi>) -> Self {
        Self { inner: api }
    }

    pub async fn geocode(&self, query: &str) -> AppResult<Option<Coordinate>> {
        self.inner.geocode(query).await
    }

    pub async fn search_nearby(
        &self,
        center: Coordinate,
        radius_m: f64,
        limit: usize,
    ) -> AppResult<Vec<StationCandidate>> {
        self.inner.search_nearby(center, radius_m, limit).await
    }

    pub async fn station_details(&self, candidate: &StationCandidate) -> AppResult<StationDetails> {
        self.inner.station_details(candidate).await
    }
}

pub struct HttpMapsClient {
    http: reqwest::Client,
    api_key: SecretString,
    geocode_endpoint: String,
    places_api_base: String,
}

impl HttpMapsClient {
    pub fn new(
        api_key: SecretString,
        geocode_endpoint: String,
        places_api_base: String,
        timeout_secs: u64,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("maps http client");
        Self {
            http,
            api_key,
            geocode_endpoint,
            places_api_base,
        }
    }
}

#[async_trait]
impl MapsApi for HttpMapsClient {
    async fn geocode(&self, query: &str) -> AppResult<Option<Coordinate>> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            results: Vec<ResponseResult>,
        }

        #[derive(Deserialize)]
        struct ResponseResult {
            geometry: ResponseGeometry,
        }

        #[derive(Deserialize)]
        struct ResponseGeometry {
            location: ResponseLocation,
        }

        #[derive(Deserialize)]
        struct ResponseLocation {
            lat: f64,
            lng: f64,
        }

        let response = self
            .http
            .get(&self.geocode_endpoint)
            .query(&[("address", query), ("key", self.api_key.expose_secret())])
            .send()
            .await?
            .error_for_status()?;

        let parsed: Response = response.json().await?;
        Ok(parsed.results.into_iter().next().map(|best| Coordinate {
            lat: best.geometry.location.lat,
            lng: best.geometry.location.lng,
        }))
    }

    async fn search_nearby(
        &self,
        center: Coordinate,
        radius_m: f64,
        limit: usize,
    ) -> AppResult<Vec<StationCandidate>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RequestBody<'a> {
            included_types: &'a [&'a str],
            rank_preference: &'a str,
            max_result_count: usize,
            location_restriction: LocationRestriction,
        }

        #[derive(Serialize)]
        struct LocationRestriction {
            circle: Circle,
        }

        #[derive(Serialize)]
        struct Circle {
            center: Center,
            radius: f64,
        }

        #[derive(Serialize)]
        struct Center {
            latitude: f64,
            longitude: f64,
        }

        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            places: Vec<ResponsePlace>,
        }

        #[derive(Deserialize)]
        struct ResponsePlace {
            name: Option<String>,
        }

        let body = RequestBody {
            included_types: &["gas_station"],
            rank_preference: "DISTANCE",
            max_result_count: limit,
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: Center {
                        latitude: center.lat,
                        longitude: center.lng,
                    },
                    radius: radius_m,
                },
            },
        };

        let response = self
            .http
            .post(format!("{}/places:searchNearby", self.places_api_base))
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .header("X-Goog-FieldMask", "places.name")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: Response = response.json().await?;
        Ok(parsed
            .places
            .into_iter()
            .filter_map(|place| place.name)
            .filter(|name| !name.is_empty())
            .map(StationCandidate)
            .collect())
    }

    async fn station_details(&self, candidate: &StationCandidate) -> AppResult<StationDetails> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            display_name: Option<ResponseText>,
            location: Option<ResponseLocation>,
            fuel_options: Option<ResponseFuelOptions>,
        }

        #[derive(Deserialize)]
        struct ResponseText {
            text: Option<String>,
        }

        #[derive(Deserialize)]
        struct ResponseLocation {
            latitude: Option<f64>,
            longitude: Option<f64>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ResponseFuelOptions {
            #[serde(default)]
            fuel_prices: Vec<ResponseFuelPrice>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ResponseFuelPrice {
            #[serde(rename = "type")]
            fuel_type: Option<String>,
            price: Option<ResponseMoney>,
        }

        #[derive(Deserialize)]
        struct ResponseMoney {
            units: Option<MoneyUnits>,
            nanos: Option<i64>,
        }

        // google.type.Money serializes `units` as a string in JSON, but
        // accept a bare number as well.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MoneyUnits {
            Text(String),
            Number(i64),
        }

        impl MoneyUnits {
            fn as_i64(&self) -> Option<i64> {
                match self {
                    MoneyUnits::Text(text) => text.parse().ok(),
                    MoneyUnits::Number(value) => Some(*value),
                }
            }
        }

        let response = self
            .http
            .get(format!("{}/{}", self.places_api_base, candidate.0))
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .header("X-Goog-FieldMask", "displayName,fuelOptions,location")
            .send()
            .await?
            .error_for_status()?;

        let parsed: Response = response.json().await?;

        let name = parsed
            .display_name
            .and_then(|text| text.text)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                AppError::Malformed("place details", format!("missing display name for {}", candidate.0))
            })?;

        let location = parsed
            .location
            .and_then(|loc| match (loc.latitude, loc.longitude) {
                (Some(lat), Some(lng)) => Some(Coordinate { lat, lng }),
                _ => None,
            })
            .ok_or_else(|| {
                AppError::Malformed("place details", format!("missing location for {}", candidate.0))
            })?;

        let quotes = parsed
            .fuel_options
            .map(|options| options.fuel_prices)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let fuel_type = entry.fuel_type?;
                let money = entry.price?;
                let units = money.units.as_ref().and_then(MoneyUnits::as_i64)?;
                let nanos = money.nanos.unwrap_or(0);
                Some(FuelQuote {
                    fuel_type,
                    price: units as f64 + nanos as f64 / 1_000_000_000.0,
                })
            })
            .collect();

        Ok(StationDetails {
            name,
            location,
            quotes,
        })
    }
}
