use std::time::Duration;

use httptest::matchers::{all_of, request};
use httptest::responders::{json_encoded, status_code};
use httptest::{Expectation, Server};
use secrecy::SecretString;
use serde_json::json;

use fueltrack_lib::{AppConfig, AppState, Advisor, MapsService, SearchPoll};

fn test_config(server: &Server) -> AppConfig {
    AppConfig {
        google_maps_api_key: Some(SecretString::from("maps-test-key".to_string())),
        openrouter_api_key: Some(SecretString::from("router-test-key".to_string())),
        geocode_endpoint: server.url_str("/geocode"),
        places_api_base: server.url_str("/places"),
        openrouter_api_base: server.url_str("/ai"),
        advisor_model: "mistralai/mistral-7b-instruct:free".into(),
        search_radius_m: 5000.0,
        max_stations: 10,
        http_timeout_secs: 5,
        poll_interval_ms: 100,
    }
}

fn maps_state(config: AppConfig) -> AppState {
    let maps = MapsService::maybe_new(&config);
    AppState::with_services(config, maps, None)
}

fn advisor_state(config: AppConfig) -> AppState {
    let advisor = Advisor::maybe_new(&config);
    AppState::with_services(config, None, advisor)
}

/// Cooperative polling, test-paced: keep checking the channel until the
/// packet lands, without ever blocking on it.
async fn poll_until_done(state: &AppState) -> SearchPoll {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match state.poll_search() {
                SearchPoll::Pending => tokio::time::sleep(Duration::from_millis(10)).await,
                done => return done,
            }
        }
    })
    .await
    .expect("pipeline delivered no packet")
}

fn geocode_hit(lat: f64, lng: f64) -> serde_json::Value {
    json!({
        "results": [
            { "geometry": { "location": { "lat": lat, "lng": lng } } }
        ],
        "status": "OK"
    })
}

fn priced_details(name: &str, lat: f64, lng: f64, fuel_type: &str, units: &str, nanos: i64) -> serde_json::Value {
    json!({
        "displayName": { "text": name, "languageCode": "en" },
        "location": { "latitude": lat, "longitude": lng },
        "fuelOptions": {
            "fuelPrices": [
                {
                    "type": fuel_type,
                    "price": { "currencyCode": "USD", "units": units, "nanos": nanos }
                }
            ]
        }
    })
}

#[tokio::test]
async fn hartford_search_renders_two_stations_in_distance_order() {
    let server = Server::run();

    server.expect(
        Expectation::matching(all_of!(request::method("GET"), request::path("/geocode")))
            .respond_with(json_encoded(geocode_hit(41.7637, -72.6851))),
    );
    server.expect(
        Expectation::matching(all_of!(
            request::method("POST"),
            request::path("/places/places:searchNearby")
        ))
        .respond_with(json_encoded(json!({
            "places": [
                { "name": "places/shell-hartford" },
                { "name": "places/mobil-hartford" }
            ]
        }))),
    );
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/places/places/shell-hartford")
        ))
        .respond_with(json_encoded(priced_details(
            "Shell", 41.7650, -72.6800, "REGULAR_UNLEADED", "3", 490_000_000,
        ))),
    );
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/places/places/mobil-hartford")
        ))
        .respond_with(json_encoded(priced_details(
            "Mobil", 41.7700, -72.6900, "REGULAR_UNLEADED", "3", 590_000_000,
        ))),
    );

    let state = maps_state(test_config(&server));
    state.launch_search("Hartford").expect("search starts");

    match poll_until_done(&state).await {
        SearchPoll::Stations {
            center,
            zoom,
            stations,
            selected,
        } => {
            assert_eq!(center.lat, 41.7637);
            assert_eq!(zoom, 14);
            assert_eq!(selected, 0);
            let names: Vec<_> = stations.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, ["Shell", "Mobil"]);
            assert_eq!(stations[0].price, 3.49);
            assert_eq!(stations[1].price, 3.59);
            assert_eq!(stations[0].label, "Shell\n$3.49");
        }
        other => panic!("expected stations, got {other:?}"),
    }

    // The default selection feeds straight into the cost calculator.
    let report = state.calculate_cost("Hartford", "25").expect("cost report");
    assert_eq!(report.station, "Shell");
    assert!((report.cost_per_mile - 0.14).abs() < 1e-9);
    assert!((report.cost_per_100_miles - 14.0).abs() < 1e-9);
}

#[tokio::test]
async fn geocode_miss_yields_location_not_found_packet() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of!(request::method("GET"), request::path("/geocode")))
            .respond_with(json_encoded(json!({ "results": [], "status": "ZERO_RESULTS" }))),
    );

    let state = maps_state(test_config(&server));
    state.launch_search("Atlantis").expect("search starts");

    match poll_until_done(&state).await {
        SearchPoll::Failed { kind, message } => {
            assert_eq!(kind, "location_not_found");
            assert_eq!(message, "could not find coordinates for 'Atlantis'");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // Nothing was rendered, so the cost path still reports a missing search.
    let err = state.calculate_cost("Atlantis", "25").unwrap_err();
    assert_eq!(err.kind(), "no_search_performed");
}

#[tokio::test]
async fn candidates_without_matching_prices_produce_an_empty_result() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of!(request::method("GET"), request::path("/geocode")))
            .respond_with(json_encoded(geocode_hit(41.6612, -72.7798))),
    );
    server.expect(
        Expectation::matching(all_of!(
            request::method("POST"),
            request::path("/places/places:searchNearby")
        ))
        .respond_with(json_encoded(json!({
            "places": [{ "name": "places/no-prices" }]
        }))),
    );
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/places/places/no-prices")
        ))
        .respond_with(json_encoded(json!({
            "displayName": { "text": "Carwash Fuel" },
            "location": { "latitude": 41.6612, "longitude": -72.7798 }
        }))),
    );

    let state = maps_state(test_config(&server));
    state.launch_search("New Britain").expect("search starts");

    match poll_until_done(&state).await {
        SearchPoll::NoStations { center, zoom, message } => {
            assert_eq!(center.lat, 41.6612);
            assert_eq!(zoom, 14);
            assert!(message.contains("Gasoline"));
        }
        other => panic!("expected empty result, got {other:?}"),
    }

    // The map recentered, but there is no station to price.
    let err = state.calculate_cost("New Britain", "25").unwrap_err();
    assert_eq!(err.kind(), "no_station_selected");
}

#[tokio::test]
async fn detail_step_failure_aborts_the_run() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of!(request::method("GET"), request::path("/geocode")))
            .respond_with(json_encoded(geocode_hit(41.7637, -72.6851))),
    );
    server.expect(
        Expectation::matching(all_of!(
            request::method("POST"),
            request::path("/places/places:searchNearby")
        ))
        .respond_with(json_encoded(json!({
            "places": [{ "name": "places/broken" }]
        }))),
    );
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/places/places/broken")
        ))
        .respond_with(status_code(500)),
    );

    let state = maps_state(test_config(&server));
    state.launch_search("Hartford").expect("search starts");

    match poll_until_done(&state).await {
        SearchPoll::Failed { kind, .. } => assert_eq!(kind, "transient"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_location_never_reaches_the_network() {
    let server = Server::run();

    let state = maps_state(test_config(&server));
    let err = state.launch_search("   ").unwrap_err();
    assert_eq!(err.kind(), "missing_location");

    // No packet was produced either.
    assert!(matches!(state.poll_search(), SearchPoll::Pending));
}

#[tokio::test]
async fn advisor_round_trip_returns_the_completion() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of!(
            request::method("POST"),
            request::path("/ai/chat/completions")
        ))
        .respond_with(json_encoded(json!({
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": "Keep tires inflated and coast to red lights."
                    }
                }
            ]
        }))),
    );

    let state = advisor_state(test_config(&server));
    let tips = state.fuel_tips("25").await.expect("tips");
    assert_eq!(tips, "Keep tires inflated and coast to red lights.");
}

#[tokio::test]
async fn advisor_mid_call_failure_surfaces_as_transient() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of!(
            request::method("POST"),
            request::path("/ai/chat/completions")
        ))
        .respond_with(status_code(500)),
    );

    let state = advisor_state(test_config(&server));
    let err = state.fuel_tips("25").await.unwrap_err();
    assert_eq!(err.kind(), "transient");
}

#[tokio::test]
async fn advisor_requires_efficiency_before_calling_out() {
    let server = Server::run();

    let state = advisor_state(test_config(&server));
    let err = state.fuel_tips("   ").await.unwrap_err();
    assert_eq!(err.kind(), "missing_efficiency");
}
