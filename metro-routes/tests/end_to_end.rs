//! Drives the engine against a local fare form and serves it over HTTP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use tempfile::tempdir;

use metro_routes::config::EngineConfig;
use metro_routes::domain::{Station, Waypoint};
use metro_routes::engine::RouteEngine;
use metro_routes::fares::MockFareSource;
use metro_routes::fares::mock::{landing_page_html, route_page_html, simple_route_html};
use metro_routes::orchestrator::FetchOrchestrator;
use metro_routes::snapshot;
use metro_routes::stations::StationCatalog;
use metro_routes::web::{AppState, create_router};

const STATIONS: &[(&str, i32)] = &[("Yamuna Bank", 7), ("Mandi House", 9), ("Rajiv Chowk", 14)];

#[derive(Default)]
struct Upstream {
    landing_requests: AtomicUsize,
    route_requests: AtomicUsize,
}

async fn landing(State(upstream): State<Arc<Upstream>>) -> Html<String> {
    upstream.landing_requests.fetch_add(1, Ordering::SeqCst);
    Html(landing_page_html(STATIONS))
}

async fn route(
    State(upstream): State<Arc<Upstream>>,
    Form(form): Form<HashMap<String, String>>,
) -> Html<String> {
    upstream.route_requests.fetch_add(1, Ordering::SeqCst);

    // Without the replayed form state the real form renders the landing page
    if form.get("__VIEWSTATE").map(String::as_str) != Some("vs-token") {
        return Html(landing_page_html(STATIONS));
    }

    let from = form.get("ctl00$MainContent$ddlFrom").cloned().unwrap_or_default();
    let to = form.get("ctl00$MainContent$ddlTo").cloned().unwrap_or_default();
    let page = match (from.as_str(), to.as_str()) {
        ("7", "14") => route_page_html(
            Some(("Rs. 30", "Rs. 20")),
            &["Timing - 14 Min", "Stations - 5", "Interchange - 1"],
            "<li>Yamuna Bank</li><li>Mandi House <b>Change Here</b><ul><li>Rajiv Chowk</li></ul></li>",
        ),
        _ => simple_route_html(&[]),
    };
    Html(page)
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn fake_fare_form() -> (SocketAddr, Arc<Upstream>) {
    let upstream = Arc::new(Upstream::default());
    let app = Router::new()
        .route("/fares", get(landing).post(route))
        .with_state(upstream.clone());
    (serve(app).await, upstream)
}

#[tokio::test]
async fn bootstrap_fetch_and_resume_from_snapshot() {
    let (addr, upstream) = fake_fare_form().await;
    let dir = tempdir().unwrap();

    let mut config = EngineConfig::default();
    config.fares.url = format!("http://{addr}/fares");
    config.persistence_enabled = true;
    config.snapshot_path = dir.path().join("routes.snapshot");

    let engine = RouteEngine::start(&config).await.unwrap();
    assert_eq!(
        engine.list_station_names(),
        vec!["MANDI HOUSE", "RAJIV CHOWK", "YAMUNA BANK"]
    );
    assert!(config.snapshot_path.exists());

    let route = engine.get_route("Yamuna Bank", "rajiv chowk").await.unwrap();
    assert_eq!(route.normal_fare, 30);
    assert_eq!(route.concessional_fare, 20);
    assert_eq!(route.time_mins, 14);
    assert_eq!(route.interchange_count, 1);
    assert_eq!(route.legs.len(), 4);
    assert_eq!(route.legs[2], Waypoint::Interchange);
    assert_eq!(route.stations().last().unwrap().name(), "RAJIV CHOWK");

    engine.get_route("YAMUNA BANK", "RAJIV CHOWK").await.unwrap();
    assert_eq!(upstream.route_requests.load(Ordering::SeqCst), 1);

    engine.save(true).await.unwrap();
    drop(engine);

    let resumed = RouteEngine::start(&config).await.unwrap();
    assert_eq!(resumed.cached_routes(), 1);
    assert_eq!(resumed.list_station_names().len(), 3);

    let again = resumed.get_route("Yamuna Bank", "Rajiv Chowk").await.unwrap();
    assert_eq!(*again, *route);
    assert_eq!(upstream.landing_requests.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.route_requests.load(Ordering::SeqCst), 1);

    // The resumed session still replays the captured form state
    resumed.get_route("Rajiv Chowk", "Mandi House").await.unwrap();
    assert_eq!(upstream.route_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn corrupt_snapshot_falls_back_to_bootstrap() {
    let (addr, upstream) = fake_fare_form().await;
    let dir = tempdir().unwrap();

    let mut config = EngineConfig::default();
    config.fares.url = format!("http://{addr}/fares");
    config.persistence_enabled = true;
    config.snapshot_path = dir.path().join("routes.snapshot");
    std::fs::write(&config.snapshot_path, b"not a snapshot").unwrap();

    let engine = RouteEngine::start(&config).await.unwrap();
    assert_eq!(engine.list_station_names().len(), 3);
    assert_eq!(upstream.landing_requests.load(Ordering::SeqCst), 1);

    // The bootstrap save replaced the corrupt file
    let snapshot = snapshot::read(&config.snapshot_path).await.unwrap().unwrap();
    assert_eq!(snapshot.stations.len(), 3);
}

#[tokio::test]
async fn bootstrap_fails_when_form_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = EngineConfig::default();
    config.fares.url = format!("http://{addr}/fares");
    config.fares.timeout_secs = 2;

    assert!(RouteEngine::start(&config).await.is_err());
}

fn stations() -> Vec<Station> {
    STATIONS
        .iter()
        .map(|(name, id)| Station::new(name, *id).unwrap())
        .collect()
}

async fn serve_engine() -> String {
    let s = stations();
    let source = MockFareSource::new()
        .with_fallback(simple_route_html(&["Yamuna Bank", "Mandi House"]))
        .failing(&s[1], &s[2]);
    let engine = RouteEngine::new(
        source,
        StationCatalog::from_stations(s),
        FetchOrchestrator::new(2),
        None,
    );
    let addr = serve(create_router(AppState::new(Arc::new(engine)))).await;
    format!("http://{addr}")
}

async fn get_json(url: &str) -> (u16, serde_json::Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn http_surface() {
    let base = serve_engine().await;

    let body = reqwest::get(format!("{base}/health")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "ok");

    let (status, json) = get_json(&format!("{base}/stations")).await;
    assert_eq!(status, 200);
    assert_eq!(json["stations"][0], "MANDI HOUSE");

    let (status, json) = get_json(&format!("{base}/route?from=Yamuna%20Bank&to=Mandi%20House")).await;
    assert_eq!(status, 200);
    assert_eq!(json["from"], "YAMUNA BANK");
    assert_eq!(json["normal_fare"], 30);
    assert_eq!(json["legs"][1]["kind"], "station");
    assert_eq!(json["legs"][1]["id"], 9);

    let (status, json) = get_json(&format!("{base}/route?from=Atlantis&to=Mandi%20House")).await;
    assert_eq!(status, 404);
    assert_eq!(json["error"], "unknown station: Atlantis");

    let (status, _) = get_json(&format!("{base}/route?from=ITO&to=ITO")).await;
    assert_eq!(status, 404);

    let (status, _) = get_json(&format!("{base}/route?from=Mandi%20House&to=mandi%20house")).await;
    assert_eq!(status, 400);

    let (status, _) = get_json(&format!("{base}/route?from=Mandi%20House&to=Rajiv%20Chowk")).await;
    assert_eq!(status, 502);
}

#[tokio::test]
async fn warm_is_accepted() {
    let base = serve_engine().await;
    let client = reqwest::Client::new();

    let response = client.post(format!("{base}/warm")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 202);

    let response = client
        .post(format!("{base}/warm?from=yamuna%20bank"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["from"], "YAMUNA BANK");

    let response = client
        .post(format!("{base}/warm?from=Atlantis"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
