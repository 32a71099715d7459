/**
 * API REST PROCWATCH - Serveur HTTP du collecteur
 *
 * RÔLE :
 * Expose la réception des rapports d'agents et les vues de lecture
 * (état courant, journal OFFLINE, tableau de bord).
 *
 * ROUTES :
 * - POST /status        rapport d'un agent (adresse = pair TCP, jamais le corps)
 * - GET  /status/all    vivacité de chaque connexion configurée
 * - GET  /log           journal OFFLINE complet, ordre du fichier
 * - GET  /              tableau de bord HTML
 * - GET  /health        "ok"
 * - GET  /system/health état du collecteur lui-même
 *
 * Le serveur doit être lancé avec `into_make_service_with_connect_info::<SocketAddr>()`
 * pour que l'adresse source soit disponible.
 */

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::{routing::{get, post}, Json, Router};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::dashboard;
use crate::health::{HealthTracker, KernelHealth};
use crate::ingest::{Collector, IngestError};
use crate::models::{LogRecord, StatusView};

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub health_tracker: HealthTracker,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/status", post(receive_status))
        .route("/status/all", get(status_all))
        .route("/log", get(view_log))
        .with_state(app_state)
}

/// Adresse source telle que comparée au registre (IPv4 mappée en IPv6 -> IPv4)
pub fn source_address(peer: &SocketAddr) -> String {
    peer.ip().to_canonical().to_string()
}

// POST /status
async fn receive_status(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, IngestError> {
    let address = source_address(&peer);
    app.collector.handle_report(&address, &body)?;
    Ok(Json(serde_json::json!({ "message": "status received" })))
}

// GET /status/all (trié par adresse)
async fn status_all(State(app): State<AppState>) -> Json<BTreeMap<String, StatusView>> {
    let views = app
        .collector
        .liveness()
        .iter()
        .map(|v| (v.address.clone(), StatusView::from(v)))
        .collect();
    Json(views)
}

// GET /log
async fn view_log(State(app): State<AppState>) -> Result<Json<Vec<LogRecord>>, StatusCode> {
    match app.collector.offline_events() {
        Ok(records) => Ok(Json(records)),
        Err(e) => {
            tracing::error!(error = %e, "failed to read offline log");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET / (tableau de bord)
async fn home(State(app): State<AppState>) -> Html<String> {
    let log = app.collector.offline_events().unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to read offline log for dashboard");
        Vec::new()
    });
    Html(dashboard::render(&app.collector.liveness(), &log))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.collector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{CollectorConfig, ConnectionConf};
    use crate::event_log::OfflineEventLog;
    use crate::registry::ConnectionRegistry;
    use serde_json::{json, Value};
    use time::macros::datetime;
    use tokio::net::TcpListener;

    struct TestApp {
        base: String,
        client: reqwest::Client,
        clock: Arc<ManualClock>,
        _dir: tempfile::TempDir,
    }

    impl TestApp {
        async fn spawn() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let registry = ConnectionRegistry::from_config(&CollectorConfig {
                connections: vec![
                    ConnectionConf {
                        ip: "127.0.0.1".into(),
                        nome_da_conexao: Some("CAM1".into()),
                        processos: vec!["REC.EXE".into()],
                    },
                    ConnectionConf {
                        ip: "10.0.0.9".into(),
                        nome_da_conexao: Some("PC_101".into()),
                        processos: vec!["processo1.exe".into()],
                    },
                ],
            });
            let log = OfflineEventLog::open(dir.path().join("status_log.jsonl")).unwrap();
            let clock = Arc::new(ManualClock::new(datetime!(2024-05-01 12:00:00 UTC)));
            let collector = Arc::new(Collector::new(registry, log, clock.clone()));
            let app = build_router(AppState { collector, health_tracker: HealthTracker::new() });

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                    .await
                    .unwrap();
            });

            Self {
                base: format!("http://{addr}"),
                client: reqwest::Client::builder().no_proxy().build().unwrap(),
                clock,
                _dir: dir,
            }
        }

        async fn post_status(&self, body: Value) -> reqwest::StatusCode {
            self.client
                .post(format!("{}/status", self.base))
                .json(&body)
                .send()
                .await
                .unwrap()
                .status()
        }

        async fn get_json(&self, path: &str) -> Value {
            self.client
                .get(format!("{}{path}", self.base))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_authorized_offline_report() {
        let app = TestApp::spawn().await;

        let resp = app
            .client
            .post(format!("{}/status", app.base))
            .json(&json!({ "ip": "10.9.9.9", "process": "REC.EXE", "status": "Offline" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert!(body["message"].is_string());

        // l'adresse vient de la connexion, pas du champ ip
        let all = app.get_json("/status/all").await;
        assert_eq!(all["127.0.0.1"]["process"], "REC.EXE");
        assert_eq!(all["127.0.0.1"]["status"], "OFFLINE");
        assert_eq!(all["127.0.0.1"]["timestamp"], "2024-05-01 12:00:00");
        assert_eq!(all["127.0.0.1"]["offline"], false);
        assert!(all.get("10.9.9.9").is_none());

        let log = app.get_json("/log").await;
        let log = log.as_array().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["ip"], "127.0.0.1");
        assert_eq!(log[0]["nome_conexao"], "CAM1");
        assert_eq!(log[0]["process"], "REC.EXE");
        assert_eq!(log[0]["status"], "OFFLINE");
    }

    #[tokio::test]
    async fn test_unauthorized_process_is_forbidden() {
        let app = TestApp::spawn().await;

        let status = app.post_status(json!({ "process": "OTHER.EXE", "status": "Online" })).await;
        assert_eq!(status, reqwest::StatusCode::FORBIDDEN);

        let all = app.get_json("/status/all").await;
        assert_eq!(all["127.0.0.1"]["process"], "Desconhecido");
        assert_eq!(all["127.0.0.1"]["timestamp"], "-");
        assert!(app.get_json("/log").await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_rejected() {
        let app = TestApp::spawn().await;

        assert_eq!(app.post_status(json!({ "status": "Online" })).await, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(app.post_status(json!({ "process": "REC.EXE" })).await, reqwest::StatusCode::BAD_REQUEST);

        let resp = app
            .client
            .post(format!("{}/status", app.base))
            .header("content-type", "application/json")
            .body("{ broken")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_status_all_applies_staleness() {
        let app = TestApp::spawn().await;

        assert_eq!(
            app.post_status(json!({ "process": "rec.exe", "status": "Online" })).await,
            reqwest::StatusCode::OK
        );
        let fresh = app.get_json("/status/all").await;
        assert_eq!(fresh["127.0.0.1"]["status"], "ONLINE");
        assert_eq!(fresh["127.0.0.1"]["process"], "REC.EXE");

        app.clock.advance(time::Duration::seconds(21));
        let stale = app.get_json("/status/all").await;
        assert_eq!(stale["127.0.0.1"]["status"], "OFFLINE");
        assert_eq!(stale["127.0.0.1"]["offline"], true);
        assert_eq!(stale["127.0.0.1"]["timestamp"], "2024-05-01 12:00:00");

        // jamais rapporté
        assert_eq!(stale["10.0.0.9"]["process"], "Desconhecido");
        assert_eq!(stale["10.0.0.9"]["status"], "OFFLINE");
        assert_eq!(stale["10.0.0.9"]["offline"], true);

        // un rapport ONLINE n'écrit jamais dans le journal
        assert!(app.get_json("/log").await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_and_health() {
        let app = TestApp::spawn().await;
        app.post_status(json!({ "process": "REC.EXE", "status": "Offline" })).await;

        let html = app.client.get(format!("{}/", app.base)).send().await.unwrap().text().await.unwrap();
        assert!(html.contains("Monitor de Processos"));
        assert!(html.contains("PC_101"));
        assert!(html.contains("REC.EXE"));

        let ok = app.client.get(format!("{}/health", app.base)).send().await.unwrap().text().await.unwrap();
        assert_eq!(ok, "ok");

        let health = app.get_json("/system/health").await;
        assert_eq!(health["connections_configured"], 2);
        assert_eq!(health["addresses_tracked"], 1);
        assert_eq!(health["addresses_online"], 0);
    }

    #[test]
    fn test_source_address_unmaps_ipv4() {
        let peer: SocketAddr = "[::ffff:10.0.0.5]:4242".parse().unwrap();
        assert_eq!(source_address(&peer), "10.0.0.5");
        let peer: SocketAddr = "10.0.0.5:4242".parse().unwrap();
        assert_eq!(source_address(&peer), "10.0.0.5");
    }
}
