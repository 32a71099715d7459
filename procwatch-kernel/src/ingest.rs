/**
 * POINT DE RÉCEPTION - Autorisation et ingestion des rapports d'agents
 *
 * RÔLE : relie un rapport reçu (et l'adresse source de la connexion) à
 * l'agrégateur d'état et au journal OFFLINE.
 *
 * ORDRE DES ÉTAPES (chacune peut interrompre le traitement) :
 * 1. validation du corps (process + status non vides) -> 400
 * 2. autorisation adresse + processus                 -> 403
 * 3. mise à jour de l'agrégateur
 * 4. si OFFLINE : ajout au journal (un échec est signalé, pas propagé)
 * 5. succès
 * L'autorisation précède toute mutation : un rapport refusé ne laisse
 * aucune trace ni dans l'état ni dans le journal.
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aggregator::StatusAggregator;
use crate::clock::{format_timestamp, Clock};
use crate::event_log::{LogError, OfflineEventLog};
use crate::models::{LivenessView, LogRecord, RawStatus, StatusReport, StatusReportIn};
use crate::registry::{ConnectionRegistry, Unauthorized};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Forbidden(#[from] Unauthorized),
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Malformed(_) => StatusCode::BAD_REQUEST,
            IngestError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Résultat d'un rapport accepté
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub display_name: String,
    /// vrai si une ligne a été ajoutée au journal
    pub logged: bool,
}

/// Contexte explicite du collecteur : registre, état, journal et horloge.
/// Une instance par processus en production, une par test sinon.
pub struct Collector {
    registry: ConnectionRegistry,
    aggregator: StatusAggregator,
    log: OfflineEventLog,
    clock: Arc<dyn Clock>,
}

impl Collector {
    pub fn new(registry: ConnectionRegistry, log: OfflineEventLog, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            aggregator: StatusAggregator::new(),
            log,
            clock,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub fn aggregator(&self) -> &StatusAggregator {
        &self.aggregator
    }

    /// Décode et valide un corps JSON de POST /status
    pub fn parse_report(body: &[u8]) -> Result<StatusReport, IngestError> {
        let raw: StatusReportIn =
            serde_json::from_slice(body).map_err(|e| IngestError::Malformed(e.to_string()))?;
        StatusReport::try_from(raw).map_err(|e| IngestError::Malformed(e.to_string()))
    }

    /// Traite un corps brut venant de `address`
    pub fn handle_report(&self, address: &str, body: &[u8]) -> Result<Accepted, IngestError> {
        let report = Self::parse_report(body).inspect_err(|e| {
            warn!(%address, error = %e, "rejected status report");
        })?;
        self.ingest(address, &report)
    }

    /// Étapes 2 à 5 sur un rapport déjà validé
    pub fn ingest(&self, address: &str, report: &StatusReport) -> Result<Accepted, IngestError> {
        let display_name = match self.registry.authorize(address, &report.process) {
            Ok(name) => name.to_string(),
            Err(e) => {
                warn!(%address, process = %report.process, error = %e, "unauthorized status report");
                return Err(e.into());
            }
        };

        let now = self.clock.now();
        self.aggregator.record(address, &report.process, report.status, now);
        info!(%address, name = %display_name, process = %report.process.to_uppercase(), status = %report.status, "status received");

        let mut logged = false;
        if report.status == RawStatus::Offline {
            let record = LogRecord {
                timestamp: format_timestamp(now),
                address: address.to_string(),
                display_name: display_name.clone(),
                process: report.process.to_uppercase(),
                status: report.status,
            };
            match self.log.append(&record) {
                Ok(written) => logged = written,
                // l'audit ne doit pas bloquer le suivi de fraîcheur
                Err(e) => error!(%address, error = %e, "failed to append offline event"),
            }
        }

        Ok(Accepted { display_name, logged })
    }

    pub fn tracked_addresses(&self) -> usize {
        self.aggregator.len()
    }

    /// Vue de vivacité calculée maintenant
    pub fn liveness(&self) -> Vec<LivenessView> {
        self.aggregator.snapshot(&self.registry, self.clock.now())
    }

    pub fn offline_events(&self) -> Result<Vec<LogRecord>, LogError> {
        self.log.read_all()
    }
}
