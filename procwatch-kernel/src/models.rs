use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::clock::format_timestamp;

/// Valeur affichée pour le processus d'une connexion qui n'a encore rien rapporté
pub const UNKNOWN_PROCESS: &str = "Desconhecido";
/// Valeur affichée pour un horodatage absent
pub const UNSET_TIMESTAMP: &str = "-";

/// Statut brut rapporté par un agent. Sérialisé en majuscules (ONLINE / OFFLINE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RawStatus {
    Online,
    Offline,
}

impl RawStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawStatus::Online => "ONLINE",
            RawStatus::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown status '{0}' (expected Online or Offline)")]
pub struct UnknownStatus(pub String);

impl FromStr for RawStatus {
    type Err = UnknownStatus;

    // Les agents envoient "Online"/"Offline", la casse n'est pas significative
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(RawStatus::Online),
            "offline" => Ok(RawStatus::Offline),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Corps brut de POST /status. Tout est optionnel ici : la validation des
/// champs obligatoires est faite explicitement par `StatusReport::try_from`.
/// Le champ `ip` est accepté mais ignoré (l'adresse vient de la connexion TCP).
#[derive(Debug, Default, Deserialize)]
pub struct StatusReportIn {
    #[allow(dead_code)]
    pub ip: Option<String>,
    pub process: Option<String>,
    pub status: Option<String>,
}

/// Rapport validé
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub process: String,
    pub status: RawStatus,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReportValidationError {
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
}

impl TryFrom<StatusReportIn> for StatusReport {
    type Error = ReportValidationError;

    fn try_from(raw: StatusReportIn) -> Result<Self, Self::Error> {
        let process = raw
            .process
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or(ReportValidationError::MissingField("process"))?;
        let status = raw
            .status
            .filter(|s| !s.trim().is_empty())
            .ok_or(ReportValidationError::MissingField("status"))?;
        Ok(StatusReport { process, status: status.parse()? })
    }
}

/// Dernier état connu d'une adresse (un seul créneau par adresse)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub process: String,
    pub raw_status: RawStatus,
    pub last_report_time: OffsetDateTime,
}

/// Vue dérivée, recalculée à chaque lecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessView {
    pub address: String,
    pub display_name: String,
    pub process: Option<String>,
    pub effective_status: RawStatus,
    pub last_report_time: Option<OffsetDateTime>,
    pub is_stale: bool,
}

/// Format fil de GET /status/all (noms de champs conservés)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusView {
    pub process: String,
    pub status: RawStatus,
    pub timestamp: String,
    pub offline: bool,
}

impl From<&LivenessView> for StatusView {
    fn from(v: &LivenessView) -> Self {
        StatusView {
            process: v.process.clone().unwrap_or_else(|| UNKNOWN_PROCESS.to_string()),
            status: v.effective_status,
            timestamp: v
                .last_report_time
                .map(format_timestamp)
                .unwrap_or_else(|| UNSET_TIMESTAMP.to_string()),
            offline: v.is_stale,
        }
    }
}

/// Ligne du journal des passages OFFLINE (status_log.jsonl)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    #[serde(rename = "ip")]
    pub address: String,
    #[serde(rename = "nome_conexao")]
    pub display_name: String,
    pub process: String,
    pub status: RawStatus,
}
