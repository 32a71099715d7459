use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Document config.json du collecteur (noms de champs conservés pour compatibilité)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    #[serde(default)]
    pub connections: Vec<ConnectionConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionConf {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome_da_conexao: Option<String>,
    #[serde(default)]
    pub processos: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            connections: vec![
                ConnectionConf {
                    ip: "10.10.9.59".into(),
                    nome_da_conexao: Some("PC_CAMERAS".into()),
                    processos: vec!["APOWERREC.EXE".into()],
                },
                ConnectionConf {
                    ip: "192.168.1.101".into(),
                    nome_da_conexao: Some("PC_101".into()),
                    processos: vec!["processo1.exe".into()],
                },
            ],
        }
    }
}

/// Réglages de démarrage lus dans l'environnement (.env pris en compte par main)
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub bind: String,
    pub log_file: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
        Self {
            config_path: var("PROCWATCH_KERNEL_CONFIG", "config.json").into(),
            bind: var("PROCWATCH_BIND", "0.0.0.0:5000"),
            log_file: var("PROCWATCH_LOG_FILE", "status_log.jsonl").into(),
        }
    }
}

/// Charge config.json ; le crée avec les valeurs par défaut s'il n'existe pas.
/// Un JSON invalide est une erreur de démarrage.
pub async fn load_config(path: &Path) -> anyhow::Result<CollectorConfig> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "no collector config, writing defaults");
        let defaults = CollectorConfig::default();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let txt = serde_json::to_string_pretty(&defaults)?;
        fs::write(path, txt)
            .await
            .with_context(|| format!("cannot write default config to {}", path.display()))?;
        return Ok(defaults);
    }

    let txt = fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let cfg: CollectorConfig =
        serde_json::from_str(&txt).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
