//! Agent configuration file (`config.txt`)
//!
//! Plain `KEY=VALUE` lines:
//! - `MASTER_SERVER_URL`: collector endpoint, e.g. `http://10.10.8.101:5000/status`
//! - `SERVICE_PROCESS_NAMES`: comma separated process names
//! - `CHECK_INTERVAL_SECONDS`: optional, defaults to 10
//!
//! Values are taken verbatim after the first `=` (spaces allowed, no
//! quoting rules). Blank lines and `#` comments are skipped.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_INTERVAL_SECS: u64 = 10;

const DEFAULT_CONFIG: &str = "MASTER_SERVER_URL=http://10.10.8.101:5000/status\nSERVICE_PROCESS_NAMES=APOWERREC.EXE\n";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write default config to {path}: {source}")]
    WriteDefault {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("missing or empty key {0}")]
    MissingKey(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub master_server_url: String,
    pub process_names: Vec<String>,
    pub interval: Duration,
}

/// Outcome of loading the config file
#[derive(Debug)]
pub enum Loaded {
    Ready(AgentConfig),
    /// The file did not exist and was created with defaults; operator must edit it
    CreatedDefault(PathBuf),
}

impl AgentConfig {
    /// Config path: `$PROCWATCH_AGENT_CONFIG`, else `config.txt` next to the executable
    pub fn default_path() -> PathBuf {
        if let Ok(p) = std::env::var("PROCWATCH_AGENT_CONFIG") {
            return PathBuf::from(p);
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join("config.txt")
    }

    pub fn load(path: &Path) -> Result<Loaded, ConfigError> {
        if !path.exists() {
            std::fs::write(path, DEFAULT_CONFIG)
                .map_err(|source| ConfigError::WriteDefault { path: path.to_path_buf(), source })?;
            return Ok(Loaded::CreatedDefault(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_pairs(parse_lines(&content)).map(Loaded::Ready)
    }

    fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut url = None;
        let mut names = None;
        let mut interval = None;
        for (key, value) in pairs {
            match key.as_str() {
                "MASTER_SERVER_URL" => url = Some(value.trim().to_string()),
                "SERVICE_PROCESS_NAMES" => names = Some(value),
                "CHECK_INTERVAL_SECONDS" => interval = Some(value),
                _ => tracing::debug!(%key, "ignoring unknown config key"),
            }
        }

        let master_server_url = url
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingKey("MASTER_SERVER_URL"))?;

        let process_names: Vec<String> = names
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        if process_names.is_empty() {
            return Err(ConfigError::MissingKey("SERVICE_PROCESS_NAMES"));
        }

        let interval = match interval {
            None => Duration::from_secs(DEFAULT_INTERVAL_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidValue { key: "CHECK_INTERVAL_SECONDS", value: raw }),
            },
        };

        Ok(AgentConfig { master_server_url, process_names, interval })
    }
}

/// `KEY=VALUE` lines, split on the first `=`, key and value trimmed
fn parse_lines(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match line.split_once('=') {
            Some((key, value)) => Some((key.trim().to_string(), value.trim().to_string())),
            None => {
                tracing::debug!(%line, "ignoring config line without '='");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");

        let loaded = AgentConfig::load(&path).unwrap();
        assert!(matches!(loaded, Loaded::CreatedDefault(_)));

        // the generated file is itself a valid config
        let Loaded::Ready(cfg) = AgentConfig::load(&path).unwrap() else {
            panic!("expected a ready config");
        };
        assert_eq!(cfg.master_server_url, "http://10.10.8.101:5000/status");
        assert_eq!(cfg.process_names, vec!["APOWERREC.EXE"]);
        assert_eq!(cfg.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
    }

    #[test]
    fn test_process_list_is_trimmed() {
        let cfg = AgentConfig::from_pairs(pairs(&[
            ("MASTER_SERVER_URL", "http://collector:5000/status"),
            ("SERVICE_PROCESS_NAMES", " REC.EXE, ,sync.exe ,"),
            ("CHECK_INTERVAL_SECONDS", "3"),
        ]))
        .unwrap();
        assert_eq!(cfg.process_names, vec!["REC.EXE", "sync.exe"]);
        assert_eq!(cfg.interval, Duration::from_secs(3));
    }

    #[test]
    fn test_required_keys() {
        let err = AgentConfig::from_pairs(pairs(&[("SERVICE_PROCESS_NAMES", "REC.EXE")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("MASTER_SERVER_URL")));

        let err = AgentConfig::from_pairs(pairs(&[
            ("MASTER_SERVER_URL", "http://collector:5000/status"),
            ("SERVICE_PROCESS_NAMES", " , "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("SERVICE_PROCESS_NAMES")));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = AgentConfig::from_pairs(pairs(&[
            ("MASTER_SERVER_URL", "http://collector:5000/status"),
            ("SERVICE_PROCESS_NAMES", "REC.EXE"),
            ("CHECK_INTERVAL_SECONDS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        std::fs::write(&path, "MASTER_SERVER_URL=http://10.0.0.1:5000/status\nSERVICE_PROCESS_NAMES=A.EXE,B.EXE\n").unwrap();

        let Loaded::Ready(cfg) = AgentConfig::load(&path).unwrap() else {
            panic!("expected a ready config");
        };
        assert_eq!(cfg.process_names, vec!["A.EXE", "B.EXE"]);
    }

    #[test]
    fn test_values_with_spaces_are_taken_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        std::fs::write(
            &path,
            "# agent\nMASTER_SERVER_URL = http://10.0.0.1:5000/status\r\nSERVICE_PROCESS_NAMES=A.EXE, B.EXE, My App.exe\n\nCHECK_INTERVAL_SECONDS=5\n",
        )
        .unwrap();

        let Loaded::Ready(cfg) = AgentConfig::load(&path).unwrap() else {
            panic!("expected a ready config");
        };
        assert_eq!(cfg.master_server_url, "http://10.0.0.1:5000/status");
        assert_eq!(cfg.process_names, vec!["A.EXE", "B.EXE", "My App.exe"]);
        assert_eq!(cfg.interval, Duration::from_secs(5));
    }

    #[test]
    fn test_url_keeps_embedded_equals() {
        let pairs = parse_lines("MASTER_SERVER_URL=http://h:5000/status?a=b\nnot a pair\n");
        assert_eq!(pairs, vec![("MASTER_SERVER_URL".to_string(), "http://h:5000/status?a=b".to_string())]);
    }
}
