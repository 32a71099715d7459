/**
 * JOURNAL OFFLINE - Trace d'audit des passages à l'état OFFLINE
 *
 * RÔLE : fichier JSON lines en ajout seul (status_log.jsonl), une ligne
 * par rapport OFFLINE accepté. Relu en entier pour /log et le tableau de bord.
 *
 * FONCTIONNEMENT :
 * - un seul écrivain à la fois (mutex tenu le temps de l'écriture)
 * - chaque enregistrement = un seul write d'une ligne complète
 * - jamais de troncature ni de réécriture, pas de rotation (faite à l'extérieur)
 * - à la relecture, les lignes illisibles sont ignorées
 * - si le fichier se termine par une ligne partielle (crash), la prochaine
 *   écriture commence par un saut de ligne pour ne pas s'y coller
 */

use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::{LogRecord, RawStatus};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug)]
struct WriterState {
    /// le fichier ne se termine pas par '\n'
    needs_newline: bool,
}

#[derive(Debug)]
pub struct OfflineEventLog {
    path: PathBuf,
    writer: Mutex<WriterState>,
}

impl OfflineEventLog {
    /// Prépare le journal (le fichier lui-même est créé au premier ajout)
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, LogError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LogError::Io { path: parent.to_path_buf(), source })?;
        }
        let needs_newline = ends_without_newline(&path).map_err(|source| LogError::Io { path: path.clone(), source })?;
        if needs_newline {
            tracing::warn!(path = %path.display(), "offline log ends with a partial line");
        }
        Ok(Self { path, writer: Mutex::new(WriterState { needs_newline }) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ajoute un enregistrement. Seuls les statuts OFFLINE sont journalisés :
    /// renvoie `Ok(false)` sans rien écrire pour un autre statut.
    pub fn append(&self, record: &LogRecord) -> Result<bool, LogError> {
        if record.status != RawStatus::Offline {
            return Ok(false);
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut state = self.writer.lock();
        if state.needs_newline {
            line.insert(0, '\n');
        }
        let io_err = |source| LogError::Io { path: self.path.clone(), source };
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        state.needs_newline = false;
        Ok(true)
    }

    /// Relit tout le journal dans l'ordre du fichier, en sautant les lignes illisibles
    pub fn read_all(&self) -> Result<Vec<LogRecord>, LogError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(LogError::Io { path: self.path.clone(), source }),
        };
        Ok(parse_lines(&content))
    }
}

fn parse_lines(content: &str) -> Vec<LogRecord> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| match serde_json::from_str::<LogRecord>(l) {
            Ok(rec) => Some(rec),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed offline log line");
                None
            }
        })
        .collect()
}

fn ends_without_newline(path: &Path) -> io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let meta = file.metadata()?;
    if !meta.is_file() || meta.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
