/**
 * AGRÉGATEUR D'ÉTAT - Dernier rapport connu par adresse
 *
 * RÔLE : garde en mémoire, pour chaque adresse, le dernier couple
 * (processus, statut) reçu et son heure d'arrivée ; dérive la vivacité
 * (ONLINE / OFFLINE) à la lecture en comparant "maintenant" à cette heure.
 *
 * FONCTIONNEMENT :
 * - un seul créneau par adresse : un nouveau rapport écrase le précédent,
 *   même s'il concerne un autre processus
 * - les entrées ne sont jamais supprimées, une adresse muette devient périmée
 * - verrou lecteurs/écrivain global sur la map : pas d'entrée lue à moitié écrite
 */

use parking_lot::RwLock;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

use crate::models::{LivenessView, RawStatus, StatusEntry};
use crate::registry::ConnectionRegistry;

/// Au-delà de ce délai sans rapport, une adresse est considérée OFFLINE
pub const STALENESS_THRESHOLD: Duration = Duration::seconds(20);

#[derive(Debug, Default)]
pub struct StatusAggregator {
    entries: RwLock<HashMap<String, StatusEntry>>,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Écrase sans condition l'entrée de `address`
    pub fn record(&self, address: &str, process: &str, status: RawStatus, now: OffsetDateTime) {
        let entry = StatusEntry {
            process: process.to_uppercase(),
            raw_status: status,
            last_report_time: now,
        };
        self.entries.write().insert(address.to_string(), entry);
    }

    #[cfg(test)]
    pub fn entry(&self, address: &str) -> Option<StatusEntry> {
        self.entries.read().get(address).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Vue de vivacité pour toutes les connexions du registre, y compris
    /// celles qui n'ont encore jamais rapporté. Ordre du registre.
    pub fn snapshot(&self, registry: &ConnectionRegistry, now: OffsetDateTime) -> Vec<LivenessView> {
        let entries = self.entries.read();
        registry
            .connections()
            .map(|conn| {
                let entry = entries.get(&conn.address);
                let (effective_status, is_stale) = derive_liveness(entry, now);
                LivenessView {
                    address: conn.address.clone(),
                    display_name: conn.display_name.clone(),
                    process: entry.map(|e| e.process.clone()),
                    effective_status,
                    last_report_time: entry.map(|e| e.last_report_time),
                    is_stale,
                }
            })
            .collect()
    }
}

/// Règle de péremption : (statut effectif, périmé ?)
pub fn derive_liveness(entry: Option<&StatusEntry>, now: OffsetDateTime) -> (RawStatus, bool) {
    match entry {
        None => (RawStatus::Offline, true),
        Some(e) => {
            let stale = now - e.last_report_time > STALENESS_THRESHOLD;
            if stale {
                (RawStatus::Offline, true)
            } else {
                (e.raw_status, false)
            }
        }
    }
}
