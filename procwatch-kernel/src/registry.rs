/**
 * REGISTRE DES CONNEXIONS - Liste blanche statique du collecteur
 *
 * RÔLE : associe chaque adresse autorisée à un nom d'affichage et à
 * l'ensemble des processus qu'elle a le droit de rapporter.
 *
 * FONCTIONNEMENT : construit une fois au démarrage depuis config.json,
 * immuable ensuite (une modification demande un redémarrage).
 * `authorize` est une simple recherche, sans effet de bord.
 */

use std::collections::{HashMap, HashSet};

use crate::config::CollectorConfig;

#[derive(Debug, Clone)]
pub struct Connection {
    pub address: String,
    pub display_name: String,
    /// noms en minuscules, comparaison insensible à la casse
    allowed_processes: HashSet<String>,
}

impl Connection {
    pub fn allows(&self, process: &str) -> bool {
        self.allowed_processes.contains(&process.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unauthorized {
    #[error("address {0} is not authorized")]
    UnknownAddress(String),
    #[error("process '{process}' is not authorized for address {address}")]
    ProcessNotAllowed { address: String, process: String },
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// ordre du fichier de config
    connections: Vec<Connection>,
    by_address: HashMap<String, usize>,
}

impl ConnectionRegistry {
    pub fn from_config(cfg: &CollectorConfig) -> Self {
        let mut registry = Self::default();
        for conf in &cfg.connections {
            let address = conf.ip.trim().to_string();
            if registry.by_address.contains_key(&address) {
                tracing::warn!(%address, "duplicate connection in config, keeping the first one");
                continue;
            }
            let display_name = conf
                .nome_da_conexao
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| address.clone());
            let allowed_processes = conf.processos.iter().map(|p| p.trim().to_lowercase()).collect();

            registry.by_address.insert(address.clone(), registry.connections.len());
            registry.connections.push(Connection { address, display_name, allowed_processes });
        }
        registry
    }

    /// Vérifie qu'une adresse connue rapporte un processus autorisé.
    /// Renvoie le nom d'affichage de la connexion.
    pub fn authorize(&self, address: &str, process: &str) -> Result<&str, Unauthorized> {
        let conn = self
            .get(address)
            .ok_or_else(|| Unauthorized::UnknownAddress(address.to_string()))?;
        if !conn.allows(process) {
            return Err(Unauthorized::ProcessNotAllowed {
                address: address.to_string(),
                process: process.to_string(),
            });
        }
        Ok(&conn.display_name)
    }

    pub fn get(&self, address: &str) -> Option<&Connection> {
        self.by_address.get(address).map(|&i| &self.connections[i])
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}
