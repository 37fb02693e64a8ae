// Abstraction de stockage clé/valeur injectée dans les services.
//
// Deux instances distinctes sont attendues : un stockage "local" persistant
// (jeton de session anonyme, cache du panier) et un stockage de "session"
// volatile (transaction de paiement en cours). Les tests substituent un
// MemoryStore aux deux.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, cle: &str) -> Option<String>;
    fn set(&self, cle: &str, valeur: &str);
    fn remove(&self, cle: &str);
}

/// Stockage en mémoire : stockage de session et doublure de test.
#[derive(Default)]
pub struct MemoryStore {
    entrees: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, cle: &str) -> Option<String> {
        self.entrees.lock().unwrap().get(cle).cloned()
    }

    fn set(&self, cle: &str, valeur: &str) {
        self.entrees
            .lock()
            .unwrap()
            .insert(cle.to_string(), valeur.to_string());
    }

    fn remove(&self, cle: &str) {
        self.entrees.lock().unwrap().remove(cle);
    }
}

/// Stockage persistant sur disque : un fichier JSON unique rechargé à
/// l'ouverture et réécrit à chaque mutation.
pub struct FileStore {
    chemin: PathBuf,
    entrees: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn new(chemin: PathBuf) -> Self {
        let entrees = match fs::read_to_string(&chemin) {
            Ok(contenu) => serde_json::from_str(&contenu).unwrap_or_else(|e| {
                warn!("stockage local illisible ({}): {e}", chemin.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            chemin,
            entrees: Mutex::new(entrees),
        }
    }

    fn persister(&self, entrees: &HashMap<String, String>) {
        match serde_json::to_string_pretty(entrees) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.chemin, json) {
                    warn!("écriture du stockage local impossible: {e}");
                }
            }
            Err(e) => warn!("sérialisation du stockage local impossible: {e}"),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, cle: &str) -> Option<String> {
        self.entrees.lock().unwrap().get(cle).cloned()
    }

    fn set(&self, cle: &str, valeur: &str) {
        let mut entrees = self.entrees.lock().unwrap();
        entrees.insert(cle.to_string(), valeur.to_string());
        self.persister(&entrees);
    }

    fn remove(&self, cle: &str) {
        let mut entrees = self.entrees.lock().unwrap();
        entrees.remove(cle);
        self.persister(&entrees);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("absent"), None);
        store.set("session", "abc-123");
        assert_eq!(store.get("session"), Some("abc-123".to_string()));
        store.remove("session");
        assert_eq!(store.get("session"), None);
    }

    #[test]
    fn test_file_store_rechargement() {
        let chemin = std::env::temp_dir().join(format!(
            "bassin_store_test_{}.json",
            uuid::Uuid::new_v4()
        ));

        let store = FileStore::new(chemin.clone());
        store.set("panier", "{\"id\":-1}");
        drop(store);

        // Une nouvelle instance relit le fichier.
        let relu = FileStore::new(chemin.clone());
        assert_eq!(relu.get("panier"), Some("{\"id\":-1}".to_string()));

        let _ = std::fs::remove_file(chemin);
    }

    #[test]
    fn test_file_store_fichier_corrompu() {
        let chemin = std::env::temp_dir().join(format!(
            "bassin_store_corrompu_{}.json",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&chemin, "pas du json").unwrap();

        // Un fichier illisible repart d'un stockage vide sans paniquer.
        let store = FileStore::new(chemin.clone());
        assert_eq!(store.get("panier"), None);

        let _ = std::fs::remove_file(chemin);
    }
}
