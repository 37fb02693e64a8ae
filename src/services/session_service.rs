use rand::Rng;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::utils::jwt;
use crate::utils::storage::KeyValueStore;

/// Clé de stockage local du jeton de session anonyme.
pub const CLE_SESSION_ID: &str = "bassin_session_id";

/// Identité portée par chaque requête vers le backend : soit un utilisateur
/// authentifié (Bearer JWT), soit une session anonyme (X-Session-ID).
#[derive(Clone, Debug, PartialEq)]
pub enum Identite {
    Anonyme { session_id: String },
    Authentifie { token: String, user_id: Option<i64> },
}

/// Fournisseur d'identité de session.
///
/// Le jeton anonyme est créé paresseusement et persisté ; après connexion il
/// est CONSERVÉ tant qu'une migration de panier n'a pas confirmé que le
/// serveur l'a absorbé, et seulement alors effacé.
pub struct SessionService {
    store: Arc<dyn KeyValueStore>,
    identite: RwLock<Identite>,
}

impl SessionService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let session_id = lire_ou_generer(store.as_ref());
        Self {
            store,
            identite: RwLock::new(Identite::Anonyme { session_id }),
        }
    }

    /// Jeton de session anonyme, généré et persisté au premier besoin.
    /// Appelé avant toute requête panier anonyme.
    pub fn get_or_create_session_id(&self) -> String {
        let jeton = lire_ou_generer(self.store.as_ref());
        if let Identite::Anonyme { session_id } = &mut *self.identite.write().unwrap() {
            session_id.clone_from(&jeton);
        }
        jeton
    }

    pub fn identite(&self) -> Identite {
        self.identite.read().unwrap().clone()
    }

    pub fn est_authentifie(&self) -> bool {
        matches!(*self.identite.read().unwrap(), Identite::Authentifie { .. })
    }

    /// Jeton de session encore persisté (pas encore absorbé par une
    /// migration de panier).
    pub fn session_id_persiste(&self) -> Option<String> {
        self.store.get(CLE_SESSION_ID)
    }

    /// Bascule en identité authentifiée. Les claims sont lus sans
    /// vérification de signature ; un payload illisible n'empêche pas la
    /// connexion, le serveur reste seul juge du jeton.
    pub fn connecter(&self, token: &str) {
        let user_id = match jwt::decoder_claims(token) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                warn!("claims du jeton illisibles, identité sans profil: {e}");
                None
            }
        };
        *self.identite.write().unwrap() = Identite::Authentifie {
            token: token.to_string(),
            user_id,
        };
    }

    /// Retour à l'identité anonyme (déconnexion volontaire ou 401/403).
    pub fn deconnecter(&self) {
        let session_id = lire_ou_generer(self.store.as_ref());
        *self.identite.write().unwrap() = Identite::Anonyme { session_id };
    }

    /// À appeler uniquement quand le serveur a confirmé la migration du
    /// panier de session : le jeton anonyme peut enfin être oublié.
    pub fn effacer_session_id(&self) {
        self.store.remove(CLE_SESSION_ID);
    }
}

fn lire_ou_generer(store: &dyn KeyValueStore) -> String {
    if let Some(existant) = store.get(CLE_SESSION_ID) {
        return existant;
    }
    let jeton = generer_jeton_session();
    store.set(CLE_SESSION_ID, &jeton);
    jeton
}

/// Jeton de session au format UUID v4, tiré du PRNG du processus.
fn generer_jeton_session() -> String {
    let mut octets = [0u8; 16];
    rand::thread_rng().fill(&mut octets[..]);
    uuid::Builder::from_random_bytes(octets)
        .into_uuid()
        .to_string()
}
