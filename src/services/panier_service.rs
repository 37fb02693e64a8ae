// ============================================================================
// SERVICE PANIER - RÉCONCILIATION
// ============================================================================
//
// Description:
//   Source de vérité unique du panier courant. Réconcilie l'état serveur,
//   le cache local et les mutations optimistes en vol, puis publie chaque
//   nouvel état sur un canal watch (un seul écrivain, N observateurs).
//
// Points d'attention:
//   - Les échecs de LECTURE se replient silencieusement sur le cache local
//     (l'interface reste utilisable hors ligne) ; seuls les échecs de
//     MUTATION remontent à l'appelant.
//   - Mutation optimiste : l'état local est publié avant l'appel réseau.
//     En cas d'échec, retour à l'instantané pour un utilisateur authentifié,
//     conservation locale pour une session anonyme (pas de panier serveur
//     fiable vers lequel revenir).
//
// ============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::session_service::SessionService;
use crate::api::error::ApiErreur;
use crate::api::panier_api::PanierApi;
use crate::config::Config;
use crate::models::dto::AjoutPanierRequest;
use crate::models::panier::{PANIER_NON_CREE, Panier};
use crate::utils::storage::KeyValueStore;

/// Clé du cache local du panier (instantané + expiration).
pub const CLE_CACHE_PANIER: &str = "bassin_panier_local";
/// Clé du pointeur "panier courant" (id serveur).
pub const CLE_PANIER_ID: &str = "bassin_panier_id";

#[derive(Debug, Error)]
pub enum PanierErreur {
    #[error("stock insuffisant: {stock} disponible(s), {demande} demandé(s)")]
    StockInsuffisant { stock: i32, demande: i32 },
    #[error("ligne {0} introuvable dans le panier")]
    LigneIntrouvable(i64),
    #[error(transparent)]
    Api(#[from] ApiErreur),
}

/// Instantané du panier persisté localement, avec expiration (TTL 2 h).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachePanier {
    panier: Panier,
    /// Epoch millisecondes.
    expires_at: i64,
}

pub struct PanierService {
    api: Arc<dyn PanierApi>,
    session: Arc<SessionService>,
    store: Arc<dyn KeyValueStore>,
    config: Config,
    etat: Mutex<Panier>,
    canal: watch::Sender<Panier>,
    migration_faite: AtomicBool,
    surveillance: Mutex<Option<JoinHandle<()>>>,
}

impl PanierService {
    pub fn new(
        api: Arc<dyn PanierApi>,
        session: Arc<SessionService>,
        store: Arc<dyn KeyValueStore>,
        config: Config,
    ) -> Self {
        let initial = Panier::vide();
        let (canal, _) = watch::channel(initial.clone());
        let service = Self {
            api,
            session,
            store,
            config,
            etat: Mutex::new(initial),
            canal,
            migration_faite: AtomicBool::new(false),
            surveillance: Mutex::new(None),
        };
        // Le dernier instantané local sert d'état de départ avant le premier
        // aller-retour serveur.
        if let Some(cache) = service.lire_cache() {
            service.publier(cache);
        }
        service
    }

    /// Flux du panier courant : les abonnés observent toujours le dernier
    /// état publié, jamais un état périmé après une émission plus récente.
    pub fn subscribe(&self) -> watch::Receiver<Panier> {
        self.canal.subscribe()
    }

    pub fn panier_actuel(&self) -> Panier {
        self.etat.lock().unwrap().clone()
    }

    /// Charge le panier serveur. Un 404 déclenche une création puis une
    /// relecture unique ; toute autre erreur se replie en silence sur le
    /// cache local (journalisée, jamais remontée à l'interface).
    pub async fn load_cart(&self) -> Panier {
        match self.api.fetch_panier().await {
            Ok(panier) => self.publier(normaliser(panier)),
            Err(ApiErreur::Introuvable) => {
                info!("aucun panier serveur, création puis relecture");
                match self.api.creer_panier().await {
                    Ok(_) => match self.api.fetch_panier().await {
                        Ok(panier) => self.publier(normaliser(panier)),
                        Err(erreur) => self.replier_sur_cache(&erreur),
                    },
                    Err(erreur) => self.replier_sur_cache(&erreur),
                }
            }
            Err(erreur) if erreur.resultat_non_unique() => {
                warn!("paniers serveur en double pour cette identité, repli local");
                self.replier_sur_cache(&erreur);
            }
            Err(erreur) => self.replier_sur_cache(&erreur),
        }
        self.panier_actuel()
    }

    /// Ajoute un article. Une personnalisation identique (bassin, matériau,
    /// dimension, couleur, même ensemble d'accessoires quel que soit leur
    /// ordre) déjà présente devient un cumul de quantités, pas une nouvelle
    /// ligne.
    pub async fn add_item(&self, requete: AjoutPanierRequest) -> Result<(), PanierErreur> {
        if requete.is_customized {
            if let Some(personnalisation) = requete.personnalisation.as_ref() {
                let existante = {
                    let panier = self.etat.lock().unwrap();
                    panier
                        .ligne_personnalisee_identique(requete.bassin_id, personnalisation)
                        .map(|ligne| (ligne.id, ligne.quantite))
                };
                if let Some((item_id, quantite)) = existante {
                    return self
                        .update_quantity(item_id, quantite + requete.quantite)
                        .await;
                }
            }
        }

        let panier = self.api.ajouter_item(&requete).await?;
        self.publier(normaliser(panier));
        Ok(())
    }

    /// Change la quantité d'une ligne. Zéro ou moins délègue à la
    /// suppression ; une ligne standard est plafonnée au stock catalogue,
    /// une ligne personnalisée ne l'est jamais.
    pub async fn update_quantity(
        &self,
        item_id: i64,
        nouvelle_quantite: i32,
    ) -> Result<(), PanierErreur> {
        if nouvelle_quantite <= 0 {
            return self.remove_item(item_id).await;
        }

        let instantane = self.panier_actuel();
        let Some(item) = instantane.item(item_id) else {
            return Err(PanierErreur::LigneIntrouvable(item_id));
        };
        if let Some(stock) = item.stock_disponible() {
            if nouvelle_quantite > stock {
                return Err(PanierErreur::StockInsuffisant {
                    stock,
                    demande: nouvelle_quantite,
                });
            }
        }

        // Mise à jour optimiste publiée avant l'appel réseau.
        let mut optimiste = instantane.clone();
        if let Some(ligne) = optimiste.items.iter_mut().find(|i| i.id == item_id) {
            ligne.quantite = nouvelle_quantite;
        }
        optimiste.recalculer_total();
        self.publier(optimiste);

        match self.api.maj_quantite(item_id, nouvelle_quantite).await {
            Ok(panier) => {
                self.publier(normaliser(panier));
                Ok(())
            }
            Err(erreur) => self.retablir_ou_conserver(instantane, erreur),
        }
    }

    pub async fn remove_item(&self, item_id: i64) -> Result<(), PanierErreur> {
        let instantane = self.panier_actuel();
        if instantane.item(item_id).is_none() {
            return Err(PanierErreur::LigneIntrouvable(item_id));
        }

        let mut optimiste = instantane.clone();
        optimiste.items.retain(|i| i.id != item_id);
        optimiste.recalculer_total();
        self.publier(optimiste);

        match self.api.supprimer_item(item_id).await {
            Ok(panier) => {
                self.publier(normaliser(panier));
                Ok(())
            }
            Err(erreur) => self.retablir_ou_conserver(instantane, erreur),
        }
    }

    /// Vide le panier. Pour une session anonyme, le panier vide est conservé
    /// quel que soit le résultat serveur.
    pub async fn clear_cart(&self) -> Result<(), PanierErreur> {
        let instantane = self.panier_actuel();
        let mut vide = Panier::vide();
        vide.id = instantane.id;
        vide.user_id = instantane.user_id;
        vide.session_id = instantane.session_id.clone();
        self.publier(vide);

        match self.api.vider_panier().await {
            Ok(()) => Ok(()),
            Err(erreur) => {
                if self.session.est_authentifie() {
                    warn!("vidage refusé par le serveur, retour à l'instantané: {erreur}");
                    self.publier(instantane);
                    Err(erreur.into())
                } else {
                    warn!("vidage hors ligne, panier anonyme vidé localement: {erreur}");
                    Ok(())
                }
            }
        }
    }

    /// Fusionne le panier de session anonyme dans le panier de
    /// l'utilisateur connecté. Au plus une migration par connexion ; en cas
    /// de succès le jeton de session est effacé, en cas d'échec il est
    /// conservé pour une reprise ultérieure et l'échec est remonté (les
    /// articles de session ne disparaissent pas en silence).
    pub async fn migrate_session_cart_to_user(&self) -> Result<(), PanierErreur> {
        if self.migration_faite.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(session_id) = self.session.session_id_persiste() else {
            self.load_cart().await;
            return Ok(());
        };

        match self.api.migrer_panier(&session_id).await {
            Ok(panier) => {
                self.session.effacer_session_id();
                self.publier(normaliser(panier));
                Ok(())
            }
            Err(erreur) => {
                warn!("migration du panier refusée, repli sur le panier utilisateur: {erreur}");
                self.load_cart().await;
                Err(erreur.into())
            }
        }
    }

    /// Réévalue les promotions de toutes les lignes ; ne recalcule le total
    /// et ne republie que si au moins une ligne a changé. Retourne true dans
    /// ce cas.
    pub fn reevaluer_promotions(&self) -> bool {
        let mut panier = self.panier_actuel();
        if !panier.reevaluer_promotions(Utc::now()) {
            return false;
        }
        panier.recalculer_total();
        self.publier(panier);
        true
    }

    /// Minuteur de réévaluation des promotions (toutes les 60 s par défaut).
    pub fn demarrer_surveillance_promotions(self: &Arc<Self>) {
        let service = Arc::clone(self);
        let poignee = tokio::spawn(async move {
            let mut tic = tokio::time::interval(service.config.intervalle_promotions);
            tic.tick().await; // le premier tick est immédiat
            loop {
                tic.tick().await;
                service.reevaluer_promotions();
            }
        });
        if let Some(precedente) = self.surveillance.lock().unwrap().replace(poignee) {
            precedente.abort();
        }
    }

    /// Démontage du composant : coupe le minuteur, les abonnements watch se
    /// ferment d'eux-mêmes à la chute des récepteurs.
    pub fn arreter_surveillance(&self) {
        if let Some(poignee) = self.surveillance.lock().unwrap().take() {
            poignee.abort();
        }
    }

    fn retablir_ou_conserver(
        &self,
        instantane: Panier,
        erreur: ApiErreur,
    ) -> Result<(), PanierErreur> {
        if self.session.est_authentifie() {
            warn!("mutation refusée par le serveur, retour à l'instantané: {erreur}");
            self.publier(instantane);
            Err(erreur.into())
        } else {
            // L'instantané optimiste déjà publié a aussi été persisté
            // localement : c'est l'état de référence d'une session anonyme.
            warn!("serveur injoignable, modification anonyme conservée localement: {erreur}");
            Ok(())
        }
    }

    fn publier(&self, panier: Panier) {
        *self.etat.lock().unwrap() = panier.clone();
        self.ecrire_cache(&panier);
        if panier.id != PANIER_NON_CREE {
            self.store.set(CLE_PANIER_ID, &panier.id.to_string());
        }
        self.canal.send_replace(panier);
    }

    fn ecrire_cache(&self, panier: &Panier) {
        let cache = CachePanier {
            panier: panier.clone(),
            expires_at: (Utc::now() + self.config.ttl_cache_panier).timestamp_millis(),
        };
        match serde_json::to_string(&cache) {
            Ok(json) => self.store.set(CLE_CACHE_PANIER, &json),
            Err(e) => warn!("instantané du panier non sérialisable: {e}"),
        }
    }

    fn lire_cache(&self) -> Option<Panier> {
        let brut = self.store.get(CLE_CACHE_PANIER)?;
        let cache: CachePanier = match serde_json::from_str(&brut) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("cache panier illisible, ignoré: {e}");
                self.store.remove(CLE_CACHE_PANIER);
                return None;
            }
        };
        if cache.expires_at <= Utc::now().timestamp_millis() {
            self.store.remove(CLE_CACHE_PANIER);
            return None;
        }
        Some(cache.panier)
    }

    fn replier_sur_cache(&self, erreur: &ApiErreur) {
        warn!("lecture du panier impossible ({erreur}), repli sur le cache local");
        if let Some(panier) = self.lire_cache() {
            self.publier(normaliser(panier));
        }
    }
}

fn normaliser(mut panier: Panier) -> Panier {
    panier.reevaluer_promotions(Utc::now());
    panier.recalculer_total();
    panier
}
