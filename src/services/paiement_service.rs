// ============================================================================
// SERVICE PAIEMENT - PROTOCOLE DE RÉSERVATION
// ============================================================================
//
// Description:
//   Machine à états linéaire d'une tentative de paiement :
//   SaisieFormulaire → CommandeCreee → CarteSoumise → CodeEnvoye → Verifie,
//   avec Annule atteignable depuis toute étape non terminale.
//
// Points d'attention:
//   - Garantie d'abandon : tout démontage avant Verifie DOIT annuler la
//     commande en attente, exactement une fois. Tous les déclencheurs
//     (confirmation de sortie, démontage, expiration, renvois épuisés)
//     passent par finaliser(), idempotent grâce à un compare-and-set.
//   - Le compte à rebours du code suit l'expiration FOURNIE PAR LE SERVEUR ;
//     le défaut de 10 minutes ne sert que si cette lecture échoue.
//   - Les erreurs de paiement ne se dégradent jamais en silence : chacune
//     porte une action proposée (réessayer, annuler, se reconnecter).
//
// ============================================================================

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use validator::{Validate, ValidationErrors};

use crate::api::commande_api::CommandeApi;
use crate::api::error::{ActionCorrective, ApiErreur, CauseValidation};
use crate::api::paiement_api::{InitiationPaiementRequest, PaiementApi};
use crate::config::Config;
use crate::models::commande::Commande;
use crate::models::dto::CarteBancaire;
use crate::models::transaction::{EtapePaiement, TransactionEnCours};
use crate::utils::storage::KeyValueStore;
use crate::utils::validation;

/// Nombre maximal de renvois du code de vérification.
const MAX_RENVOIS: u8 = 3;

#[derive(Debug, Error)]
pub enum PaiementErreur {
    #[error("transition impossible depuis l'étape {0:?}")]
    EtapeInvalide(EtapePaiement),
    #[error("carte expirée")]
    CarteExpiree,
    #[error("données de carte invalides")]
    CarteInvalide(ValidationErrors),
    #[error("code mal formé: 6 chiffres attendus")]
    CodeMalForme,
    #[error("nombre maximal de renvois atteint, commande annulée")]
    RenvoisEpuises,
    #[error(transparent)]
    Api(#[from] ApiErreur),
}

impl PaiementErreur {
    /// Action à proposer à l'utilisateur (boîte de dialogue bloquante côté
    /// interface) : la correction d'un paiement n'est jamais silencieuse.
    pub fn action_proposee(&self) -> ActionCorrective {
        match self {
            Self::Api(erreur) => erreur.action_proposee(),
            Self::RenvoisEpuises => ActionCorrective::Annuler,
            _ => ActionCorrective::Message,
        }
    }
}

#[derive(Default)]
struct FluxPaiement {
    etape: EtapePaiement,
    commande_id: Option<i64>,
    numero_commande: Option<String>,
    transaction_id: Option<i64>,
    renvois: u8,
    expire_a: Option<DateTime<Utc>>,
    cree_le: Option<DateTime<Utc>>,
}

pub struct PaiementService {
    paiements: Arc<dyn PaiementApi>,
    commandes: Arc<dyn CommandeApi>,
    session_store: Arc<dyn KeyValueStore>,
    config: Config,
    etat: tokio::sync::Mutex<FluxPaiement>,
    /// Drapeau à usage unique : le premier déclencheur qui le gagne
    /// finalise le flux, les suivants sont des no-op.
    finalise: AtomicBool,
    compte_a_rebours: watch::Sender<i64>,
    tic: Mutex<Option<JoinHandle<()>>>,
}

impl PaiementService {
    pub fn new(
        paiements: Arc<dyn PaiementApi>,
        commandes: Arc<dyn CommandeApi>,
        session_store: Arc<dyn KeyValueStore>,
        config: Config,
    ) -> Self {
        let (compte_a_rebours, _) = watch::channel(0);
        Self {
            paiements,
            commandes,
            session_store,
            config,
            etat: tokio::sync::Mutex::new(FluxPaiement::default()),
            finalise: AtomicBool::new(false),
            compte_a_rebours,
            tic: Mutex::new(None),
        }
    }

    /// Entre dans le flux après la création de la commande par le checkout.
    /// L'enregistrement de session permet au flux de survivre à un
    /// rechargement de page.
    pub async fn demarrer(&self, commande: &Commande) {
        let mut etat = self.etat.lock().await;
        *etat = FluxPaiement {
            etape: EtapePaiement::CommandeCreee,
            commande_id: Some(commande.id),
            numero_commande: Some(commande.numero_commande.clone()),
            cree_le: Some(Utc::now()),
            ..FluxPaiement::default()
        };
        self.finalise.store(false, Ordering::SeqCst);
        self.persister_transaction(&etat);
    }

    /// Reprise après rechargement : reconstruit le flux depuis le stockage
    /// de session. Un enregistrement au-delà de la fenêtre d'expiration est
    /// un déchet annulable : purgé, et la commande annulée au mieux.
    pub async fn reprendre(&self) -> Option<TransactionEnCours> {
        let brut = self.session_store.get(TransactionEnCours::CLE)?;
        let enregistrement: TransactionEnCours = match serde_json::from_str(&brut) {
            Ok(enregistrement) => enregistrement,
            Err(e) => {
                warn!("enregistrement de transaction illisible, purgé: {e}");
                self.session_store.remove(TransactionEnCours::CLE);
                return None;
            }
        };

        if enregistrement.est_expiree(Utc::now(), self.config.duree_transaction) {
            warn!(
                "transaction de session expirée, annulation de la commande {}",
                enregistrement.numero_commande
            );
            if let Err(erreur) = self
                .commandes
                .annuler_commande(&enregistrement.numero_commande)
                .await
            {
                error!("annulation de la commande périmée impossible: {erreur}");
            }
            self.session_store.remove(TransactionEnCours::CLE);
            return None;
        }

        let mut etat = self.etat.lock().await;
        *etat = FluxPaiement {
            etape: if enregistrement.transaction_id.is_some() {
                EtapePaiement::CarteSoumise
            } else {
                EtapePaiement::CommandeCreee
            },
            commande_id: Some(enregistrement.commande_id),
            numero_commande: Some(enregistrement.numero_commande.clone()),
            transaction_id: enregistrement.transaction_id,
            cree_le: Some(enregistrement.cree_le),
            ..FluxPaiement::default()
        };
        self.finalise.store(false, Ordering::SeqCst);
        Some(enregistrement)
    }

    /// Soumet la carte au backend. L'expiration est refusée côté client si
    /// elle est déjà échue ; le serveur émet ensuite le code de vérification
    /// et le compte à rebours démarre sur l'expiration qu'il fournit.
    pub async fn soumettre_carte(&self, carte: &CarteBancaire) -> Result<(), PaiementErreur> {
        carte.validate().map_err(PaiementErreur::CarteInvalide)?;
        if !carte.expiration_valide(Utc::now()) {
            return Err(PaiementErreur::CarteExpiree);
        }

        let mut etat = self.etat.lock().await;
        if etat.etape != EtapePaiement::CommandeCreee {
            return Err(PaiementErreur::EtapeInvalide(etat.etape));
        }
        let Some(commande_id) = etat.commande_id else {
            return Err(PaiementErreur::EtapeInvalide(etat.etape));
        };

        let requete = InitiationPaiementRequest {
            commande_id,
            numero_carte: carte.numero.clone(),
            titulaire: carte.titulaire.clone(),
            expiration: carte.expiration.clone(),
            cvv: carte.cvv.clone(),
        };
        let reponse = self.paiements.initier(&requete).await?;
        etat.transaction_id = Some(reponse.transaction_id);
        etat.etape = EtapePaiement::CarteSoumise;
        self.persister_transaction(&etat);

        etat.expire_a = Some(self.expiration_ou_defaut(reponse.transaction_id).await);
        etat.etape = EtapePaiement::CodeEnvoye;
        self.maj_compte_a_rebours(&etat);
        Ok(())
    }

    /// Soumet le code de vérification. Le succès finalise la commande,
    /// purge le stockage de session et neutralise la garantie d'abandon.
    pub async fn verifier_code(&self, code: &str) -> Result<String, PaiementErreur> {
        if !validation::code_verification_bien_forme(code) {
            return Err(PaiementErreur::CodeMalForme);
        }

        let mut etat = self.etat.lock().await;
        if etat.etape != EtapePaiement::CodeEnvoye {
            return Err(PaiementErreur::EtapeInvalide(etat.etape));
        }
        let Some(transaction_id) = etat.transaction_id else {
            return Err(PaiementErreur::EtapeInvalide(etat.etape));
        };

        match self.paiements.verifier(transaction_id, code).await {
            Ok(reponse) => {
                etat.etape = EtapePaiement::Verifie;
                // Flux accompli : plus rien à annuler au démontage.
                self.finalise.store(true, Ordering::SeqCst);
                self.session_store.remove(TransactionEnCours::CLE);
                drop(etat);
                self.arreter_compte_a_rebours();
                info!("paiement vérifié, référence {}", reponse.reference_paiement);
                Ok(reponse.reference_paiement)
            }
            Err(erreur) => {
                let tentatives_epuisees = matches!(
                    &erreur,
                    ApiErreur::Validation {
                        cause: CauseValidation::TentativesEpuisees,
                        ..
                    }
                );
                drop(etat);
                if tentatives_epuisees {
                    self.finaliser().await;
                }
                Err(erreur.into())
            }
        }
    }

    /// Renvoie un nouveau code, borné à MAX_RENVOIS ; au-delà, le flux est
    /// finalisé et la commande annulée.
    pub async fn renvoyer_code(&self) -> Result<(), PaiementErreur> {
        let mut etat = self.etat.lock().await;
        if etat.etape != EtapePaiement::CodeEnvoye {
            return Err(PaiementErreur::EtapeInvalide(etat.etape));
        }
        let Some(transaction_id) = etat.transaction_id else {
            return Err(PaiementErreur::EtapeInvalide(etat.etape));
        };
        if etat.renvois >= MAX_RENVOIS {
            drop(etat);
            self.finaliser().await;
            return Err(PaiementErreur::RenvoisEpuises);
        }

        etat.renvois += 1;
        self.paiements.renvoyer_code(transaction_id).await?;
        etat.expire_a = Some(self.expiration_ou_defaut(transaction_id).await);
        self.maj_compte_a_rebours(&etat);
        Ok(())
    }

    /// Tic d'une seconde : publie les secondes restantes ; à zéro, renvoi
    /// automatique s'il reste des tentatives, sinon finalisation.
    pub fn demarrer_compte_a_rebours(self: &Arc<Self>) {
        let service = Arc::clone(self);
        let poignee = tokio::spawn(async move {
            let mut tic = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                tic.tick().await;
                let (restantes, etape) = {
                    let etat = service.etat.lock().await;
                    (secondes_avant(etat.expire_a), etat.etape)
                };
                if etape.est_terminale() {
                    break;
                }
                if etape != EtapePaiement::CodeEnvoye {
                    continue;
                }
                service.compte_a_rebours.send_replace(restantes);
                if restantes == 0 {
                    service.expiration_atteinte().await;
                }
            }
        });
        if let Some(precedente) = self.tic.lock().unwrap().replace(poignee) {
            precedente.abort();
        }
    }

    pub fn subscribe_compte_a_rebours(&self) -> watch::Receiver<i64> {
        self.compte_a_rebours.subscribe()
    }

    pub async fn secondes_restantes(&self) -> i64 {
        secondes_avant(self.etat.lock().await.expire_a)
    }

    pub async fn etape(&self) -> EtapePaiement {
        self.etat.lock().await.etape
    }

    /// Relit la commande courante (vue de confirmation après rechargement).
    pub async fn commande_courante(&self) -> Result<Commande, PaiementErreur> {
        let numero = self.etat.lock().await.numero_commande.clone();
        let Some(numero) = numero else {
            return Err(PaiementErreur::EtapeInvalide(self.etape().await));
        };
        Ok(self.commandes.commande_par_numero(&numero).await?)
    }

    /// Statut serveur de la transaction : la vue de confirmation s'en sert
    /// quand la réponse de vérification croise la redirection.
    pub async fn statut_transaction(&self) -> Result<String, PaiementErreur> {
        let transaction_id = self.etat.lock().await.transaction_id;
        let Some(transaction_id) = transaction_id else {
            return Err(PaiementErreur::EtapeInvalide(self.etape().await));
        };
        Ok(self.paiements.statut(transaction_id).await?.statut)
    }

    /// Finalisation idempotente du flux. Quel que soit le déclencheur
    /// (confirmation de sortie, démontage du composant, expiration du code,
    /// renvois épuisés), seul le premier appel gagne le compare-and-set ;
    /// la commande en attente est annulée exactement une fois, et jamais
    /// après Verifie.
    pub async fn finaliser(&self) {
        if self
            .finalise
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.arreter_compte_a_rebours();

        let mut etat = self.etat.lock().await;
        if !etat.etape.est_terminale() {
            if let Some(transaction_id) = etat.transaction_id {
                if let Err(erreur) = self.paiements.annuler(transaction_id).await {
                    warn!("annulation de la transaction {transaction_id} impossible: {erreur}");
                }
            }
            if let Some(numero) = etat.numero_commande.clone() {
                info!("abandon du flux de paiement, annulation de la commande {numero}");
                if let Err(erreur) = self.commandes.annuler_commande(&numero).await {
                    error!("annulation de la commande {numero} impossible: {erreur}");
                }
            }
            etat.etape = EtapePaiement::Annule;
        }
        self.session_store.remove(TransactionEnCours::CLE);
    }

    /// Crochet de démontage du composant : finalise sans condition.
    pub async fn teardown(&self) {
        self.finaliser().await;
    }

    /// Sortie confirmée par l'utilisateur (garde de navigation).
    pub async fn confirmer_abandon(&self) {
        self.finaliser().await;
    }

    pub fn arreter_compte_a_rebours(&self) {
        if let Some(poignee) = self.tic.lock().unwrap().take() {
            poignee.abort();
        }
    }

    async fn expiration_atteinte(&self) {
        let renvois = self.etat.lock().await.renvois;
        if renvois < MAX_RENVOIS {
            if let Err(erreur) = self.renvoyer_code().await {
                warn!("renvoi automatique impossible: {erreur}");
                self.finaliser().await;
            }
        } else {
            self.finaliser().await;
        }
    }

    async fn expiration_ou_defaut(&self, transaction_id: i64) -> DateTime<Utc> {
        match self.paiements.expiration_code(transaction_id).await {
            Ok(expire_a) => expire_a,
            Err(erreur) => {
                warn!("expiration du code illisible, défaut 10 minutes: {erreur}");
                Utc::now() + self.config.duree_code_defaut
            }
        }
    }

    fn maj_compte_a_rebours(&self, etat: &FluxPaiement) {
        self.compte_a_rebours.send_replace(secondes_avant(etat.expire_a));
    }

    fn persister_transaction(&self, etat: &FluxPaiement) {
        let (Some(commande_id), Some(numero_commande)) =
            (etat.commande_id, etat.numero_commande.clone())
        else {
            return;
        };
        let enregistrement = TransactionEnCours {
            commande_id,
            numero_commande,
            transaction_id: etat.transaction_id,
            cree_le: etat.cree_le.unwrap_or_else(Utc::now),
        };
        match serde_json::to_string(&enregistrement) {
            Ok(json) => self.session_store.set(TransactionEnCours::CLE, &json),
            Err(e) => warn!("enregistrement de transaction non sérialisable: {e}"),
        }
    }
}

fn secondes_avant(expire_a: Option<DateTime<Utc>>) -> i64 {
    expire_a
        .map(|e| (e - Utc::now()).num_seconds().max(0))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::paiement_api::{InitiationPaiementReponse, StatutPaiementReponse, VerificationReponse};
    use crate::models::commande::StatutCommande;
    use crate::models::dto::CreationCommandeRequest;
    use crate::utils::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use std::sync::atomic::AtomicUsize;

    // ------------------------------------------------------------------
    // Doublures : backend paiement scriptable et compteur d'annulations.
    // ------------------------------------------------------------------
    #[derive(Default)]
    struct PaiementsFactices {
        echec_expiration: AtomicBool,
        renvois: AtomicUsize,
        annulations: AtomicUsize,
        tentatives_avant_blocage: AtomicUsize,
    }

    #[async_trait]
    impl PaiementApi for PaiementsFactices {
        async fn initier(
            &self,
            _requete: &InitiationPaiementRequest,
        ) -> Result<InitiationPaiementReponse, ApiErreur> {
            Ok(InitiationPaiementReponse { transaction_id: 77 })
        }

        async fn verifier(
            &self,
            _transaction_id: i64,
            code: &str,
        ) -> Result<VerificationReponse, ApiErreur> {
            if self.tentatives_avant_blocage.load(Ordering::SeqCst) > 0
                && self.tentatives_avant_blocage.fetch_sub(1, Ordering::SeqCst) == 1
            {
                return Err(ApiErreur::Validation {
                    message: "Nombre maximal de tentatives atteint".to_string(),
                    cause: CauseValidation::TentativesEpuisees,
                });
            }
            if code == "123456" {
                Ok(VerificationReponse {
                    reference_paiement: "PAY-77".to_string(),
                })
            } else {
                Err(ApiErreur::Validation {
                    message: "Code invalide".to_string(),
                    cause: CauseValidation::CodeInvalide,
                })
            }
        }

        async fn renvoyer_code(&self, _transaction_id: i64) -> Result<(), ApiErreur> {
            self.renvois.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn statut(&self, _transaction_id: i64) -> Result<StatutPaiementReponse, ApiErreur> {
            Ok(StatutPaiementReponse {
                statut: "EN_ATTENTE".to_string(),
            })
        }

        async fn expiration_code(&self, _transaction_id: i64) -> Result<DateTime<Utc>, ApiErreur> {
            if self.echec_expiration.load(Ordering::SeqCst) {
                return Err(ApiErreur::Serveur("indisponible".to_string()));
            }
            Ok(Utc::now() + Duration::seconds(120))
        }

        async fn annuler(&self, _transaction_id: i64) -> Result<(), ApiErreur> {
            self.annulations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CommandesComptables {
        annulations: AtomicUsize,
        dernier_numero: Mutex<Option<String>>,
    }

    #[async_trait]
    impl CommandeApi for CommandesComptables {
        async fn creer_commande(
            &self,
            _requete: &CreationCommandeRequest,
        ) -> Result<Commande, ApiErreur> {
            Err(ApiErreur::Introuvable)
        }

        async fn commande_par_numero(&self, _numero: &str) -> Result<Commande, ApiErreur> {
            Err(ApiErreur::Introuvable)
        }

        async fn maj_statut(
            &self,
            _id: i64,
            _statut: StatutCommande,
        ) -> Result<Commande, ApiErreur> {
            Err(ApiErreur::Introuvable)
        }

        async fn annuler_commande(&self, numero: &str) -> Result<(), ApiErreur> {
            self.annulations.fetch_add(1, Ordering::SeqCst);
            *self.dernier_numero.lock().unwrap() = Some(numero.to_string());
            Ok(())
        }
    }

    struct Banc {
        paiements: Arc<PaiementsFactices>,
        commandes: Arc<CommandesComptables>,
        store: Arc<MemoryStore>,
        service: Arc<PaiementService>,
    }

    fn banc() -> Banc {
        let paiements = Arc::new(PaiementsFactices::default());
        let commandes = Arc::new(CommandesComptables::default());
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(PaiementService::new(
            paiements.clone() as Arc<dyn PaiementApi>,
            commandes.clone() as Arc<dyn CommandeApi>,
            store.clone() as Arc<dyn KeyValueStore>,
            Config::default(),
        ));
        Banc {
            paiements,
            commandes,
            store,
            service,
        }
    }

    fn commande() -> Commande {
        Commande {
            id: 9,
            numero_commande: "CMD-2024-009".to_string(),
            statut: StatutCommande::EnAttente,
            lignes: vec![],
            sous_total: Decimal::from(400),
            tva: Decimal::from(76),
            frais_livraison: Decimal::from(20),
            total: Decimal::from(496),
            cree_le: None,
        }
    }

    fn carte_valide() -> CarteBancaire {
        CarteBancaire {
            numero: "4111111111111111".to_string(),
            titulaire: "AMINE BEN SALAH".to_string(),
            expiration: "12/99".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_abandon_annule_exactement_une_fois() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();

        // Démontage avant Verifie : une annulation, avec le bon numéro.
        banc.service.teardown().await;
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 1);
        assert_eq!(
            banc.commandes.dernier_numero.lock().unwrap().as_deref(),
            Some("CMD-2024-009")
        );
        // La transaction déjà initiée est également annulée.
        assert_eq!(banc.paiements.annulations.load(Ordering::SeqCst), 1);

        // Les déclencheurs concurrents sont des no-op.
        banc.service.teardown().await;
        banc.service.confirmer_abandon().await;
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 1);
        assert_eq!(banc.service.etape().await, EtapePaiement::Annule);
    }

    #[tokio::test]
    async fn test_abandon_sans_carte_soumise() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        banc.service.teardown().await;
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verification_puis_demontage_sans_annulation() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();

        let reference = banc.service.verifier_code("123456").await.unwrap();
        assert_eq!(reference, "PAY-77");
        assert_eq!(banc.service.etape().await, EtapePaiement::Verifie);
        // Le stockage de session est purgé à la vérification.
        assert_eq!(banc.store.get(TransactionEnCours::CLE), None);

        banc.service.teardown().await;
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_carte_echue_refusee_avant_envoi() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        let carte = CarteBancaire {
            expiration: "01/20".to_string(),
            ..carte_valide()
        };
        let erreur = banc.service.soumettre_carte(&carte).await.unwrap_err();
        assert!(matches!(erreur, PaiementErreur::CarteExpiree));
        assert_eq!(banc.service.etape().await, EtapePaiement::CommandeCreee);
    }

    #[tokio::test]
    async fn test_code_mal_forme_refuse_sans_appel() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();
        let erreur = banc.service.verifier_code("12ab56").await.unwrap_err();
        assert!(matches!(erreur, PaiementErreur::CodeMalForme));
        assert_eq!(banc.service.etape().await, EtapePaiement::CodeEnvoye);
    }

    #[tokio::test]
    async fn test_mauvais_code_puis_bon_code() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();

        let erreur = banc.service.verifier_code("000000").await.unwrap_err();
        assert!(matches!(
            erreur,
            PaiementErreur::Api(ApiErreur::Validation {
                cause: CauseValidation::CodeInvalide,
                ..
            })
        ));
        // Le flux reste à CodeEnvoye : l'utilisateur peut réessayer.
        assert_eq!(banc.service.etape().await, EtapePaiement::CodeEnvoye);

        banc.service.verifier_code("123456").await.unwrap();
        assert_eq!(banc.service.etape().await, EtapePaiement::Verifie);
    }

    #[tokio::test]
    async fn test_tentatives_epuisees_finalisent() {
        let banc = banc();
        banc.paiements
            .tentatives_avant_blocage
            .store(1, Ordering::SeqCst);
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();

        let erreur = banc.service.verifier_code("123456").await.unwrap_err();
        assert_eq!(erreur.action_proposee(), ActionCorrective::Annuler);
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 1);
        assert_eq!(banc.service.etape().await, EtapePaiement::Annule);
    }

    #[tokio::test]
    async fn test_renvois_bornes_puis_annulation() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();

        for _ in 0..3 {
            banc.service.renvoyer_code().await.unwrap();
        }
        assert_eq!(banc.paiements.renvois.load(Ordering::SeqCst), 3);

        // Le 4e renvoi dépasse la borne : flux finalisé, commande annulée.
        let erreur = banc.service.renvoyer_code().await.unwrap_err();
        assert!(matches!(erreur, PaiementErreur::RenvoisEpuises));
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiration_du_serveur_pilote_le_compte_a_rebours() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();

        let restantes = banc.service.secondes_restantes().await;
        assert!((115..=120).contains(&restantes), "restantes = {restantes}");
    }

    #[tokio::test]
    async fn test_defaut_dix_minutes_si_expiration_illisible() {
        let banc = banc();
        banc.paiements.echec_expiration.store(true, Ordering::SeqCst);
        banc.service.demarrer(&commande()).await;
        banc.service.soumettre_carte(&carte_valide()).await.unwrap();

        let restantes = banc.service.secondes_restantes().await;
        assert!((595..=600).contains(&restantes), "restantes = {restantes}");
    }

    #[tokio::test]
    async fn test_statut_transaction_pour_la_confirmation() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        // Pas encore de transaction : refusé.
        assert!(banc.service.statut_transaction().await.is_err());

        banc.service.soumettre_carte(&carte_valide()).await.unwrap();
        let statut = banc.service.statut_transaction().await.unwrap();
        assert_eq!(statut, "EN_ATTENTE");
    }

    #[tokio::test]
    async fn test_verification_hors_etape_refusee() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;
        let erreur = banc.service.verifier_code("123456").await.unwrap_err();
        assert!(matches!(erreur, PaiementErreur::EtapeInvalide(_)));
    }

    #[tokio::test]
    async fn test_reprise_apres_rechargement() {
        let banc = banc();
        banc.service.demarrer(&commande()).await;

        // Nouveau service sur le même stockage de session : la reprise
        // retrouve la commande en attente.
        let relance = PaiementService::new(
            banc.paiements.clone() as Arc<dyn PaiementApi>,
            banc.commandes.clone() as Arc<dyn CommandeApi>,
            banc.store.clone() as Arc<dyn KeyValueStore>,
            Config::default(),
        );
        let enregistrement = relance.reprendre().await.unwrap();
        assert_eq!(enregistrement.numero_commande, "CMD-2024-009");
        assert_eq!(relance.etape().await, EtapePaiement::CommandeCreee);
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reprise_d_un_enregistrement_perime() {
        let banc = banc();
        let perime = TransactionEnCours {
            commande_id: 9,
            numero_commande: "CMD-2024-009".to_string(),
            transaction_id: Some(77),
            cree_le: Utc::now() - Duration::minutes(45),
        };
        banc.store.set(
            TransactionEnCours::CLE,
            &serde_json::to_string(&perime).unwrap(),
        );

        // Déchet annulable : purge + annulation au mieux.
        assert!(banc.service.reprendre().await.is_none());
        assert_eq!(banc.commandes.annulations.load(Ordering::SeqCst), 1);
        assert_eq!(banc.store.get(TransactionEnCours::CLE), None);
    }
}
