use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Étapes du protocole de paiement, linéaire par tentative de checkout :
/// SaisieFormulaire → CommandeCreee → CarteSoumise → CodeEnvoye → Verifie,
/// avec Annule atteignable depuis toute étape non terminale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtapePaiement {
    #[default]
    SaisieFormulaire,
    CommandeCreee,
    CarteSoumise,
    CodeEnvoye,
    Verifie,
    Annule,
}

impl EtapePaiement {
    pub fn est_terminale(&self) -> bool {
        matches!(self, Self::Verifie | Self::Annule)
    }
}

/// Enregistrement de la transaction en cours, persisté en stockage de
/// session pour que le flux de paiement survive à un rechargement de page.
/// Au-delà de la fenêtre d'expiration (~30 min), l'enregistrement est un
/// déchet annulable : purgé et la commande en attente annulée.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnCours {
    pub commande_id: i64,
    pub numero_commande: String,
    pub transaction_id: Option<i64>,
    pub cree_le: DateTime<Utc>,
}

impl TransactionEnCours {
    /// Clé de stockage de session de l'enregistrement.
    pub const CLE: &'static str = "bassin_transaction_en_cours";

    pub fn est_expiree(&self, maintenant: DateTime<Utc>, duree: Duration) -> bool {
        maintenant - self.cree_le > duree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etapes_terminales() {
        assert!(EtapePaiement::Verifie.est_terminale());
        assert!(EtapePaiement::Annule.est_terminale());
        assert!(!EtapePaiement::CodeEnvoye.est_terminale());
        assert!(!EtapePaiement::SaisieFormulaire.est_terminale());
    }

    #[test]
    fn test_expiration_enregistrement() {
        let maintenant = Utc::now();
        let transaction = TransactionEnCours {
            commande_id: 1,
            numero_commande: "CMD-001".to_string(),
            transaction_id: None,
            cree_le: maintenant - Duration::minutes(31),
        };
        assert!(transaction.est_expiree(maintenant, Duration::minutes(30)));

        let recente = TransactionEnCours {
            cree_le: maintenant - Duration::minutes(5),
            ..transaction
        };
        assert!(!recente.est_expiree(maintenant, Duration::minutes(30)));
    }
}
