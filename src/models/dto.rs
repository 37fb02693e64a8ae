// DTO validés pour le checkout et les requêtes vers le backend

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::commande::LigneCommande;
use super::panier::Personnalisation;
use crate::utils::validation;

/// Identité du client saisie dans le premier formulaire de checkout.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    #[validate(length(min = 1, message = "nom requis"))]
    pub nom: String,
    #[validate(length(min = 1, message = "prénom requis"))]
    pub prenom: String,
    #[validate(email(message = "email invalide"))]
    pub email: String,
    /// Numéro local à 8 chiffres.
    #[validate(custom(function = "crate::utils::validation::valider_telephone"))]
    pub telephone: String,
}

/// Adresse de livraison saisie dans le second formulaire de checkout.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdresseLivraison {
    #[validate(length(min = 1, message = "rue requise"))]
    pub rue: String,
    #[validate(length(min = 1, message = "ville requise"))]
    pub ville: String,
    /// Code postal à 4 chiffres.
    #[validate(custom(function = "crate::utils::validation::valider_code_postal"))]
    pub code_postal: String,
}

/// Données carte saisies à l'étape de paiement. Jamais persistées côté
/// client, transmises une seule fois à l'initiation.
#[derive(Clone, Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CarteBancaire {
    #[validate(custom(function = "crate::utils::validation::valider_numero_carte"))]
    pub numero: String,
    #[validate(length(min = 1, message = "titulaire requis"))]
    pub titulaire: String,
    /// Format MM/YY ; refusée côté client si déjà échue.
    pub expiration: String,
    #[validate(custom(function = "crate::utils::validation::valider_cvv"))]
    pub cvv: String,
}

impl CarteBancaire {
    pub fn expiration_valide(&self, maintenant: DateTime<Utc>) -> bool {
        validation::expiration_carte_valide(&self.expiration, maintenant)
    }
}

/// Requête d'ajout d'un article au panier.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AjoutPanierRequest {
    pub bassin_id: i32,
    pub quantite: i32,
    #[serde(default)]
    pub is_customized: bool,
    pub personnalisation: Option<Personnalisation>,
}

/// Requête de création de commande envoyée par le checkout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationCommandeRequest {
    pub client: ClientInfo,
    pub livraison: AdresseLivraison,
    pub lignes: Vec<LigneCommande>,
    pub sous_total: Decimal,
    pub tva: Decimal,
    pub frais_livraison: Decimal,
    pub total: Decimal,
}
