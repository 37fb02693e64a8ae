use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Statut global d'une commande côté backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatutCommande {
    EnAttente,
    Validee,
    Expediee,
    Livree,
    Annulee,
}

/// Statut d'une ligne de commande. Les lignes personnalisées sont toujours
/// SUR_COMMANDE (fabrication à la demande), quel que soit le statut porté
/// par la ligne de panier d'origine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatutLigne {
    Disponible,
    SurCommande,
    RuptureStock,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LigneCommande {
    pub bassin_id: i32,
    pub nom_bassin: String,
    #[serde(default)]
    pub description: String,
    pub quantite: i32,
    pub prix_unitaire: Decimal,
    pub statut: StatutLigne,
    #[serde(default)]
    pub duree_fabrication: String,
}

/// Commande créée par le checkout, identifiée par un id numérique et un
/// numéro lisible (affiché au client et utilisé pour l'annulation).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commande {
    pub id: i64,
    pub numero_commande: String,
    pub statut: StatutCommande,
    #[serde(default)]
    pub lignes: Vec<LigneCommande>,
    pub sous_total: Decimal,
    pub tva: Decimal,
    pub frais_livraison: Decimal,
    pub total: Decimal,
    pub cree_le: Option<DateTime<Utc>>,
}
