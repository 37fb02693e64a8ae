use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::promotion::Promotion;

/// Produit du catalogue : bassin standard ou base d'un bassin personnalisé.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bassin {
    pub id: i32,
    pub nom: String,
    pub description: Option<String>,
    /// Prix catalogue (avant promotion).
    pub prix: Decimal,
    /// Stock disponible ; plafonne la quantité des lignes standard uniquement.
    pub stock: i32,
    #[serde(default)]
    pub sur_commande: bool,
    pub image_url: Option<String>,
    pub promotion: Option<Promotion>,
}

/// Accessoire sélectionnable lors de la personnalisation d'un bassin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessoire {
    pub id: i64,
    pub nom: String,
    pub prix_accessoire: Decimal,
}
