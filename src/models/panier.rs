use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bassin::{Accessoire, Bassin};
use super::commande::StatutLigne;
use crate::utils::prix::arrondir_montant;
use chrono::{DateTime, Utc};

/// Identifiant sentinelle d'un panier pas encore créé côté serveur.
pub const PANIER_NON_CREE: i64 = -1;

/// Options choisies pour un bassin personnalisé (fabriqué sur commande).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personnalisation {
    pub materiau: String,
    pub prix_materiau: Decimal,
    pub dimension: String,
    pub prix_dimension: Decimal,
    pub couleur: String,
    #[serde(default)]
    pub accessoires: Vec<Accessoire>,
    /// Estimation de durée de fabrication (ex: "3 à 4 semaines").
    pub duree_fabrication: Option<String>,
}

impl Personnalisation {
    pub fn prix_accessoires(&self) -> Decimal {
        self.accessoires.iter().map(|a| a.prix_accessoire).sum()
    }

    /// Clé d'identité d'une personnalisation : deux lignes dont les clés sont
    /// égales sont fusionnées (ajout = cumul de quantité). Les identifiants
    /// d'accessoires sont triés pour que l'ordre de sélection soit indifférent.
    pub fn cle_identite(&self) -> (String, String, String, Vec<i64>) {
        let mut ids: Vec<i64> = self.accessoires.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        (
            self.materiau.clone(),
            self.dimension.clone(),
            self.couleur.clone(),
            ids,
        )
    }
}

/// Ligne de panier : article standard du catalogue ou bassin personnalisé.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanierItem {
    pub id: i64,
    pub bassin_id: i32,
    pub quantite: i32,
    /// Prix unitaire avant promotion (prix de base pour une ligne personnalisée).
    pub prix_original: Decimal,
    #[serde(default)]
    pub is_customized: bool,
    pub personnalisation: Option<Personnalisation>,
    /// Instantané du produit catalogue référencé (stock, fenêtre de promotion).
    pub bassin: Option<Bassin>,
    // Champs de promotion dénormalisés, recalculés par le minuteur de
    // réévaluation quand la fenêtre de promotion du bassin change.
    #[serde(default)]
    pub promotion_active: bool,
    pub taux_reduction: Option<Decimal>,
    pub prix_promo: Option<Decimal>,
    pub statut: Option<StatutLigne>,
}

impl PanierItem {
    /// Prix unitaire avant application de la promotion.
    pub fn prix_brut(&self) -> Decimal {
        match (self.is_customized, &self.personnalisation) {
            (true, Some(p)) => {
                self.prix_original + p.prix_materiau + p.prix_dimension + p.prix_accessoires()
            }
            _ => self.prix_original,
        }
    }

    /// Prix unitaire effectif, promotion appliquée multiplicativement si et
    /// seulement si elle est active, arrondi à 2 décimales (demi-supérieur).
    pub fn prix_effectif(&self) -> Decimal {
        let brut = self.prix_brut();
        if self.promotion_active {
            let taux = self.taux_reduction.unwrap_or(Decimal::ZERO);
            arrondir_montant(brut * (Decimal::ONE - taux))
        } else {
            arrondir_montant(brut)
        }
    }

    /// Stock catalogue plafonnant la quantité ; None pour les lignes
    /// personnalisées (fabrication sur commande, aucun plafond).
    pub fn stock_disponible(&self) -> Option<i32> {
        if self.is_customized {
            return None;
        }
        self.bassin.as_ref().map(|b| b.stock)
    }

    /// Recalcule les champs de promotion dénormalisés depuis la fenêtre de
    /// dates du bassin référencé. Retourne true si un champ a changé.
    /// Sans instantané catalogue, les champs reçus du serveur sont conservés.
    pub fn reevaluer_promotion(&mut self, maintenant: DateTime<Utc>) -> bool {
        let Some(bassin) = self.bassin.as_ref() else {
            return false;
        };
        let promo = bassin.promotion.as_ref();
        let active = promo.is_some_and(|p| p.est_active_a(maintenant));
        let taux = if active {
            promo.map(|p| p.taux_reduction)
        } else {
            None
        };

        let avant = (self.promotion_active, self.taux_reduction, self.prix_promo);
        self.promotion_active = active;
        self.taux_reduction = taux;
        self.prix_promo = active.then(|| self.prix_effectif());

        avant != (self.promotion_active, self.taux_reduction, self.prix_promo)
    }
}

/// Panier : appartient soit à un utilisateur authentifié (user_id), soit à
/// une session anonyme (session_id), jamais aux deux.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panier {
    #[serde(default = "panier_non_cree")]
    pub id: i64,
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
    pub items: Vec<PanierItem>,
    /// Dérivé : somme des prix effectifs × quantités, jamais saisi.
    #[serde(default)]
    pub prix_total: Decimal,
}

fn panier_non_cree() -> i64 {
    PANIER_NON_CREE
}

impl Default for Panier {
    fn default() -> Self {
        Self::vide()
    }
}

impl Panier {
    pub fn vide() -> Self {
        Self {
            id: PANIER_NON_CREE,
            user_id: None,
            session_id: None,
            items: Vec::new(),
            prix_total: Decimal::ZERO,
        }
    }

    pub fn item(&self, item_id: i64) -> Option<&PanierItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Cherche une ligne personnalisée de même identité
    /// (bassin, matériau, dimension, couleur, ensemble d'accessoires).
    pub fn ligne_personnalisee_identique(
        &self,
        bassin_id: i32,
        personnalisation: &Personnalisation,
    ) -> Option<&PanierItem> {
        let cle = personnalisation.cle_identite();
        self.items.iter().find(|item| {
            item.is_customized
                && item.bassin_id == bassin_id
                && item
                    .personnalisation
                    .as_ref()
                    .is_some_and(|p| p.cle_identite() == cle)
        })
    }

    /// Invariant : prix_total == somme des prix effectifs × quantités.
    pub fn recalculer_total(&mut self) {
        let somme: Decimal = self
            .items
            .iter()
            .map(|item| item.prix_effectif() * Decimal::from(item.quantite))
            .sum();
        self.prix_total = arrondir_montant(somme);
    }

    /// Réévalue toutes les promotions du panier ; retourne true si au moins
    /// une ligne a changé (le total n'est recalculé que dans ce cas par
    /// l'appelant, pour éviter les republication inutiles).
    pub fn reevaluer_promotions(&mut self, maintenant: DateTime<Utc>) -> bool {
        let mut change = false;
        for item in &mut self.items {
            change |= item.reevaluer_promotion(maintenant);
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::promotion::Promotion;
    use chrono::Duration;

    fn ligne_standard(prix: Decimal, quantite: i32) -> PanierItem {
        PanierItem {
            id: 1,
            bassin_id: 10,
            quantite,
            prix_original: prix,
            is_customized: false,
            personnalisation: None,
            bassin: None,
            promotion_active: false,
            taux_reduction: None,
            prix_promo: None,
            statut: None,
        }
    }

    fn ligne_personnalisee() -> PanierItem {
        // base 200, matériau +50, dimension +30, accessoires +20
        PanierItem {
            id: 2,
            bassin_id: 20,
            quantite: 1,
            prix_original: Decimal::from(200),
            is_customized: true,
            personnalisation: Some(Personnalisation {
                materiau: "Béton".to_string(),
                prix_materiau: Decimal::from(50),
                dimension: "200x150".to_string(),
                prix_dimension: Decimal::from(30),
                couleur: "Bleu".to_string(),
                accessoires: vec![
                    Accessoire {
                        id: 1,
                        nom: "Pompe".to_string(),
                        prix_accessoire: Decimal::from(12),
                    },
                    Accessoire {
                        id: 2,
                        nom: "Filtre".to_string(),
                        prix_accessoire: Decimal::from(8),
                    },
                ],
                duree_fabrication: Some("3 semaines".to_string()),
            }),
            bassin: None,
            promotion_active: false,
            taux_reduction: None,
            prix_promo: None,
            statut: None,
        }
    }

    fn bassin_avec_promotion(maintenant: DateTime<Utc>, debut: i64, fin: i64) -> Bassin {
        Bassin {
            id: 10,
            nom: "Bassin rond".to_string(),
            description: None,
            prix: Decimal::from(100),
            stock: 5,
            sur_commande: false,
            image_url: None,
            promotion: Some(Promotion {
                id: 7,
                taux_reduction: Decimal::new(25, 2),
                date_debut: maintenant + Duration::hours(debut),
                date_fin: maintenant + Duration::hours(fin),
            }),
        }
    }

    #[test]
    fn test_prix_effectif_standard_sans_promotion() {
        let ligne = ligne_standard(Decimal::from(100), 1);
        assert_eq!(ligne.prix_effectif(), Decimal::from(100));
    }

    #[test]
    fn test_prix_effectif_standard_avec_promotion() {
        // prixOriginal=100, taux=0.25 actif => 75.00
        let mut ligne = ligne_standard(Decimal::from(100), 1);
        ligne.promotion_active = true;
        ligne.taux_reduction = Some(Decimal::new(25, 2));
        assert_eq!(ligne.prix_effectif(), Decimal::from(75));
    }

    #[test]
    fn test_prix_effectif_personnalise() {
        // 200 + 50 + 30 + 20 = 300
        let ligne = ligne_personnalisee();
        assert_eq!(ligne.prix_effectif(), Decimal::from(300));
    }

    #[test]
    fn test_prix_effectif_personnalise_avec_promotion() {
        let mut ligne = ligne_personnalisee();
        ligne.promotion_active = true;
        ligne.taux_reduction = Some(Decimal::new(10, 2));
        // 300 * 0.90 = 270
        assert_eq!(ligne.prix_effectif(), Decimal::from(270));
    }

    #[test]
    fn test_recalculer_total() {
        // Scénario concret : 100×1 standard + 300×1 personnalisé = 400
        let mut panier = Panier::vide();
        panier.items.push(ligne_standard(Decimal::from(100), 1));
        panier.items.push(ligne_personnalisee());
        panier.recalculer_total();
        assert_eq!(panier.prix_total, Decimal::from(400));
    }

    #[test]
    fn test_total_suit_les_quantites() {
        let mut panier = Panier::vide();
        panier.items.push(ligne_standard(Decimal::new(3333, 2), 3)); // 33.33 × 3
        panier.recalculer_total();
        assert_eq!(panier.prix_total, Decimal::new(9999, 2));
    }

    #[test]
    fn test_cle_identite_insensible_a_l_ordre_des_accessoires() {
        let ligne = ligne_personnalisee();
        let mut inversee = ligne.clone();
        inversee
            .personnalisation
            .as_mut()
            .unwrap()
            .accessoires
            .reverse();

        let mut panier = Panier::vide();
        panier.items.push(ligne);
        let perso = inversee.personnalisation.as_ref().unwrap();
        assert!(
            panier
                .ligne_personnalisee_identique(20, perso)
                .is_some(),
            "l'ordre des accessoires ne doit pas changer l'identité"
        );
    }

    #[test]
    fn test_stock_jamais_plafonne_pour_le_personnalise() {
        let ligne = ligne_personnalisee();
        assert_eq!(ligne.stock_disponible(), None);
    }

    #[test]
    fn test_reevaluation_idempotente() {
        let maintenant = Utc::now();
        let mut ligne = ligne_standard(Decimal::from(100), 1);
        ligne.bassin = Some(bassin_avec_promotion(maintenant, -1, 1));

        assert!(ligne.reevaluer_promotion(maintenant));
        assert!(ligne.promotion_active);
        assert_eq!(ligne.prix_promo, Some(Decimal::from(75)));

        // Deuxième évaluation sans changement d'horloge : aucun effet.
        assert!(!ligne.reevaluer_promotion(maintenant));
        assert_eq!(ligne.taux_reduction, Some(Decimal::new(25, 2)));
        assert_eq!(ligne.prix_promo, Some(Decimal::from(75)));
    }

    #[test]
    fn test_promotion_expiree_au_recheck() {
        let maintenant = Utc::now();
        let mut ligne = ligne_standard(Decimal::from(100), 1);
        ligne.bassin = Some(bassin_avec_promotion(maintenant, -2, 1));

        ligne.reevaluer_promotion(maintenant);
        assert_eq!(ligne.prix_effectif(), Decimal::from(75));

        // Une fois la fenêtre dépassée, le prix catalogue revient.
        let apres_fin = maintenant + Duration::hours(2);
        assert!(ligne.reevaluer_promotion(apres_fin));
        assert!(!ligne.promotion_active);
        assert_eq!(ligne.prix_effectif(), Decimal::from(100));
    }

    #[test]
    fn test_ligne_sans_instantane_catalogue_conservee() {
        let mut ligne = ligne_standard(Decimal::from(100), 1);
        ligne.promotion_active = true;
        ligne.taux_reduction = Some(Decimal::new(10, 2));
        // Pas de bassin lié : impossible de recalculer, on garde le serveur.
        assert!(!ligne.reevaluer_promotion(Utc::now()));
        assert!(ligne.promotion_active);
    }
}
