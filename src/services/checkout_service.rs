// Orchestrateur de checkout : validation des deux formulaires, projection
// des lignes de panier en lignes de commande et création de la commande.

use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationErrors};

use super::panier_service::PanierService;
use crate::api::commande_api::CommandeApi;
use crate::api::error::ApiErreur;
use crate::config::Config;
use crate::models::commande::{Commande, LigneCommande, StatutLigne};
use crate::models::dto::{AdresseLivraison, ClientInfo, CreationCommandeRequest};
use crate::models::panier::{Panier, PanierItem};
use crate::utils::prix::arrondir_montant;
use crate::utils::validation::tronquer;

/// Plafond par défaut des colonnes texte du backend.
const LONGUEUR_MAX_CHAMP: usize = 255;

#[derive(Debug, Error)]
pub enum CheckoutErreur {
    #[error("formulaire {formulaire} invalide")]
    FormulaireInvalide {
        formulaire: &'static str,
        erreurs: ValidationErrors,
    },
    #[error("le panier est vide")]
    PanierVide,
    #[error(transparent)]
    Api(#[from] ApiErreur),
}

pub struct CheckoutService {
    commandes: Arc<dyn CommandeApi>,
    config: Config,
}

impl CheckoutService {
    pub fn new(commandes: Arc<dyn CommandeApi>, config: Config) -> Self {
        Self { commandes, config }
    }

    /// Valide les deux formulaires l'un après l'autre ; le premier
    /// formulaire invalide bloque la progression.
    pub fn valider_formulaires(
        client: &ClientInfo,
        livraison: &AdresseLivraison,
    ) -> Result<(), CheckoutErreur> {
        client
            .validate()
            .map_err(|erreurs| CheckoutErreur::FormulaireInvalide {
                formulaire: "client",
                erreurs,
            })?;
        livraison
            .validate()
            .map_err(|erreurs| CheckoutErreur::FormulaireInvalide {
                formulaire: "livraison",
                erreurs,
            })?;
        Ok(())
    }

    /// Projette le panier en requête de création de commande :
    /// troncature des champs longs, valeurs optionnelles ramenées à des
    /// chaînes vides, statut SUR_COMMANDE forcé pour toute ligne
    /// personnalisée, totaux TTC calculés.
    pub fn construire_requete(
        &self,
        panier: &Panier,
        client: &ClientInfo,
        livraison: &AdresseLivraison,
    ) -> Result<CreationCommandeRequest, CheckoutErreur> {
        if panier.items.is_empty() {
            return Err(CheckoutErreur::PanierVide);
        }

        let lignes: Vec<LigneCommande> = panier.items.iter().map(projeter_ligne).collect();

        let sous_total = arrondir_montant(
            panier
                .items
                .iter()
                .map(|i| i.prix_effectif() * Decimal::from(i.quantite))
                .sum(),
        );
        let tva = arrondir_montant(sous_total * self.config.taux_tva);
        let frais_livraison = self.config.frais_livraison;
        let total = arrondir_montant(sous_total + tva + frais_livraison);

        Ok(CreationCommandeRequest {
            client: client.clone(),
            livraison: livraison.clone(),
            lignes,
            sous_total,
            tva,
            frais_livraison,
            total,
        })
    }

    /// Passe la commande : validation, projection, appel au backend puis
    /// vidage du panier (le panier est détruit après un placement réussi).
    pub async fn passer_commande(
        &self,
        paniers: &PanierService,
        client: &ClientInfo,
        livraison: &AdresseLivraison,
    ) -> Result<Commande, CheckoutErreur> {
        Self::valider_formulaires(client, livraison)?;
        let panier = paniers.panier_actuel();
        let requete = self.construire_requete(&panier, client, livraison)?;

        let commande = self.commandes.creer_commande(&requete).await?;
        info!(
            "commande {} créée ({} ligne(s), total {})",
            commande.numero_commande,
            requete.lignes.len(),
            requete.total
        );

        let _ = paniers.clear_cart().await;
        Ok(commande)
    }
}

fn projeter_ligne(item: &PanierItem) -> LigneCommande {
    let nom = item
        .bassin
        .as_ref()
        .map(|b| b.nom.clone())
        .unwrap_or_else(|| "Bassin personnalisé".to_string());
    let description = item
        .bassin
        .as_ref()
        .and_then(|b| b.description.clone())
        .unwrap_or_default();
    let duree_fabrication = item
        .personnalisation
        .as_ref()
        .and_then(|p| p.duree_fabrication.clone())
        .unwrap_or_default();

    // Une ligne personnalisée est toujours fabriquée à la demande, quel que
    // soit le statut porté par la ligne de panier.
    let statut = if item.is_customized {
        StatutLigne::SurCommande
    } else {
        item.statut.unwrap_or(StatutLigne::Disponible)
    };

    LigneCommande {
        bassin_id: item.bassin_id,
        nom_bassin: tronquer(&nom, LONGUEUR_MAX_CHAMP),
        description: tronquer(&description, LONGUEUR_MAX_CHAMP),
        quantite: item.quantite,
        prix_unitaire: item.prix_effectif(),
        statut,
        duree_fabrication: tronquer(&duree_fabrication, LONGUEUR_MAX_CHAMP),
    }
}
