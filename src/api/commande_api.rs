use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use super::error::ApiErreur;
use super::http::HttpApi;
use crate::models::commande::{Commande, StatutCommande};
use crate::models::dto::CreationCommandeRequest;

#[async_trait]
pub trait CommandeApi: Send + Sync {
    async fn creer_commande(&self, requete: &CreationCommandeRequest)
    -> Result<Commande, ApiErreur>;
    /// Recherche par id numérique ou par numéro lisible (même endpoint).
    async fn commande_par_numero(&self, numero: &str) -> Result<Commande, ApiErreur>;
    async fn maj_statut(&self, id: i64, statut: StatutCommande) -> Result<Commande, ApiErreur>;
    async fn annuler_commande(&self, numero: &str) -> Result<(), ApiErreur>;
}

#[async_trait]
impl CommandeApi for HttpApi {
    async fn creer_commande(
        &self,
        requete: &CreationCommandeRequest,
    ) -> Result<Commande, ApiErreur> {
        self.executer(self.requete(Method::POST, "/orders").json(requete))
            .await
    }

    async fn commande_par_numero(&self, numero: &str) -> Result<Commande, ApiErreur> {
        let chemin = format!("/orders/{numero}");
        self.executer(self.requete(Method::GET, &chemin)).await
    }

    async fn maj_statut(&self, id: i64, statut: StatutCommande) -> Result<Commande, ApiErreur> {
        let chemin = format!("/orders/{id}/status");
        self.executer(
            self.requete(Method::PUT, &chemin)
                .json(&json!({ "statut": statut })),
        )
        .await
    }

    async fn annuler_commande(&self, numero: &str) -> Result<(), ApiErreur> {
        let chemin = format!("/orders/{numero}/cancel");
        self.executer_sans_corps(self.requete(Method::DELETE, &chemin))
            .await
    }
}
