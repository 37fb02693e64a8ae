use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiErreur;
use super::http::HttpApi;
use crate::models::dto::AjoutPanierRequest;
use crate::models::panier::Panier;

/// Formes de réponse observées sur les endpoints panier. Le backend renvoie
/// tantôt le panier nu, tantôt une enveloppe `{"panier": ...}` ; toute autre
/// forme est rejetée explicitement par l'adaptateur, jamais devinée.
/// L'enveloppe est essayée d'abord : un panier nu n'a pas de champ `panier`,
/// et un objet sans champ `items` ne passe pour aucun des deux.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PanierReponse {
    Enveloppe { panier: Panier },
    Direct(Panier),
    Inconnue(serde_json::Value),
}

pub fn adapter_reponse_panier(reponse: PanierReponse) -> Result<Panier, ApiErreur> {
    match reponse {
        PanierReponse::Direct(panier) | PanierReponse::Enveloppe { panier } => Ok(panier),
        PanierReponse::Inconnue(valeur) => Err(ApiErreur::Serveur(format!(
            "forme de réponse panier inconnue: {valeur}"
        ))),
    }
}

#[async_trait]
pub trait PanierApi: Send + Sync {
    async fn fetch_panier(&self) -> Result<Panier, ApiErreur>;
    async fn creer_panier(&self) -> Result<Panier, ApiErreur>;
    async fn ajouter_item(&self, requete: &AjoutPanierRequest) -> Result<Panier, ApiErreur>;
    async fn maj_quantite(&self, item_id: i64, quantite: i32) -> Result<Panier, ApiErreur>;
    async fn supprimer_item(&self, item_id: i64) -> Result<Panier, ApiErreur>;
    async fn vider_panier(&self) -> Result<(), ApiErreur>;
    async fn migrer_panier(&self, session_id: &str) -> Result<Panier, ApiErreur>;
}

#[async_trait]
impl PanierApi for HttpApi {
    async fn fetch_panier(&self) -> Result<Panier, ApiErreur> {
        let reponse = self.executer(self.requete(Method::GET, "/cart")).await?;
        adapter_reponse_panier(reponse)
    }

    async fn creer_panier(&self) -> Result<Panier, ApiErreur> {
        let reponse = self.executer(self.requete(Method::POST, "/cart")).await?;
        adapter_reponse_panier(reponse)
    }

    async fn ajouter_item(&self, requete: &AjoutPanierRequest) -> Result<Panier, ApiErreur> {
        let reponse = self
            .executer(self.requete(Method::POST, "/cart/items").json(requete))
            .await?;
        adapter_reponse_panier(reponse)
    }

    async fn maj_quantite(&self, item_id: i64, quantite: i32) -> Result<Panier, ApiErreur> {
        let chemin = format!("/cart/items/{item_id}/quantity");
        let reponse = self
            .executer(
                self.requete(Method::PUT, &chemin)
                    .json(&json!({ "quantite": quantite })),
            )
            .await?;
        adapter_reponse_panier(reponse)
    }

    async fn supprimer_item(&self, item_id: i64) -> Result<Panier, ApiErreur> {
        let chemin = format!("/cart/items/{item_id}");
        let reponse = self
            .executer(self.requete(Method::DELETE, &chemin))
            .await?;
        adapter_reponse_panier(reponse)
    }

    async fn vider_panier(&self) -> Result<(), ApiErreur> {
        self.executer_sans_corps(self.requete(Method::DELETE, "/cart"))
            .await
    }

    async fn migrer_panier(&self, session_id: &str) -> Result<Panier, ApiErreur> {
        let reponse = self
            .executer(
                self.requete(Method::POST, "/cart/migrate")
                    .json(&json!({ "sessionId": session_id })),
            )
            .await?;
        adapter_reponse_panier(reponse)
    }
}
