use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::ApiErreur;
use super::http::HttpApi;

/// Données d'initiation envoyées une seule fois, jamais persistées.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiationPaiementRequest {
    pub commande_id: i64,
    pub numero_carte: String,
    pub titulaire: String,
    pub expiration: String,
    pub cvv: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiationPaiementReponse {
    pub transaction_id: i64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReponse {
    pub reference_paiement: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationCodeReponse {
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatutPaiementReponse {
    pub statut: String,
}

#[async_trait]
pub trait PaiementApi: Send + Sync {
    async fn initier(
        &self,
        requete: &InitiationPaiementRequest,
    ) -> Result<InitiationPaiementReponse, ApiErreur>;
    async fn verifier(
        &self,
        transaction_id: i64,
        code: &str,
    ) -> Result<VerificationReponse, ApiErreur>;
    async fn renvoyer_code(&self, transaction_id: i64) -> Result<(), ApiErreur>;
    async fn statut(&self, transaction_id: i64) -> Result<StatutPaiementReponse, ApiErreur>;
    async fn expiration_code(&self, transaction_id: i64) -> Result<DateTime<Utc>, ApiErreur>;
    async fn annuler(&self, transaction_id: i64) -> Result<(), ApiErreur>;
}

#[async_trait]
impl PaiementApi for HttpApi {
    async fn initier(
        &self,
        requete: &InitiationPaiementRequest,
    ) -> Result<InitiationPaiementReponse, ApiErreur> {
        self.executer(self.requete(Method::POST, "/payments/initiate").json(requete))
            .await
    }

    async fn verifier(
        &self,
        transaction_id: i64,
        code: &str,
    ) -> Result<VerificationReponse, ApiErreur> {
        self.executer(
            self.requete(Method::POST, "/payments/verify")
                .json(&json!({ "transactionId": transaction_id, "code": code })),
        )
        .await
    }

    async fn renvoyer_code(&self, transaction_id: i64) -> Result<(), ApiErreur> {
        self.executer_sans_corps(
            self.requete(Method::POST, "/payments/resend-code")
                .json(&json!({ "transactionId": transaction_id })),
        )
        .await
    }

    async fn statut(&self, transaction_id: i64) -> Result<StatutPaiementReponse, ApiErreur> {
        let chemin = format!("/payments/{transaction_id}/status");
        self.executer(self.requete(Method::GET, &chemin)).await
    }

    async fn expiration_code(&self, transaction_id: i64) -> Result<DateTime<Utc>, ApiErreur> {
        let chemin = format!("/payments/code-expiry/{transaction_id}");
        let reponse: ExpirationCodeReponse =
            self.executer(self.requete(Method::GET, &chemin)).await?;
        Ok(reponse.expires_at)
    }

    async fn annuler(&self, transaction_id: i64) -> Result<(), ApiErreur> {
        let chemin = format!("/payments/{transaction_id}/cancel");
        self.executer_sans_corps(self.requete(Method::POST, &chemin))
            .await
    }
}
