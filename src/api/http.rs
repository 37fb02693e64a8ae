use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::error::ApiErreur;
use crate::config::Config;
use crate::services::session_service::{Identite, SessionService};

/// En-tête d'identité anonyme, porteur du jeton de session.
pub const ENTETE_SESSION: &str = "X-Session-ID";

/// Implémentation reqwest commune des traits d'API. L'identité (Bearer ou
/// session anonyme) est relue à chaque requête auprès du SessionService.
pub struct HttpApi {
    client: Client,
    base_url: String,
    session: Arc<SessionService>,
}

impl HttpApi {
    pub fn new(config: &Config, session: Arc<SessionService>) -> Result<Self, ApiErreur> {
        let client = Client::builder()
            .timeout(config.delai_requete)
            .build()
            .map_err(|e| ApiErreur::Reseau(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Une seule identité par requête : Bearer JWT ou X-Session-ID,
    /// jamais les deux.
    pub(crate) fn requete(&self, methode: Method, chemin: &str) -> RequestBuilder {
        let constructeur = self
            .client
            .request(methode, format!("{}{}", self.base_url, chemin));
        match self.session.identite() {
            Identite::Authentifie { token, .. } => {
                constructeur.header(AUTHORIZATION, format!("Bearer {token}"))
            }
            Identite::Anonyme { session_id } => constructeur.header(ENTETE_SESSION, session_id),
        }
    }

    pub(crate) async fn executer<T: DeserializeOwned>(
        &self,
        requete: RequestBuilder,
    ) -> Result<T, ApiErreur> {
        let reponse = requete.send().await.map_err(convertir_erreur_transport)?;
        let statut = reponse.status();
        if statut.is_success() {
            reponse
                .json::<T>()
                .await
                .map_err(|e| ApiErreur::Serveur(format!("réponse illisible: {e}")))
        } else {
            let corps = reponse.text().await.unwrap_or_default();
            Err(ApiErreur::depuis_statut(statut.as_u16(), &corps))
        }
    }

    pub(crate) async fn executer_sans_corps(
        &self,
        requete: RequestBuilder,
    ) -> Result<(), ApiErreur> {
        let reponse = requete.send().await.map_err(convertir_erreur_transport)?;
        let statut = reponse.status();
        if statut.is_success() {
            Ok(())
        } else {
            let corps = reponse.text().await.unwrap_or_default();
            Err(ApiErreur::depuis_statut(statut.as_u16(), &corps))
        }
    }
}

fn convertir_erreur_transport(erreur: reqwest::Error) -> ApiErreur {
    if erreur.is_timeout() {
        ApiErreur::DelaiDepasse
    } else {
        ApiErreur::Reseau(erreur.to_string())
    }
}
