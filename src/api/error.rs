use thiserror::Error;

/// Taxonomie des erreurs d'appel au backend.
///
/// Les lectures de panier se replient silencieusement sur le cache local ;
/// les erreurs du protocole de paiement sont toujours remontées avec une
/// action proposée, la correction d'un paiement ne se dégrade jamais en
/// silence.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApiErreur {
    /// Réseau injoignable (statut 0 : DNS, connexion refusée, ...).
    #[error("réseau injoignable: {0}")]
    Reseau(String),
    /// Délai client écoulé avant la réponse du serveur.
    #[error("délai d'attente dépassé")]
    DelaiDepasse,
    /// Requête refusée (400), sous-classée pour les cas paiement.
    #[error("requête refusée: {message}")]
    Validation {
        message: String,
        cause: CauseValidation,
    },
    /// 401/403 : force une reconnexion, l'état en vol est abandonné.
    #[error("authentification requise (statut {statut})")]
    Autorisation { statut: u16 },
    /// 404.
    #[error("ressource introuvable")]
    Introuvable,
    /// 5xx.
    #[error("erreur serveur: {0}")]
    Serveur(String),
}

/// Sous-classification des 400 du protocole de paiement, déduite du message
/// serveur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CauseValidation {
    CodeInvalide,
    CodeExpire,
    TentativesEpuisees,
    RenvoisEpuises,
    Generique,
}

/// Action à proposer à l'utilisateur face à une erreur de paiement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionCorrective {
    Reessayer,
    Annuler,
    Reconnexion,
    Message,
}

impl ApiErreur {
    pub fn depuis_statut(statut: u16, corps: &str) -> Self {
        let message = extraire_message(corps);
        match statut {
            0 => Self::Reseau(message),
            400 => Self::Validation {
                cause: classifier_message_validation(&message),
                message,
            },
            401 | 403 => Self::Autorisation { statut },
            404 => Self::Introuvable,
            _ if statut >= 500 => Self::Serveur(message),
            _ => Self::Serveur(format!("statut inattendu {statut}: {message}")),
        }
    }

    /// Signature du 500 "résultat non unique" : plusieurs paniers serveur
    /// pour la même identité. Traité comme un repli cache, pas comme une
    /// erreur remontée.
    pub fn resultat_non_unique(&self) -> bool {
        match self {
            Self::Serveur(message) => {
                let m = message.to_lowercase();
                m.contains("non-unique result") || m.contains("unique result")
            }
            _ => false,
        }
    }

    pub fn action_proposee(&self) -> ActionCorrective {
        match self {
            Self::Reseau(_) | Self::DelaiDepasse | Self::Serveur(_) => ActionCorrective::Reessayer,
            Self::Autorisation { .. } => ActionCorrective::Reconnexion,
            Self::Validation { cause, .. } => match cause {
                CauseValidation::TentativesEpuisees | CauseValidation::RenvoisEpuises => {
                    ActionCorrective::Annuler
                }
                CauseValidation::CodeExpire => ActionCorrective::Reessayer,
                _ => ActionCorrective::Message,
            },
            Self::Introuvable => ActionCorrective::Message,
        }
    }
}

fn classifier_message_validation(message: &str) -> CauseValidation {
    let m = message.to_lowercase();
    if m.contains("renvoi") {
        CauseValidation::RenvoisEpuises
    } else if m.contains("tentative") {
        CauseValidation::TentativesEpuisees
    } else if m.contains("expir") {
        CauseValidation::CodeExpire
    } else if m.contains("code") && m.contains("invalide") {
        CauseValidation::CodeInvalide
    } else {
        CauseValidation::Generique
    }
}

/// Extrait le message d'un corps d'erreur JSON ({"error": ...} ou
/// {"message": ...}), sinon retourne le texte brut.
fn extraire_message(corps: &str) -> String {
    if let Ok(valeur) = serde_json::from_str::<serde_json::Value>(corps) {
        for cle in ["error", "message"] {
            if let Some(message) = valeur.get(cle).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    corps.trim().to_string()
}
