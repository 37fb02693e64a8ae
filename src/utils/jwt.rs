// Lecture côté client des claims du JWT émis par le backend.
//
// Le client ne vérifie JAMAIS la signature (il ne connaît pas le secret,
// c'est le serveur qui fait autorité) : il lit le payload pour connaître
// l'identifiant utilisateur et refuser localement un jeton déjà expiré.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identifiant utilisateur.
    pub sub: i64,
    pub email: Option<String>,
    /// Timestamp d'expiration (epoch secondes).
    pub exp: i64,
}

/// Décode les claims d'un jeton sans vérifier la signature.
/// Un jeton expiré ou illisible est refusé.
pub fn decoder_claims(token: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}
