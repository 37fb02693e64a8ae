// Configuration du client (variables d'environnement + valeurs par défaut)

use chrono::Duration as DureeChrono;
use rust_decimal::Decimal;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Configuration globale du client boutique.
///
/// Chaque valeur peut être surchargée par variable d'environnement ; en
/// l'absence de `.env` ou de variable, la valeur par défaut s'applique.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL de base de l'API REST (préfixe de tous les chemins).
    pub base_url: String,
    /// Délai maximal d'attente d'une réponse avant TIMEOUT_ERROR.
    pub delai_requete: Duration,
    /// Taux de TVA appliqué au sous-total (0.18 ou 0.19 selon la variante).
    pub taux_tva: Decimal,
    /// Frais de livraison fixes ajoutés au total de la commande.
    pub frais_livraison: Decimal,
    /// Durée de vie du cache local du panier.
    pub ttl_cache_panier: DureeChrono,
    /// Intervalle de réévaluation des promotions du panier.
    pub intervalle_promotions: Duration,
    /// Expiration douce de l'enregistrement de transaction en session.
    pub duree_transaction: DureeChrono,
    /// Durée par défaut du code de vérification quand le serveur ne répond pas.
    pub duree_code_defaut: DureeChrono,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            base_url: var_ou("API_BASE_URL", "http://localhost:8080/api"),
            delai_requete: Duration::from_secs(nombre_ou("API_TIMEOUT_SECS", 15)),
            taux_tva: decimal_ou("TAUX_TVA", "0.19"),
            frais_livraison: decimal_ou("FRAIS_LIVRAISON", "20"),
            ttl_cache_panier: DureeChrono::hours(2),
            intervalle_promotions: Duration::from_secs(nombre_ou("INTERVALLE_PROMOTIONS_SECS", 60)),
            duree_transaction: DureeChrono::minutes(30),
            duree_code_defaut: DureeChrono::minutes(10),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            delai_requete: Duration::from_secs(15),
            taux_tva: Decimal::new(19, 2),
            frais_livraison: Decimal::from(20),
            ttl_cache_panier: DureeChrono::hours(2),
            intervalle_promotions: Duration::from_secs(60),
            duree_transaction: DureeChrono::minutes(30),
            duree_code_defaut: DureeChrono::minutes(10),
        }
    }
}

fn var_ou(cle: &str, defaut: &str) -> String {
    env::var(cle).unwrap_or_else(|_| defaut.to_string())
}

fn nombre_ou(cle: &str, defaut: u64) -> u64 {
    match env::var(cle) {
        Ok(valeur) => valeur.parse().unwrap_or_else(|e| {
            warn!("valeur invalide pour {cle}: {e}, utilisation de {defaut}");
            defaut
        }),
        Err(_) => defaut,
    }
}

fn decimal_ou(cle: &str, defaut: &str) -> Decimal {
    let brut = var_ou(cle, defaut);
    brut.parse().unwrap_or_else(|e| {
        warn!("valeur invalide pour {cle}: {e}, utilisation de {defaut}");
        defaut.parse().unwrap_or(Decimal::ZERO)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defauts() {
        let config = Config::default();
        assert_eq!(config.taux_tva, Decimal::new(19, 2));
        assert_eq!(config.frais_livraison, Decimal::from(20));
        assert_eq!(config.intervalle_promotions, Duration::from_secs(60));
    }
}
