use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Promotion : réduction en pourcentage bornée dans le temps.
///
/// Une promotion est active si `date_debut <= maintenant <= date_fin`
/// (intervalle fermé aux deux bornes). L'évaluation est idempotente :
/// réévaluer sans changement d'horloge ne modifie aucun prix dérivé.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: i64,
    /// Taux de réduction entre 0 et 1 (0.25 = -25%).
    pub taux_reduction: Decimal,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
}

impl Promotion {
    pub fn est_active_a(&self, maintenant: DateTime<Utc>) -> bool {
        maintenant >= self.date_debut && maintenant <= self.date_fin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promotion_autour(maintenant: DateTime<Utc>, avant: i64, apres: i64) -> Promotion {
        Promotion {
            id: 1,
            taux_reduction: Decimal::new(25, 2),
            date_debut: maintenant - Duration::hours(avant),
            date_fin: maintenant + Duration::hours(apres),
        }
    }

    #[test]
    fn test_active_dans_la_fenetre() {
        let maintenant = Utc::now();
        assert!(promotion_autour(maintenant, 1, 1).est_active_a(maintenant));
    }

    #[test]
    fn test_bornes_incluses() {
        let maintenant = Utc::now();
        let promo = promotion_autour(maintenant, 0, 2);
        // date_debut == maintenant : active
        assert!(promo.est_active_a(promo.date_debut));
        // date_fin == maintenant : encore active
        assert!(promo.est_active_a(promo.date_fin));
        // juste après la fin : inactive
        assert!(!promo.est_active_a(promo.date_fin + Duration::seconds(1)));
    }

    #[test]
    fn test_inactive_avant_le_debut() {
        let maintenant = Utc::now();
        let promo = promotion_autour(maintenant, -1, 2); // commence dans 1h
        assert!(!promo.est_active_a(maintenant));
    }
}
