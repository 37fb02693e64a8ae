use rust_decimal::{Decimal, RoundingStrategy};

/// Arrondit un montant à 2 décimales, demi-supérieur sur l'entier scalé
/// (10.005 → 10.01). Règle unique pour tous les prix dérivés du client.
pub fn arrondir_montant(montant: Decimal) -> Decimal {
    montant.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
