// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données du client boutique.
//   Les modèles reflètent le JSON camelCase exposé par le backend REST.
//
// Liste des modules:
//   - bassin : produits du catalogue (bassins) et leurs accessoires
//   - promotion : réductions bornées dans le temps [dateDebut, dateFin]
//   - panier : panier, lignes standard et personnalisées, prix effectifs
//   - commande : commandes, lignes de commande, statuts (SUR_COMMANDE, ...)
//   - transaction : étapes du protocole de paiement, enregistrement de session
//   - dto : Data Transfer Objects validés (client, livraison, carte, requêtes)
//
// Points d'attention:
//   - Tous les montants sont des rust_decimal::Decimal (jamais de flottants
//     pour les prix), arrondis à 2 décimales via utils::prix::arrondir_montant.
//   - prix_total d'un panier est dérivé : recalculé après chaque mutation.
//
// ============================================================================

pub mod bassin;
pub mod commande;
pub mod dto;
pub mod panier;
pub mod promotion;
pub mod transaction;
