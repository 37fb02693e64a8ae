// Couche d'accès REST : un trait par ressource (panier, commandes,
// paiements), une implémentation reqwest commune (HttpApi), et la taxonomie
// d'erreurs partagée. Les services dépendent des traits, jamais de reqwest.

pub mod commande_api;
pub mod error;
pub mod http;
pub mod paiement_api;
pub mod panier_api;
