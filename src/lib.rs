// ============================================================================
// BASSIN BOUTIQUE - CLIENT
// ============================================================================
//
// Description:
//   Bibliothèque cliente de la boutique de bassins : gestion du panier
//   (réconciliation serveur / cache local), passage de commande et protocole
//   de paiement par carte avec code de vérification.
//
// Liste des modules:
//   - config : configuration (URL de l'API, TVA, frais de livraison, délais)
//   - models : modèles de données (bassin, panier, promotion, commande, ...)
//   - api : couche d'appel REST typée (panier, commandes, paiements)
//   - services : logique métier (session, panier, checkout, paiement)
//   - utils : stockage clé/valeur, validation, arrondi des prix, JWT
//
// Points d'attention:
//   - Aucune identité mixte : une requête porte soit un Bearer JWT, soit
//     l'en-tête X-Session-ID de session anonyme, jamais les deux.
//   - Le flux "panier courant" n'a qu'un seul écrivain (PanierService) ;
//     tous les autres composants sont des observateurs.
//
// ============================================================================

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::panier_service::PanierService;
pub use services::paiement_service::PaiementService;
pub use services::checkout_service::CheckoutService;
pub use services::session_service::SessionService;
