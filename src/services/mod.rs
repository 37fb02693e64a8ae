pub mod checkout_service;
pub mod paiement_service;
pub mod panier_service;
pub mod session_service;
