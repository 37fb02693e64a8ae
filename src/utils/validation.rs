// Validateurs partagés des formulaires de checkout et de paiement

use chrono::{DateTime, Datelike, Utc};
use validator::ValidationError;

fn chiffres_exactement(valeur: &str, attendu: usize, code: &'static str) -> Result<(), ValidationError> {
    if valeur.len() == attendu && valeur.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new(code))
    }
}

/// Numéro de téléphone local : exactement 8 chiffres.
pub fn valider_telephone(valeur: &str) -> Result<(), ValidationError> {
    chiffres_exactement(valeur, 8, "telephone_invalide")
}

/// Code postal : exactement 4 chiffres.
pub fn valider_code_postal(valeur: &str) -> Result<(), ValidationError> {
    chiffres_exactement(valeur, 4, "code_postal_invalide")
}

/// Numéro de carte : 16 chiffres, sans séparateurs.
pub fn valider_numero_carte(valeur: &str) -> Result<(), ValidationError> {
    chiffres_exactement(valeur, 16, "numero_carte_invalide")
}

/// Cryptogramme : 3 chiffres.
pub fn valider_cvv(valeur: &str) -> Result<(), ValidationError> {
    chiffres_exactement(valeur, 3, "cvv_invalide")
}

/// Code de vérification SMS/email : 6 chiffres.
pub fn code_verification_bien_forme(valeur: &str) -> bool {
    valeur.len() == 6 && valeur.chars().all(|c| c.is_ascii_digit())
}

/// Expiration carte au format MM/YY, refusée si antérieure au mois courant.
pub fn expiration_carte_valide(expiration: &str, maintenant: DateTime<Utc>) -> bool {
    let Some((mois, annee)) = expiration.split_once('/') else {
        return false;
    };
    let (Ok(mois), Ok(annee)) = (mois.parse::<u32>(), annee.parse::<i32>()) else {
        return false;
    };
    if !(1..=12).contains(&mois) || !(0..=99).contains(&annee) {
        return false;
    }
    let annee = 2000 + annee;
    (annee, mois) >= (maintenant.year(), maintenant.month())
}

/// Tronque un champ texte à `max` caractères avant l'envoi au backend
/// (plafond par défaut des colonnes : 255).
pub fn tronquer(texte: &str, max: usize) -> String {
    texte.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_telephone() {
        assert!(valider_telephone("22334455").is_ok());
        assert!(valider_telephone("2233445").is_err());
        assert!(valider_telephone("22 33 44 55").is_err());
        assert!(valider_telephone("2233445a").is_err());
    }

    #[test]
    fn test_code_postal() {
        assert!(valider_code_postal("2046").is_ok());
        assert!(valider_code_postal("204").is_err());
    }

    #[test]
    fn test_code_verification() {
        assert!(code_verification_bien_forme("123456"));
        assert!(!code_verification_bien_forme("12345"));
        assert!(!code_verification_bien_forme("12345a"));
    }

    #[test]
    fn test_expiration_carte() {
        let maintenant = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        // Mois courant : encore valide
        assert!(expiration_carte_valide("06/25", maintenant));
        assert!(expiration_carte_valide("01/26", maintenant));
        // Mois précédent : échue
        assert!(!expiration_carte_valide("05/25", maintenant));
        // Formats invalides
        assert!(!expiration_carte_valide("13/25", maintenant));
        assert!(!expiration_carte_valide("0625", maintenant));
        assert!(!expiration_carte_valide("06/", maintenant));
    }

    #[test]
    fn test_tronquer() {
        let long = "a".repeat(300);
        assert_eq!(tronquer(&long, 255).len(), 255);
        assert_eq!(tronquer("court", 255), "court");
    }
}
