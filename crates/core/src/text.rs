//! Accent/punctuation-insensitive text normalization.
//!
//! Customer-entered address text ("São Cristóvão", "sao cristovao",
//! "SAO-CRISTOVAO") must compare equal when matching delivery zones and
//! state names. Normalization lowercases, folds Latin-1 accented letters
//! to their base letter, and drops everything that is not ASCII
//! alphanumeric.

/// Fold a single character to its unaccented lowercase base form.
///
/// Returns `None` for characters that carry no alphanumeric content
/// (punctuation, whitespace, symbols).
#[must_use]
pub fn fold_char(c: char) -> Option<char> {
    let c = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other.to_ascii_lowercase(),
    };
    c.is_ascii_alphanumeric().then_some(c)
}

/// Normalize a string for fuzzy lookup: lowercase, strip diacritics,
/// strip everything that is not alphanumeric.
///
/// ```
/// use jabuticaba_core::text::normalize;
///
/// assert_eq!(normalize("São Cristóvão"), "saocristovao");
/// assert_eq!(normalize("JARDIM - AMÉRICA!"), "jardimamerica");
/// assert_eq!(normalize("   "), "");
/// ```
#[must_use]
pub fn normalize(s: &str) -> String {
    s.chars().filter_map(fold_char).collect()
}
