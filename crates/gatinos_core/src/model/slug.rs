//! Slug derivation for colony and cat URLs/keys.

use crate::model::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid slug filter regex"));
static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\s]+").expect("valid slug separator regex"));

/// Derives a lowercase ASCII slug from a display name.
///
/// Spanish diacritics fold to their base letter; any other non-ASCII
/// character is dropped.
pub fn slugify(value: &str) -> String {
    let folded: String = value
        .chars()
        .filter_map(fold_char)
        .collect::<String>()
        .to_lowercase();
    let filtered = DISALLOWED_RE.replace_all(&folded, "");
    let joined = SEPARATOR_RE.replace_all(filtered.trim(), "-");
    joined.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Like [`slugify`], rejecting names whose slug would be empty.
pub fn require_slug(name: &str) -> Result<String, ValidationError> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ValidationError::EmptySlug(name.to_string()));
    }
    Ok(slug)
}

fn fold_char(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::{require_slug, slugify};

    #[test]
    fn slugify_lowercases_and_joins_words() {
        assert_eq!(slugify("Colonia del Puerto"), "colonia-del-puerto");
        assert_eq!(slugify("  Gato   Negro  "), "gato-negro");
    }

    #[test]
    fn slugify_folds_spanish_letters() {
        assert_eq!(slugify("Señor Bigotes"), "senor-bigotes");
        assert_eq!(slugify("Pequeñín Ágil"), "pequenin-agil");
    }

    #[test]
    fn slugify_strips_punctuation_and_edge_separators() {
        assert_eq!(slugify("¡Michi! (el bueno)"), "michi-el-bueno");
        assert_eq!(slugify("--rayas--"), "rayas");
        assert_eq!(slugify("a -- b"), "a-b");
    }

    #[test]
    fn require_slug_rejects_symbol_only_names() {
        assert!(require_slug("???").is_err());
        assert_eq!(require_slug("Luna").expect("slug"), "luna");
    }
}
