use crate::models::CITY_NOT_SPECIFIED;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Known spellings of city names, matched by substring against the lowercased,
/// accent-stripped input. Fragments overlap (`gaia` is inside `vngaia`), so the
/// first match in declaration order wins.
pub const CITY_VARIANTS: &[(&str, &str)] = &[
    ("lisbon", "Lisboa"),
    ("ponte lima", "Ponte de Lima"),
    ("vila real sto antonio", "Vila Real de Santo António"),
    ("vr sto antonio", "Vila Real de Santo António"),
    ("vrsa", "Vila Real de Santo António"),
    ("vfxira", "Vila Franca de Xira"),
    ("vila franca xira", "Vila Franca de Xira"),
    ("povo", "Póvoa de Varzim"),
    ("povoa varzim", "Póvoa de Varzim"),
    ("pdv", "Póvoa de Varzim"),
    ("vngaia", "Vila Nova de Gaia"),
    ("vn gaia", "Vila Nova de Gaia"),
    ("gaia", "Vila Nova de Gaia"),
];

/// Map a free-text town to its display name.
///
/// Unmapped names are title-cased from the accent-stripped form, so `"Évora"`
/// comes back as `"Evora"`.
pub fn normalize_city(city: Option<&str>) -> String {
    let city = match city.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => return CITY_NOT_SPECIFIED.to_string(),
    };

    let folded = fold(city);

    if let Some((_, canonical)) = CITY_VARIANTS
        .iter()
        .find(|(fragment, _)| folded.contains(fragment))
    {
        return canonical.to_string();
    }

    folded
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase and drop combining marks after canonical decomposition.
pub fn fold(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_variants() {
        assert_eq!(normalize_city(Some("Lisbon")), "Lisboa");
        assert_eq!(normalize_city(Some("VRSA")), "Vila Real de Santo António");
        assert_eq!(normalize_city(Some("V.N. Gaia")), "Vila Nova de Gaia");
        assert_eq!(normalize_city(Some("Póvoa Varzim")), "Póvoa de Varzim");
        assert_eq!(normalize_city(Some("Vila Franca Xira")), "Vila Franca de Xira");
    }

    #[test]
    fn test_missing_city() {
        assert_eq!(normalize_city(None), "Not specified");
        assert_eq!(normalize_city(Some("   ")), "Not specified");
    }

    #[test]
    fn test_unmapped_city_loses_accents() {
        assert_eq!(normalize_city(Some("Évora")), "Evora");
        assert_eq!(normalize_city(Some("  são   joão da MADEIRA ")), "Sao Joao Da Madeira");
    }

    #[test]
    fn test_fold_strips_diacritics() {
        assert_eq!(fold("São"), "sao");
        assert_eq!(fold("Conceição"), "conceicao");
    }

    #[test]
    fn test_first_variant_wins() {
        // "vngaia" and "gaia" both match; the earlier entry decides
        assert_eq!(normalize_city(Some("VNGaia")), "Vila Nova de Gaia");
        // "povoa varzim" also contains "povo", which is declared first
        assert_eq!(normalize_city(Some("povoa varzim")), "Póvoa de Varzim");
    }
}
