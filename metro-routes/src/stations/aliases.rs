//! Known spelling variants in upstream route pages.
//!
//! Route pages don't always spell a station the way the station list does.
//! Each entry maps a canonical variant to the catalog's canonical name.
//! Add new variants here; no code changes are needed.

use crate::domain::canonical_name;

/// `(variant, catalog name)`, both already canonical.
pub const STATION_ALIASES: &[(&str, &str)] = &[
    ("KASHMERE GATE", "KASHMIRI GATE"),
    ("I.T.O", "ITO"),
    ("I.T.O.", "ITO"),
    ("JLN STADIUM", "JAWAHARLAL NEHRU STADIUM"),
    ("NEW DELHI RLY STATION", "NEW DELHI"),
    ("HAUZ KHAS METRO", "HAUZ KHAS"),
    ("DILSHAD GARDENS", "DILSHAD GARDEN"),
    ("VISHWAVIDYALAYA", "VISHWA VIDYALAYA"),
];

/// Canonicalize a raw leg name and apply the alias table.
pub fn normalize_leg_name(raw: &str) -> String {
    let name = canonical_name(raw);
    match STATION_ALIASES.iter().find(|(variant, _)| *variant == name) {
        Some((_, target)) => (*target).to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_alias() {
        assert_eq!(normalize_leg_name("Kashmere  Gate"), "KASHMIRI GATE");
        assert_eq!(normalize_leg_name(" i.t.o "), "ITO");
    }

    #[test]
    fn passes_through_unlisted_names() {
        assert_eq!(normalize_leg_name("rajiv chowk"), "RAJIV CHOWK");
    }

    #[test]
    fn table_is_canonical() {
        for (variant, target) in STATION_ALIASES {
            assert_eq!(canonical_name(variant), *variant);
            assert_eq!(canonical_name(target), *target);
            assert_ne!(variant, target);
        }
    }
}
