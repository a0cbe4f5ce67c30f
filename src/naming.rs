//! Method name canonicalization.
//!
//! Registry keys are PascalCase. Callers may spell a method however they like
//! (`add_some_numbers`, `add-some-numbers`, `AddSomeNumbers`); the converter maps
//! each spelling onto the key form.

/// Characters that separate words in a raw method name.
#[inline]
fn is_separator(c: char) -> bool {
    c == '_' || c == '-' || c.is_whitespace()
}

/// Convert a raw identifier into the canonical registry form.
///
/// Each word gets an upper-cased first character, the rest of the word is kept
/// as written, and the words are joined without separators. Applying it to its
/// own output returns the output unchanged.
///
/// ```
/// use rpcgate::naming::to_canonical;
///
/// assert_eq!(to_canonical("add_some_numbers"), "AddSomeNumbers");
/// assert_eq!(to_canonical("no-input"), "NoInput");
/// assert_eq!(to_canonical("AddSomeNumbers"), "AddSomeNumbers");
/// ```
#[must_use]
pub fn to_canonical(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split(is_separator).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Case-folded form of a canonical name, used for case-insensitive lookup.
#[inline]
#[must_use]
pub fn fold(canonical: &str) -> String {
    canonical.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_and_kebab() {
        assert_eq!(to_canonical("add"), "Add");
        assert_eq!(to_canonical("no_input"), "NoInput");
        assert_eq!(to_canonical("add_some_numbers"), "AddSomeNumbers");
        assert_eq!(to_canonical("add-some-numbers"), "AddSomeNumbers");
        assert_eq!(to_canonical("add some numbers"), "AddSomeNumbers");
    }

    #[test]
    fn test_repeated_and_edge_separators() {
        assert_eq!(to_canonical("__add__some_"), "AddSome");
        assert_eq!(to_canonical("-"), "");
        assert_eq!(to_canonical(""), "");
    }

    #[test]
    fn test_case_preserved_after_first_letter() {
        assert_eq!(to_canonical("ADD"), "ADD");
        assert_eq!(to_canonical("addSome"), "AddSome");
        assert_eq!(to_canonical("get_HTTP_status"), "GetHTTPStatus");
    }

    #[test]
    fn test_idempotent() {
        for raw in [
            "add_some_numbers",
            "AddSomeNumbers",
            "addsomenumbers",
            "x-y_z",
            "ß_straße",
            "1st_place",
            "   ",
        ] {
            let once = to_canonical(raw);
            assert_eq!(to_canonical(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold(&to_canonical("addsomenumbers")), fold("AddSomeNumbers"));
    }
}
