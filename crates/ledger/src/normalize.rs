//! Text canonicalization for free-text labels and item identities.

/// Canonicalize free text for matching: `None` becomes empty, surrounding
/// whitespace is trimmed, everything is lowercased and every run of
/// whitespace collapses to a single space.
///
/// Total and idempotent: `normalize(Some(&normalize(x))) == normalize(x)`.
pub fn normalize(text: Option<&str>) -> String {
    match text {
        Some(s) => normalize_str(s),
        None => String::new(),
    }
}

/// [`normalize`] for a value that is known to be present.
pub fn normalize_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_lowercases() {
        assert_eq!(normalize(Some("  A   B ")), "a b");
        assert_eq!(normalize_str("Olib\tKelindi\n"), "olib kelindi");
    }

    #[test]
    fn missing_and_blank_are_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("")), "");
        assert_eq!(normalize(Some("   \t ")), "");
    }

    #[test]
    fn idempotent() {
        for input in ["  A   B ", "Lenta  K1", "", "ÖMBOR  Kirim", "x"] {
            let once = normalize_str(input);
            assert_eq!(normalize_str(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn non_ascii_lowercased() {
        assert_eq!(normalize_str("QABUL Qilindi"), "qabul qilindi");
        assert_eq!(normalize_str("ЛЕНТА"), "лента");
    }
}
