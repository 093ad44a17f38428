/// Declares a function returning a lazily compiled, process-wide regex.
/// Only for literal patterns known to be valid.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}
pub(crate) use re;

/// Edit distance counted in chars, keeping a single DP row.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let (short, long): (Vec<char>, Vec<char>) = if s1.chars().count() <= s2.chars().count() {
        (s1.chars().collect(), s2.chars().collect())
    } else {
        (s2.chars().collect(), s1.chars().collect())
    };
    if short.is_empty() {
        return long.len();
    }

    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (i, lc) in long.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitute = diagonal + usize::from(lc != sc);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[short.len()]
}

/// Similarity in `[0.0, 1.0]`: one minus the edit distance over the longer
/// input's char count.
pub fn similarity_ratio(s1: &str, s2: &str) -> f32 {
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(s1, s2) as f32 / max_len as f32)
}

/// Keeps ASCII letters only, uppercased. Payee identity for fuzzy matching.
pub fn letters_upper(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Keeps ASCII letters and digits only, uppercased.
pub fn alnum_upper(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

re!(re_us_date_prefix, r"^\d{1,2}/\d{1,2}/\d{2,4}");

/// Whether a field starts like `M/D/YY` or `MM/DD/YYYY`.
pub fn looks_like_date(field: &str) -> bool {
    re_us_date_prefix().is_match(field.trim())
}

/// Hex-encode a digest.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("", "STARBUCKS"), 9);
        assert_eq!(levenshtein_distance("SHELL OIL", "SHELL OIL"), 0);
        assert_eq!(levenshtein_distance("SAFEWAY", "SAFEWAYS"), 1);
        assert_eq!(levenshtein_distance("WALMART", "WALMRT"), 1);
        assert_eq!(levenshtein_distance("amzn", "amazon"), levenshtein_distance("amazon", "amzn"));
        assert_eq!(levenshtein_distance("CAFÉ", "CAFE"), 1);
    }

    #[test]
    fn ratio_bounds() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("SHELL", "SHELL"), 1.0);
        assert!(similarity_ratio("SHELL", "SHEL") > 0.75);
        assert!(similarity_ratio("AMAZON", "STARBUCKS") < 0.5);
    }

    #[test]
    fn payee_normalisers() {
        assert_eq!(letters_upper("Shell #4521, Inc."), "SHELLINC");
        assert_eq!(alnum_upper("Shell #4521, Inc."), "SHELL4521INC");
    }

    #[test]
    fn date_prefix() {
        assert!(looks_like_date("01/15/2024"));
        assert!(looks_like_date("1/5/24 "));
        assert!(!looks_like_date("Date"));
        assert!(!looks_like_date("2024-01-15"));
    }

    #[test]
    fn hex_encoding() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
