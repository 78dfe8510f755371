//! Portable filename sanitization for alt text and URL path segments.

use unicode_normalization::UnicodeNormalization;

/// Punctuation kept besides ASCII letters and digits.
const ALLOWED_PUNCT: &[char] = &['-', '_', '.', '(', ')', ' '];

/// Sanitizes arbitrary text into a filename component.
///
/// - Decomposes to NFKD and drops everything outside ASCII, so `é` becomes `e`
///   and characters without an ASCII base disappear
/// - Keeps only ASCII letters, digits and `-_.()` plus space
/// - Replaces spaces with `_`
///
/// The result may be empty; callers pick a placeholder in that case.
pub fn sanitize_filename(name: &str) -> String {
    name.nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || ALLOWED_PUNCT.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_underscores() {
        assert_eq!(sanitize_filename("Cat Photo"), "Cat_Photo");
    }

    #[test]
    fn strips_path_separators_and_symbols() {
        assert_eq!(sanitize_filename("a/b\\c:d*?.png"), "abcd.png");
        assert_eq!(sanitize_filename("fig. (1) - draft"), "fig._(1)_-_draft");
    }

    #[test]
    fn transliterates_accents() {
        assert_eq!(sanitize_filename("Café Crème"), "Cafe_Creme");
        assert_eq!(sanitize_filename("naïve"), "naive");
    }

    #[test]
    fn drops_characters_without_ascii_form() {
        assert_eq!(sanitize_filename("日本語"), "");
        assert_eq!(sanitize_filename("🐱 cat"), "_cat");
    }

    #[test]
    fn idempotent() {
        for s in ["Cat Photo", "Café (v2).png", "  x  ", "日本 語", "a_b-c.d"] {
            let once = sanitize_filename(s);
            assert_eq!(sanitize_filename(&once), once, "input {s:?}");
        }
    }
}
