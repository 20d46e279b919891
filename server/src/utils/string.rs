//! String utility functions

/// Longest slug `slugify` produces; leaves room for a `-N` suffix
pub const SLUG_BASE_MAX_LEN: usize = 48;

/// Lowercase ASCII slug: alphanumerics kept, runs of anything else collapsed
/// to a single `-`, no leading or trailing dash
///
/// Returns `"workspace"` when nothing slug-worthy remains.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= SLUG_BASE_MAX_LEN {
                break;
            }
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "workspace".to_string()
    } else {
        slug
    }
}

/// Truncate to at most `max_chars` characters (never splits a char)
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Last four characters of a secret, for display
pub fn key_hint(secret: &str) -> String {
    let count = secret.chars().count();
    secret.chars().skip(count.saturating_sub(4)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Ada Lovelace"), "ada-lovelace");
        assert_eq!(slugify("  --Hello,   World!!  "), "hello-world");
        assert_eq!(slugify("ada@example.com"), "ada-example-com");
        assert_eq!(slugify("Team_42"), "team-42");
    }

    #[test]
    fn test_slugify_caps_length() {
        let slug = slugify(&"ab ".repeat(40));
        assert!(slug.len() <= SLUG_BASE_MAX_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slugify_empty_fallback() {
        assert_eq!(slugify(""), "workspace");
        assert_eq!(slugify("日本語"), "workspace");
        assert_eq!(slugify("!!!"), "workspace");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_key_hint() {
        assert_eq!(key_hint("sk-abcdef1234"), "1234");
        assert_eq!(key_hint("abc"), "abc");
        assert_eq!(key_hint(""), "");
    }
}
