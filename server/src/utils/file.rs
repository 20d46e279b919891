//! Path helpers

use std::path::PathBuf;

/// Expand a user-supplied path to an absolute path
///
/// `~` and `~/...` resolve against the home directory; relative paths
/// (including bare names) resolve against the current directory. The
/// result is not canonicalized.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => dirs::home_dir()
            .map(|home| home.join(&rest[1..]))
            .unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_unchanged() {
        assert_eq!(expand_path("/srv/data"), PathBuf::from("/srv/data"));
        assert_eq!(expand_path("  /srv/data  "), PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_relative_becomes_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path(".."), cwd.join(".."));
        assert_eq!(expand_path("data/db"), cwd.join("data/db"));
        assert!(expand_path("").is_absolute());
    }

    #[test]
    fn test_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/.promptbench"), home.join(".promptbench"));
        }
        // not a home reference
        assert!(expand_path("~user").ends_with("~user"));
    }
}
