use std::fmt;

/// Check whether a candidate article title is acceptable.
///
/// A title is non-empty and made only of ASCII letters and digits. Route
/// handlers rely on this as the only guard before a title reaches storage.
pub fn is_valid_title(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// An article title that has passed [`is_valid_title`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Title(String);

impl Title {
    /// Validate `candidate`, returning `None` when it is not a legal title
    pub fn parse(candidate: &str) -> Option<Self> {
        is_valid_title(candidate).then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ascii_alphanumerics() {
        for title in ["a", "Z", "9", "hello", "FrontPage", "abc123", "007"] {
            assert!(is_valid_title(title), "{title} should be valid");
        }
    }

    #[test]
    fn rejects_empty() {
        assert!(!is_valid_title(""));
    }

    #[test]
    fn rejects_separators_and_punctuation() {
        for title in ["a/b", "../etc", "a.b", "a b", "a-b", "a_b", "a\\b", "a%2Fb", "a\0", " a"] {
            assert!(!is_valid_title(title), "{title:?} should be rejected");
        }
    }

    #[test]
    fn rejects_non_ascii() {
        for title in ["café", "日本", "ａ", "é"] {
            assert!(!is_valid_title(title), "{title:?} should be rejected");
        }
    }

    #[test]
    fn title_parse_follows_validator() {
        assert_eq!(Title::parse("Hello").as_ref().map(Title::as_str), Some("Hello"));
        assert!(Title::parse("a/b").is_none());
        assert_eq!(Title::parse("x1").unwrap().to_string(), "x1");
    }
}
