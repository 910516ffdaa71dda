//! Tag parsing.

use std::fmt;

/// Maximum number of digits in the numeric part of a tag.
const MAX_DIGITS: usize = 3;

/// A parsed tag: letter prefix plus number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    prefix: String,
    number: u32,
}

impl Tag {
    /// Creates a tag from its parts.
    #[must_use]
    pub fn new(prefix: impl Into<String>, number: u32) -> Self {
        Self {
            prefix: prefix.into(),
            number,
        }
    }

    /// Parses a tag of the form `<A-Z>+<0-9>{1,3}`.
    ///
    /// Returns `None` for anything else (lowercase, trailing characters, more
    /// than three digits, no digits, empty input).
    pub fn parse(s: &str) -> Option<Self> {
        let split = s.find(|c: char| !c.is_ascii_uppercase())?;
        let (prefix, digits) = s.split_at(split);

        if prefix.is_empty() || digits.is_empty() || digits.len() > MAX_DIGITS {
            return None;
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let number = digits.parse().ok()?;
        Some(Self::new(prefix, number))
    }

    /// Returns the letter prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the numeric part.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.number)
    }
}

impl serde::Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Parses a tag string, returning `None` when it is not a well-formed tag.
pub fn parse_tag(tag: &str) -> Option<Tag> {
    Tag::parse(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_two_letter_prefix() {
        let tag = parse_tag("AB12").unwrap();
        assert_eq!(tag.prefix(), "AB");
        assert_eq!(tag.number(), 12);
    }

    #[test]
    fn test_parse_keeps_leading_zeros_out_of_number() {
        let tag = parse_tag("C007").unwrap();
        assert_eq!(tag.prefix(), "C");
        assert_eq!(tag.number(), 7);
        assert_eq!(tag.to_string(), "C7");
    }

    #[test]
    fn test_parse_long_prefix() {
        // The parser accepts any letter run; only the allocator limits it to two.
        let tag = parse_tag("ABC5").unwrap();
        assert_eq!(tag.prefix(), "ABC");
    }

    #[rstest]
    #[case::lowercase("ab12")]
    #[case::four_digits("A1234")]
    #[case::no_digits("A")]
    #[case::no_prefix("12")]
    #[case::empty("")]
    #[case::trailing_letter("A1B")]
    #[case::leading_space(" A1")]
    #[case::trailing_space("A1 ")]
    #[case::separator("A-1")]
    #[case::mixed_case("Ab1")]
    #[case::non_ascii_digit("A١")]
    fn test_parse_rejects(#[case] input: &str) {
        assert_eq!(parse_tag(input), None);
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::new("ZZ", 999).to_string(), "ZZ999");
    }

    #[test]
    fn test_tag_serializes_as_string() {
        let json = serde_json::to_string(&Tag::new("B", 4)).unwrap();
        assert_eq!(json, "\"B4\"");
    }
}
