//! Branch allow-list
//!
//! A branch name is both an access scope and the name of its storage
//! directory, so only names from this closed set ever reach the filesystem.

use std::fmt;

/// Every branch the portal accepts, in canonical (lowercase) form
pub const BRANCHES: [&str; 3] = ["addis_ababa", "adama", "mekele"];

/// A branch name that passed the allow-list check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Branch(&'static str);

impl Branch {
    /// Look a name up case-insensitively. Surrounding whitespace is not
    /// trimmed: `" adama"` is not a branch.
    pub fn parse(name: &str) -> Option<Self> {
        BRANCHES
            .iter()
            .copied()
            .find(|branch| branch.eq_ignore_ascii_case(name))
            .map(Branch)
    }

    /// Canonical lowercase name, also the directory name
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_branches() {
        for name in BRANCHES {
            assert_eq!(Branch::parse(name).map(|b| b.as_str()), Some(name));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Branch::parse("ADAMA").unwrap().as_str(), "adama");
        assert_eq!(Branch::parse("Addis_Ababa").unwrap().to_string(), "addis_ababa");
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!(Branch::parse("").is_none());
        assert!(Branch::parse("temp").is_none());
        assert!(Branch::parse("gondar").is_none());
        assert!(Branch::parse(" adama").is_none());
        assert!(Branch::parse("../adama").is_none());
    }
}
