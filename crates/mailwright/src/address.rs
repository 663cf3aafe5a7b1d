//! Recipient list normalization.
//!
//! Builder methods accept a single address or a list of them; both become an
//! ordered [`Recipients`] list with surrounding whitespace trimmed and empty
//! entries dropped. Duplicates are kept.

/// Ordered list of address strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an address, skipping it when blank.
    ///
    /// Only spaces and tabs are trimmed; line breaks are kept so header
    /// sanitizing rejects them.
    pub fn push(&mut self, address: &str) {
        let address = address.trim_matches([' ', '\t']);
        if !address.is_empty() {
            self.0.push(address.to_string());
        }
    }

    /// Gets the addresses.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Checks if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins the addresses into a header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        self.0.join(", ")
    }

    /// Consumes the list, returning the addresses.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for Recipients {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for address in iter {
            list.push(address.as_ref());
        }
        list
    }
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        std::iter::once(address).collect()
    }
}

impl From<String> for Recipients {
    fn from(address: String) -> Self {
        Self::from(address.as_str())
    }
}

impl From<&String> for Recipients {
    fn from(address: &String) -> Self {
        Self::from(address.as_str())
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addresses: Vec<String>) -> Self {
        addresses.into_iter().collect()
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(addresses: Vec<&str>) -> Self {
        addresses.into_iter().collect()
    }
}

impl From<&[&str]> for Recipients {
    fn from(addresses: &[&str]) -> Self {
        addresses.iter().collect()
    }
}

impl From<&[String]> for Recipients {
    fn from(addresses: &[String]) -> Self {
        addresses.iter().collect()
    }
}

impl<const N: usize> From<[&str; N]> for Recipients {
    fn from(addresses: [&str; N]) -> Self {
        addresses.into_iter().collect()
    }
}

/// Extracts the bare address from a mailbox such as `Name <user@host>`.
#[must_use]
pub fn bare_address(mailbox: &str) -> &str {
    let mailbox = mailbox.trim();
    match (mailbox.rfind('<'), mailbox.rfind('>')) {
        (Some(start), Some(end)) if start < end => mailbox[start + 1..end].trim(),
        _ => mailbox,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_single_address() {
        let list = Recipients::from("  alice@example.com ");
        assert_eq!(list.as_slice(), ["alice@example.com"]);
    }

    #[test]
    fn test_blank_single_address() {
        assert!(Recipients::from("   ").is_empty());
        assert!(Recipients::from(String::new()).is_empty());
    }

    #[test]
    fn test_line_breaks_are_kept() {
        let list = Recipients::from(["a@example.com\r\n", "\nb@example.com", "\n"]);
        assert_eq!(list.as_slice(), ["a@example.com\r\n", "\nb@example.com", "\n"]);
    }

    #[test]
    fn test_list_keeps_order_and_duplicates() {
        let list = Recipients::from(vec!["b@example.com", "", "a@example.com", "b@example.com"]);
        assert_eq!(
            list.as_slice(),
            ["b@example.com", "a@example.com", "b@example.com"]
        );
        assert_eq!(
            list.to_header_value(),
            "b@example.com, a@example.com, b@example.com"
        );
    }

    #[test]
    fn test_array_and_slice() {
        let from_array = Recipients::from(["x@example.com", "y@example.com"]);
        let owned = vec!["x@example.com".to_string(), "y@example.com".to_string()];
        let from_slice = Recipients::from(owned.as_slice());
        assert_eq!(from_array, from_slice);
        assert_eq!(from_array.into_vec().len(), 2);
    }

    #[test]
    fn test_bare_address() {
        assert_eq!(bare_address("Alice <alice@example.com>"), "alice@example.com");
        assert_eq!(bare_address("\"Doe, J\" < j@example.com >"), "j@example.com");
        assert_eq!(bare_address(" bob@example.com "), "bob@example.com");
        assert_eq!(bare_address("broken > <"), "broken > <");
    }
}
