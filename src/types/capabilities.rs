use std::collections::hash_map::Iter;
use std::collections::HashMap;

/// What the server said about one capability name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CapabilityValue {
    /// The capability was advertised as a bare atom, e.g. `IDLE`.
    Present,
    /// The capability was advertised with sub-values, e.g. `AUTH=PLAIN AUTH=LOGIN`.
    Values(Vec<String>),
}

/// From [section 7.2.1 of RFC 3501](https://tools.ietf.org/html/rfc3501#section-7.2.1).
///
/// A list of capabilities that the server supports.
/// The capability list will include the atom "IMAP4rev1".
///
/// A capability name which begins with `AUTH=` indicates that the server supports that particular
/// authentication mechanism. Such `NAME=value` capabilities are grouped under `NAME`, so that
/// `AUTH=PLAIN AUTH=LOGIN` is stored as `AUTH: [PLAIN, LOGIN]`.
///
/// Client implementations SHOULD NOT require any capability name other than `IMAP4rev1`, and MUST
/// ignore any unknown capability names.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Capabilities(pub(crate) HashMap<String, CapabilityValue>);

impl Capabilities {
    pub(crate) fn insert(&mut self, token: &str) {
        match token.split_once('=') {
            Some((name, value)) => {
                let entry = self
                    .0
                    .entry(name.to_string())
                    .or_insert_with(|| CapabilityValue::Values(Vec::new()));
                match entry {
                    CapabilityValue::Values(values) => values.push(value.to_string()),
                    CapabilityValue::Present => {
                        *entry = CapabilityValue::Values(vec![value.to_string()]);
                    }
                }
            }
            None => {
                self.0
                    .entry(token.to_string())
                    .or_insert(CapabilityValue::Present);
            }
        }
    }

    /// Check if the server has the given capability. `NAME=value` checks for a specific
    /// sub-value.
    pub fn has(&self, capability: &str) -> bool {
        match capability.split_once('=') {
            Some((name, value)) => self
                .values(name)
                .map_or(false, |values| values.iter().any(|v| v == value)),
            None => self.0.contains_key(capability),
        }
    }

    /// The sub-values advertised for `name`, if any.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        match self.0.get(name) {
            Some(CapabilityValue::Values(values)) => Some(values),
            _ => None,
        }
    }

    /// Check if the server advertises the given `AUTH=` mechanism. The comparison is
    /// case-sensitive.
    pub fn has_auth(&self, mechanism: &str) -> bool {
        self.values("AUTH")
            .map_or(false, |mechs| mechs.iter().any(|m| m == mechanism))
    }

    /// Whether the server accepts UTF-8 mailbox names (`UTF8=ACCEPT`, `UTF8=ALL` or
    /// `UTF8=ONLY`).
    pub fn accepts_utf8(&self) -> bool {
        self.values("UTF8").map_or(false, |values| {
            values
                .iter()
                .any(|v| matches!(v.as_str(), "ACCEPT" | "ALL" | "ONLY"))
        })
    }

    /// Iterate over all the server's capabilities
    pub fn iter(&self) -> Iter<'_, String, CapabilityValue> {
        self.0.iter()
    }

    /// Returns how many capability names the server has.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the server purports to have no capabilities.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
