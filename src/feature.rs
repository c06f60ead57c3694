//! Server capabilities advertised by the `FEAT` command (RFC 2389).

use std::collections::HashMap;

use super::status;
use super::types::Line;

/// Capability table negotiated once, right after the greeting.
///
/// A missing entry means the server did not advertise the capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features {
    table: HashMap<String, Option<String>>,
}

impl Features {
    /// Builds the table from the reply to `FEAT`.
    ///
    /// Any reply other than `211` means the server has no extensions.
    pub fn from_reply(reply: &Line) -> Features {
        let mut features = Features::default();
        if reply.0 != status::SYSTEM {
            return features;
        }

        for line in reply.1.lines().filter(|l| l.starts_with(' ')) {
            let mut parts = line.trim().splitn(2, ' ');
            let name = match parts.next() {
                Some(name) if !name.is_empty() => name.to_ascii_uppercase(),
                _ => continue,
            };
            let param = parts.next().map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
            features.table.insert(name, param);
        }
        features
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(&name.to_ascii_uppercase())
    }

    /// Returns the parameter of a capability, `None` if it has none or is absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.table
            .get(&name.to_ascii_uppercase())
            .and_then(|p| p.as_deref())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(|k| k.as_str())
    }
}
