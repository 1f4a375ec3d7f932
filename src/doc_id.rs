use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// A short, stable key derived from a document's identity string.
///
/// The identity is the document path when one is known, otherwise its
/// name (see [`crate::corpus::Document::identity`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    pub numeric: u64,
    /// Short hex form for display (e.g. "a1b2c3").
    pub short: String,
}

impl DocumentId {
    pub fn new(identity: &str) -> Self {
        let numeric = Self::hash_identity(identity);
        let short = Self::short_hex(numeric, 6);
        Self { numeric, short }
    }

    fn hash_identity(identity: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        hasher.finish()
    }

    fn short_hex(value: u64, len: usize) -> String {
        let full = format!("{value:016x}");
        full[..len].to_string()
    }

    /// Full 16-digit hex form, used as the key column of persisted tables.
    pub fn hex(&self) -> String {
        Self::short_hex(self.numeric, 16)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.short)
    }
}
