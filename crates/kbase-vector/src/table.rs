//! LanceDB connection and partition naming helpers.
//!
//! Each namespace lives in its own table named `<prefix><namespace>`; tables
//! without the prefix are ignored when listing partitions.

use lancedb::{connect, Connection};

use kbase_core::types::Namespace;

pub async fn open_db(uri: &str) -> lancedb::Result<Connection> {
    connect(uri).execute().await
}

pub fn table_name(prefix: &str, namespace: &Namespace) -> String {
    format!("{}{}", prefix, namespace.as_str())
}

/// Inverse of [`table_name`]; `None` for tables outside the prefix or with
/// names that are not valid namespaces.
pub fn namespace_of(prefix: &str, table: &str) -> Option<Namespace> {
    table.strip_prefix(prefix).and_then(|rest| Namespace::new(rest).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_prefix() {
        let ns = Namespace::new("Sample").unwrap();
        assert_eq!(table_name("kb_", &ns), "kb_Sample");
        assert_eq!(namespace_of("kb_", "kb_Sample"), Some(ns));
        assert_eq!(namespace_of("kb_", "other_table"), None);
        assert_eq!(namespace_of("kb_", "kb_"), None);
    }
}
