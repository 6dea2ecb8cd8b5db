//! redb table definitions for the appstat state store.

use redb::TableDefinition;

/// Applications keyed by `{namespace}/{name}`, JSON-serialized.
pub const APPLICATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("applications");
