//! Schema for the local index file.

/// One schema step, applied when the stored version is lower.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "documents keyed by (partition, key)",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS documents (
    partition    TEXT NOT NULL,
    key          TEXT NOT NULL,
    body         TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    PRIMARY KEY (partition, key)
);

CREATE INDEX IF NOT EXISTS idx_documents_partition ON documents(partition);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
