//! Database schema definitions

/// SQL to create the properties table
pub const CREATE_PROPERTIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mh_properties (
    store_id         CHAR(32) NOT NULL PRIMARY KEY,
    version          CHAR(10),
    update_timestamp TEXT
)
"#;

/// SQL to create the key-value table
pub const CREATE_KV_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mh_kv (
    key              VARCHAR NOT NULL PRIMARY KEY,
    value            TEXT NOT NULL,
    change_timestamp TEXT
)
"#;

/// SQL to create the documents table (composite primary key)
pub const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mh_documents (
    user_id          VARCHAR NOT NULL,
    doc_id           VARCHAR NOT NULL,
    body             TEXT NOT NULL,
    change_timestamp TEXT,
    PRIMARY KEY (user_id, doc_id)
)
"#;

/// All table creation statements in order
pub const CREATE_ALL_TABLES: &[&str] = &[
    CREATE_PROPERTIES_TABLE,
    CREATE_KV_TABLE,
    CREATE_DOCUMENTS_TABLE,
];
