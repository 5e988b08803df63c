pub const SCHEMA: &str = r#"
-- Account credentials; profile data belongs to the web layer
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL        -- argon2id PHC string with embedded salt
);
"#;
