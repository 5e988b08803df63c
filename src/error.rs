use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("brand registry JSON error: {0}")]
    Registry(#[source] serde_json::Error),

    #[error("user already exists: {0}")]
    DuplicateUser(String),

    #[error("no such user: {0}")]
    NoSuchUser(String),

    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("brand already exists: {0}")]
    DuplicateBrand(String),

    #[error("no such brand: {0}")]
    NoSuchBrand(String),

    #[error("invalid brand id: {0}")]
    InvalidBrandId(String),

    #[error("bad report file: {0}")]
    BadReport(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
