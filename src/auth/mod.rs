mod password;

pub use password::CredentialHasher;
