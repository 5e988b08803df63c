mod schema;
mod sqlite;

pub use sqlite::SqliteUserStore;

use crate::error::Result;
use crate::types::User;

/// UserStore defines the credential database interface.
///
/// All writes are durable before the call returns. Only authentication
/// collaborators consume this; it is independent of the brand registry and
/// tenant databases.
pub trait UserStore: Send + Sync {
    fn initialize(&self) -> Result<()>;

    /// Creates a user, hashing the password. Fails with `DuplicateUser` if
    /// the username is taken.
    fn create_user(&self, username: &str, password: &str) -> Result<User>;

    /// Checks a username/password pair. Unknown username and wrong password
    /// both return `Ok(false)` and are indistinguishable to the caller,
    /// including by timing.
    fn verify_credentials(&self, username: &str, password: &str) -> Result<bool>;

    /// Replaces the stored hash in a single transaction. Fails with
    /// `NoSuchUser` if the username is absent.
    fn reset_password(&self, username: &str, new_password: &str) -> Result<()>;

    fn get_user(&self, username: &str) -> Result<Option<User>>;

    fn list_users(&self) -> Result<Vec<User>>;
}
