mod middleware;
mod token;

pub use middleware::{AuthError, RequireAdmin, RequireUser};
pub use token::{generate_token, hash_token};
