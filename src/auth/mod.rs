pub mod jwt;

pub use jwt::{create_access_token, identity_from_token};
