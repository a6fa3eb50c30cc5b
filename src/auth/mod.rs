//! Token verification and channel authorization

pub mod jwt;

pub use jwt::{Claims, TokenVerifier};
