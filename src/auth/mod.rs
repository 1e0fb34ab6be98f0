pub mod extractors;
pub mod token;

// Re-export necessary items
pub use token::{check_jwt, generate_token, verify_token, JwtKeys, Token};
