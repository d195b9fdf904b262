//! Credential models, access tokens, and the in-process token cache.

pub mod cache;
pub mod credential;
pub mod token;

pub use cache::*;
pub use credential::*;
pub use token::*;
