//! Core traits shared by the client and the credential stores.

mod token_store;

pub use token_store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};
