pub mod auth;

pub use auth::{auth_gate, is_public, AuthContext, Viewer};
