pub mod client;
pub mod error;
pub mod types;
pub mod wire;

pub use client::{DialogueBackend, DialogueClient};
pub use error::{CallFailure, DialogueError, FailureClass};
pub use types::*;
