//! Recipe generation: build the prompt, call the chat endpoint, normalize the reply.

pub mod engine;
pub mod error;
pub mod parse;
pub mod prompt;

pub use engine::{ChatTransport, HttpReply, RecipeGenerator, ReqwestTransport, TransportError};
pub use error::GenerationError;
