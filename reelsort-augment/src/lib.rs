pub mod client;
pub mod error;
pub mod prompt;

pub use client::{Augmentor, ChatClient, TextGenerator};
pub use error::AugmentError;
pub use prompt::GenerationRequest;
