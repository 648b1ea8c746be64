//! RAG (Retrieval-Augmented Generation) for question answering.
//!
//! Retrieval and composition live in [`context`]; prompting the model lives in
//! [`Responder`].

pub mod context;
mod response;

pub use context::{ComposedContext, ContextBuilder};
pub use response::Responder;
