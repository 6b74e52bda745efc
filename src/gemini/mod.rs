//! Gemini `generateContent` client: a single prompt in, the model's raw text out.

pub mod client;
mod response;
pub mod types;

pub use client::{GeminiClient, GeminiError, TextGenerator};
