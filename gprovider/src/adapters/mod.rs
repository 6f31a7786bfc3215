//! Concrete provider adapters, compiled per feature flag.

#[cfg(feature = "provider-openai")]
mod openai;

#[cfg(feature = "provider-openai")]
pub use openai::OpenAiCompatibleProvider;
