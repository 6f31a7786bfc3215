//! Single-import surface for applications.

pub use gchat::prelude::*;
pub use gmemory::prelude::*;
pub use gobserve::prelude::*;
pub use gprovider::prelude::*;
pub use gtooling::prelude::*;

pub use crate::runtime::{
    RuntimeBundle, build_runtime, build_runtime_with, build_runtime_with_tooling,
    in_memory_history,
};
pub use crate::util::{
    assistant_message, linked_turn, system_message, tool_message, turn, user_message,
};

#[cfg(feature = "provider-openai")]
pub use crate::providers::{openai_compatible_provider, openai_provider};
