//! Slot-indexed reassembly of fragmented tool-call declarations.
//!
//! Providers announce tool invocations as partial chunks addressed by slot
//! index; name and argument text arrive in pieces and must be concatenated
//! in order. Each applied fragment yields the current cumulative snapshot
//! for its slot so clients can replace (never append to) their local copy.
//!
//! ```rust
//! use gchat::ToolCallAccumulator;
//! use gprovider::ToolCallFragment;
//!
//! let mut accumulator = ToolCallAccumulator::new();
//! accumulator.apply(ToolCallFragment::new(0).with_id("call_1").with_name("scan_"));
//! let snapshot = accumulator.apply(ToolCallFragment::new(0).with_name("adapters"));
//!
//! assert_eq!(snapshot.name, "scan_adapters");
//! ```

use std::collections::BTreeMap;

use gprovider::{ToolCall, ToolCallFragment};

#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    slots: BTreeMap<u32, ToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a fragment into its slot and returns the slot's cumulative
    /// snapshot.
    pub fn apply(&mut self, fragment: ToolCallFragment) -> ToolCall {
        let entry = self.slots.entry(fragment.index).or_insert_with(|| ToolCall {
            index: fragment.index,
            id: format!("tool_call_{}", fragment.index),
            name: String::new(),
            arguments: String::new(),
        });

        if let Some(id) = fragment.id {
            entry.id = id;
        }

        if let Some(name) = fragment.name {
            entry.name.push_str(&name);
        }

        if let Some(arguments) = fragment.arguments {
            entry.arguments.push_str(&arguments);
        }

        entry.clone()
    }

    /// The accumulated set in slot order. Completion is signalled by the
    /// provider's terminal signal, not by the accumulator.
    pub fn into_calls(self) -> Vec<ToolCall> {
        self.slots.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
