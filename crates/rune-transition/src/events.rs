//! Lifecycle events for hosts that poll instead of registering hooks.
//!
//! Every hook invocation made by a group is mirrored into its `EventQueue`.
//!
//! # Usage
//!
//! ```ignore
//! let mut group = TransitionGroup::new(TransitionConfig::with_durations(100.0, 100.0), ());
//! group.update(vec!["a"])?;
//! group.update(vec!["b"])?;
//! group.tick(16.0);
//!
//! for event in group.drain_events() {
//!     if event.hook == LifecycleHook::ExitComplete {
//!         println!("{} left at {}ms", event.key, event.at_ms);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::EntityKey;

/// The six lifecycle callbacks, in the order a full cycle fires them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleHook {
    Enter,
    EnterActive,
    EnterComplete,
    Exit,
    ExitActive,
    ExitComplete,
}

impl LifecycleHook {
    pub fn is_enter(&self) -> bool {
        matches!(self, Self::Enter | Self::EnterActive | Self::EnterComplete)
    }

    pub fn is_exit(&self) -> bool {
        !self.is_enter()
    }

    /// Callback name as exposed to widget code.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enter => "onEnter",
            Self::EnterActive => "onEnterActive",
            Self::EnterComplete => "onEnterComplete",
            Self::Exit => "onExit",
            Self::ExitActive => "onExitActive",
            Self::ExitComplete => "onExitComplete",
        }
    }
}

/// A hook invocation for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Entity the hook fired for.
    pub key: EntityKey,
    /// Which hook fired.
    pub hook: LifecycleHook,
    /// Virtual time of the invocation.
    pub at_ms: f64,
}

/// Queue collecting lifecycle events between drains.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<LifecycleEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: LifecycleEvent) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<LifecycleEvent> {
        self.events.pop_front()
    }

    /// Drain all events from the queue, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = LifecycleEvent> + '_ {
        self.events.drain(..)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Pending events for a specific entity.
    pub fn events_for_key(&self, key: &str) -> Vec<&LifecycleEvent> {
        self.events.iter().filter(|e| e.key == key).collect()
    }
}
