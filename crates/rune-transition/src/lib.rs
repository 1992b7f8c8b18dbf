//! Transition orchestration for keyed visual entities.
//!
//! The crate animates entities in and out of a rendered list:
//!
//! - `reconcile`: merges the caller's next entity list into the render list,
//!   keeping departed entities around until their exit finishes
//! - `machine`: pure reducer over the five transition phases
//! - `controller`: per-entity lifecycle driving the reducer and the hooks
//! - `group`: `TransitionGroup`, the orchestrator hosts talk to
//! - `layout`: container resize coordinated by a single captain entity
//! - `session`: per-session dismiss stack for overlays
//!
//! Time is virtual. Hosts call `TransitionGroup::tick` once per frame with the
//! elapsed milliseconds; frame waits and timers are resolved inside that call.

mod controller;
pub mod error;
pub mod events;
pub mod group;
pub mod hooks;
pub mod layout;
pub mod machine;
pub mod reconcile;
pub mod scheduler;
pub mod session;
pub mod types;

pub use error::{Result, TransitionError};
pub use events::{EventQueue, LifecycleEvent, LifecycleHook};
pub use group::{Rendered, TransitionGroup};
pub use hooks::{Hooks, PhaseContext, TransitionHooks};
pub use layout::{
    CaptainHooks, Captaincy, ContainerStyle, LayoutMeasure, LayoutTransition, ResizeDirection,
};
pub use machine::{PhaseMarkers, TransitionAction, TransitionPhase, TransitionState};
pub use reconcile::{RenderRecord, reconcile};
pub use scheduler::{FrameScheduler, TaskId};
pub use session::{DismissRegistration, DismissStack, UiSession};
pub use types::{EntityKey, Item, Keyed, NodeRef};

pub use rune_config::{
    Dimension, Environment, InsertPolicy, ItemAnchor, LayoutConfig, RuneConfig, TransitionConfig,
};
