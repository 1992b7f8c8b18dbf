//! Core entity types shared across the engine.
//!
//! - `EntityKey`: caller-supplied identity of a visual entity
//! - `Keyed`: trait implemented by anything the engine can track
//! - `Item`: convenience wrapper pairing a key with a payload
//! - `NodeRef`: shared slot forwarded to the single rendered entity

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Unique identifier for an entity within a rendering cycle.
pub type EntityKey = String;

/// A visual entity identified by a caller-supplied key.
///
/// An empty key is treated as a missing key and rejected by the group.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

impl Keyed for &str {
    fn key(&self) -> &str {
        self
    }
}

/// A keyed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<T> {
    pub key: EntityKey,
    pub value: T,
}

impl<T> Item<T> {
    pub fn new(key: impl Into<EntityKey>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl<T> Keyed for Item<T> {
    fn key(&self) -> &str {
        &self.key
    }
}

/// Reference to the rendered node of a single-entity group.
///
/// The group points it at the entity the caller currently asks to render.
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct NodeRef {
    current: Rc<RefCell<Option<EntityKey>>>,
}

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the entity this reference currently points at.
    pub fn current(&self) -> Option<EntityKey> {
        self.current.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub(crate) fn attach(&self, key: Option<&str>) {
        *self.current.borrow_mut() = key.map(str::to_string);
    }
}
