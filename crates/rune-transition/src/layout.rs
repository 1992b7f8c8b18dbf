//! Layout transitions: container resize coordinated by a single captain.
//!
//! Several entities of one group may animate at once, but only one of them
//! at a time (the captain) is allowed to drive the container's size. An
//! entity claims captaincy when it starts entering, or when it starts exiting
//! and nobody else holds it. Every container write checks the token, so a
//! pre-empted entity finishing its own animation later changes nothing.
//!
//! ```text
//! onEnter         claim, size = container, direction = in | move
//! onEnterActive   size = entity                         (captain only)
//! onEnterComplete release at the next frame boundary    (captain only)
//! onExit          claim if vacant, size = container, direction = out
//! onExitActive    size = 0                              (captain only)
//! onExitComplete  release at the next frame boundary    (captain only)
//! ```

use std::marker::PhantomData;

use rune_config::{Dimension, Environment, ItemAnchor, LayoutConfig, TransitionConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::group::{Rendered, TransitionGroup};
use crate::hooks::{PhaseContext, TransitionHooks};
use crate::types::{EntityKey, Keyed};

/// Host-provided measurements.
pub trait LayoutMeasure<T> {
    /// Current size of the container along `dimension`.
    fn container_size(&self, dimension: Dimension) -> f32;
    /// Natural size of an entity along `dimension`.
    fn entity_size(&self, entity: &T, dimension: Dimension) -> f32;
}

/// Token naming the entity allowed to write the container's size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captaincy {
    owner: Option<EntityKey>,
}

impl Captaincy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the token unconditionally. Returns the previous owner.
    pub fn claim(&mut self, key: &str) -> Option<EntityKey> {
        self.owner.replace(key.to_string())
    }

    /// Take the token if nobody holds it, or keep it if `key` already does.
    pub fn claim_if_vacant_or_held(&mut self, key: &str) -> bool {
        match &self.owner {
            Some(owner) => owner == key,
            None => {
                self.owner = Some(key.to_string());
                true
            }
        }
    }

    pub fn holds(&self, key: &str) -> bool {
        self.owner.as_deref() == Some(key)
    }

    /// Give the token up. Only the owner can release it.
    pub fn release(&mut self, key: &str) -> bool {
        if self.holds(key) {
            self.owner = None;
            true
        } else {
            false
        }
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Drop the token regardless of who holds it.
    pub fn clear(&mut self) -> Option<EntityKey> {
        self.owner.take()
    }
}

/// Which way the container is resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeDirection {
    /// An entity appears into an empty container.
    In,
    /// One entity replaces another.
    Move,
    /// The container empties.
    Out,
}

impl ResizeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Move => "move",
            Self::Out => "out",
        }
    }
}

/// Container size and direction as read by the styling layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStyle {
    pub dimension: Dimension,
    pub anchor: ItemAnchor,
    /// Explicit size. `None` means the natural size.
    pub size: Option<f32>,
    pub direction: Option<ResizeDirection>,
}

impl ContainerStyle {
    pub fn new(dimension: Dimension, anchor: ItemAnchor) -> Self {
        Self {
            dimension,
            anchor,
            size: None,
            direction: None,
        }
    }

    /// Apply `change` if `key` holds the captaincy. Returns whether it did.
    pub fn write(
        &mut self,
        captaincy: &Captaincy,
        key: &str,
        change: impl FnOnce(&mut ContainerStyle),
    ) -> bool {
        if !captaincy.holds(key) {
            return false;
        }
        change(self);
        true
    }

    /// Back to natural size with no direction.
    pub fn reset(&mut self) {
        self.size = None;
        self.direction = None;
    }

    /// True while no resize is being driven.
    pub fn is_natural(&self) -> bool {
        self.size.is_none() && self.direction.is_none()
    }
}

/// Hooks implementing the captain protocol, chained with user hooks.
pub struct CaptainHooks<T, M, H = ()> {
    layout: LayoutConfig,
    measure: M,
    inner: H,
    captaincy: Captaincy,
    style: ContainerStyle,
    last_exit_at: Option<f64>,
    pending_release: Option<EntityKey>,
    _entity: PhantomData<fn(&T)>,
}

impl<T, M, H> CaptainHooks<T, M, H>
where
    M: LayoutMeasure<T>,
    H: TransitionHooks<T>,
{
    pub fn new(layout: LayoutConfig, measure: M, inner: H) -> Self {
        let style = ContainerStyle::new(layout.dimension, layout.item_anchor);
        Self {
            layout,
            measure,
            inner,
            captaincy: Captaincy::new(),
            style,
            last_exit_at: None,
            pending_release: None,
            _entity: PhantomData,
        }
    }

    pub fn style(&self) -> &ContainerStyle {
        &self.style
    }

    pub fn captaincy(&self) -> &Captaincy {
        &self.captaincy
    }

    pub fn measure(&self) -> &M {
        &self.measure
    }

    pub fn measure_mut(&mut self) -> &mut M {
        &mut self.measure
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    fn exited_recently(&self, now_ms: f64) -> bool {
        self.last_exit_at
            .is_some_and(|at| now_ms - at <= f64::from(self.layout.move_grace_ms))
    }

    fn schedule_release(&mut self, key: &str) {
        if self.captaincy.holds(key) {
            self.pending_release = Some(key.to_string());
        }
    }
}

impl<T, M, H> TransitionHooks<T> for CaptainHooks<T, M, H>
where
    M: LayoutMeasure<T>,
    H: TransitionHooks<T>,
{
    fn on_enter(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        let previous = self.captaincy.claim(cx.key);
        // A release queued by the previous phase must not undo this claim.
        self.pending_release = None;
        let direction = if previous.is_some() || self.exited_recently(cx.now_ms) {
            ResizeDirection::Move
        } else {
            ResizeDirection::In
        };
        let size = self.measure.container_size(self.layout.dimension);
        self.style.write(&self.captaincy, cx.key, |style| {
            style.size = Some(size);
            style.direction = Some(direction);
        });
        debug!(key = cx.key, direction = direction.as_str(), "captain claimed on enter");
        self.inner.on_enter(cx, entity);
    }

    fn on_enter_active(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        let size = self.measure.entity_size(entity, self.layout.dimension);
        self.style.write(&self.captaincy, cx.key, |style| {
            style.size = Some(size);
        });
        self.inner.on_enter_active(cx, entity);
    }

    fn on_enter_complete(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.schedule_release(cx.key);
        self.inner.on_enter_complete(cx, entity);
    }

    fn on_exit(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.last_exit_at = Some(cx.now_ms);
        if self.captaincy.claim_if_vacant_or_held(cx.key) {
            self.pending_release = None;
            let size = self.measure.container_size(self.layout.dimension);
            self.style.write(&self.captaincy, cx.key, |style| {
                style.size = Some(size);
                style.direction = Some(ResizeDirection::Out);
            });
            debug!(key = cx.key, "captain claimed on exit");
        }
        self.inner.on_exit(cx, entity);
    }

    fn on_exit_active(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.style.write(&self.captaincy, cx.key, |style| {
            style.size = Some(0.0);
        });
        self.inner.on_exit_active(cx, entity);
    }

    fn on_exit_complete(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.schedule_release(cx.key);
        self.inner.on_exit_complete(cx, entity);
    }

    fn on_frame(&mut self, now_ms: f64) {
        if let Some(key) = self.pending_release.take() {
            if self.captaincy.release(&key) {
                self.style.reset();
                debug!(key = %key, "captain released");
            }
        }
        self.inner.on_frame(now_ms);
    }

    fn on_reset(&mut self) {
        if let Some(key) = self.captaincy.clear() {
            debug!(key = %key, "captain dropped on reset");
        }
        self.pending_release = None;
        self.last_exit_at = None;
        self.style.reset();
        self.inner.on_reset();
    }
}

/// A transition group that also animates its container's size.
pub struct LayoutTransition<T, M, H = ()> {
    group: TransitionGroup<T, CaptainHooks<T, M, H>>,
}

impl<T, M, H> LayoutTransition<T, M, H>
where
    T: Keyed + Clone,
    M: LayoutMeasure<T>,
    H: TransitionHooks<T>,
{
    pub fn new(config: TransitionConfig, layout: LayoutConfig, measure: M, hooks: H) -> Self {
        Self {
            group: TransitionGroup::new(config, CaptainHooks::new(layout, measure, hooks)),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.group = self.group.with_environment(environment);
        self
    }

    pub fn update(&mut self, entities: impl IntoIterator<Item = T>) -> Result<()> {
        self.group.update(entities)
    }

    pub fn tick(&mut self, delta_ms: f32) {
        self.group.tick(delta_ms);
    }

    pub fn rendered(&self) -> Vec<Rendered<'_, T>> {
        self.group.rendered()
    }

    pub fn container_style(&self) -> &ContainerStyle {
        self.group.hooks().style()
    }

    /// Key of the entity currently driving the container.
    pub fn captain(&self) -> Option<&str> {
        self.group.hooks().captaincy().owner()
    }

    pub fn measure_mut(&mut self) -> &mut M {
        self.group.hooks_mut().measure_mut()
    }

    pub fn hooks(&self) -> &H {
        self.group.hooks().inner()
    }

    pub fn group(&self) -> &TransitionGroup<T, CaptainHooks<T, M, H>> {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut TransitionGroup<T, CaptainHooks<T, M, H>> {
        &mut self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Hooks;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct FixedMeasure {
        container: f32,
        sizes: HashMap<&'static str, f32>,
    }

    impl FixedMeasure {
        fn new(container: f32) -> Self {
            Self {
                container,
                sizes: HashMap::from([("a", 40.0), ("b", 80.0)]),
            }
        }
    }

    impl LayoutMeasure<&'static str> for FixedMeasure {
        fn container_size(&self, _dimension: Dimension) -> f32 {
            self.container
        }

        fn entity_size(&self, entity: &&'static str, _dimension: Dimension) -> f32 {
            self.sizes.get(entity).copied().unwrap_or(0.0)
        }
    }

    fn layout(grace_ms: f32) -> LayoutTransition<&'static str, FixedMeasure> {
        LayoutTransition::new(
            TransitionConfig::with_durations(100.0, 100.0),
            LayoutConfig::default().with_move_grace(grace_ms),
            FixedMeasure::new(40.0),
            (),
        )
    }

    #[test]
    fn test_captaincy_token() {
        let mut token = Captaincy::new();
        assert!(token.claim_if_vacant_or_held("a"));
        assert!(token.claim_if_vacant_or_held("a"));
        assert!(!token.claim_if_vacant_or_held("b"));

        assert_eq!(token.claim("b").as_deref(), Some("a"));
        assert!(!token.release("a"));
        assert!(token.release("b"));
        assert_eq!(token.owner(), None);
    }

    #[test]
    fn test_style_write_requires_captaincy() {
        let mut token = Captaincy::new();
        token.claim("a");
        let mut style = ContainerStyle::new(Dimension::Height, ItemAnchor::Start);

        assert!(!style.write(&token, "b", |s| s.size = Some(1.0)));
        assert!(style.is_natural());
        assert!(style.write(&token, "a", |s| s.size = Some(2.0)));
        assert_eq!(style.size, Some(2.0));
    }

    #[test]
    fn test_swap_moves_container_to_incoming_size() {
        let mut layout = layout(50.0);
        layout.update(vec!["a"]).unwrap();
        assert!(layout.container_style().is_natural());

        layout.update(vec!["b"]).unwrap();
        assert_eq!(layout.captain(), Some("b"));
        assert_eq!(layout.container_style().size, Some(40.0));
        assert_eq!(
            layout.container_style().direction,
            Some(ResizeDirection::Move)
        );

        layout.tick(16.0);
        assert_eq!(layout.container_style().size, Some(80.0));

        layout.tick(100.0);
        assert_eq!(layout.captain(), None);
        assert!(layout.container_style().is_natural());
    }

    #[test]
    fn test_enter_into_empty_container() {
        let mut layout = layout(50.0);
        layout.update(Vec::new()).unwrap();
        layout.update(vec!["a"]).unwrap();

        assert_eq!(layout.container_style().direction, Some(ResizeDirection::In));
        layout.tick(16.0);
        assert_eq!(layout.container_style().size, Some(40.0));
    }

    #[test]
    fn test_lone_exit_collapses_container() {
        let mut layout = layout(50.0);
        layout.update(vec!["a"]).unwrap();
        layout.update(Vec::new()).unwrap();

        assert_eq!(layout.captain(), Some("a"));
        assert_eq!(layout.container_style().direction, Some(ResizeDirection::Out));

        layout.tick(16.0);
        assert_eq!(layout.container_style().size, Some(0.0));

        layout.tick(100.0);
        assert!(layout.rendered().is_empty());
        assert!(layout.container_style().is_natural());
    }

    #[test]
    fn test_preempted_exit_leaves_container_alone() {
        let mut layout = layout(50.0);
        layout.update(vec!["a"]).unwrap();
        layout.update(Vec::new()).unwrap();
        layout.tick(16.0);
        layout.tick(50.0);

        layout.update(vec!["b"]).unwrap();
        assert_eq!(layout.captain(), Some("b"));
        layout.tick(16.0);
        assert_eq!(layout.container_style().size, Some(80.0));

        // "a" finishes exiting without being captain.
        layout.tick(34.0);
        assert_eq!(layout.rendered().len(), 1);
        assert_eq!(layout.captain(), Some("b"));
        assert_eq!(layout.container_style().size, Some(80.0));
    }

    #[test]
    fn test_enter_within_grace_counts_as_move() {
        let mut layout = layout(200.0);
        layout.update(vec!["a"]).unwrap();
        layout.update(Vec::new()).unwrap();
        layout.tick(16.0);
        layout.tick(100.0);
        assert_eq!(layout.captain(), None);

        layout.update(vec!["b"]).unwrap();
        assert_eq!(
            layout.container_style().direction,
            Some(ResizeDirection::Move)
        );
    }

    #[test]
    fn test_enter_after_grace_counts_as_in() {
        let mut layout = layout(50.0);
        layout.update(vec!["a"]).unwrap();
        layout.update(Vec::new()).unwrap();
        layout.tick(16.0);
        layout.tick(100.0);

        layout.update(vec!["b"]).unwrap();
        assert_eq!(layout.container_style().direction, Some(ResizeDirection::In));
    }

    #[test]
    fn test_user_hooks_still_fire() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let hooks = Hooks::new().on_enter(move |cx: &PhaseContext<'_>, _: &&'static str| {
            sink.borrow_mut().push(cx.key.to_string());
        });
        let mut layout = LayoutTransition::new(
            TransitionConfig::default(),
            LayoutConfig::default(),
            FixedMeasure::new(10.0),
            hooks,
        );
        layout.update(Vec::new()).unwrap();
        layout.update(vec!["a"]).unwrap();

        assert_eq!(*seen.borrow(), vec!["a".to_string()]);
        assert_eq!(layout.captain(), Some("a"));
    }

    #[test]
    fn test_disabling_mid_exit_restores_natural_size() {
        let mut layout = layout(50.0);
        layout.update(vec!["a"]).unwrap();
        layout.update(Vec::new()).unwrap();
        layout.tick(16.0);
        assert_eq!(layout.container_style().size, Some(0.0));

        let config = layout.group().config().clone().with_disable_animations(true);
        layout.group_mut().set_config(config);
        layout.update(vec!["b"]).unwrap();
        layout.tick(1000.0);

        assert_eq!(layout.captain(), None);
        assert!(layout.container_style().is_natural());
    }

    #[test]
    fn test_exit_after_instant_enter_keeps_collapsing() {
        let mut layout = LayoutTransition::new(
            TransitionConfig::with_durations(0.0, 100.0),
            LayoutConfig::default(),
            FixedMeasure::new(40.0),
            (),
        );
        layout.update(Vec::new()).unwrap();
        layout.update(vec!["a"]).unwrap();
        // Enter completes here and queues the release for the next frame.
        layout.tick(16.0);

        layout.update(Vec::new()).unwrap();
        layout.tick(16.0);

        assert_eq!(layout.captain(), Some("a"));
        assert_eq!(layout.container_style().size, Some(0.0));
        assert_eq!(layout.container_style().direction, Some(ResizeDirection::Out));
    }

    #[test]
    fn test_disabled_layout_never_resizes() {
        let mut layout = layout(50.0).with_environment(Environment::Test);
        layout.update(vec!["a"]).unwrap();
        layout.update(vec!["b"]).unwrap();
        layout.tick(16.0);

        assert!(layout.container_style().is_natural());
        assert_eq!(layout.captain(), None);
    }
}
