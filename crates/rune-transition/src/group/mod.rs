//! Group orchestrator for keyed enter/exit transitions.
//!
//! `TransitionGroup` owns the render list produced by the reconciler and one
//! lifecycle controller per record. The host calls `update` whenever its
//! entity list changes and `tick` once per rendered frame; after either call
//! `rendered()` yields the entities to draw together with their phase
//! markers.
//!
//! # Usage
//!
//! ```ignore
//! use rune_transition::{TransitionConfig, TransitionGroup};
//!
//! let mut group = TransitionGroup::new(TransitionConfig::with_durations(100.0, 100.0), ());
//! group.update(vec!["a"])?;
//! group.update(vec!["b"])?;   // "a" exiting, "b" entering
//! group.tick(16.0);            // both flip to their active sub-phase
//! group.tick(100.0);           // "a" removed, "b" at rest
//! ```

use std::collections::{HashMap, HashSet};

use rune_config::{Environment, TransitionConfig};
use tracing::{debug, warn};

use crate::controller::{Driver, EntityController, Outcome, Task, Timing};
use crate::error::{Result, TransitionError};
use crate::events::{EventQueue, LifecycleEvent};
use crate::hooks::TransitionHooks;
use crate::machine::PhaseMarkers;
use crate::reconcile::{RenderRecord, reconcile};
use crate::scheduler::{FrameScheduler, TaskId};
use crate::types::{EntityKey, Keyed, NodeRef};


/// An entity as it should currently be drawn.
#[derive(Debug, Clone)]
pub struct Rendered<'a, T> {
    pub key: &'a str,
    pub entity: &'a T,
    /// Phase markers for the styling layer. Always empty when animations are
    /// disabled.
    pub markers: PhaseMarkers,
    /// False while the entity is animating out.
    pub should_render: bool,
}

/// Keyed transition group.
pub struct TransitionGroup<T, H = ()> {
    config: TransitionConfig,
    environment: Environment,
    records: Vec<RenderRecord<T>>,
    controllers: HashMap<EntityKey, EntityController>,
    /// Entities rendered as-is while animations are disabled.
    passthrough: Vec<T>,
    scheduler: FrameScheduler<Task>,
    hooks: H,
    events: EventQueue,
    node_ref: Option<NodeRef>,
    /// Whether the first animated update has happened.
    mounted: bool,
    disabled: bool,
}

impl<T, H> TransitionGroup<T, H>
where
    T: Keyed + Clone,
    H: TransitionHooks<T>,
{
    /// Create a group in the development environment.
    pub fn new(config: TransitionConfig, hooks: H) -> Self {
        let environment = Environment::default();
        let disabled = config.animations_disabled(environment);
        Self {
            config,
            environment,
            records: Vec::new(),
            controllers: HashMap::new(),
            passthrough: Vec::new(),
            scheduler: FrameScheduler::new(),
            hooks,
            events: EventQueue::new(),
            node_ref: None,
            mounted: false,
            disabled,
        }
    }

    /// Set the runtime environment. `Test` forces the disabled fast path.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self.disabled = self.config.animations_disabled(environment);
        self
    }

    /// Forward a node reference to the rendered entity. The group then
    /// accepts at most one entity per update.
    pub fn with_node_ref(mut self, node_ref: NodeRef) -> Self {
        self.node_ref = Some(node_ref);
        self
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Replace the configuration. Durations apply to waits scheduled from now
    /// on; a change of the disabled switch takes effect on the next update.
    pub fn set_config(&mut self, config: TransitionConfig) {
        self.config = config;
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Swap the hooks. In-flight animations call the new hooks from their
    /// next phase on. Returns the previous hooks.
    pub fn set_hooks(&mut self, hooks: H) -> H {
        std::mem::replace(&mut self.hooks, hooks)
    }

    /// Whether the group currently bypasses the transition machinery.
    pub fn animations_disabled(&self) -> bool {
        self.disabled
    }

    /// Virtual time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }

    /// Feed the caller's current entities.
    ///
    /// Usage errors (missing or duplicate key, several entities with a node
    /// reference) are returned before any state changes.
    pub fn update(&mut self, entities: impl IntoIterator<Item = T>) -> Result<()> {
        let entities: Vec<T> = entities.into_iter().collect();
        validate_keys(&entities)?;

        if self.node_ref.is_some() && self.environment.checks_usage() && entities.len() > 1 {
            warn!(count = entities.len(), "node reference used with several entities");
            return Err(TransitionError::MultipleEntitiesWithNodeRef {
                count: entities.len(),
            });
        }

        let disabled = self.config.animations_disabled(self.environment);
        if disabled != self.disabled {
            debug!(disabled, "animation mode switched, resetting group");
            self.reset();
            self.disabled = disabled;
        }

        if self.disabled {
            self.passthrough = entities;
            self.attach_node_ref();
            return Ok(());
        }

        let initial = !self.mounted;
        let prevent = initial && self.config.prevent_initial_transition;
        let current = std::mem::take(&mut self.records);
        self.records = reconcile(&entities, current, self.config.insert_policy, prevent);
        self.mounted = true;

        self.sync_controllers(initial);
        self.attach_node_ref();
        Ok(())
    }

    /// Advance time by `delta_ms` and cross one frame boundary.
    ///
    /// Timers due within the window fire first, then frame tasks requested
    /// before this call, then timers made due by those tasks.
    pub fn tick(&mut self, delta_ms: f32) {
        self.scheduler.advance(delta_ms);
        if self.disabled {
            return;
        }

        self.run_due_timers();

        let frame_tasks = self.scheduler.take_frame_tasks();
        self.hooks.on_frame(self.scheduler.now_ms());
        self.run_tasks(frame_tasks);

        self.run_due_timers();
        self.attach_node_ref();
    }

    /// Entities to draw, in render-list order.
    ///
    /// Entities still waiting out their mount delay are omitted.
    pub fn rendered(&self) -> Vec<Rendered<'_, T>> {
        if self.disabled {
            return self
                .passthrough
                .iter()
                .map(|entity| Rendered {
                    key: entity.key(),
                    entity,
                    markers: PhaseMarkers::default(),
                    should_render: true,
                })
                .collect();
        }

        self.records
            .iter()
            .filter_map(|record| {
                let controller = self.controllers.get(record.key())?;
                controller.is_mounted().then(|| Rendered {
                    key: record.key(),
                    entity: &record.entity,
                    markers: controller.markers(),
                    should_render: record.should_render,
                })
            })
            .collect()
    }

    /// Keys currently drawn, in order.
    pub fn rendered_keys(&self) -> Vec<&str> {
        self.rendered().into_iter().map(|r| r.key).collect()
    }

    /// Whether an entity is currently drawn.
    pub fn is_rendered(&self, key: &str) -> bool {
        self.rendered().iter().any(|r| r.key == key)
    }

    /// Phase markers for a drawn entity.
    pub fn markers(&self, key: &str) -> Option<PhaseMarkers> {
        self.rendered()
            .into_iter()
            .find(|r| r.key == key)
            .map(|r| r.markers)
    }

    /// The render list, including records still waiting on a mount delay.
    pub fn records(&self) -> &[RenderRecord<T>] {
        &self.records
    }

    /// True when no frame wait or timer is pending.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Drain lifecycle events recorded since the last drain.
    pub fn drain_events(&mut self) -> impl Iterator<Item = LifecycleEvent> + '_ {
        self.events.drain()
    }

    /// Tear every controller down and forget all entities.
    pub fn unmount(&mut self) {
        self.reset();
        if let Some(node_ref) = &self.node_ref {
            node_ref.attach(None);
        }
    }

    fn reset(&mut self) {
        for controller in self.controllers.values_mut() {
            controller.teardown(&mut self.scheduler);
        }
        self.controllers.clear();
        self.records.clear();
        self.passthrough.clear();
        self.scheduler.clear();
        self.mounted = false;
        self.hooks.on_reset();
    }

    fn timing(&self) -> Timing {
        Timing {
            enter_ms: self.config.enter_duration_ms,
            exit_ms: self.config.exit_duration_ms,
        }
    }

    fn sync_controllers(&mut self, initial: bool) {
        let timing = self.timing();
        let mount_delay_ms = if initial {
            None
        } else {
            self.config.enter_mount_delay_ms
        };

        let Self {
            records,
            controllers,
            scheduler,
            hooks,
            events,
            ..
        } = &mut *self;
        let mut driver = Driver {
            scheduler,
            hooks,
            events,
            timing,
        };

        // Exits are dispatched before enters so a swap reports the outgoing
        // entity first.
        let exiting = records.iter().filter(|r| !r.should_render);
        let entering = records.iter().filter(|r| r.should_render);

        let mut removed = Vec::new();
        for record in exiting.chain(entering) {
            let controller = controllers
                .entry(record.key().to_string())
                .or_insert_with(|| {
                    debug!(key = record.key(), "entity added");
                    EntityController::new(
                        record.key().to_string(),
                        record.prevent_mount_transition,
                        mount_delay_ms,
                    )
                });
            let outcome = controller.sync(record.should_render, &record.entity, &mut driver);
            if outcome == Outcome::Remove {
                removed.push(record.key().to_string());
            }
        }

        for key in removed {
            self.remove_record(&key);
        }
    }

    fn run_due_timers(&mut self) {
        loop {
            let due = self.scheduler.take_due_timers();
            if due.is_empty() {
                break;
            }
            self.run_tasks(due);
        }
    }

    fn run_tasks(&mut self, tasks: Vec<(TaskId, Task)>) {
        let timing = self.timing();
        let Self {
            records,
            controllers,
            scheduler,
            hooks,
            events,
            ..
        } = &mut *self;
        let mut driver = Driver {
            scheduler,
            hooks,
            events,
            timing,
        };

        let removed = {
            let index: HashMap<&str, usize> = records
                .iter()
                .enumerate()
                .map(|(i, r)| (r.key(), i))
                .collect();

            let mut removed = Vec::new();
            for (id, task) in tasks {
                let Some(controller) = controllers.get_mut(&task.key) else {
                    continue;
                };
                let Some(&at) = index.get(task.key.as_str()) else {
                    continue;
                };
                let entity = &records[at].entity;
                if controller.run(id, task.step, entity, &mut driver) == Outcome::Remove {
                    removed.push(task.key);
                }
            }
            removed
        };

        for key in removed {
            self.remove_record(&key);
        }
    }

    fn remove_record(&mut self, key: &str) {
        if let Some(pos) = self.records.iter().position(|r| r.key() == key) {
            self.records.remove(pos);
        }
        if let Some(mut controller) = self.controllers.remove(key) {
            controller.teardown(&mut self.scheduler);
        }
        debug!(key, "entity removed");
    }

    fn attach_node_ref(&self) {
        let Some(node_ref) = &self.node_ref else {
            return;
        };
        let key = if self.disabled {
            self.passthrough.first().map(|e| e.key())
        } else {
            self.records
                .iter()
                .filter(|r| r.should_render)
                .find(|r| {
                    self.controllers
                        .get(r.key())
                        .is_some_and(|c| c.is_mounted())
                })
                .map(|r| r.key())
        };
        node_ref.attach(key);
    }
}

fn validate_keys<T: Keyed>(entities: &[T]) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, entity) in entities.iter().enumerate() {
        let key = entity.key();
        if key.is_empty() {
            warn!(index, "entity supplied without a key");
            return Err(TransitionError::MissingKey { index });
        }
        if !seen.insert(key) {
            warn!(key, "duplicate entity key");
            return Err(TransitionError::DuplicateKey {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}
