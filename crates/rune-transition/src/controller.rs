//! Per-entity lifecycle controller.
//!
//! Drives one entity's `TransitionState` through its phases:
//!
//! ```text
//! enter: enter-before + onEnter ─frame─▶ enter-active + onEnterActive ─enter_ms─▶ done + onEnterComplete
//! exit:  exit-before + onExit   ─frame─▶ exit-active + onExitActive   ─exit_ms──▶ onExitComplete, remove
//! ```
//!
//! The controller owns at most one pending scheduler task. Re-evaluating the
//! entity (its `should_render` flipped) or tearing the controller down cancels
//! that task before anything else happens.

use tracing::trace;

use crate::events::{EventQueue, LifecycleEvent, LifecycleHook};
use crate::hooks::{PhaseContext, TransitionHooks};
use crate::machine::{PhaseMarkers, TransitionAction, TransitionState};
use crate::scheduler::{FrameScheduler, TaskId};
use crate::types::EntityKey;

/// Deferred controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Mount delay elapsed.
    Mount,
    EnterActive,
    EnterComplete,
    ExitActive,
    ExitComplete,
}

/// Scheduler payload routed back to a controller by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Task {
    pub key: EntityKey,
    pub step: Step,
}

/// Phase durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Timing {
    pub enter_ms: f32,
    pub exit_ms: f32,
}

/// Borrowed group resources a controller needs while running.
pub(crate) struct Driver<'a, H> {
    pub scheduler: &'a mut FrameScheduler<Task>,
    pub hooks: &'a mut H,
    pub events: &'a mut EventQueue,
    pub timing: Timing,
}

/// What the group should do with the controller's record afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Keep,
    Remove,
}

#[derive(Debug)]
pub(crate) struct EntityController {
    key: EntityKey,
    /// `None` while a mount delay is pending.
    state: Option<TransitionState>,
    prevent_mount_transition: bool,
    prevention_consumed: bool,
    mount_delay_ms: Option<f32>,
    /// Last `should_render` value acted upon.
    evaluated: Option<bool>,
    last_fired: Option<LifecycleHook>,
    pending: Option<TaskId>,
}

impl EntityController {
    /// Create a controller. A mount delay only applies to entities whose
    /// mount transition is not suppressed.
    pub fn new(key: EntityKey, prevent_mount_transition: bool, mount_delay_ms: Option<f32>) -> Self {
        let mount_delay_ms = mount_delay_ms.filter(|_| !prevent_mount_transition);
        Self {
            key,
            state: match mount_delay_ms {
                Some(_) => None,
                None => Some(TransitionState::initial(prevent_mount_transition)),
            },
            prevent_mount_transition,
            prevention_consumed: false,
            mount_delay_ms,
            evaluated: None,
            last_fired: None,
            pending: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> Option<TransitionState> {
        self.state
    }

    /// Whether the entity is present in the rendered output.
    pub fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    pub fn markers(&self) -> PhaseMarkers {
        self.state.map(|s| s.markers()).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// React to the record's current `should_render`.
    ///
    /// Re-renders that leave `should_render` unchanged are no-ops.
    pub fn sync<T, H: TransitionHooks<T>>(
        &mut self,
        should_render: bool,
        entity: &T,
        driver: &mut Driver<'_, H>,
    ) -> Outcome {
        if self.evaluated == Some(should_render) {
            return Outcome::Keep;
        }
        self.evaluated = Some(should_render);

        if self.state.is_none() {
            if should_render {
                if self.pending.is_none() {
                    let delay = self.mount_delay_ms.unwrap_or(0.0);
                    self.schedule_timeout(delay, Step::Mount, driver);
                }
                return Outcome::Keep;
            }
            // Never became visible: nothing to animate out.
            self.teardown(driver.scheduler);
            return Outcome::Remove;
        }

        if should_render {
            self.begin_enter(entity, driver);
        } else {
            self.begin_exit(entity, driver);
        }
        Outcome::Keep
    }

    /// Run a scheduled step. Stale task ids are ignored.
    pub fn run<T, H: TransitionHooks<T>>(
        &mut self,
        id: TaskId,
        step: Step,
        entity: &T,
        driver: &mut Driver<'_, H>,
    ) -> Outcome {
        if self.pending != Some(id) {
            return Outcome::Keep;
        }
        self.pending = None;

        match step {
            Step::Mount => {
                self.state = Some(TransitionState::initial(false));
                self.begin_enter(entity, driver);
            }
            Step::EnterActive => {
                self.dispatch(TransitionAction::EnterActive);
                self.fire(LifecycleHook::EnterActive, entity, driver);
                let enter_ms = driver.timing.enter_ms;
                self.schedule_timeout(enter_ms, Step::EnterComplete, driver);
            }
            Step::EnterComplete => {
                self.dispatch(TransitionAction::Done);
                self.fire(LifecycleHook::EnterComplete, entity, driver);
            }
            Step::ExitActive => {
                self.dispatch(TransitionAction::ExitActive);
                self.fire(LifecycleHook::ExitActive, entity, driver);
                let exit_ms = driver.timing.exit_ms;
                self.schedule_timeout(exit_ms, Step::ExitComplete, driver);
            }
            Step::ExitComplete => {
                self.fire(LifecycleHook::ExitComplete, entity, driver);
                return Outcome::Remove;
            }
        }
        Outcome::Keep
    }

    /// Cancel any in-flight wait.
    pub fn teardown(&mut self, scheduler: &mut FrameScheduler<Task>) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }

    fn begin_enter<T, H: TransitionHooks<T>>(&mut self, entity: &T, driver: &mut Driver<'_, H>) {
        if self.prevent_mount_transition && !self.prevention_consumed {
            self.prevention_consumed = true;
            trace!(key = %self.key, "mount transition suppressed");
            return;
        }
        self.prevention_consumed = true;

        self.teardown(driver.scheduler);
        self.dispatch(TransitionAction::EnterBefore);
        self.fire(LifecycleHook::Enter, entity, driver);
        self.schedule_frame(Step::EnterActive, driver);
    }

    fn begin_exit<T, H: TransitionHooks<T>>(&mut self, entity: &T, driver: &mut Driver<'_, H>) {
        self.prevention_consumed = true;

        self.teardown(driver.scheduler);
        self.dispatch(TransitionAction::ExitBefore);
        self.fire(LifecycleHook::Exit, entity, driver);
        self.schedule_frame(Step::ExitActive, driver);
    }

    fn dispatch(&mut self, action: TransitionAction) {
        if let Some(state) = self.state.as_mut() {
            *state = state.reduce(action);
            trace!(
                key = %self.key,
                ?action,
                phase = ?state.phase,
                interrupted = state.interrupted,
                "transition dispatch"
            );
        }
    }

    fn fire<T, H: TransitionHooks<T>>(
        &mut self,
        hook: LifecycleHook,
        entity: &T,
        driver: &mut Driver<'_, H>,
    ) {
        if self.last_fired == Some(hook) {
            return;
        }
        self.last_fired = Some(hook);

        let now_ms = driver.scheduler.now_ms();
        let cx = PhaseContext {
            key: &self.key,
            now_ms,
        };
        driver.hooks.invoke(hook, &cx, entity);
        driver.events.push(LifecycleEvent {
            key: self.key.clone(),
            hook,
            at_ms: now_ms,
        });
    }

    fn schedule_frame<H>(&mut self, step: Step, driver: &mut Driver<'_, H>) {
        let task = Task {
            key: self.key.clone(),
            step,
        };
        self.pending = Some(driver.scheduler.request_frame(task));
    }

    fn schedule_timeout<H>(&mut self, delay_ms: f32, step: Step, driver: &mut Driver<'_, H>) {
        let task = Task {
            key: self.key.clone(),
            step,
        };
        self.pending = Some(driver.scheduler.set_timeout(delay_ms, task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::TransitionPhase;

    struct Harness {
        scheduler: FrameScheduler<Task>,
        hooks: (),
        events: EventQueue,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                scheduler: FrameScheduler::new(),
                hooks: (),
                events: EventQueue::new(),
            }
        }

        fn driver(&mut self) -> Driver<'_, ()> {
            Driver {
                scheduler: &mut self.scheduler,
                hooks: &mut self.hooks,
                events: &mut self.events,
                timing: Timing {
                    enter_ms: 100.0,
                    exit_ms: 100.0,
                },
            }
        }

        fn hooks(&mut self) -> Vec<LifecycleHook> {
            self.events.drain().map(|e| e.hook).collect()
        }
    }

    fn run_frame(controller: &mut EntityController, harness: &mut Harness) -> Vec<Outcome> {
        let tasks = harness.scheduler.take_frame_tasks();
        let mut outcomes = Vec::new();
        for (id, task) in tasks {
            outcomes.push(controller.run(id, task.step, &"a", &mut harness.driver()));
        }
        outcomes
    }

    fn run_timers(
        controller: &mut EntityController,
        harness: &mut Harness,
        delta_ms: f32,
    ) -> Vec<Outcome> {
        harness.scheduler.advance(delta_ms);
        let tasks = harness.scheduler.take_due_timers();
        let mut outcomes = Vec::new();
        for (id, task) in tasks {
            outcomes.push(controller.run(id, task.step, &"a", &mut harness.driver()));
        }
        outcomes
    }

    #[test]
    fn test_suppressed_mount_fires_nothing() {
        let mut harness = Harness::new();
        let mut controller = EntityController::new("a".into(), true, None);

        controller.sync(true, &"a", &mut harness.driver());

        assert!(controller.markers().is_empty());
        assert!(!controller.has_pending());
        assert!(harness.hooks().is_empty());
    }

    #[test]
    fn test_full_enter_cycle() {
        let mut harness = Harness::new();
        let mut controller = EntityController::new("a".into(), false, None);

        controller.sync(true, &"a", &mut harness.driver());
        assert_eq!(controller.state().map(|s| s.phase), Some(TransitionPhase::Entering));
        assert_eq!(harness.hooks(), vec![LifecycleHook::Enter]);

        run_frame(&mut controller, &mut harness);
        assert!(controller.markers().entering_active);
        assert_eq!(harness.hooks(), vec![LifecycleHook::EnterActive]);

        run_timers(&mut controller, &mut harness, 99.0);
        assert!(controller.markers().entering_active);

        run_timers(&mut controller, &mut harness, 1.0);
        assert!(controller.markers().is_empty());
        assert_eq!(harness.hooks(), vec![LifecycleHook::EnterComplete]);
    }

    #[test]
    fn test_exit_cycle_requests_removal() {
        let mut harness = Harness::new();
        let mut controller = EntityController::new("a".into(), true, None);
        controller.sync(true, &"a", &mut harness.driver());

        controller.sync(false, &"a", &mut harness.driver());
        assert!(controller.markers().exiting);
        assert!(!controller.markers().interrupted);

        assert_eq!(run_frame(&mut controller, &mut harness), vec![Outcome::Keep]);
        assert!(controller.markers().exiting_active);

        assert_eq!(
            run_timers(&mut controller, &mut harness, 100.0),
            vec![Outcome::Remove]
        );
        assert_eq!(
            harness.hooks(),
            vec![
                LifecycleHook::Exit,
                LifecycleHook::ExitActive,
                LifecycleHook::ExitComplete
            ]
        );
    }

    #[test]
    fn test_unchanged_should_render_is_idempotent() {
        let mut harness = Harness::new();
        let mut controller = EntityController::new("a".into(), false, None);

        controller.sync(true, &"a", &mut harness.driver());
        controller.sync(true, &"a", &mut harness.driver());
        controller.sync(true, &"a", &mut harness.driver());

        assert_eq!(harness.hooks(), vec![LifecycleHook::Enter]);
        assert_eq!(harness.scheduler.pending(), 1);
    }

    #[test]
    fn test_flip_cancels_pending_wait() {
        let mut harness = Harness::new();
        let mut controller = EntityController::new("a".into(), false, None);

        controller.sync(true, &"a", &mut harness.driver());
        controller.sync(false, &"a", &mut harness.driver());

        // Only the exit frame task remains.
        assert_eq!(harness.scheduler.pending(), 1);
        assert!(controller.markers().interrupted);

        run_frame(&mut controller, &mut harness);
        assert!(controller.markers().exiting_active);
        assert!(!controller.markers().interrupted);
    }

    #[test]
    fn test_delayed_mount() {
        let mut harness = Harness::new();
        let mut controller = EntityController::new("a".into(), false, Some(30.0));

        controller.sync(true, &"a", &mut harness.driver());
        assert!(!controller.is_mounted());
        assert!(harness.hooks().is_empty());

        run_timers(&mut controller, &mut harness, 30.0);
        assert!(controller.is_mounted());
        assert!(controller.markers().entering);
        assert_eq!(harness.hooks(), vec![LifecycleHook::Enter]);
    }

    #[test]
    fn test_exit_during_mount_delay_removes_silently() {
        let mut harness = Harness::new();
        let mut controller = EntityController::new("a".into(), false, Some(30.0));

        controller.sync(true, &"a", &mut harness.driver());
        let outcome = controller.sync(false, &"a", &mut harness.driver());

        assert_eq!(outcome, Outcome::Remove);
        assert!(harness.scheduler.is_idle());
        assert!(harness.hooks().is_empty());
    }

    #[test]
    fn test_suppressed_mount_does_not_delay() {
        let controller = EntityController::new("a".into(), true, Some(30.0));
        assert!(controller.is_mounted());
    }
}
