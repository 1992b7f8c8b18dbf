//! Lifecycle hooks invoked by the engine.
//!
//! A group stores exactly one hooks value and every deferred dispatch (frame
//! boundary or timer) goes through whatever is stored at that moment, so
//! replacing the hooks with `TransitionGroup::set_hooks` takes effect for
//! animations already in flight.

use crate::events::LifecycleHook;

/// Context passed to every lifecycle hook.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext<'a> {
    /// Key of the entity the hook fires for.
    pub key: &'a str,
    /// Virtual time of the invocation.
    pub now_ms: f64,
}

/// Callbacks fired at most once per phase entry.
pub trait TransitionHooks<T> {
    fn on_enter(&mut self, _cx: &PhaseContext<'_>, _entity: &T) {}
    fn on_enter_active(&mut self, _cx: &PhaseContext<'_>, _entity: &T) {}
    fn on_enter_complete(&mut self, _cx: &PhaseContext<'_>, _entity: &T) {}
    fn on_exit(&mut self, _cx: &PhaseContext<'_>, _entity: &T) {}
    fn on_exit_active(&mut self, _cx: &PhaseContext<'_>, _entity: &T) {}
    fn on_exit_complete(&mut self, _cx: &PhaseContext<'_>, _entity: &T) {}

    /// Called at every frame boundary, before frame tasks are dispatched.
    fn on_frame(&mut self, _now_ms: f64) {}

    /// Called when the group drops every entity at once (unmount, or a switch
    /// of the disabled mode). No lifecycle hook fires for those entities.
    fn on_reset(&mut self) {}

    /// Dispatch by hook kind.
    fn invoke(&mut self, hook: LifecycleHook, cx: &PhaseContext<'_>, entity: &T) {
        match hook {
            LifecycleHook::Enter => self.on_enter(cx, entity),
            LifecycleHook::EnterActive => self.on_enter_active(cx, entity),
            LifecycleHook::EnterComplete => self.on_enter_complete(cx, entity),
            LifecycleHook::Exit => self.on_exit(cx, entity),
            LifecycleHook::ExitActive => self.on_exit_active(cx, entity),
            LifecycleHook::ExitComplete => self.on_exit_complete(cx, entity),
        }
    }
}

impl<T> TransitionHooks<T> for () {}

type HookFn<T> = Box<dyn FnMut(&PhaseContext<'_>, &T)>;

/// Closure-backed hooks.
///
/// ```ignore
/// let hooks = Hooks::new()
///     .on_enter(|cx, _| println!("{} entering", cx.key))
///     .on_exit_complete(|cx, _| println!("{} gone", cx.key));
/// ```
pub struct Hooks<T> {
    handlers: [Option<HookFn<T>>; 6],
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            handlers: [None, None, None, None, None, None],
        }
    }
}

impl<T> std::fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered = self.handlers.iter().filter(|h| h.is_some()).count();
        f.debug_struct("Hooks")
            .field("registered", &registered)
            .finish()
    }
}

fn slot(hook: LifecycleHook) -> usize {
    match hook {
        LifecycleHook::Enter => 0,
        LifecycleHook::EnterActive => 1,
        LifecycleHook::EnterComplete => 2,
        LifecycleHook::Exit => 3,
        LifecycleHook::ExitActive => 4,
        LifecycleHook::ExitComplete => 5,
    }
}

impl<T> Hooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for any hook kind, replacing the previous one.
    pub fn with(
        mut self,
        hook: LifecycleHook,
        f: impl FnMut(&PhaseContext<'_>, &T) + 'static,
    ) -> Self {
        self.handlers[slot(hook)] = Some(Box::new(f));
        self
    }

    pub fn on_enter(self, f: impl FnMut(&PhaseContext<'_>, &T) + 'static) -> Self {
        self.with(LifecycleHook::Enter, f)
    }

    pub fn on_enter_active(self, f: impl FnMut(&PhaseContext<'_>, &T) + 'static) -> Self {
        self.with(LifecycleHook::EnterActive, f)
    }

    pub fn on_enter_complete(self, f: impl FnMut(&PhaseContext<'_>, &T) + 'static) -> Self {
        self.with(LifecycleHook::EnterComplete, f)
    }

    pub fn on_exit(self, f: impl FnMut(&PhaseContext<'_>, &T) + 'static) -> Self {
        self.with(LifecycleHook::Exit, f)
    }

    pub fn on_exit_active(self, f: impl FnMut(&PhaseContext<'_>, &T) + 'static) -> Self {
        self.with(LifecycleHook::ExitActive, f)
    }

    pub fn on_exit_complete(self, f: impl FnMut(&PhaseContext<'_>, &T) + 'static) -> Self {
        self.with(LifecycleHook::ExitComplete, f)
    }

    pub fn is_registered(&self, hook: LifecycleHook) -> bool {
        self.handlers[slot(hook)].is_some()
    }

    fn call(&mut self, hook: LifecycleHook, cx: &PhaseContext<'_>, entity: &T) {
        if let Some(handler) = self.handlers[slot(hook)].as_mut() {
            handler(cx, entity);
        }
    }
}

impl<T> TransitionHooks<T> for Hooks<T> {
    fn on_enter(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.call(LifecycleHook::Enter, cx, entity);
    }

    fn on_enter_active(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.call(LifecycleHook::EnterActive, cx, entity);
    }

    fn on_enter_complete(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.call(LifecycleHook::EnterComplete, cx, entity);
    }

    fn on_exit(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.call(LifecycleHook::Exit, cx, entity);
    }

    fn on_exit_active(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.call(LifecycleHook::ExitActive, cx, entity);
    }

    fn on_exit_complete(&mut self, cx: &PhaseContext<'_>, entity: &T) {
        self.call(LifecycleHook::ExitComplete, cx, entity);
    }
}
