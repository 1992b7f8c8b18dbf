//! Transition state machine for a single entity.
//!
//! A pure reducer over `TransitionState`. The lifecycle controller feeds it
//! actions; the styling layer reads the resulting `PhaseMarkers`.
//!
//! ```text
//! resting ──enter-before──▶ entering ──enter-active──▶ entering-active ──done──▶ resting
//! resting ──exit-before───▶ exiting  ──exit-active───▶ exiting-active
//! ```
//!
//! Switching family mid-flight (exit while entering, or the reverse) marks the
//! state `interrupted` until the new family reaches its active sub-phase.

use serde::{Deserialize, Serialize};

/// Animation phase of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPhase {
    #[default]
    Resting,
    Entering,
    EnteringActive,
    Exiting,
    ExitingActive,
}

impl TransitionPhase {
    pub fn is_entering(&self) -> bool {
        matches!(self, Self::Entering | Self::EnteringActive)
    }

    pub fn is_exiting(&self) -> bool {
        matches!(self, Self::Exiting | Self::ExitingActive)
    }
}

/// Reducer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionAction {
    EnterBefore,
    EnterActive,
    ExitBefore,
    ExitActive,
    Done,
}

/// Phase plus interruption flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionState {
    pub phase: TransitionPhase,
    pub interrupted: bool,
}

impl TransitionState {
    /// Initial state for a freshly created controller.
    pub fn initial(prevent_mount_transition: bool) -> Self {
        Self {
            phase: if prevent_mount_transition {
                TransitionPhase::Resting
            } else {
                TransitionPhase::Entering
            },
            interrupted: false,
        }
    }

    pub fn is_resting(&self) -> bool {
        self.phase == TransitionPhase::Resting
    }

    /// Apply an action, returning the next state.
    pub fn reduce(self, action: TransitionAction) -> Self {
        match action {
            TransitionAction::EnterBefore => Self {
                phase: TransitionPhase::Entering,
                interrupted: self.interrupted || self.phase.is_exiting(),
            },
            TransitionAction::EnterActive => Self {
                phase: TransitionPhase::EnteringActive,
                interrupted: false,
            },
            TransitionAction::ExitBefore => Self {
                phase: TransitionPhase::Exiting,
                interrupted: self.interrupted || self.phase.is_entering(),
            },
            TransitionAction::ExitActive => Self {
                phase: TransitionPhase::ExitingActive,
                interrupted: false,
            },
            TransitionAction::Done => Self::default(),
        }
    }

    /// Boolean markers consumed by the styling layer.
    pub fn markers(&self) -> PhaseMarkers {
        PhaseMarkers {
            entering: self.phase.is_entering(),
            entering_active: self.phase == TransitionPhase::EnteringActive,
            exiting: self.phase.is_exiting(),
            exiting_active: self.phase == TransitionPhase::ExitingActive,
            interrupted: self.interrupted,
        }
    }
}

/// Boolean-presence attributes exposed on each rendered entity.
///
/// `entering` stays set through the active sub-phase, so a styling layer can
/// select on `entering` alone or on `entering` + `entering-active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseMarkers {
    pub entering: bool,
    pub entering_active: bool,
    pub exiting: bool,
    pub exiting_active: bool,
    pub interrupted: bool,
}

impl PhaseMarkers {
    /// True when no marker is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the attributes currently present.
    pub fn attributes(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.entering, "entering"),
            (self.entering_active, "entering-active"),
            (self.exiting, "exiting"),
            (self.exiting_active, "exiting-active"),
            (self.interrupted, "interrupted"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
    }
}
