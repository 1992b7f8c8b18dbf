//! Rune transition configuration
//!
//! This crate provides the configuration model for the transition engine,
//! loading settings from `rune.toml` with environment-variable overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the transition engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuneConfig {
    /// Runtime environment (controls test fast paths and usage checks)
    pub environment: Environment,
    /// Enter/exit transition settings shared by every group
    pub transitions: TransitionConfig,
    /// Container resize settings for layout transitions
    pub layout: LayoutConfig,
}

/// Runtime environment the engine is embedded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
    /// Test execution: animations are always disabled.
    Test,
}

impl Environment {
    /// Read the environment from `RUNE_ENV`, falling back to development.
    pub fn from_env() -> Self {
        std::env::var("RUNE_ENV")
            .ok()
            .and_then(|val| Self::parse(&val))
            .unwrap_or_default()
    }

    /// Parse an environment name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    pub fn is_test(&self) -> bool {
        *self == Self::Test
    }

    /// Whether usage invariants (such as the single node reference check)
    /// are enforced. Only optimized production builds skip them.
    pub fn checks_usage(&self) -> bool {
        cfg!(debug_assertions) || *self != Self::Production
    }
}

/// Where newly appearing entities are placed relative to survivors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPolicy {
    #[default]
    Append,
    Prepend,
}

/// Axis animated by a layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    #[default]
    Height,
    Width,
}

impl Dimension {
    /// Style property name written by the styling layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Width => "width",
        }
    }
}

/// Edge entities visually pin to while their container resizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAnchor {
    #[default]
    Start,
    End,
}

/// Enter/exit transition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Duration of the enter "active" phase in milliseconds
    pub enter_duration_ms: f32,
    /// Duration of the exit "active" phase in milliseconds
    pub exit_duration_ms: f32,
    /// Suppress the enter animation for entities present on the first render
    pub prevent_initial_transition: bool,
    /// Defer presence of newly entering (non-initial) entities
    pub enter_mount_delay_ms: Option<f32>,
    /// Placement of new entities in the render list
    pub insert_policy: InsertPolicy,
    /// Bypass the state machine entirely
    pub disable_animations: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            enter_duration_ms: 200.0,
            exit_duration_ms: 200.0,
            prevent_initial_transition: true,
            enter_mount_delay_ms: None,
            insert_policy: InsertPolicy::Append,
            disable_animations: false,
        }
    }
}

impl TransitionConfig {
    /// Create a config with the given enter and exit durations.
    pub fn with_durations(enter_duration_ms: f32, exit_duration_ms: f32) -> Self {
        Self {
            enter_duration_ms,
            exit_duration_ms,
            ..Self::default()
        }
    }

    pub fn with_prevent_initial_transition(mut self, prevent: bool) -> Self {
        self.prevent_initial_transition = prevent;
        self
    }

    pub fn with_mount_delay(mut self, delay_ms: f32) -> Self {
        self.enter_mount_delay_ms = Some(delay_ms);
        self
    }

    pub fn with_insert_policy(mut self, policy: InsertPolicy) -> Self {
        self.insert_policy = policy;
        self
    }

    pub fn with_disable_animations(mut self, disable: bool) -> Self {
        self.disable_animations = disable;
        self
    }

    /// Whether the engine should bypass transitions in this environment.
    pub fn animations_disabled(&self, environment: Environment) -> bool {
        self.disable_animations || environment.is_test()
    }
}

/// Layout transition (container resize) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Axis measured and animated on the container
    pub dimension: Dimension,
    /// Edge the entities pin to during resize
    pub item_anchor: ItemAnchor,
    /// Window after an exit in which a new enter counts as a "move"
    pub move_grace_ms: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            dimension: Dimension::Height,
            item_anchor: ItemAnchor::Start,
            move_grace_ms: 50.0,
        }
    }
}

impl LayoutConfig {
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_item_anchor(mut self, anchor: ItemAnchor) -> Self {
        self.item_anchor = anchor;
        self
    }

    pub fn with_move_grace(mut self, grace_ms: f32) -> Self {
        self.move_grace_ms = grace_ms;
        self
    }
}

impl RuneConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration from `rune.toml` in the current directory
    /// or return default configuration if it is missing or invalid
    pub fn load_or_default() -> Self {
        Self::load_from_file("rune.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Some(env) = std::env::var("RUNE_ENV")
            .ok()
            .and_then(|val| Environment::parse(&val))
        {
            self.environment = env;
        }

        if let Ok(val) = std::env::var("RUNE_DISABLE_ANIMATIONS") {
            self.transitions.disable_animations = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("RUNE_ENTER_DURATION_MS") {
            if let Ok(ms) = val.parse::<f32>() {
                self.transitions.enter_duration_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("RUNE_EXIT_DURATION_MS") {
            if let Ok(ms) = val.parse::<f32>() {
                self.transitions.exit_duration_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("RUNE_ENTER_MOUNT_DELAY_MS") {
            if let Ok(ms) = val.parse::<f32>() {
                self.transitions.enter_mount_delay_ms = Some(ms);
            }
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from rune.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
