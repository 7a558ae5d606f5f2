//! Routing tables from command names and callback tokens to actions.

use super::menu::MenuModel;
use crate::config::Settings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

/// Errors raised while building the routing tables
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Command names must be 1-32 chars of `a-z`, `0-9` or `_`
    #[error("Invalid command name: '{0}'")]
    InvalidCommandName(String),
    /// Callback tokens must be 1-64 bytes (Telegram `callback_data` limit)
    #[error("Invalid callback token: '{0}'")]
    InvalidCallbackToken(String),
    /// A menu button points at a token with no registered action
    #[error("Menu callback token '{0}' has no registered action")]
    UnresolvedMenuToken(String),
}

/// The named operations of the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Send the greeting with the menu
    ShowMenu,
    /// Take a picture and send it to the owner
    CaptureAndSend,
    /// Enable periodic motion detection
    StartDetection,
    /// Disable periodic motion detection
    StopDetection,
}

impl ActionKind {
    /// Every action, in menu order
    pub const ALL: [Self; 4] = [
        Self::ShowMenu,
        Self::CaptureAndSend,
        Self::StartDetection,
        Self::StopDetection,
    ];

    /// Stable action name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShowMenu => "show_menu",
            Self::CaptureAndSend => "capture_and_send",
            Self::StartDetection => "start_detection",
            Self::StopDetection => "stop_detection",
        }
    }

    /// Short description used for command hints
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ShowMenu => "Show the menu.",
            Self::CaptureAndSend => "Take a photo now.",
            Self::StartDetection => "Enable motion detection.",
            Self::StopDetection => "Disable motion detection.",
        }
    }
}

/// Resolved destination of a command or callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Action to execute
    pub action: ActionKind,
    /// Whether the sender must be the owner
    pub require_owner: bool,
}

impl Route {
    /// Route restricted to the owner
    #[must_use]
    pub const fn owner_only(action: ActionKind) -> Self {
        Self {
            action,
            require_owner: true,
        }
    }

    /// Route open to every sender
    #[must_use]
    pub const fn open(action: ActionKind) -> Self {
        Self {
            action,
            require_owner: false,
        }
    }
}

/// Where the owner gate applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Gate text commands
    pub commands: bool,
    /// Gate menu callbacks
    pub callbacks: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            commands: true,
            callbacks: true,
        }
    }
}

impl AccessPolicy {
    /// Policy described by the settings
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            commands: settings.require_owner_commands,
            callbacks: settings.require_owner_callbacks,
        }
    }
}

/// Built-in command table
pub const DEFAULT_COMMANDS: &[(&str, ActionKind)] = &[
    ("menu", ActionKind::ShowMenu),
    ("hi", ActionKind::ShowMenu),
    ("hey", ActionKind::ShowMenu),
    ("hello", ActionKind::ShowMenu),
    ("photo", ActionKind::CaptureAndSend),
    ("capture", ActionKind::CaptureAndSend),
    ("stop", ActionKind::StopDetection),
    ("start", ActionKind::StartDetection),
];

/// Built-in callback table
pub const DEFAULT_CALLBACKS: &[(&str, ActionKind)] = &[
    ("menu", ActionKind::ShowMenu),
    ("hello", ActionKind::ShowMenu),
    ("photo", ActionKind::CaptureAndSend),
    ("start", ActionKind::StartDetection),
    ("stop", ActionKind::StopDetection),
];

/// Exact-match, case-sensitive routing tables
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    commands: HashMap<String, Route>,
    callbacks: HashMap<String, Route>,
}

impl ActionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tables
    #[must_use]
    pub fn with_defaults(policy: AccessPolicy) -> Self {
        let mut registry = Self::new();
        for (name, action) in DEFAULT_COMMANDS {
            registry.register_command(*name, route_for(*action, policy.commands));
        }
        for (token, action) in DEFAULT_CALLBACKS {
            registry.register_callback(*token, route_for(*action, policy.callbacks));
        }
        registry
    }

    /// Registry described by the settings.
    ///
    /// A `commands` or `callbacks` table in the settings replaces the
    /// matching built-in table entirely.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidCommandName` or
    /// `RegistryError::InvalidCallbackToken` for an entry Telegram would
    /// reject.
    pub fn from_settings(settings: &Settings) -> Result<Self, RegistryError> {
        let policy = AccessPolicy::from_settings(settings);
        let mut registry = Self::with_defaults(policy);

        if let Some(table) = &settings.commands {
            registry.commands.clear();
            for (name, action) in table {
                validate_command_name(name)?;
                registry.register_command(name.clone(), route_for(*action, policy.commands));
            }
        }

        if let Some(table) = &settings.callbacks {
            registry.callbacks.clear();
            for (token, action) in table {
                if token.is_empty() || token.len() > 64 {
                    return Err(RegistryError::InvalidCallbackToken(token.clone()));
                }
                registry.register_callback(token.clone(), route_for(*action, policy.callbacks));
            }
        }

        Ok(registry)
    }

    /// Register or replace a command route
    pub fn register_command(&mut self, name: impl Into<String>, route: Route) {
        let name = name.into();
        debug!(command = %name, action = route.action.name(), "Registered command");
        self.commands.insert(name, route);
    }

    /// Register or replace a callback route
    pub fn register_callback(&mut self, token: impl Into<String>, route: Route) {
        let token = token.into();
        debug!(token = %token, action = route.action.name(), "Registered callback");
        self.callbacks.insert(token, route);
    }

    /// Look up a command by exact name
    #[must_use]
    pub fn command(&self, name: &str) -> Option<Route> {
        self.commands.get(name).copied()
    }

    /// Look up a callback by exact token
    #[must_use]
    pub fn callback(&self, token: &str) -> Option<Route> {
        self.callbacks.get(token).copied()
    }

    /// Registered commands sorted by name
    #[must_use]
    pub fn commands(&self) -> BTreeMap<&str, Route> {
        self.commands
            .iter()
            .map(|(name, route)| (name.as_str(), *route))
            .collect()
    }

    /// Check that every menu token resolves to a registered callback.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnresolvedMenuToken` for the first dangling
    /// token.
    pub fn validate_menu(&self, menu: &MenuModel) -> Result<(), RegistryError> {
        match menu.tokens().find(|token| self.callback(token).is_none()) {
            Some(token) => Err(RegistryError::UnresolvedMenuToken(token.to_string())),
            None => Ok(()),
        }
    }
}

const fn route_for(action: ActionKind, gated: bool) -> Route {
    if gated {
        Route::owner_only(action)
    } else {
        Route::open(action)
    }
}

fn validate_command_name(name: &str) -> Result<(), RegistryError> {
    let valid = (1..=32).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidCommandName(name.to_string()))
    }
}
