//! Command and callback routing.
//!
//! An explicit routing table maps inbound command names and menu callback
//! tokens to [`ActionKind`]s; the [`Dispatcher`] applies the owner gate and
//! executes the action.

pub mod denial_throttle;
pub mod dispatcher;
pub mod menu;
pub mod messages;
pub mod registry;

pub use denial_throttle::{Denial, DenialThrottle};
pub use dispatcher::{Dispatch, Dispatcher, InboundEvent};
pub use menu::{MenuButton, MenuModel};
pub use registry::{AccessPolicy, ActionKind, ActionRegistry, RegistryError, Route};
