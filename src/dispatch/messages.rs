//! Fixed user-facing texts.

/// Greeting shown with the menu
pub const GREETING: &str = "Hello, I'm Your Security Bot. What would you like to do?";

/// Rejection sent to anyone but the owner
pub const ACCESS_DENIED: &str = "You don't have permissions to communicate with this bot";

/// Detection switched on
pub const DETECTION_ENABLED: &str = "Motion Detection Enabled.";

/// Detection was already on
pub const DETECTION_ALREADY_ENABLED: &str = "Motion Detection is already enabled.";

/// Detection switched off
pub const DETECTION_DISABLED: &str = "Motion Detection Disabled.";

/// Detection was already off
pub const DETECTION_ALREADY_DISABLED: &str = "Motion Detection is already disabled.";

/// Generic notice after a failed capture
pub const CAPTURE_FAILED: &str = "Failed to take a picture, see the logs.";
