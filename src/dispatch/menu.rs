//! Interactive menu model.

/// One menu button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    /// Text shown on the button
    pub label: String,
    /// Callback token sent back when the button is pressed
    pub token: String,
}

impl MenuButton {
    /// Create a button
    #[must_use]
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Ordered list of menu buttons, static for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuModel {
    buttons: Vec<MenuButton>,
}

impl MenuModel {
    /// Create a menu from buttons, keeping their order
    #[must_use]
    pub const fn new(buttons: Vec<MenuButton>) -> Self {
        Self { buttons }
    }

    /// Buttons in display order
    #[must_use]
    pub fn buttons(&self) -> &[MenuButton] {
        &self.buttons
    }

    /// Callback tokens referenced by the menu
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().map(|b| b.token.as_str())
    }
}

impl Default for MenuModel {
    fn default() -> Self {
        Self::new(vec![
            MenuButton::new("Show Menu", "menu"),
            MenuButton::new("Make Photo", "photo"),
            MenuButton::new("Start Detection", "start"),
            MenuButton::new("Stop Detection", "stop"),
        ])
    }
}
