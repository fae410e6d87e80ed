//! Automation provider abstraction
//!
//! Each input category (mouse, keyboard, screen, clipboard) has a trait and
//! one or more interchangeable implementations, picked by a provider-type
//! string through [`ProviderRegistry`].

mod clipboard;
mod keymap;
mod registry;
mod screen;
mod x11;
mod xdotool;
mod ydotool;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

pub use registry::ProviderRegistry;

/// Provider type names chosen per category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub mouse: String,
    pub keyboard: String,
    pub screen: String,
    pub clipboard: String,
}

impl Default for ProviderSelection {
    fn default() -> Self {
        Self {
            mouse: "auto".to_string(),
            keyboard: "auto".to_string(),
            screen: "xcap".to_string(),
            clipboard: "command".to_string(),
        }
    }
}

/// A point in absolute screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Rectangle on screen, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// X11 core protocol button number
    pub fn x11_button(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Middle => 2,
            Self::Right => 3,
        }
    }
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            other => Err(format!("unknown mouse button {other:?}")),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// X11 wheel button number
    pub fn x11_button(self) -> u8 {
        match self {
            Self::Up => 4,
            Self::Down => 5,
            Self::Left => 6,
            Self::Right => 7,
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown scroll direction {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Super,
}

impl FromStr for Modifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ctrl" | "control" => Ok(Self::Ctrl),
            "alt" => Ok(Self::Alt),
            "shift" => Ok(Self::Shift),
            "super" | "meta" | "win" | "cmd" => Ok(Self::Super),
            other => Err(format!("unknown modifier {other:?}")),
        }
    }
}

/// Mouse movement, buttons and wheel
#[async_trait]
pub trait MouseProvider: Send + Sync {
    /// Provider type name, e.g. "ydotool"
    fn name(&self) -> &'static str;

    /// Move the pointer to absolute screen coordinates
    async fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()>;

    /// Click `count` times at the current pointer position
    async fn click(&self, button: MouseButton, count: u8) -> anyhow::Result<()>;

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> anyhow::Result<()>;

    /// Current pointer position
    async fn position(&self) -> anyhow::Result<Point>;
}

/// Text entry and key presses
#[async_trait]
pub trait KeyboardProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn type_text(&self, text: &str, delay_ms: u32) -> anyhow::Result<()>;

    /// Press and release `key` while holding `modifiers`
    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> anyhow::Result<()>;
}

/// Screen geometry and capture
#[async_trait]
pub trait ScreenProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn size(&self) -> anyhow::Result<ScreenSize>;

    /// PNG of the primary screen, or of `region` within it
    async fn capture(&self, region: Option<Region>) -> anyhow::Result<Vec<u8>>;
}

/// System clipboard text
#[async_trait]
pub trait ClipboardProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn read(&self) -> anyhow::Result<String>;

    async fn write(&self, text: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_aliases() {
        assert_eq!("Control".parse::<Modifier>(), Ok(Modifier::Ctrl));
        assert_eq!("meta".parse::<Modifier>(), Ok(Modifier::Super));
        assert!("hyper".parse::<Modifier>().is_err());
    }

    #[test]
    fn test_button_numbers() {
        assert_eq!(MouseButton::Right.x11_button(), 3);
        assert_eq!("MIDDLE".parse::<MouseButton>().map(MouseButton::x11_button), Ok(2));
        assert_eq!(ScrollDirection::Down.x11_button(), 5);
    }
}
