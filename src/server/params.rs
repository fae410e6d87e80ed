//! Tool parameters and their validation
//!
//! Each `validate` turns raw JSON arguments into typed values, or a
//! [`ValidationError`] naming the offending field.

use std::collections::HashSet;

use rmcp::{schemars, serde};

use crate::error::ValidationError;
use crate::providers::{Modifier, MouseButton, Region, ScrollDirection};

/// Largest coordinate or dimension X11 can address
pub const MAX_COORDINATE: i32 = i16::MAX as i32;
pub const MAX_TEXT_CHARS: usize = 10_000;
pub const MAX_CLIPBOARD_BYTES: usize = 1024 * 1024;
pub const MAX_KEY_DELAY_MS: u32 = 1000;
pub const MAX_SCROLL_AMOUNT: u32 = 100;
pub const MAX_CLICK_COUNT: u8 = 3;

fn check_coordinate(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    if (0..=MAX_COORDINATE).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::new(
            field,
            format!("must be between 0 and {MAX_COORDINATE}, got {value}"),
        ))
    }
}

fn check_dimension(field: &'static str, value: u32) -> Result<u32, ValidationError> {
    if (1..=MAX_COORDINATE as u32).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::new(
            field,
            format!("must be between 1 and {MAX_COORDINATE}, got {value}"),
        ))
    }
}

fn check_text(field: &'static str, text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(ValidationError::new(
            field,
            format!("at most {MAX_TEXT_CHARS} characters allowed, got {chars}"),
        ));
    }
    Ok(())
}

/// Parameters for mouse_move tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MouseMoveParams {
    /// Absolute screen X coordinate
    pub x: i32,
    /// Absolute screen Y coordinate
    pub y: i32,
}

impl MouseMoveParams {
    pub fn validate(&self) -> Result<(i32, i32), ValidationError> {
        Ok((check_coordinate("x", self.x)?, check_coordinate("y", self.y)?))
    }
}

/// Parameters for mouse_click tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MouseClickParams {
    /// Move here before clicking (requires y)
    #[serde(default)]
    pub x: Option<i32>,
    /// Move here before clicking (requires x)
    #[serde(default)]
    pub y: Option<i32>,
    /// Mouse button: "left" (default), "right", "middle"
    #[serde(default = "default_button")]
    pub button: String,
    /// Number of clicks, 1-3 (2 = double click)
    #[serde(default = "default_click_count")]
    pub count: u8,
}

fn default_button() -> String {
    "left".to_string()
}

fn default_click_count() -> u8 {
    1
}

/// Validated mouse_click request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickRequest {
    pub target: Option<(i32, i32)>,
    pub button: MouseButton,
    pub count: u8,
}

impl MouseClickParams {
    pub fn validate(&self) -> Result<ClickRequest, ValidationError> {
        let target = match (self.x, self.y) {
            (Some(x), Some(y)) => Some((check_coordinate("x", x)?, check_coordinate("y", y)?)),
            (None, None) => None,
            _ => return Err(ValidationError::new("x", "x and y must be given together")),
        };
        let button = self
            .button
            .parse::<MouseButton>()
            .map_err(|e: String| ValidationError::new("button", e))?;
        if !(1..=MAX_CLICK_COUNT).contains(&self.count) {
            return Err(ValidationError::new(
                "count",
                format!("must be between 1 and {MAX_CLICK_COUNT}, got {}", self.count),
            ));
        }
        Ok(ClickRequest {
            target,
            button,
            count: self.count,
        })
    }
}

/// Parameters for mouse_scroll tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MouseScrollParams {
    /// Direction: "up", "down" (default), "left", "right"
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Number of wheel notches, 1-100
    #[serde(default = "default_scroll_amount")]
    pub amount: u32,
}

fn default_direction() -> String {
    "down".to_string()
}

fn default_scroll_amount() -> u32 {
    3
}

impl MouseScrollParams {
    pub fn validate(&self) -> Result<(ScrollDirection, u32), ValidationError> {
        let direction = self
            .direction
            .parse::<ScrollDirection>()
            .map_err(|e: String| ValidationError::new("direction", e))?;
        if !(1..=MAX_SCROLL_AMOUNT).contains(&self.amount) {
            return Err(ValidationError::new(
                "amount",
                format!("must be between 1 and {MAX_SCROLL_AMOUNT}, got {}", self.amount),
            ));
        }
        Ok((direction, self.amount))
    }
}

/// Parameters for keyboard_type tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct KeyboardTypeParams {
    /// Text to type
    pub text: String,
    /// Delay between keystrokes in milliseconds
    #[serde(default = "default_delay")]
    pub delay_ms: u32,
}

fn default_delay() -> u32 {
    12
}

impl KeyboardTypeParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("text", &self.text)?;
        if self.delay_ms > MAX_KEY_DELAY_MS {
            return Err(ValidationError::new(
                "delay_ms",
                format!("at most {MAX_KEY_DELAY_MS}, got {}", self.delay_ms),
            ));
        }
        Ok(())
    }
}

/// Parameters for keyboard_press tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct KeyboardPressParams {
    /// Key to press (e.g., "Return", "Escape", "Tab", "a", "F1")
    pub key: String,
    /// Modifier keys to hold: "ctrl", "alt", "shift", "super"
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl KeyboardPressParams {
    pub fn validate(&self) -> Result<Vec<Modifier>, ValidationError> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(ValidationError::new("key", "must not be empty"));
        }
        if key.contains(char::is_whitespace) {
            return Err(ValidationError::new("key", "must be a single key name"));
        }

        let mut seen = HashSet::new();
        let mut modifiers = Vec::with_capacity(self.modifiers.len());
        for raw in &self.modifiers {
            let modifier = raw
                .parse::<Modifier>()
                .map_err(|e: String| ValidationError::new("modifiers", e))?;
            if !seen.insert(modifier) {
                return Err(ValidationError::new(
                    "modifiers",
                    format!("duplicate modifier {raw:?}"),
                ));
            }
            modifiers.push(modifier);
        }
        Ok(modifiers)
    }
}

/// Parameters for screen_capture tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ScreenCaptureParams {
    /// Region left edge; give all four region fields or none
    #[serde(default)]
    pub x: Option<i32>,
    /// Region top edge
    #[serde(default)]
    pub y: Option<i32>,
    /// Region width
    #[serde(default)]
    pub width: Option<u32>,
    /// Region height
    #[serde(default)]
    pub height: Option<u32>,
}

impl ScreenCaptureParams {
    pub fn validate(&self) -> Result<Option<Region>, ValidationError> {
        match (self.x, self.y, self.width, self.height) {
            (None, None, None, None) => Ok(None),
            (Some(x), Some(y), Some(width), Some(height)) => Ok(Some(Region {
                x: check_coordinate("x", x)?,
                y: check_coordinate("y", y)?,
                width: check_dimension("width", width)?,
                height: check_dimension("height", height)?,
            })),
            _ => Err(ValidationError::new(
                "region",
                "x, y, width and height must be given together",
            )),
        }
    }
}

/// Parameters for clipboard_write tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ClipboardWriteParams {
    /// Text to place on the clipboard
    pub text: String,
}

impl ClipboardWriteParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.len() > MAX_CLIPBOARD_BYTES {
            return Err(ValidationError::new(
                "text",
                format!("at most {MAX_CLIPBOARD_BYTES} bytes allowed, got {}", self.text.len()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_bounds() {
        assert_eq!(MouseMoveParams { x: 0, y: 32767 }.validate(), Ok((0, 32767)));
        let err = MouseMoveParams { x: -1, y: 5 }.validate().unwrap_err();
        assert_eq!(err.field, "x");
        assert!(MouseMoveParams { x: 1, y: 40_000 }.validate().is_err());
    }

    #[test]
    fn test_click_requires_both_coordinates() {
        let params = MouseClickParams {
            x: Some(10),
            y: None,
            button: "left".to_string(),
            count: 1,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_click_parses_button_and_count() {
        let params = MouseClickParams {
            x: Some(10),
            y: Some(20),
            button: "Right".to_string(),
            count: 2,
        };
        assert_eq!(
            params.validate(),
            Ok(ClickRequest {
                target: Some((10, 20)),
                button: MouseButton::Right,
                count: 2
            })
        );

        let params = MouseClickParams {
            x: None,
            y: None,
            button: "left".to_string(),
            count: 4,
        };
        assert_eq!(params.validate().unwrap_err().field, "count");

        let params = MouseClickParams {
            x: None,
            y: None,
            button: "thumb".to_string(),
            count: 1,
        };
        assert_eq!(params.validate().unwrap_err().field, "button");
    }

    #[test]
    fn test_scroll_amount_bounds() {
        let params = MouseScrollParams {
            direction: "up".to_string(),
            amount: 0,
        };
        assert_eq!(params.validate().unwrap_err().field, "amount");

        let params = MouseScrollParams {
            direction: "sideways".to_string(),
            amount: 1,
        };
        assert_eq!(params.validate().unwrap_err().field, "direction");
    }

    #[test]
    fn test_type_text_limits() {
        let params = KeyboardTypeParams {
            text: String::new(),
            delay_ms: 12,
        };
        assert!(params.validate().is_err());

        let params = KeyboardTypeParams {
            text: "x".repeat(MAX_TEXT_CHARS + 1),
            delay_ms: 12,
        };
        assert!(params.validate().is_err());

        let params = KeyboardTypeParams {
            text: "hello".to_string(),
            delay_ms: 5000,
        };
        assert_eq!(params.validate().unwrap_err().field, "delay_ms");
    }

    #[test]
    fn test_key_modifiers() {
        let params = KeyboardPressParams {
            key: "a".to_string(),
            modifiers: vec!["ctrl".to_string(), "Shift".to_string()],
        };
        assert_eq!(params.validate(), Ok(vec![Modifier::Ctrl, Modifier::Shift]));

        let params = KeyboardPressParams {
            key: "a".to_string(),
            modifiers: vec!["ctrl".to_string(), "control".to_string()],
        };
        assert!(params.validate().is_err());

        let params = KeyboardPressParams {
            key: "  ".to_string(),
            modifiers: vec![],
        };
        assert_eq!(params.validate().unwrap_err().field, "key");
    }

    #[test]
    fn test_capture_region_all_or_nothing() {
        let none = ScreenCaptureParams {
            x: None,
            y: None,
            width: None,
            height: None,
        };
        assert_eq!(none.validate(), Ok(None));

        let partial = ScreenCaptureParams {
            x: Some(0),
            y: Some(0),
            width: Some(10),
            height: None,
        };
        assert_eq!(partial.validate().unwrap_err().field, "region");

        let zero = ScreenCaptureParams {
            x: Some(0),
            y: Some(0),
            width: Some(0),
            height: Some(10),
        };
        assert_eq!(zero.validate().unwrap_err().field, "width");
    }

    #[test]
    fn test_clipboard_size_limit() {
        let params = ClipboardWriteParams {
            text: "a".repeat(MAX_CLIPBOARD_BYTES + 1),
        };
        assert!(params.validate().is_err());
        assert!(ClipboardWriteParams { text: String::new() }.validate().is_ok());
    }
}
