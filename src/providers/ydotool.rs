//! Input simulation via ydotool
//!
//! ydotool injects events through uinput, so it works on both X11 and
//! Wayland. It needs a running `ydotoold` and cannot report the pointer
//! position.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::keymap::{evdev_code, evdev_modifier};
use super::{KeyboardProvider, Modifier, MouseButton, MouseProvider, Point, ScrollDirection};

/// Delay between key down and key up, in milliseconds
const KEY_HOLD_MS: u32 = 50;

#[derive(Debug, Default)]
pub struct YdotoolInput;

impl YdotoolInput {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[String]) -> anyhow::Result<()> {
        tracing::debug!("Executing ydotool {:?}", args);

        let output = Command::new("ydotool").args(args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ydotool {} failed: {}", args[0], stderr.trim());
        }
        Ok(())
    }
}

fn click_code(button: MouseButton) -> &'static str {
    // Low nibble is the button, 0xC0 = down + up
    match button {
        MouseButton::Left => "0xC0",
        MouseButton::Right => "0xC1",
        MouseButton::Middle => "0xC2",
    }
}

/// `ydotool key` arguments: modifiers down, key tap, modifiers up in reverse
fn key_args(key: &str, modifiers: &[Modifier]) -> anyhow::Result<Vec<String>> {
    let code = evdev_code(key).ok_or_else(|| anyhow::anyhow!("ydotool has no key code for {key:?}"))?;

    let mut args = vec!["key".to_string()];
    args.extend(modifiers.iter().map(|m| format!("{}:1", evdev_modifier(*m))));
    args.push(format!("{code}:1"));
    // Bare numbers between events are delays
    args.push(KEY_HOLD_MS.to_string());
    args.push(format!("{code}:0"));
    args.extend(modifiers.iter().rev().map(|m| format!("{}:0", evdev_modifier(*m))));
    Ok(args)
}

fn wheel_args(direction: ScrollDirection, amount: u32) -> Vec<String> {
    let amount = i64::from(amount);
    let (x, y) = match direction {
        ScrollDirection::Up => (0, amount),
        ScrollDirection::Down => (0, -amount),
        ScrollDirection::Left => (-amount, 0),
        ScrollDirection::Right => (amount, 0),
    };
    vec![
        "mousemove".to_string(),
        "--wheel".to_string(),
        "-x".to_string(),
        x.to_string(),
        "-y".to_string(),
        y.to_string(),
    ]
}

#[async_trait]
impl MouseProvider for YdotoolInput {
    fn name(&self) -> &'static str {
        "ydotool"
    }

    async fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.run(&[
            "mousemove".to_string(),
            "--absolute".to_string(),
            "-x".to_string(),
            x.to_string(),
            "-y".to_string(),
            y.to_string(),
        ])
        .await?;

        // Let the move land before a following click
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    }

    async fn click(&self, button: MouseButton, count: u8) -> anyhow::Result<()> {
        self.run(&[
            "click".to_string(),
            "--repeat".to_string(),
            count.to_string(),
            "--next-delay".to_string(),
            "80".to_string(),
            click_code(button).to_string(),
        ])
        .await
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> anyhow::Result<()> {
        self.run(&wheel_args(direction, amount)).await
    }

    async fn position(&self) -> anyhow::Result<Point> {
        anyhow::bail!("ydotool cannot query the pointer position")
    }
}

#[async_trait]
impl KeyboardProvider for YdotoolInput {
    fn name(&self) -> &'static str {
        "ydotool"
    }

    async fn type_text(&self, text: &str, delay_ms: u32) -> anyhow::Result<()> {
        self.run(&[
            "type".to_string(),
            "--key-delay".to_string(),
            delay_ms.to_string(),
            "--".to_string(),
            text.to_string(),
        ])
        .await
    }

    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> anyhow::Result<()> {
        let args = key_args(key, modifiers)?;
        self.run(&args).await
    }
}
