//! Keyboard input via xdotool (X11 and XWayland only)

use async_trait::async_trait;
use tokio::process::Command;

use super::keymap::{x11_keysym, x11_modifier};
use super::{KeyboardProvider, Modifier};

#[derive(Debug, Default)]
pub struct XdotoolKeyboard;

impl XdotoolKeyboard {
    pub fn new() -> Self {
        Self
    }
}

/// Combination string such as `ctrl+shift+Return`
fn chord(key: &str, modifiers: &[Modifier]) -> String {
    modifiers
        .iter()
        .map(|m| x11_modifier(*m).to_string())
        .chain(std::iter::once(x11_keysym(key)))
        .collect::<Vec<_>>()
        .join("+")
}

async fn xdotool(args: &[&str]) -> anyhow::Result<()> {
    tracing::debug!("Executing xdotool {:?}", args);

    let output = Command::new("xdotool").args(args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("xdotool {} failed: {}", args[0], stderr.trim());
    }
    Ok(())
}

#[async_trait]
impl KeyboardProvider for XdotoolKeyboard {
    fn name(&self) -> &'static str {
        "xdotool"
    }

    async fn type_text(&self, text: &str, delay_ms: u32) -> anyhow::Result<()> {
        let delay = delay_ms.to_string();
        xdotool(&["type", "--delay", &delay, "--", text]).await
    }

    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> anyhow::Result<()> {
        let combo = chord(key, modifiers);
        xdotool(&["key", "--clearmodifiers", &combo]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_formatting() {
        assert_eq!(chord("enter", &[Modifier::Ctrl, Modifier::Shift]), "ctrl+shift+Return");
        assert_eq!(chord("x", &[]), "x");
    }
}
