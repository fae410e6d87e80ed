//! Clipboard providers
//!
//! `command` shells out to wl-clipboard on Wayland or xclip on X11.
//! `klipper` talks to KDE's clipboard manager over D-Bus.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use zbus::Connection;

use super::ClipboardProvider;

/// Programs used to read and write the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClipboardCommands {
    read: (&'static str, &'static [&'static str]),
    write: (&'static str, &'static [&'static str]),
}

const WL_CLIPBOARD: ClipboardCommands = ClipboardCommands {
    read: ("wl-paste", &["--no-newline"]),
    write: ("wl-copy", &[]),
};

const XCLIP: ClipboardCommands = ClipboardCommands {
    read: ("xclip", &["-selection", "clipboard", "-out"]),
    write: ("xclip", &["-selection", "clipboard", "-in"]),
};

#[derive(Debug)]
pub struct CommandClipboard {
    commands: ClipboardCommands,
}

impl CommandClipboard {
    /// Pick wl-clipboard under Wayland, xclip otherwise
    pub fn detect() -> Self {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();
        let commands = if wayland { WL_CLIPBOARD } else { XCLIP };
        tracing::info!("Using {} for clipboard access", commands.write.0);
        Self { commands }
    }
}

#[async_trait]
impl ClipboardProvider for CommandClipboard {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn read(&self) -> anyhow::Result<String> {
        let (program, args) = self.commands.read;
        let output = Command::new(program).args(args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", program, stderr.trim());
        }
        Ok(String::from_utf8(output.stdout)?)
    }

    async fn write(&self, text: &str) -> anyhow::Result<()> {
        let (program, args) = self.commands.write;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            // Dropping stdin sends EOF
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", program, stderr.trim());
        }
        Ok(())
    }
}

/// KDE Klipper over the session bus
pub struct KlipperClipboard {
    dbus: Connection,
}

impl KlipperClipboard {
    pub async fn connect() -> anyhow::Result<Self> {
        let dbus = Connection::session().await?;
        Ok(Self { dbus })
    }

    async fn call<B>(&self, method: &str, body: &B) -> anyhow::Result<zbus::Message>
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        let reply = self
            .dbus
            .call_method(
                Some("org.kde.klipper"),
                "/klipper",
                Some("org.kde.klipper.klipper"),
                method,
                body,
            )
            .await?;
        Ok(reply)
    }
}

#[async_trait]
impl ClipboardProvider for KlipperClipboard {
    fn name(&self) -> &'static str {
        "klipper"
    }

    async fn read(&self) -> anyhow::Result<String> {
        let reply = self.call("getClipboardContents", &()).await?;
        let contents: String = reply.body().deserialize()?;
        Ok(contents)
    }

    async fn write(&self, text: &str) -> anyhow::Result<()> {
        self.call("setClipboardContents", &(text,)).await?;
        Ok(())
    }
}
