//! X11 mouse provider using x11rb and the XTEST extension

use std::time::Duration;

use async_trait::async_trait;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _, Window};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;

use super::{MouseButton, MouseProvider, Point, ScrollDirection};

/// Synthesizes pointer events on the default X display
pub struct X11Input {
    conn: RustConnection,
    root: Window,
}

impl X11Input {
    /// Connect to `$DISPLAY` and check that XTEST is available
    pub fn connect() -> anyhow::Result<Self> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        let version = conn.xtest_get_version(2, 2)?.reply()?;
        tracing::debug!(
            "XTEST {}.{} available",
            version.major_version,
            version.minor_version
        );

        Ok(Self { conn, root })
    }

    fn button_event(&self, button: u8, pressed: bool) -> anyhow::Result<()> {
        let event_type = if pressed {
            xproto::BUTTON_PRESS_EVENT
        } else {
            xproto::BUTTON_RELEASE_EVENT
        };
        // time 0 = now, root/coords ignored for button events
        self.conn
            .xtest_fake_input(event_type, button, 0, x11rb::NONE, 0, 0, 0)?;
        Ok(())
    }

    fn tap(&self, button: u8) -> anyhow::Result<()> {
        self.button_event(button, true)?;
        self.button_event(button, false)?;
        self.conn.flush()?;
        Ok(())
    }
}

fn coord(value: i32) -> anyhow::Result<i16> {
    i16::try_from(value).map_err(|_| anyhow::anyhow!("coordinate {value} out of X11 range"))
}

#[async_trait]
impl MouseProvider for X11Input {
    fn name(&self) -> &'static str {
        "x11"
    }

    async fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, coord(x)?, coord(y)?)?;
        self.conn.flush()?;
        Ok(())
    }

    async fn click(&self, button: MouseButton, count: u8) -> anyhow::Result<()> {
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            self.tap(button.x11_button())?;
        }
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> anyhow::Result<()> {
        // One wheel button tap per notch
        for _ in 0..amount {
            self.tap(direction.x11_button())?;
        }
        Ok(())
    }

    async fn position(&self) -> anyhow::Result<Point> {
        let pointer = self.conn.query_pointer(self.root)?.reply()?;
        Ok(Point {
            x: i32::from(pointer.root_x),
            y: i32::from(pointer.root_y),
        })
    }
}
