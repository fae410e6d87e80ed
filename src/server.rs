//! MCP Server implementation for Puppetry
//!
//! Exposes mouse, keyboard, screen and clipboard tools. Every tool validates
//! its arguments, resolves its provider from the registry, awaits the
//! provider call and answers with an [`Envelope`]. Outcomes are also pushed
//! to the event stream as `tool-completed` / `tool-failed`.

mod envelope;
mod params;

use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde_json::{Value, json};

pub use envelope::{Envelope, ErrorBody, ErrorCode};
pub use params::{
    ClipboardWriteParams, KeyboardPressParams, KeyboardTypeParams, MouseClickParams,
    MouseMoveParams, MouseScrollParams, ScreenCaptureParams,
};

use crate::error::{ProviderError, ValidationError};
use crate::providers::ProviderRegistry;
use crate::transport::SseTransport;

pub const TOOL_COMPLETED_EVENT: &str = "tool-completed";
pub const TOOL_FAILED_EVENT: &str = "tool-failed";

impl From<ValidationError> for Envelope {
    fn from(err: ValidationError) -> Self {
        Envelope::invalid(&err)
    }
}

impl From<ProviderError> for Envelope {
    fn from(err: ProviderError) -> Self {
        Envelope::unavailable(&err)
    }
}

impl From<anyhow::Error> for Envelope {
    fn from(err: anyhow::Error) -> Self {
        Envelope::failed(&err)
    }
}

type Outcome<T = Value> = Result<T, Envelope>;

/// Event stream copy of a tool result. Clipboard text stays out of it.
fn event_data(tool: &str, data: &Value) -> Value {
    match tool {
        "clipboard_read" => json!({
            "length": data["text"].as_str().map_or(0, str::len),
            "provider": data["provider"],
        }),
        _ => data.clone(),
    }
}

/// Puppetry MCP Server
///
/// Provides desktop input automation tools for AI assistants.
#[derive(Clone)]
pub struct PuppetryServer {
    providers: Arc<ProviderRegistry>,
    events: SseTransport,
    tool_router: ToolRouter<PuppetryServer>,
}

#[tool_router]
impl PuppetryServer {
    pub fn new(providers: Arc<ProviderRegistry>, events: SseTransport) -> Self {
        Self {
            providers,
            events,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Move the mouse pointer to absolute screen coordinates")]
    async fn mouse_move(
        &self,
        Parameters(params): Parameters<MouseMoveParams>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_mouse_move(params).await;
        Ok(self.respond("mouse_move", started, outcome, Vec::new()))
    }

    #[tool(description = "Click a mouse button, optionally moving to x/y first")]
    async fn mouse_click(
        &self,
        Parameters(params): Parameters<MouseClickParams>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_mouse_click(params).await;
        Ok(self.respond("mouse_click", started, outcome, Vec::new()))
    }

    #[tool(description = "Scroll the mouse wheel")]
    async fn mouse_scroll(
        &self,
        Parameters(params): Parameters<MouseScrollParams>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_mouse_scroll(params).await;
        Ok(self.respond("mouse_scroll", started, outcome, Vec::new()))
    }

    #[tool(description = "Get the current mouse pointer position")]
    async fn mouse_position(&self) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_mouse_position().await;
        Ok(self.respond("mouse_position", started, outcome, Vec::new()))
    }

    #[tool(description = "Type text into the focused window")]
    async fn keyboard_type(
        &self,
        Parameters(params): Parameters<KeyboardTypeParams>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_keyboard_type(params).await;
        Ok(self.respond("keyboard_type", started, outcome, Vec::new()))
    }

    #[tool(description = "Press a key or key combination")]
    async fn keyboard_press(
        &self,
        Parameters(params): Parameters<KeyboardPressParams>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_keyboard_press(params).await;
        Ok(self.respond("keyboard_press", started, outcome, Vec::new()))
    }

    #[tool(description = "Get the primary screen size in pixels")]
    async fn screen_size(&self) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_screen_size().await;
        Ok(self.respond("screen_size", started, outcome, Vec::new()))
    }

    #[tool(description = "Capture the primary screen, or a region of it, as PNG")]
    async fn screen_capture(
        &self,
        Parameters(params): Parameters<ScreenCaptureParams>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let (outcome, image) = match self.run_screen_capture(params).await {
            Ok((data, png)) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                (Ok(data), vec![Content::image(encoded, "image/png")])
            }
            Err(envelope) => (Err(envelope), Vec::new()),
        };
        Ok(self.respond("screen_capture", started, outcome, image))
    }

    #[tool(description = "Read text from the clipboard")]
    async fn clipboard_read(&self) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_clipboard_read().await;
        Ok(self.respond("clipboard_read", started, outcome, Vec::new()))
    }

    #[tool(description = "Replace the clipboard contents with text")]
    async fn clipboard_write(
        &self,
        Parameters(params): Parameters<ClipboardWriteParams>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();
        let outcome = self.run_clipboard_write(params).await;
        Ok(self.respond("clipboard_write", started, outcome, Vec::new()))
    }
}

impl PuppetryServer {
    async fn run_mouse_move(&self, params: MouseMoveParams) -> Outcome {
        let (x, y) = params.validate()?;
        let mouse = self.providers.mouse().await?;
        mouse.move_to(x, y).await?;
        Ok(json!({ "x": x, "y": y, "provider": mouse.name() }))
    }

    async fn run_mouse_click(&self, params: MouseClickParams) -> Outcome {
        let request = params.validate()?;
        let mouse = self.providers.mouse().await?;
        if let Some((x, y)) = request.target {
            mouse.move_to(x, y).await?;
        }
        mouse.click(request.button, request.count).await?;
        Ok(json!({
            "button": request.button,
            "count": request.count,
            "position": request.target.map(|(x, y)| json!({ "x": x, "y": y })),
            "provider": mouse.name()
        }))
    }

    async fn run_mouse_scroll(&self, params: MouseScrollParams) -> Outcome {
        let (direction, amount) = params.validate()?;
        let mouse = self.providers.mouse().await?;
        mouse.scroll(direction, amount).await?;
        Ok(json!({ "direction": direction, "amount": amount, "provider": mouse.name() }))
    }

    async fn run_mouse_position(&self) -> Outcome {
        let mouse = self.providers.mouse().await?;
        let point = mouse.position().await?;
        Ok(json!({ "x": point.x, "y": point.y, "provider": mouse.name() }))
    }

    async fn run_keyboard_type(&self, params: KeyboardTypeParams) -> Outcome {
        params.validate()?;
        let keyboard = self.providers.keyboard().await?;
        keyboard.type_text(&params.text, params.delay_ms).await?;
        Ok(json!({
            "text_length": params.text.chars().count(),
            "delay_ms": params.delay_ms,
            "provider": keyboard.name()
        }))
    }

    async fn run_keyboard_press(&self, params: KeyboardPressParams) -> Outcome {
        let modifiers = params.validate()?;
        let key = params.key.trim();
        let keyboard = self.providers.keyboard().await?;
        keyboard.press_key(key, &modifiers).await?;
        Ok(json!({ "key": key, "modifiers": modifiers, "provider": keyboard.name() }))
    }

    async fn run_screen_size(&self) -> Outcome {
        let screen = self.providers.screen().await?;
        let size = screen.size().await?;
        Ok(json!({ "width": size.width, "height": size.height, "provider": screen.name() }))
    }

    async fn run_screen_capture(&self, params: ScreenCaptureParams) -> Outcome<(Value, Vec<u8>)> {
        let region = params.validate()?;
        let screen = self.providers.screen().await?;
        let png = screen.capture(region).await?;
        let data = json!({
            "region": region,
            "size_bytes": png.len(),
            "mime_type": "image/png",
            "provider": screen.name()
        });
        Ok((data, png))
    }

    async fn run_clipboard_read(&self) -> Outcome {
        let clipboard = self.providers.clipboard().await?;
        let text = clipboard.read().await?;
        Ok(json!({ "text": text, "provider": clipboard.name() }))
    }

    async fn run_clipboard_write(&self, params: ClipboardWriteParams) -> Outcome {
        params.validate()?;
        let clipboard = self.providers.clipboard().await?;
        clipboard.write(&params.text).await?;
        Ok(json!({ "length": params.text.len(), "provider": clipboard.name() }))
    }

    /// Build the tool result and report the outcome on the event stream
    fn respond(
        &self,
        tool: &'static str,
        started: Instant,
        outcome: Outcome,
        extra: Vec<Content>,
    ) -> CallToolResult {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(data) => {
                tracing::debug!(tool, duration_ms, "Tool completed");
                self.events.emit_event(
                    TOOL_COMPLETED_EVENT,
                    &json!({
                        "tool": tool,
                        "duration_ms": duration_ms,
                        "data": event_data(tool, &data)
                    }),
                );
                Envelope::ok(data).into_result_with(extra)
            }
            Err(envelope) => {
                if let Some(error) = &envelope.error {
                    tracing::warn!(tool, code = ?error.code, "Tool failed: {}", error.message);
                }
                self.events.emit_event(
                    TOOL_FAILED_EVENT,
                    &json!({ "tool": tool, "duration_ms": duration_ms, "error": envelope.error }),
                );
                envelope.into_result()
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for PuppetryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Puppetry drives the desktop: mouse_* tools move, click and scroll, \
                 keyboard_* tools type text and press keys, screen_* tools report the \
                 screen size and capture screenshots, clipboard_* tools read and write \
                 clipboard text. Coordinates are absolute screen pixels."
                    .to_string(),
            ),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        ClipboardProvider, Modifier, MouseButton, MouseProvider, Point, ProviderSelection,
        ScrollDirection,
    };
    use crate::transport::TransportConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeMouse {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl MouseProvider for FakeMouse {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn move_to(&self, x: i32, y: i32) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("device unplugged");
            }
            self.calls.lock().push(format!("move {x},{y}"));
            Ok(())
        }

        async fn click(&self, button: MouseButton, count: u8) -> anyhow::Result<()> {
            self.calls.lock().push(format!("click {button} x{count}"));
            Ok(())
        }

        async fn scroll(&self, direction: ScrollDirection, amount: u32) -> anyhow::Result<()> {
            self.calls.lock().push(format!("scroll {direction:?} {amount}"));
            Ok(())
        }

        async fn position(&self) -> anyhow::Result<Point> {
            Ok(Point { x: 7, y: 9 })
        }
    }

    #[derive(Default)]
    struct FakeClipboard {
        text: Mutex<String>,
    }

    #[async_trait]
    impl ClipboardProvider for FakeClipboard {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn read(&self) -> anyhow::Result<String> {
            Ok(self.text.lock().clone())
        }

        async fn write(&self, text: &str) -> anyhow::Result<()> {
            *self.text.lock() = text.to_string();
            Ok(())
        }
    }

    async fn server_with(mouse: Arc<FakeMouse>) -> (PuppetryServer, SseTransport) {
        let registry = ProviderRegistry::new(ProviderSelection {
            mouse: "fake".to_string(),
            keyboard: "none".to_string(),
            screen: "none".to_string(),
            clipboard: "fake".to_string(),
        });
        registry.register_mouse("fake", mouse).await;
        registry
            .register_clipboard("fake", Arc::new(FakeClipboard::default()))
            .await;

        let events = SseTransport::new(TransportConfig::default());
        (PuppetryServer::new(Arc::new(registry), events.clone()), events)
    }

    fn envelope_of(result: &CallToolResult) -> Value {
        let value = serde_json::to_value(result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_click_moves_then_clicks() {
        let mouse = Arc::new(FakeMouse::default());
        let (server, events) = server_with(mouse.clone()).await;

        let result = server
            .mouse_click(Parameters(MouseClickParams {
                x: Some(100),
                y: Some(200),
                button: "right".to_string(),
                count: 2,
            }))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(false));
        assert_eq!(*mouse.calls.lock(), vec!["move 100,200", "click right x2"]);

        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["button"], "right");

        let entries = events.replay_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_name, TOOL_COMPLETED_EVENT);
        assert_eq!(entries[0].payload["tool"], "mouse_click");
    }

    #[tokio::test]
    async fn test_invalid_params_skip_provider() {
        let mouse = Arc::new(FakeMouse::default());
        let (server, events) = server_with(mouse.clone()).await;

        let result = server
            .mouse_move(Parameters(MouseMoveParams { x: -5, y: 0 }))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        assert!(mouse.calls.lock().is_empty());
        assert_eq!(envelope_of(&result)["error"]["code"], "invalid_params");

        let entries = events.replay_entries();
        assert_eq!(entries[0].event_name, TOOL_FAILED_EVENT);
        assert_eq!(entries[0].payload["error"]["code"], "invalid_params");
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let mouse = Arc::new(FakeMouse {
            fail: true,
            ..FakeMouse::default()
        });
        let (server, events) = server_with(mouse).await;

        let result = server
            .mouse_move(Parameters(MouseMoveParams { x: 1, y: 1 }))
            .await
            .unwrap();

        let envelope = envelope_of(&result);
        assert_eq!(envelope["error"]["code"], "provider_failed");
        assert!(
            envelope["error"]["message"]
                .as_str()
                .unwrap()
                .contains("device unplugged")
        );
        assert_eq!(events.replay_entries()[0].event_name, TOOL_FAILED_EVENT);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_unavailable() {
        let (server, _events) = server_with(Arc::new(FakeMouse::default())).await;

        let result = server
            .keyboard_press(Parameters(KeyboardPressParams {
                key: "a".to_string(),
                modifiers: vec!["ctrl".to_string()],
            }))
            .await
            .unwrap();

        assert_eq!(envelope_of(&result)["error"]["code"], "provider_unavailable");
    }

    #[tokio::test]
    async fn test_position_and_scroll() {
        let mouse = Arc::new(FakeMouse::default());
        let (server, _events) = server_with(mouse.clone()).await;

        let result = server.mouse_position().await.unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["data"]["x"], 7);
        assert_eq!(envelope["data"]["y"], 9);

        server
            .mouse_scroll(Parameters(MouseScrollParams {
                direction: "up".to_string(),
                amount: 4,
            }))
            .await
            .unwrap();
        assert_eq!(*mouse.calls.lock(), vec!["scroll Up 4"]);
    }

    #[tokio::test]
    async fn test_clipboard_round_trip() {
        let (server, events) = server_with(Arc::new(FakeMouse::default())).await;

        server
            .clipboard_write(Parameters(ClipboardWriteParams {
                text: "copied".to_string(),
            }))
            .await
            .unwrap();
        let result = server.clipboard_read().await.unwrap();

        assert_eq!(envelope_of(&result)["data"]["text"], "copied");
        assert_eq!(events.replay_buffer_size(), 2);
    }

    #[tokio::test]
    async fn test_clipboard_text_stays_off_event_stream() {
        let (server, events) = server_with(Arc::new(FakeMouse::default())).await;

        server
            .clipboard_write(Parameters(ClipboardWriteParams {
                text: "hunter2-secret".to_string(),
            }))
            .await
            .unwrap();
        let result = server.clipboard_read().await.unwrap();
        assert_eq!(envelope_of(&result)["data"]["text"], "hunter2-secret");

        let entries = events.replay_entries();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            let wire = String::from_utf8(entry.chunk.to_vec()).unwrap();
            assert!(!wire.contains("hunter2-secret"));
            assert!(!entry.payload.to_string().contains("hunter2-secret"));
        }

        let read = &entries[1].payload;
        assert_eq!(read["tool"], "clipboard_read");
        assert_eq!(read["data"]["length"], 14);
        assert!(read["data"].get("text").is_none());
    }

    #[test]
    fn test_modifiers_serialize_lowercase() {
        assert_eq!(json!([Modifier::Super]), json!(["super"]));
    }
}
