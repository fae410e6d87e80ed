//! Provider Registry - memoized provider construction
//!
//! Providers are built on first use and cached by type string, so every
//! caller asking for "x11" shares one connection. The registry is created by
//! the composition root and handed out by reference.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::clipboard::{CommandClipboard, KlipperClipboard};
use super::screen::XcapScreen;
use super::x11::X11Input;
use super::xdotool::XdotoolKeyboard;
use super::ydotool::YdotoolInput;
use super::{ClipboardProvider, KeyboardProvider, MouseProvider, ProviderSelection, ScreenProvider};
use crate::error::ProviderError;

/// Cache of built providers for one category
struct ProviderCache<P: ?Sized> {
    category: &'static str,
    entries: Mutex<HashMap<String, Arc<P>>>,
}

impl<P: ?Sized> ProviderCache<P> {
    fn new(category: &'static str) -> Self {
        Self {
            category,
            entries: Mutex::new(HashMap::new()),
        }
    }

    async fn insert(&self, kind: &str, provider: Arc<P>) {
        self.entries.lock().await.insert(kind.to_string(), provider);
    }

    /// Return the cached provider for `kind`, building it on a miss.
    ///
    /// The lock is held while building so concurrent first calls construct
    /// one instance.
    async fn resolve<F, Fut>(&self, kind: &str, build: F) -> Result<Arc<P>, ProviderError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Arc<P>, ProviderError>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(provider) = entries.get(kind) {
            return Ok(provider.clone());
        }

        let provider = build(kind.to_string()).await?;
        tracing::info!("Initialized {} provider {:?}", self.category, kind);
        entries.insert(kind.to_string(), provider.clone());
        Ok(provider)
    }
}

fn unavailable(category: &'static str, kind: &str, source: anyhow::Error) -> ProviderError {
    ProviderError::Unavailable {
        category,
        kind: kind.to_string(),
        source,
    }
}

fn unknown(category: &'static str, kind: &str) -> ProviderError {
    ProviderError::Unknown {
        category,
        kind: kind.to_string(),
    }
}

/// Resolve "auto" from the session environment
fn detect_input_kind(category: &'static str, x11_kind: &'static str) -> Result<&'static str, ProviderError> {
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        Ok("ydotool")
    } else if std::env::var_os("DISPLAY").is_some() {
        Ok(x11_kind)
    } else {
        Err(unavailable(
            category,
            "auto",
            anyhow::anyhow!("No display server detected. Set DISPLAY for X11 or WAYLAND_DISPLAY for Wayland."),
        ))
    }
}

/// The X11 handshake blocks, so it runs on the blocking pool
async fn connect_x11() -> anyhow::Result<X11Input> {
    tokio::task::spawn_blocking(X11Input::connect).await?
}

async fn build_mouse(kind: String) -> Result<Arc<dyn MouseProvider>, ProviderError> {
    let concrete = if kind == "auto" {
        detect_input_kind("mouse", "x11")?
    } else {
        kind.as_str()
    };
    match concrete {
        "ydotool" => Ok(Arc::new(YdotoolInput::new())),
        "x11" => connect_x11()
            .await
            .map(|p| Arc::new(p) as Arc<dyn MouseProvider>)
            .map_err(|e| unavailable("mouse", &kind, e)),
        _ => Err(unknown("mouse", &kind)),
    }
}

async fn build_keyboard(kind: String) -> Result<Arc<dyn KeyboardProvider>, ProviderError> {
    let concrete = if kind == "auto" {
        detect_input_kind("keyboard", "xdotool")?
    } else {
        kind.as_str()
    };
    match concrete {
        "ydotool" => Ok(Arc::new(YdotoolInput::new())),
        "xdotool" => Ok(Arc::new(XdotoolKeyboard::new())),
        _ => Err(unknown("keyboard", &kind)),
    }
}

async fn build_screen(kind: String) -> Result<Arc<dyn ScreenProvider>, ProviderError> {
    match kind.as_str() {
        "xcap" => Ok(Arc::new(XcapScreen::new())),
        _ => Err(unknown("screen", &kind)),
    }
}

async fn build_clipboard(kind: String) -> Result<Arc<dyn ClipboardProvider>, ProviderError> {
    match kind.as_str() {
        "command" => Ok(Arc::new(CommandClipboard::detect())),
        "klipper" => KlipperClipboard::connect()
            .await
            .map(|p| Arc::new(p) as Arc<dyn ClipboardProvider>)
            .map_err(|e| unavailable("clipboard", &kind, e)),
        _ => Err(unknown("clipboard", &kind)),
    }
}

/// Registry of automation providers, one default type per category
pub struct ProviderRegistry {
    selection: ProviderSelection,
    mouse: ProviderCache<dyn MouseProvider>,
    keyboard: ProviderCache<dyn KeyboardProvider>,
    screen: ProviderCache<dyn ScreenProvider>,
    clipboard: ProviderCache<dyn ClipboardProvider>,
}

impl ProviderRegistry {
    pub fn new(selection: ProviderSelection) -> Self {
        Self {
            selection,
            mouse: ProviderCache::new("mouse"),
            keyboard: ProviderCache::new("keyboard"),
            screen: ProviderCache::new("screen"),
            clipboard: ProviderCache::new("clipboard"),
        }
    }

    pub async fn mouse(&self) -> Result<Arc<dyn MouseProvider>, ProviderError> {
        self.mouse_of(&self.selection.mouse).await
    }

    pub async fn mouse_of(&self, kind: &str) -> Result<Arc<dyn MouseProvider>, ProviderError> {
        self.mouse.resolve(kind, build_mouse).await
    }

    pub async fn keyboard(&self) -> Result<Arc<dyn KeyboardProvider>, ProviderError> {
        self.keyboard_of(&self.selection.keyboard).await
    }

    pub async fn keyboard_of(&self, kind: &str) -> Result<Arc<dyn KeyboardProvider>, ProviderError> {
        self.keyboard.resolve(kind, build_keyboard).await
    }

    pub async fn screen(&self) -> Result<Arc<dyn ScreenProvider>, ProviderError> {
        self.screen_of(&self.selection.screen).await
    }

    pub async fn screen_of(&self, kind: &str) -> Result<Arc<dyn ScreenProvider>, ProviderError> {
        self.screen.resolve(kind, build_screen).await
    }

    pub async fn clipboard(&self) -> Result<Arc<dyn ClipboardProvider>, ProviderError> {
        self.clipboard_of(&self.selection.clipboard).await
    }

    pub async fn clipboard_of(&self, kind: &str) -> Result<Arc<dyn ClipboardProvider>, ProviderError> {
        self.clipboard.resolve(kind, build_clipboard).await
    }

    /// Install a prebuilt mouse provider under `kind`
    pub async fn register_mouse(&self, kind: &str, provider: Arc<dyn MouseProvider>) {
        self.mouse.insert(kind, provider).await;
    }

    pub async fn register_keyboard(&self, kind: &str, provider: Arc<dyn KeyboardProvider>) {
        self.keyboard.insert(kind, provider).await;
    }

    pub async fn register_screen(&self, kind: &str, provider: Arc<dyn ScreenProvider>) {
        self.screen.insert(kind, provider).await;
    }

    pub async fn register_clipboard(&self, kind: &str, provider: Arc<dyn ClipboardProvider>) {
        self.clipboard.insert(kind, provider).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(mouse: &str, keyboard: &str) -> ProviderSelection {
        ProviderSelection {
            mouse: mouse.to_string(),
            keyboard: keyboard.to_string(),
            ..ProviderSelection::default()
        }
    }

    #[tokio::test]
    async fn test_same_kind_resolves_to_same_instance() {
        let registry = ProviderRegistry::new(selection("ydotool", "xdotool"));
        let first = registry.mouse().await.unwrap();
        let second = registry.mouse_of("ydotool").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "ydotool");

        let keyboard = registry.keyboard().await.unwrap();
        assert_eq!(keyboard.name(), "xdotool");
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let registry = ProviderRegistry::new(selection("telepathy", "ydotool"));
        let err = registry.mouse().await.err().unwrap();
        assert!(matches!(
            err,
            ProviderError::Unknown { category: "mouse", ref kind } if kind == "telepathy"
        ));
        assert!(registry.screen_of("crayon").await.is_err());
    }

    #[tokio::test]
    async fn test_registered_provider_is_returned() {
        let registry = ProviderRegistry::new(selection("fake", "ydotool"));
        let provider: Arc<dyn MouseProvider> = Arc::new(YdotoolInput::new());
        registry.register_mouse("fake", provider.clone()).await;

        let resolved = registry.mouse().await.unwrap();
        assert!(Arc::ptr_eq(&provider, &resolved));
    }

    #[tokio::test]
    async fn test_registration_replaces_cached_provider() {
        let registry = ProviderRegistry::new(ProviderSelection {
            keyboard: "xdotool".to_string(),
            screen: "mirror".to_string(),
            ..ProviderSelection::default()
        });
        assert!(registry.screen().await.is_err());

        let keyboard: Arc<dyn KeyboardProvider> = Arc::new(YdotoolInput::new());
        registry.register_keyboard("xdotool", keyboard.clone()).await;
        let screen: Arc<dyn ScreenProvider> = Arc::new(XcapScreen::new());
        registry.register_screen("mirror", screen.clone()).await;

        let resolved_keyboard = registry.keyboard().await.unwrap();
        assert!(Arc::ptr_eq(&keyboard, &resolved_keyboard));
        assert_eq!(resolved_keyboard.name(), "ydotool");

        let resolved_screen = registry.screen().await.unwrap();
        assert!(Arc::ptr_eq(&screen, &resolved_screen));
    }
}
