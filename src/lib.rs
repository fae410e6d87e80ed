//! Puppetry - desktop input automation MCP server
//!
//! This library provides an MCP (Model Context Protocol) server that lets AI
//! assistants drive a Linux desktop, plus a Server-Sent Events stream that
//! reports what the server does.
//!
//! ## Features
//!
//! - Mouse movement, clicks, scrolling and pointer position
//! - Text typing and key combinations
//! - Screen size and screenshots
//! - Clipboard read and write
//! - SSE event stream with replay buffer and heartbeat
//!
//! ## Providers
//!
//! - ydotool (X11 and Wayland via uinput)
//! - X11 via XTEST, xdotool
//! - xcap screenshots
//! - wl-clipboard / xclip, KDE Klipper over D-Bus

pub mod config;
pub mod error;
pub mod http;
pub mod providers;
pub mod server;
pub mod transport;
