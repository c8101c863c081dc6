//! Browser-engine contract.
//!
//! The rendering engine is a collaborator, not part of the core. This module
//! is its entire surface: the [`BrowserEngine`] factory, the per-context
//! [`PageEngine`] primitives, and the observation types the verifier and the
//! navigation tracker consume. The engine may post work onto its own
//! internal threads; the core treats those as opaque and only sees the
//! async methods here.
//!
//! [`sim`] provides a deterministic in-memory implementation used by every
//! test in the workspace.

pub mod sim;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Centroid of the rectangle.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether a point lies inside the rectangle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Everything the verifier reads about one matched element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Selector that uniquely addresses this element.
    pub selector: String,
    /// Lowercase tag name.
    pub tag: String,
    /// Whether the element is rendered and has non-zero area.
    pub visible: bool,
    /// Whether the element accepts interaction.
    pub enabled: bool,
    /// Checked state for checkboxes/radios.
    pub checked: Option<bool>,
    /// Bounding rectangle in viewport coordinates.
    pub rect: Rect,
    /// Selector of another element covering this one at its centroid.
    pub covered_by: Option<String>,
    /// Current value for form controls.
    pub value: Option<String>,
    /// Visible text content.
    pub text: String,
    /// Attribute map.
    pub attributes: HashMap<String, String>,
    /// Option values for `<select>` elements.
    pub options: Vec<String>,
    /// Whether this element currently holds focus.
    pub focused: bool,
}

/// Mouse button for click primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// One frame in the page's frame tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Opaque frame id.
    pub id: String,
    /// Frame document URL.
    pub url: String,
    /// The `name` attribute, if any.
    pub name: Option<String>,
    /// Parent frame id; `None` for the main frame.
    pub parent_id: Option<String>,
}

/// A console line as the engine reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleLine {
    /// Severity: "log", "info", "warn", "error", "debug".
    pub level: String,
    /// Message text.
    pub text: String,
}

/// Point-in-time navigation observation.
///
/// The navigation tracker polls this and derives state transitions; the
/// engine only reports raw facts.
#[derive(Debug, Clone, Default)]
pub struct NavSnapshot {
    /// Current document URL.
    pub url: String,
    /// Document title.
    pub title: String,
    /// HTTP status of the main document response, once received.
    pub http_status: Option<u16>,
    /// Whether a navigation is still in flight.
    pub loading: bool,
    /// Whether the last navigation failed.
    pub failed: bool,
    /// Engine-reported failure reason, when `failed`.
    pub failure: Option<String>,
    /// Number of in-flight subresource requests.
    pub pending_requests: usize,
    /// Monotonic count of DOM mutations since page creation.
    pub dom_mutation_count: u64,
}

/// Options applied when the engine materializes a page for a context.
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    /// Script evaluated in every new document before any page script runs.
    pub init_script: Option<String>,
    /// Proxy specification handed to the engine transport.
    pub proxy: Option<String>,
    /// Whether to block heavy subresources (images, media, fonts).
    pub block_resources: bool,
    /// Initial viewport size.
    pub viewport: (u32, u32),
}

/// Factory for per-context pages; the process owns exactly one.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Whether the engine finished initializing.
    fn is_ready(&self) -> bool;

    /// Materialize a page for a new context.
    async fn create_page(
        &self,
        context_id: &str,
        options: &PageOptions,
    ) -> Result<Arc<dyn PageEngine>, EngineError>;

    /// Tear the engine down. Idempotent.
    async fn shutdown(&self);
}

impl std::fmt::Debug for dyn PageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PageEngine")
    }
}

/// Primitive operations on one page. Object-safe; everything the action
/// surface does goes through these.
#[async_trait]
pub trait PageEngine: Send + Sync {
    // --- Navigation ---

    /// Start navigating to `url`. Returns once the navigation is accepted,
    /// not once it completes; completion is observed via [`Self::nav_snapshot`].
    async fn begin_navigate(&self, url: &str) -> Result<(), EngineError>;

    /// Raw navigation observation.
    async fn nav_snapshot(&self) -> NavSnapshot;

    async fn can_go_back(&self) -> bool;
    async fn can_go_forward(&self) -> bool;
    async fn go_back(&self) -> Result<(), EngineError>;
    async fn go_forward(&self) -> Result<(), EngineError>;
    async fn reload(&self) -> Result<(), EngineError>;

    // --- Script & DOM ---

    /// Evaluate a script in the current frame and return its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value, EngineError>;

    /// Query the current frame with a CSS selector.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSelector`] if the selector does not parse.
    async fn query(&self, selector: &str) -> Result<Vec<ElementSnapshot>, EngineError>;

    /// Full document markup.
    async fn page_html(&self) -> String;

    /// Concatenated visible text.
    async fn page_text(&self) -> String;

    // --- Input ---

    async fn click_at(
        &self,
        x: f64,
        y: f64,
        button: MouseButton,
        clicks: u32,
    ) -> Result<(), EngineError>;
    async fn move_mouse(&self, x: f64, y: f64) -> Result<(), EngineError>;
    async fn press_key(&self, key: &str, modifiers: &[String]) -> Result<(), EngineError>;

    /// Type text into the focused element, honouring its input constraints.
    async fn insert_text(&self, text: &str) -> Result<(), EngineError>;

    /// Select an option of a `<select>` by value.
    async fn select_option(&self, selector: &str, value: &str) -> Result<(), EngineError>;

    /// Attach files to a file input.
    async fn set_files(&self, selector: &str, files: &[String]) -> Result<(), EngineError>;

    async fn focus(&self, selector: &str) -> Result<(), EngineError>;
    async fn blur(&self) -> Result<(), EngineError>;

    /// Selector of the focused element, if any.
    async fn active_element(&self) -> Option<String>;

    // --- Scrolling & viewport ---

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), EngineError>;
    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), EngineError>;
    async fn scroll_position(&self) -> (f64, f64);
    async fn scroll_into_view(&self, selector: &str) -> Result<(), EngineError>;
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), EngineError>;
    async fn viewport(&self) -> (u32, u32);
    async fn set_zoom(&self, level: f64) -> Result<(), EngineError>;
    async fn zoom(&self) -> f64;

    // --- Rendering ---

    /// Capture the current viewport as an encoded PNG.
    async fn capture_frame(&self) -> Result<Vec<u8>, EngineError>;

    // --- Frames ---

    async fn frame_tree(&self) -> Vec<FrameInfo>;
    async fn switch_frame(&self, frame_id: &str) -> Result<(), EngineError>;
    async fn switch_to_parent_frame(&self) -> Result<(), EngineError>;
    async fn switch_to_main_frame(&self) -> Result<(), EngineError>;

    // --- Console & clipboard ---

    /// Drain buffered console lines since the last call.
    async fn drain_console(&self) -> Vec<ConsoleLine>;

    async fn set_clipboard(&self, text: &str) -> Result<(), EngineError>;
    async fn clipboard(&self) -> String;

    // --- Lifecycle ---

    /// Release engine-side resources. Idempotent.
    async fn close(&self);
}
