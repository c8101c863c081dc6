//! Deterministic in-memory engine.
//!
//! [`SimBrowser`] implements the [`BrowserEngine`] contract against scripted
//! documents instead of a real renderer. Tests install [`SimDocument`]s
//! keyed by URL, then drive the core exactly as a client would; every
//! observation (element snapshots, navigation progress, console output,
//! captured frames) is reproducible.
//!
//! Navigation completion is poll-driven: a navigation with a scripted delay
//! completes the first time anything observes the page after its deadline,
//! so no background task is involved and timing stays deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{
    BrowserEngine, ConsoleLine, ElementSnapshot, FrameInfo, MouseButton, NavSnapshot, PageEngine,
    PageOptions, Rect,
};
use crate::error::EngineError;

/// Minimal PNG header; every captured frame starts with it so the base64
/// form carries the standard `iVBOR` prefix.
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Effect a scripted element applies when clicked.
#[derive(Debug, Clone, Default)]
pub enum ClickEffect {
    /// No observable change. Post-checks will time out.
    #[default]
    None,
    /// Begin a navigation to the given URL.
    Navigate(String),
    /// Move focus to this element.
    Focus,
    /// Mutate the DOM (bumps the mutation counter).
    Mutate,
    /// Toggle the checked state.
    Toggle,
}

/// One scripted element.
#[derive(Debug, Clone)]
pub struct SimElement {
    pub id: Option<String>,
    pub tag: String,
    pub classes: Vec<String>,
    pub text: String,
    pub value: String,
    pub attributes: HashMap<String, String>,
    pub rect: Rect,
    pub visible: bool,
    pub enabled: bool,
    pub checked: Option<bool>,
    pub options: Vec<String>,
    pub covered_by: Option<String>,
    pub on_click: ClickEffect,
}

impl SimElement {
    /// A new element with the given tag and sensible defaults.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: None,
            tag: tag.into(),
            classes: Vec::new(),
            text: String::new(),
            value: String::new(),
            attributes: HashMap::new(),
            rect: Rect {
                x: 10.0,
                y: 10.0,
                width: 100.0,
                height: 20.0,
            },
            visible: true,
            enabled: true,
            checked: None,
            options: Vec::new(),
            covered_by: None,
            on_click: ClickEffect::None,
        }
    }

    /// A button with an id (pass without the leading `#`).
    pub fn button(id: &str) -> Self {
        Self::new("button").with_id(id)
    }

    /// A text input with an id.
    pub fn input(id: &str) -> Self {
        Self::new("input").with_id(id)
    }

    /// A select with an id and scripted options.
    pub fn select(id: &str, options: &[&str]) -> Self {
        let mut el = Self::new("select").with_id(id);
        el.options = options.iter().map(|s| (*s).to_string()).collect();
        if let Some(first) = el.options.first() {
            el.value.clone_from(first);
        }
        el
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect {
            x,
            y,
            width,
            height,
        };
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn covered_by(mut self, selector: &str) -> Self {
        self.covered_by = Some(selector.to_string());
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = effect;
        self
    }

    /// The unique selector reported in snapshots.
    fn unique_selector(&self, index: usize) -> String {
        match &self.id {
            Some(id) => format!("#{id}"),
            None => format!("{}:nth-of-type({})", self.tag, index + 1),
        }
    }
}

/// A scripted document, installed into the [`SimBrowser`] under a URL.
#[derive(Debug, Clone)]
pub struct SimDocument {
    pub url: String,
    pub title: String,
    pub status: u16,
    pub html: String,
    pub elements: Vec<SimElement>,
    /// How long the navigation takes to complete.
    pub load_delay: Duration,
    /// Subresource requests that stay pending for a while after load.
    pub lingering_requests: Option<(usize, Duration)>,
    /// Scripted navigation failure.
    pub failure: Option<String>,
}

impl SimDocument {
    /// A blank 200 document for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: String::new(),
            status: 200,
            html: format!("<html><head></head><body data-url=\"{url}\"></body></html>"),
            url,
            elements: Vec::new(),
            load_delay: Duration::ZERO,
            lingering_requests: None,
            failure: None,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn element(mut self, element: SimElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn lingering_requests(mut self, count: usize, for_duration: Duration) -> Self {
        self.lingering_requests = Some((count, for_duration));
        self
    }

    pub fn fails_with(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }
}

/// Parsed form of the simple selector subset the sim understands.
#[derive(Debug, Default)]
struct SimSelector {
    tag: Option<String>,
    id: Option<String>,
    class: Option<String>,
    attr: Option<(String, String)>,
}

fn parse_selector(selector: &str) -> Result<SimSelector, EngineError> {
    let s = selector.trim();
    if s.is_empty() || s.contains("[[") || s.contains(">>") {
        return Err(EngineError::InvalidSelector(selector.to_string()));
    }
    let mut out = SimSelector::default();
    let mut rest = s;

    // Leading tag name.
    let tag_end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .unwrap_or(rest.len());
    if tag_end > 0 {
        out.tag = Some(rest[..tag_end].to_ascii_lowercase());
        rest = &rest[tag_end..];
    }

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('#') {
            let end = tail
                .find(|c: char| c == '.' || c == '[' || c == '#')
                .unwrap_or(tail.len());
            if end == 0 {
                return Err(EngineError::InvalidSelector(selector.to_string()));
            }
            out.id = Some(tail[..end].to_string());
            rest = &tail[end..];
        } else if let Some(tail) = rest.strip_prefix('.') {
            let end = tail
                .find(|c: char| c == '.' || c == '[' || c == '#')
                .unwrap_or(tail.len());
            if end == 0 {
                return Err(EngineError::InvalidSelector(selector.to_string()));
            }
            out.class = Some(tail[..end].to_string());
            rest = &tail[end..];
        } else if let Some(tail) = rest.strip_prefix('[') {
            let end = tail
                .find(']')
                .ok_or_else(|| EngineError::InvalidSelector(selector.to_string()))?;
            let body = &tail[..end];
            let (key, value) = body
                .split_once('=')
                .ok_or_else(|| EngineError::InvalidSelector(selector.to_string()))?;
            out.attr = Some((
                key.trim().to_string(),
                value.trim().trim_matches(['"', '\'']).to_string(),
            ));
            rest = &tail[end + 1..];
        } else {
            return Err(EngineError::InvalidSelector(selector.to_string()));
        }
    }
    Ok(out)
}

impl SimSelector {
    fn matches(&self, element: &SimElement) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(class) = &self.class {
            if !element.classes.iter().any(|c| c == class) {
                return false;
            }
        }
        if let Some((key, value)) = &self.attr {
            if element.attributes.get(key) != Some(value) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug)]
struct PageState {
    url: String,
    title: String,
    status: Option<u16>,
    loading: bool,
    failed: bool,
    failure: Option<String>,
    /// In-flight navigation: target URL and its completion deadline.
    nav_target: Option<(String, Instant)>,
    /// When the current document finished loading.
    loaded_at: Option<Instant>,
    lingering_requests: Option<(usize, Duration)>,
    history: Vec<String>,
    history_pos: usize,
    elements: Vec<SimElement>,
    html: String,
    focused: Option<usize>,
    dom_mutations: u64,
    scroll: (f64, f64),
    viewport: (u32, u32),
    zoom: f64,
    console: Vec<ConsoleLine>,
    clipboard: String,
    frames: Vec<FrameInfo>,
    current_frame: String,
    eval_results: HashMap<String, Value>,
    init_script: Option<String>,
    injected: bool,
    closed: bool,
}

/// Shared scripted-document map; pages resolve navigations against it.
type DocumentMap = Arc<RwLock<HashMap<String, SimDocument>>>;

/// One simulated page; handed to the core as `Arc<dyn PageEngine>`.
#[derive(Debug)]
pub struct SimPage {
    documents: DocumentMap,
    state: Mutex<PageState>,
}

impl SimPage {
    fn new(documents: DocumentMap, options: &PageOptions) -> Self {
        let state = PageState {
            url: "about:blank".to_string(),
            title: String::new(),
            status: None,
            loading: false,
            failed: false,
            failure: None,
            nav_target: None,
            loaded_at: Some(Instant::now()),
            lingering_requests: None,
            history: vec!["about:blank".to_string()],
            history_pos: 0,
            elements: Vec::new(),
            html: "<html><head></head><body></body></html>".to_string(),
            focused: None,
            dom_mutations: 0,
            scroll: (0.0, 0.0),
            viewport: if options.viewport == (0, 0) {
                (1280, 720)
            } else {
                options.viewport
            },
            zoom: 1.0,
            console: Vec::new(),
            clipboard: String::new(),
            frames: vec![FrameInfo {
                id: "main".to_string(),
                url: "about:blank".to_string(),
                name: None,
                parent_id: None,
            }],
            current_frame: "main".to_string(),
            eval_results: HashMap::new(),
            init_script: options.init_script.clone(),
            injected: options.init_script.is_some(),
            closed: false,
        };
        Self {
            documents,
            state: Mutex::new(state),
        }
    }

    /// Script the result of a future `evaluate` call.
    pub fn set_eval_result(&self, expression: &str, value: Value) {
        self.state
            .lock()
            .eval_results
            .insert(expression.to_string(), value);
    }

    /// The init script this page was created with, if any.
    pub fn init_script(&self) -> Option<String> {
        self.state.lock().init_script.clone()
    }

    /// Total DOM mutations so far (test observability).
    pub fn dom_mutations(&self) -> u64 {
        self.settle();
        self.state.lock().dom_mutations
    }

    /// Complete any navigation whose deadline has passed.
    fn settle(&self) {
        let mut state = self.state.lock();
        Self::settle_locked(&self.documents, &mut state);
    }

    fn settle_locked(documents: &DocumentMap, state: &mut PageState) {
        let Some((target, deadline)) = state.nav_target.clone() else {
            return;
        };
        if Instant::now() < deadline {
            return;
        }
        state.nav_target = None;
        let doc = documents
            .read()
            .get(&target)
            .cloned()
            .unwrap_or_else(|| SimDocument::new(target.clone()));

        if let Some(reason) = doc.failure {
            state.loading = false;
            state.failed = true;
            state.failure = Some(reason);
            state.status = Some(doc.status);
            return;
        }

        state.url = target.clone();
        state.title = doc.title;
        state.status = Some(doc.status);
        state.html = doc.html;
        state.elements = doc.elements;
        state.loading = false;
        state.failed = false;
        state.failure = None;
        state.focused = None;
        state.loaded_at = Some(Instant::now());
        state.lingering_requests = doc.lingering_requests;
        state.dom_mutations += 1;
        state.frames = vec![FrameInfo {
            id: "main".to_string(),
            url: target.clone(),
            name: None,
            parent_id: None,
        }];
        state.current_frame = "main".to_string();
        if state.history.get(state.history_pos) != Some(&target) {
            state.history.truncate(state.history_pos + 1);
            state.history.push(target);
            state.history_pos = state.history.len() - 1;
        }
        if state.init_script.is_some() {
            state.injected = true;
        }
    }

    fn begin_nav_locked(documents: &DocumentMap, state: &mut PageState, url: &str) {
        let delay = documents
            .read()
            .get(url)
            .map(|d| d.load_delay)
            .unwrap_or(Duration::ZERO);
        state.loading = true;
        state.failed = false;
        state.failure = None;
        state.nav_target = Some((url.to_string(), Instant::now() + delay));
    }

    fn snapshot_element(element: &SimElement, index: usize, focused: Option<usize>) -> ElementSnapshot {
        ElementSnapshot {
            selector: element.unique_selector(index),
            tag: element.tag.clone(),
            visible: element.visible,
            enabled: element.enabled,
            checked: element.checked,
            rect: element.rect,
            covered_by: element.covered_by.clone(),
            value: if element.tag == "input"
                || element.tag == "textarea"
                || element.tag == "select"
            {
                Some(element.value.clone())
            } else {
                None
            },
            text: element.text.clone(),
            attributes: element.attributes.clone(),
            options: element.options.clone(),
            focused: focused == Some(index),
        }
    }

    fn apply_click(documents: &DocumentMap, state: &mut PageState, index: usize) {
        let effect = state.elements[index].on_click.clone();
        match effect {
            ClickEffect::None => {}
            ClickEffect::Navigate(url) => Self::begin_nav_locked(documents, state, &url),
            ClickEffect::Focus => {
                state.focused = Some(index);
            }
            ClickEffect::Mutate => {
                state.dom_mutations += 1;
            }
            ClickEffect::Toggle => {
                let el = &mut state.elements[index];
                el.checked = Some(!el.checked.unwrap_or(false));
                state.dom_mutations += 1;
            }
        }
    }
}

#[async_trait]
impl PageEngine for SimPage {
    async fn begin_navigate(&self, url: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(EngineError::PageClosed);
        }
        Self::begin_nav_locked(&self.documents, &mut state, url);
        Ok(())
    }

    async fn nav_snapshot(&self) -> NavSnapshot {
        let mut state = self.state.lock();
        Self::settle_locked(&self.documents, &mut state);
        let pending = match (state.loaded_at, state.lingering_requests) {
            (Some(loaded), Some((count, for_duration))) if loaded.elapsed() < for_duration => count,
            _ => 0,
        };
        NavSnapshot {
            url: state.url.clone(),
            title: state.title.clone(),
            http_status: state.status,
            loading: state.loading,
            failed: state.failed,
            failure: state.failure.clone(),
            pending_requests: pending,
            dom_mutation_count: state.dom_mutations,
        }
    }

    async fn can_go_back(&self) -> bool {
        let state = self.state.lock();
        state.history_pos > 0
    }

    async fn can_go_forward(&self) -> bool {
        let state = self.state.lock();
        state.history_pos + 1 < state.history.len()
    }

    async fn go_back(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.history_pos == 0 {
            return Err(EngineError::Rejected("no back entry".to_string()));
        }
        state.history_pos -= 1;
        let url = state.history[state.history_pos].clone();
        Self::begin_nav_locked(&self.documents, &mut state, &url);
        Ok(())
    }

    async fn go_forward(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.history_pos + 1 >= state.history.len() {
            return Err(EngineError::Rejected("no forward entry".to_string()));
        }
        state.history_pos += 1;
        let url = state.history[state.history_pos].clone();
        Self::begin_nav_locked(&self.documents, &mut state, &url);
        Ok(())
    }

    async fn reload(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let url = state.url.clone();
        Self::begin_nav_locked(&self.documents, &mut state, &url);
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, EngineError> {
        self.settle();
        let state = self.state.lock();
        if let Some(value) = state.eval_results.get(expression) {
            return Ok(value.clone());
        }
        match expression {
            "document.title" => Ok(Value::String(state.title.clone())),
            "location.href" | "window.location.href" => Ok(Value::String(state.url.clone())),
            "document.readyState" => Ok(Value::String(
                if state.loading { "loading" } else { "complete" }.to_string(),
            )),
            _ => Ok(Value::Null),
        }
    }

    async fn query(&self, selector: &str) -> Result<Vec<ElementSnapshot>, EngineError> {
        self.settle();
        let parsed = parse_selector(selector)?;
        let state = self.state.lock();
        Ok(state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| parsed.matches(el))
            .map(|(i, el)| Self::snapshot_element(el, i, state.focused))
            .collect())
    }

    async fn page_html(&self) -> String {
        self.settle();
        self.state.lock().html.clone()
    }

    async fn page_text(&self) -> String {
        self.settle();
        let state = self.state.lock();
        state
            .elements
            .iter()
            .filter(|el| el.visible && !el.text.is_empty())
            .map(|el| el.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn click_at(
        &self,
        x: f64,
        y: f64,
        _button: MouseButton,
        clicks: u32,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        Self::settle_locked(&self.documents, &mut state);
        // Topmost wins: later elements paint over earlier ones.
        let hit = state
            .elements
            .iter()
            .enumerate()
            .rev()
            .find(|(_, el)| el.visible && el.rect.contains(x, y))
            .map(|(i, _)| i);
        if let Some(index) = hit {
            for _ in 0..clicks.max(1) {
                Self::apply_click(&self.documents, &mut state, index);
            }
        }
        Ok(())
    }

    async fn move_mouse(&self, _x: f64, _y: f64) -> Result<(), EngineError> {
        Ok(())
    }

    async fn press_key(&self, key: &str, _modifiers: &[String]) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if let Some(index) = state.focused {
            if key == "Backspace" {
                let el = &mut state.elements[index];
                el.value.pop();
                state.dom_mutations += 1;
            }
        }
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let Some(index) = state.focused else {
            return Err(EngineError::Rejected("no focused element".to_string()));
        };
        let el = &mut state.elements[index];
        let maxlength = el
            .attributes
            .get("maxlength")
            .and_then(|v| v.parse::<usize>().ok());
        for ch in text.chars() {
            if let Some(max) = maxlength {
                if el.value.chars().count() >= max {
                    break;
                }
            }
            el.value.push(ch);
        }
        state.dom_mutations += 1;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), EngineError> {
        let parsed = parse_selector(selector)?;
        let mut state = self.state.lock();
        let Some(el) = state.elements.iter_mut().find(|el| parsed.matches(el)) else {
            return Err(EngineError::Rejected(format!("no element for {selector}")));
        };
        if el.options.iter().any(|o| o == value) {
            el.value = value.to_string();
        }
        state.dom_mutations += 1;
        Ok(())
    }

    async fn set_files(&self, selector: &str, files: &[String]) -> Result<(), EngineError> {
        let parsed = parse_selector(selector)?;
        let mut state = self.state.lock();
        let Some(el) = state.elements.iter_mut().find(|el| parsed.matches(el)) else {
            return Err(EngineError::Rejected(format!("no element for {selector}")));
        };
        el.value = files.join(",");
        state.dom_mutations += 1;
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<(), EngineError> {
        let parsed = parse_selector(selector)?;
        let mut state = self.state.lock();
        let index = state
            .elements
            .iter()
            .position(|el| parsed.matches(el))
            .ok_or_else(|| EngineError::Rejected(format!("no element for {selector}")))?;
        state.focused = Some(index);
        Ok(())
    }

    async fn blur(&self) -> Result<(), EngineError> {
        self.state.lock().focused = None;
        Ok(())
    }

    async fn active_element(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .focused
            .map(|i| state.elements[i].unique_selector(i))
    }

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), EngineError> {
        self.state.lock().scroll = (x.max(0.0), y.max(0.0));
        Ok(())
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.scroll.0 = (state.scroll.0 + dx).max(0.0);
        state.scroll.1 = (state.scroll.1 + dy).max(0.0);
        Ok(())
    }

    async fn scroll_position(&self) -> (f64, f64) {
        self.state.lock().scroll
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), EngineError> {
        let parsed = parse_selector(selector)?;
        let mut state = self.state.lock();
        let rect = state
            .elements
            .iter()
            .find(|el| parsed.matches(el))
            .map(|el| el.rect)
            .ok_or_else(|| EngineError::Rejected(format!("no element for {selector}")))?;
        state.scroll = (rect.x.max(0.0), rect.y.max(0.0));
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), EngineError> {
        self.state.lock().viewport = (width, height);
        Ok(())
    }

    async fn viewport(&self) -> (u32, u32) {
        self.state.lock().viewport
    }

    async fn set_zoom(&self, level: f64) -> Result<(), EngineError> {
        if !(0.25..=5.0).contains(&level) {
            return Err(EngineError::Rejected(format!("zoom out of range: {level}")));
        }
        self.state.lock().zoom = level;
        Ok(())
    }

    async fn zoom(&self) -> f64 {
        self.state.lock().zoom
    }

    async fn capture_frame(&self) -> Result<Vec<u8>, EngineError> {
        self.settle();
        let state = self.state.lock();
        // A syntactically valid PNG prefix followed by a deterministic body
        // derived from what is on screen.
        let mut frame = PNG_MAGIC.to_vec();
        frame.extend_from_slice(state.url.as_bytes());
        frame.extend_from_slice(&state.viewport.0.to_be_bytes());
        frame.extend_from_slice(&state.viewport.1.to_be_bytes());
        frame.extend_from_slice(&state.dom_mutations.to_be_bytes());
        frame.extend_from_slice(&(state.scroll.1 as u64).to_be_bytes());
        Ok(frame)
    }

    async fn frame_tree(&self) -> Vec<FrameInfo> {
        self.settle();
        self.state.lock().frames.clone()
    }

    async fn switch_frame(&self, frame_id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.frames.iter().any(|f| f.id == frame_id) {
            state.current_frame = frame_id.to_string();
            Ok(())
        } else {
            Err(EngineError::UnknownFrame(frame_id.to_string()))
        }
    }

    async fn switch_to_parent_frame(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let parent = state
            .frames
            .iter()
            .find(|f| f.id == state.current_frame)
            .and_then(|f| f.parent_id.clone())
            .unwrap_or_else(|| "main".to_string());
        state.current_frame = parent;
        Ok(())
    }

    async fn switch_to_main_frame(&self) -> Result<(), EngineError> {
        self.state.lock().current_frame = "main".to_string();
        Ok(())
    }

    async fn drain_console(&self) -> Vec<ConsoleLine> {
        std::mem::take(&mut self.state.lock().console)
    }

    async fn set_clipboard(&self, text: &str) -> Result<(), EngineError> {
        self.state.lock().clipboard = text.to_string();
        Ok(())
    }

    async fn clipboard(&self) -> String {
        self.state.lock().clipboard.clone()
    }

    async fn close(&self) {
        self.state.lock().closed = true;
    }
}

/// Test helpers that are not part of the engine contract.
impl SimPage {
    /// Push a console line as if the page logged it.
    pub fn emit_console(&self, level: &str, text: &str) {
        self.state.lock().console.push(ConsoleLine {
            level: level.to_string(),
            text: text.to_string(),
        });
    }

    /// Install an iframe into the frame tree.
    pub fn add_frame(&self, id: &str, url: &str, name: Option<&str>) {
        self.state.lock().frames.push(FrameInfo {
            id: id.to_string(),
            url: url.to_string(),
            name: name.map(ToString::to_string),
            parent_id: Some("main".to_string()),
        });
    }
}

/// The deterministic engine factory.
#[derive(Debug)]
pub struct SimBrowser {
    ready: std::sync::atomic::AtomicBool,
    documents: DocumentMap,
    pages: Mutex<HashMap<String, Arc<SimPage>>>,
}

impl SimBrowser {
    /// A ready engine with no documents installed.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: std::sync::atomic::AtomicBool::new(true),
            documents: Arc::new(RwLock::new(HashMap::new())),
            pages: Mutex::new(HashMap::new()),
        })
    }

    /// An engine that reports not-ready until [`SimBrowser::mark_ready`].
    pub fn uninitialized() -> Arc<Self> {
        let browser = Self::new();
        browser.ready.store(false, std::sync::atomic::Ordering::SeqCst);
        browser
    }

    /// Flip the engine to ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Install a scripted document, replacing any previous one at its URL.
    pub fn install(&self, document: SimDocument) {
        self.documents
            .write()
            .insert(document.url.clone(), document);
    }

    /// The live page for a context, for test scripting.
    pub fn page(&self, context_id: &str) -> Option<Arc<SimPage>> {
        self.pages.lock().get(context_id).cloned()
    }
}

#[async_trait]
impl BrowserEngine for SimBrowser {
    fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn create_page(
        &self,
        context_id: &str,
        options: &PageOptions,
    ) -> Result<Arc<dyn PageEngine>, EngineError> {
        if !self.is_ready() {
            return Err(EngineError::NotReady);
        }
        let page = Arc::new(SimPage::new(self.documents.clone(), options));
        self.pages.lock().insert(context_id.to_string(), page.clone());
        Ok(page)
    }

    async fn shutdown(&self) {
        self.pages.lock().clear();
    }
}

#[cfg(test)]
mod tests;
