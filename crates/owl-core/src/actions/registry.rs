//! The method registry: every operation the IPC surface routes, with its
//! parameter schema and result shape.
//!
//! Validation is up-front: a missing required field or a field outside the
//! schema is rejected before any handler runs.

/// Whether a method operates on a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextUse {
    /// Global method; fully reentrant.
    Global,
    /// Requires `context_id`; serialized on the context's mutex.
    Required,
}

/// The response shape a method produces on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Action,
    Bool,
    Text,
    Json,
    Context,
}

/// One registry entry.
#[derive(Debug, Clone, Copy)]
pub struct MethodSpec {
    pub name: &'static str,
    pub context: ContextUse,
    pub shape: ResultShape,
    /// Required parameters beyond `context_id` (which `context` implies).
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl MethodSpec {
    /// Comma-separated accepted parameter list for error messages.
    pub fn accepted(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        if self.context == ContextUse::Required {
            names.push("context_id");
        }
        names.extend(self.required);
        names.extend(self.optional);
        names.join(", ")
    }
}

const VERIFY: &[&str] = &["verification_level"];

/// The full method table, grouped by category.
pub static METHODS: &[MethodSpec] = &[
    // --- Context ---
    MethodSpec { name: "createContext", context: ContextUse::Global, shape: ResultShape::Context,
        required: &[],
        optional: &["os", "gpu", "proxy", "profile_path", "block_resources", "llm"] },
    MethodSpec { name: "releaseContext", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "closeContext", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "listContexts", context: ContextUse::Global, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "getFingerprint", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "getVirtualMachine", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "getLLMStatus", context: ContextUse::Global, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "ping", context: ContextUse::Global, shape: ResultShape::Text,
        required: &[], optional: &[] },

    // --- Navigation ---
    MethodSpec { name: "navigate", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["url"], optional: &["timeout"] },
    MethodSpec { name: "reload", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },
    MethodSpec { name: "goBack", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },
    MethodSpec { name: "goForward", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },
    MethodSpec { name: "canGoBack", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "canGoForward", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "waitForNavigation", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },
    MethodSpec { name: "getNavigationState", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },

    // --- Interaction ---
    MethodSpec { name: "click", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "doubleClick", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "rightClick", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "type", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector", "text"], optional: VERIFY },
    MethodSpec { name: "pick", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector", "value"], optional: VERIFY },
    MethodSpec { name: "pressKey", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["key"], optional: &["modifiers"] },
    MethodSpec { name: "keyboardCombo", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["combo"], optional: &[] },
    MethodSpec { name: "submitForm", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "hover", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "clearInput", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "focus", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "blur", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "selectAll", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "dragDrop", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["source", "target"], optional: VERIFY },
    MethodSpec { name: "html5DragDrop", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["source", "target"], optional: &[] },
    MethodSpec { name: "mouseMove", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["x", "y"], optional: &[] },
    MethodSpec { name: "uploadFile", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector", "files"], optional: VERIFY },

    // --- Scrolling ---
    MethodSpec { name: "scroll", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["dx", "dy"], optional: VERIFY },
    MethodSpec { name: "scrollTo", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["x", "y"], optional: VERIFY },
    MethodSpec { name: "scrollToElement", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: VERIFY },
    MethodSpec { name: "scrollToTop", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "scrollToBottom", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "getScrollPosition", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },

    // --- Content extraction ---
    MethodSpec { name: "extractText", context: ContextUse::Required, shape: ResultShape::Text,
        required: &[], optional: &["selector"] },
    MethodSpec { name: "getHTML", context: ContextUse::Required, shape: ResultShape::Text,
        required: &[], optional: &[] },
    MethodSpec { name: "getMarkdown", context: ContextUse::Required, shape: ResultShape::Text,
        required: &[], optional: &[] },
    MethodSpec { name: "extractJSON", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &["template"] },
    MethodSpec { name: "detectSite", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "listTemplates", context: ContextUse::Global, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "getPageInfo", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "screenshot", context: ContextUse::Required, shape: ResultShape::Text,
        required: &[], optional: &["mode", "selector"] },
    MethodSpec { name: "freezeFrame", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "unfreezeFrame", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "highlight", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "showGrid", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["spacing"] },
    MethodSpec { name: "hideGrid", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },

    // --- Element state ---
    MethodSpec { name: "elementExists", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "isVisible", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "isEnabled", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "isChecked", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "getAttribute", context: ContextUse::Required, shape: ResultShape::Json,
        required: &["selector", "name"], optional: &[] },
    MethodSpec { name: "getBoundingBox", context: ContextUse::Required, shape: ResultShape::Json,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "countElements", context: ContextUse::Required, shape: ResultShape::Json,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "getElementText", context: ContextUse::Required, shape: ResultShape::Text,
        required: &["selector"], optional: &[] },
    MethodSpec { name: "getInputValue", context: ContextUse::Required, shape: ResultShape::Text,
        required: &["selector"], optional: &[] },

    // --- Wait ---
    MethodSpec { name: "waitForSelector", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["selector"], optional: &["timeout"] },
    MethodSpec { name: "waitForTimeout", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["timeout"], optional: &[] },
    MethodSpec { name: "waitForNetworkIdle", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },
    MethodSpec { name: "waitForFunction", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["expression"], optional: &["timeout"] },
    MethodSpec { name: "waitForUrl", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["pattern"], optional: &["timeout"] },
    MethodSpec { name: "waitForDomStable", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },

    // --- Page control ---
    MethodSpec { name: "setViewport", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["width", "height"], optional: &[] },
    MethodSpec { name: "evaluate", context: ContextUse::Required, shape: ResultShape::Json,
        required: &["expression"], optional: &[] },
    MethodSpec { name: "zoomIn", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "zoomOut", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "zoomReset", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "getZoom", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "getConsoleLogs", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &["level"] },
    MethodSpec { name: "clearConsoleLogs", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },

    // --- Video recording & live streaming ---
    MethodSpec { name: "startVideoRecording", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["path"] },
    MethodSpec { name: "stopVideoRecording", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "getVideoStatus", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "startStream", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "stopStream", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "getStreamStatus", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },

    // --- Demographics & captcha ---
    MethodSpec { name: "getDemographics", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "detectCaptcha", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "solveCaptcha", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },

    // --- Cookies & proxy & profiles ---
    MethodSpec { name: "getCookies", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "setCookie", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["name", "value"],
        optional: &["domain", "path", "expires", "http_only", "secure", "same_site"] },
    MethodSpec { name: "deleteCookie", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["name"], optional: &[] },
    MethodSpec { name: "clearCookies", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "setProxy", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["server"], optional: &["username", "password"] },
    MethodSpec { name: "getProxy", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "clearProxy", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "saveProfile", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["path"], optional: &[] },
    MethodSpec { name: "loadProfile", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["path"], optional: &[] },

    // --- Frames ---
    MethodSpec { name: "listFrames", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "switchToFrame", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["frame_id"], optional: &[] },
    MethodSpec { name: "switchToParentFrame", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },
    MethodSpec { name: "switchToMainFrame", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &[] },

    // --- Network interception ---
    MethodSpec { name: "addNetworkRule", context: ContextUse::Required, shape: ResultShape::Json,
        required: &["pattern", "action"], optional: &["resource_types"] },
    MethodSpec { name: "removeNetworkRule", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["rule_id"], optional: &[] },
    MethodSpec { name: "listNetworkRules", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "clearNetworkRules", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },
    MethodSpec { name: "setResourceBlocking", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["enabled"], optional: &[] },

    // --- Downloads ---
    MethodSpec { name: "listDownloads", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "waitForDownload", context: ContextUse::Required, shape: ResultShape::Action,
        required: &[], optional: &["timeout"] },
    MethodSpec { name: "clearDownloads", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &[], optional: &[] },

    // --- Dialogs ---
    MethodSpec { name: "setDialogPolicy", context: ContextUse::Required, shape: ResultShape::Bool,
        required: &["policy"], optional: &["text"] },
    MethodSpec { name: "getLastDialog", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "listDialogs", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },

    // --- Tabs ---
    MethodSpec { name: "listTabs", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &[] },
    MethodSpec { name: "newTab", context: ContextUse::Required, shape: ResultShape::Json,
        required: &[], optional: &["url"] },
    MethodSpec { name: "switchTab", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["tab_id"], optional: &[] },
    MethodSpec { name: "closeTab", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["tab_id"], optional: &[] },

    // --- Clipboard & license ---
    MethodSpec { name: "clipboardRead", context: ContextUse::Required, shape: ResultShape::Text,
        required: &[], optional: &[] },
    MethodSpec { name: "clipboardWrite", context: ContextUse::Required, shape: ResultShape::Action,
        required: &["text"], optional: &[] },
    MethodSpec { name: "getLicenseStatus", context: ContextUse::Global, shape: ResultShape::Json,
        required: &[], optional: &[] },
];

/// Look up a method by name.
pub fn method_spec(name: &str) -> Option<&'static MethodSpec> {
    METHODS.iter().find(|spec| spec.name == name)
}
