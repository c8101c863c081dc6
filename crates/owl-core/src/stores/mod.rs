//! Per-feature stores keyed by context id.
//!
//! Console logs, dialogs, downloads, tabs, and network rules are
//! process-wide services, each with its own brief mutex. Entries are scoped
//! to a context; the context manager calls [`Stores::clear_for_context`]
//! when a context is destroyed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One captured console log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleLogEntry {
    pub id: String,
    pub level: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Maximum retained console entries per context.
const CONSOLE_CAPACITY: usize = 2000;

/// Ring-buffered console capture per context.
#[derive(Debug, Default)]
pub struct ConsoleStore {
    entries: Mutex<HashMap<String, Vec<ConsoleLogEntry>>>,
}

impl ConsoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line; evicts the oldest entry past capacity.
    pub fn push(&self, context_id: &str, level: &str, text: &str) {
        let mut entries = self.entries.lock();
        let buffer = entries.entry(context_id.to_string()).or_default();
        buffer.push(ConsoleLogEntry {
            id: Uuid::new_v4().to_string(),
            level: level.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        if buffer.len() > CONSOLE_CAPACITY {
            let excess = buffer.len() - CONSOLE_CAPACITY;
            buffer.drain(..excess);
        }
    }

    /// All retained entries for a context, oldest first.
    pub fn read(&self, context_id: &str) -> Vec<ConsoleLogEntry> {
        self.entries
            .lock()
            .get(context_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop all entries for a context.
    pub fn clear(&self, context_id: &str) {
        self.entries.lock().remove(context_id);
    }
}

/// What to do with page dialogs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "text")]
pub enum DialogPolicy {
    /// Accept every dialog (with optional prompt text).
    Accept,
    /// Dismiss every dialog.
    #[default]
    Dismiss,
    /// Accept prompts with the given text.
    AcceptWithText(String),
}

/// One dialog the page raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogRecord {
    pub id: String,
    /// "alert", "confirm", "prompt", "beforeunload".
    pub kind: String,
    pub message: String,
    /// Whether the policy accepted it.
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

/// Dialog policy plus history per context.
#[derive(Debug, Default)]
pub struct DialogStore {
    policies: Mutex<HashMap<String, DialogPolicy>>,
    records: Mutex<HashMap<String, Vec<DialogRecord>>>,
}

impl DialogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_policy(&self, context_id: &str, policy: DialogPolicy) {
        self.policies
            .lock()
            .insert(context_id.to_string(), policy);
    }

    pub fn policy(&self, context_id: &str) -> DialogPolicy {
        self.policies
            .lock()
            .get(context_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Record a dialog resolved under the current policy and return the
    /// record.
    pub fn record(&self, context_id: &str, kind: &str, message: &str) -> DialogRecord {
        let policy = self.policy(context_id);
        let record = DialogRecord {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            message: message.to_string(),
            accepted: !matches!(policy, DialogPolicy::Dismiss),
            timestamp: Utc::now(),
        };
        self.records
            .lock()
            .entry(context_id.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    pub fn history(&self, context_id: &str) -> Vec<DialogRecord> {
        self.records
            .lock()
            .get(context_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&self, context_id: &str) {
        self.policies.lock().remove(context_id);
        self.records.lock().remove(context_id);
    }
}

/// Download progress states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    InProgress,
    Completed,
    Failed,
}

/// One tracked download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: String,
    pub url: String,
    pub path: String,
    pub state: DownloadState,
    pub started_at: DateTime<Utc>,
}

/// Download set per context.
#[derive(Debug, Default)]
pub struct DownloadStore {
    downloads: Mutex<HashMap<String, Vec<DownloadRecord>>>,
}

impl DownloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new download and return its id.
    pub fn begin(&self, context_id: &str, url: &str, path: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.downloads
            .lock()
            .entry(context_id.to_string())
            .or_default()
            .push(DownloadRecord {
                id: id.clone(),
                url: url.to_string(),
                path: path.to_string(),
                state: DownloadState::InProgress,
                started_at: Utc::now(),
            });
        id
    }

    /// Move a download to a terminal state.
    pub fn finish(&self, context_id: &str, download_id: &str, state: DownloadState) -> bool {
        let mut downloads = self.downloads.lock();
        if let Some(record) = downloads
            .get_mut(context_id)
            .and_then(|list| list.iter_mut().find(|d| d.id == download_id))
        {
            record.state = state;
            true
        } else {
            false
        }
    }

    pub fn list(&self, context_id: &str) -> Vec<DownloadRecord> {
        self.downloads
            .lock()
            .get(context_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&self, context_id: &str) {
        self.downloads.lock().remove(context_id);
    }
}

/// One tab within a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub active: bool,
}

/// Tab set per context. Every context starts with one active tab.
#[derive(Debug, Default)]
pub struct TabStore {
    tabs: Mutex<HashMap<String, Vec<TabRecord>>>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the initial tab for a fresh context.
    pub fn init(&self, context_id: &str, url: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.tabs.lock().insert(
            context_id.to_string(),
            vec![TabRecord {
                id: id.clone(),
                url: url.to_string(),
                title: String::new(),
                active: true,
            }],
        );
        id
    }

    /// Open an additional tab; it becomes active.
    pub fn open(&self, context_id: &str, url: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let mut tabs = self.tabs.lock();
        let list = tabs.entry(context_id.to_string()).or_default();
        for tab in list.iter_mut() {
            tab.active = false;
        }
        list.push(TabRecord {
            id: id.clone(),
            url: url.to_string(),
            title: String::new(),
            active: true,
        });
        id
    }

    /// Switch the active tab. Returns false for an unknown id.
    pub fn switch(&self, context_id: &str, tab_id: &str) -> bool {
        let mut tabs = self.tabs.lock();
        let Some(list) = tabs.get_mut(context_id) else {
            return false;
        };
        if !list.iter().any(|t| t.id == tab_id) {
            return false;
        }
        for tab in list.iter_mut() {
            tab.active = tab.id == tab_id;
        }
        true
    }

    /// Close a tab. The last tab cannot be closed. Closing the active tab
    /// activates the first remaining one.
    pub fn close(&self, context_id: &str, tab_id: &str) -> bool {
        let mut tabs = self.tabs.lock();
        let Some(list) = tabs.get_mut(context_id) else {
            return false;
        };
        if list.len() <= 1 || !list.iter().any(|t| t.id == tab_id) {
            return false;
        }
        let was_active = list.iter().any(|t| t.id == tab_id && t.active);
        list.retain(|t| t.id != tab_id);
        if was_active {
            if let Some(first) = list.first_mut() {
                first.active = true;
            }
        }
        true
    }

    /// Keep the active tab's url/title in step with navigation.
    pub fn sync_active(&self, context_id: &str, url: &str, title: &str) {
        let mut tabs = self.tabs.lock();
        if let Some(tab) = tabs
            .get_mut(context_id)
            .and_then(|list| list.iter_mut().find(|t| t.active))
        {
            tab.url = url.to_string();
            tab.title = title.to_string();
        }
    }

    pub fn list(&self, context_id: &str) -> Vec<TabRecord> {
        self.tabs
            .lock()
            .get(context_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&self, context_id: &str) {
        self.tabs.lock().remove(context_id);
    }
}

/// What a network rule does to matching requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    Allow,
}

/// One interception rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRule {
    pub id: String,
    /// Substring (or `*`-wildcard) pattern matched against request URLs.
    pub pattern: String,
    pub action: RuleAction,
    /// Resource types the rule applies to; empty means all.
    pub resource_types: Vec<String>,
}

impl NetworkRule {
    /// Whether this rule matches a URL/resource-type pair.
    pub fn matches(&self, url: &str, resource_type: &str) -> bool {
        if !self.resource_types.is_empty()
            && !self.resource_types.iter().any(|t| t == resource_type)
        {
            return false;
        }
        if let Some(rest) = self.pattern.strip_prefix('*') {
            if let Some(middle) = rest.strip_suffix('*') {
                return url.contains(middle);
            }
            return url.ends_with(rest);
        }
        if let Some(prefix) = self.pattern.strip_suffix('*') {
            return url.starts_with(prefix);
        }
        url.contains(&self.pattern)
    }
}

/// Network-rule list per context. First matching rule wins.
#[derive(Debug, Default)]
pub struct NetworkRuleStore {
    rules: Mutex<HashMap<String, Vec<NetworkRule>>>,
}

impl NetworkRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        context_id: &str,
        pattern: &str,
        action: RuleAction,
        resource_types: Vec<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.rules
            .lock()
            .entry(context_id.to_string())
            .or_default()
            .push(NetworkRule {
                id: id.clone(),
                pattern: pattern.to_string(),
                action,
                resource_types,
            });
        id
    }

    pub fn remove(&self, context_id: &str, rule_id: &str) -> bool {
        let mut rules = self.rules.lock();
        if let Some(list) = rules.get_mut(context_id) {
            let before = list.len();
            list.retain(|r| r.id != rule_id);
            return list.len() != before;
        }
        false
    }

    pub fn list(&self, context_id: &str) -> Vec<NetworkRule> {
        self.rules
            .lock()
            .get(context_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Decide what happens to a request. `None` means no rule applies.
    pub fn decide(&self, context_id: &str, url: &str, resource_type: &str) -> Option<RuleAction> {
        self.rules
            .lock()
            .get(context_id)?
            .iter()
            .find(|rule| rule.matches(url, resource_type))
            .map(|rule| rule.action)
    }

    pub fn clear(&self, context_id: &str) {
        self.rules.lock().remove(context_id);
    }
}

/// All feature stores, passed by reference from the runtime.
#[derive(Debug, Default)]
pub struct Stores {
    pub console: ConsoleStore,
    pub dialogs: DialogStore,
    pub downloads: DownloadStore,
    pub tabs: TabStore,
    pub network_rules: NetworkRuleStore,
}

impl Stores {
    pub fn new() -> Self {
        Self {
            console: ConsoleStore::new(),
            dialogs: DialogStore::new(),
            downloads: DownloadStore::new(),
            tabs: TabStore::new(),
            network_rules: NetworkRuleStore::new(),
        }
    }

    /// Drop every entry belonging to a destroyed context.
    pub fn clear_for_context(&self, context_id: &str) {
        self.console.clear(context_id);
        self.dialogs.clear(context_id);
        self.downloads.clear(context_id);
        self.tabs.clear(context_id);
        self.network_rules.clear(context_id);
    }
}

#[cfg(test)]
mod tests;
