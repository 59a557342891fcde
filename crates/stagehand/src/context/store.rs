//! Fixed-size window store: writes, compression, rebalancing, relevance.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::now_ms;

/// Characters per estimated token. A deliberately crude size proxy used for
/// local capacity management only, not a real tokenizer.
pub const CHARS_PER_TOKEN: usize = 4;

/// Number of windows a store holds for its entire lifetime.
pub const DEFAULT_WINDOW_COUNT: usize = 7;

/// Per-window token cap before content is compressed.
pub const DEFAULT_PER_WINDOW_CAP: usize = 2048;

/// After a rebalance, total tokens must sit under `capacity × retention`.
const DEFAULT_RETENTION_FACTOR: f64 = 0.95;

/// A write triggers a rebalance once total tokens exceed `capacity × threshold`.
const DEFAULT_REBALANCE_THRESHOLD: f64 = 0.80;

/// Fields kept when oversized object content is compressed. Everything else
/// is dropped before storage.
const COMPRESSION_ALLOW_LIST: [&str; 7] =
    ["id", "name", "result", "status", "error", "metrics", "score"];

/// Maximum windows returned by a relevance query.
const RELEVANT_LIMIT: usize = 3;

/// Configuration for a [`ContextStore`].
#[derive(Debug, Clone)]
pub struct ContextStoreConfig {
    /// Fixed window count (windows are numbered `1..=window_count`).
    pub window_count: usize,
    /// Per-window token cap; writes above it are compressed.
    pub per_window_cap: usize,
    /// Post-rebalance retention bound as a fraction of total capacity.
    pub retention_factor: f64,
    /// Rebalance trigger as a fraction of total capacity.
    pub rebalance_threshold: f64,
}

impl Default for ContextStoreConfig {
    fn default() -> Self {
        Self {
            window_count: DEFAULT_WINDOW_COUNT,
            per_window_cap: DEFAULT_PER_WINDOW_CAP,
            retention_factor: DEFAULT_RETENTION_FACTOR,
            rebalance_threshold: DEFAULT_REBALANCE_THRESHOLD,
        }
    }
}

impl ContextStoreConfig {
    /// Override the fixed window count.
    pub fn with_window_count(mut self, count: usize) -> Self {
        self.window_count = count;
        self
    }

    /// Override the per-window token cap.
    pub fn with_per_window_cap(mut self, cap: usize) -> Self {
        self.per_window_cap = cap;
        self
    }

    /// Override the retention factor.
    pub fn with_retention_factor(mut self, factor: f64) -> Self {
        self.retention_factor = factor;
        self
    }
}

/// One fixed memory slot. Exists for the life of the store; cleared, never
/// removed.
#[derive(Debug, Clone, Serialize)]
pub struct ContextWindow {
    pub id: usize,
    pub name: String,
    /// `None` when the window has been cleared (or never written).
    pub content: Option<Value>,
    /// 0–5; higher survives rebalancing longer.
    pub priority: u8,
    pub timestamp_ms: i64,
    pub token_estimate: usize,
}

impl ContextWindow {
    fn empty(id: usize) -> Self {
        Self {
            id,
            name: format!("window-{id}"),
            content: None,
            priority: 0,
            timestamp_ms: 0,
            token_estimate: 0,
        }
    }
}

/// A pending write produced by a reasoning step and applied by its driver.
///
/// Steps never touch the store directly; they read a [`ContextSnapshot`]
/// and return one of these, which the executor applies before the next step
/// begins.
#[derive(Debug, Clone)]
pub struct WindowWrite {
    pub window_id: usize,
    pub content: Value,
    pub priority: u8,
}

/// Summary of store state for callers, plus the executor's average step
/// duration.
#[derive(Debug, Clone, Serialize)]
pub struct ContextReport {
    pub active_windows: Vec<ContextWindow>,
    pub total_tokens: usize,
    pub max_tokens: usize,
    pub avg_step_duration_ms: f64,
}

/// Bounded, prioritized window store. See the [module docs](super) for the
/// write/compress/rebalance lifecycle.
#[derive(Debug)]
pub struct ContextStore {
    config: ContextStoreConfig,
    windows: Vec<ContextWindow>,
}

impl ContextStore {
    /// Create a store with `config.window_count` empty windows, numbered
    /// from 1.
    pub fn new(config: ContextStoreConfig) -> Self {
        let windows = (1..=config.window_count).map(ContextWindow::empty).collect();
        Self { config, windows }
    }

    /// Number of windows (fixed for the store's lifetime).
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Total estimated tokens across all windows.
    pub fn total_tokens(&self) -> usize {
        self.windows.iter().map(|w| w.token_estimate).sum()
    }

    /// Total capacity: `window_count × per_window_cap`.
    pub fn max_tokens(&self) -> usize {
        self.windows.len() * self.config.per_window_cap
    }

    /// Replace a window's content in place.
    ///
    /// The token estimate is `ceil(serialized_len / 4)`; content above the
    /// per-window cap is compressed to the allow-listed field subset and the
    /// estimate recomputed on the compressed value. A write to an unknown
    /// window id fails fast. Crossing the rebalance threshold triggers an
    /// automatic [`rebalance()`](Self::rebalance).
    pub fn write(&mut self, window_id: usize, content: Value, priority: u8) -> Result<(), String> {
        let count = self.windows.len();
        let idx = self
            .windows
            .iter()
            .position(|w| w.id == window_id)
            .ok_or_else(|| format!("unknown context window id {window_id} (valid: 1..={count})"))?;

        let mut stored = content;
        let mut estimate = estimate_tokens(&stored);
        if estimate > self.config.per_window_cap {
            stored = compress(stored);
            estimate = estimate_tokens(&stored);
            debug!(
                "window {window_id}: content over {}-token cap, compressed to ~{estimate} tokens",
                self.config.per_window_cap,
            );
        }

        let window = &mut self.windows[idx];
        window.content = Some(stored);
        window.token_estimate = estimate;
        window.priority = priority.min(5);
        window.timestamp_ms = now_ms();

        let trigger = (self.max_tokens() as f64 * self.config.rebalance_threshold) as usize;
        if self.total_tokens() > trigger {
            self.rebalance();
        }
        Ok(())
    }

    /// Apply a step's pending write.
    pub fn apply(&mut self, delta: WindowWrite) -> Result<(), String> {
        self.write(delta.window_id, delta.content, delta.priority)
    }

    /// The stored content, verbatim. `Ok(None)` for a cleared window.
    pub fn read(&self, window_id: usize) -> Result<Option<&Value>, String> {
        let count = self.windows.len();
        self.windows
            .iter()
            .find(|w| w.id == window_id)
            .map(|w| w.content.as_ref())
            .ok_or_else(|| format!("unknown context window id {window_id} (valid: 1..={count})"))
    }

    /// Clear low-ranked windows until total tokens fall under the retention
    /// bound.
    ///
    /// Windows are ranked `(priority asc, timestamp asc)`; lowest priority
    /// and oldest go first. Clearing resets content, estimate, and priority;
    /// the window itself survives. One uninterrupted pass, so it is atomic
    /// relative to other store operations.
    pub fn rebalance(&mut self) {
        let target = (self.max_tokens() as f64 * self.config.retention_factor) as usize;
        let mut order: Vec<usize> = (0..self.windows.len()).collect();
        order.sort_by_key(|&i| (self.windows[i].priority, self.windows[i].timestamp_ms));

        let mut cleared = 0usize;
        for idx in order {
            if self.total_tokens() < target {
                break;
            }
            let w = &mut self.windows[idx];
            if w.content.is_none() {
                continue;
            }
            w.content = None;
            w.token_estimate = 0;
            w.priority = 0;
            cleared += 1;
        }
        if cleared > 0 {
            debug!(
                "rebalance cleared {cleared} window(s); {} of {} tokens in use",
                self.total_tokens(),
                self.max_tokens(),
            );
        }
    }

    /// Immutable snapshot for relevance lookup during a step.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            windows: self.windows.clone(),
        }
    }

    /// Store state plus the caller-supplied average step duration.
    pub fn report(&self, avg_step_duration_ms: f64) -> ContextReport {
        ContextReport {
            active_windows: self
                .windows
                .iter()
                .filter(|w| w.content.is_some())
                .cloned()
                .collect(),
            total_tokens: self.total_tokens(),
            max_tokens: self.max_tokens(),
            avg_step_duration_ms,
        }
    }
}

/// Point-in-time view of the window set, safe to hold across a suspension
/// point.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    windows: Vec<ContextWindow>,
}

impl ContextSnapshot {
    /// The top 3 non-empty windows for a query.
    ///
    /// The query is tokenized into lowercase words; each window is scored by
    /// how many distinct query words appear in its serialized content, then
    /// ranked `(match_count desc, priority desc, timestamp desc)`.
    pub fn relevant_to(&self, query: &str) -> Vec<&ContextWindow> {
        let words: Vec<String> = tokenize(query);
        let mut scored: Vec<(usize, &ContextWindow)> = self
            .windows
            .iter()
            .filter(|w| w.content.is_some())
            .map(|w| {
                let serialized = w
                    .content
                    .as_ref()
                    .map(|c| c.to_string().to_lowercase())
                    .unwrap_or_default();
                let matches = words.iter().filter(|word| serialized.contains(word.as_str())).count();
                (matches, w)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.priority.cmp(&a.1.priority))
                .then(b.1.timestamp_ms.cmp(&a.1.timestamp_ms))
        });
        scored.into_iter().take(RELEVANT_LIMIT).map(|(_, w)| w).collect()
    }
}

/// `ceil(serialized_len / 4)`. See [`CHARS_PER_TOKEN`].
pub(crate) fn estimate_tokens(content: &Value) -> usize {
    content.to_string().len().div_ceil(CHARS_PER_TOKEN)
}

/// Keep only allow-listed fields of an oversized object. Non-object content
/// has no fields to retain and is stored unchanged.
fn compress(content: Value) -> Value {
    match content {
        Value::Object(map) => {
            let retained: serde_json::Map<String, Value> = map
                .into_iter()
                .filter(|(k, _)| COMPRESSION_ALLOW_LIST.contains(&k.as_str()))
                .collect();
            Value::Object(retained)
        }
        other => other,
    }
}

/// Lowercase alphanumeric word tokens, deduplicated.
fn tokenize(text: &str) -> Vec<String> {
    let mut words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    words.sort();
    words.dedup();
    words
}
