//! Durable, append-only token accounting with multi-process safety: a
//! `persisted_count` high-water mark tracks how many records this
//! process has already flushed, so a concurrent writer's appended
//! records survive a read-merge-rewrite rather than being clobbered.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

use codeforge_artifact::AgentKind;
use codeforge_utils::atomic_write::write_file_atomic;
use codeforge_utils::types::now_iso8601;
use codeforge_utils::CodeforgeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    pub agent: String,
    pub tokens: u64,
    pub timestamp: String,
    pub iteration: Option<u32>,
    pub metadata: Value,
}

/// `track`'s `tokens_used` argument accepts either a bare count or a
/// provider usage object carrying `total_tokens`, matching the
/// original's `isinstance(tokens_used, dict)` branch.
#[derive(Debug, Clone)]
pub enum TokensInput {
    Count(u64),
    Detailed(serde_json::Map<String, Value>),
}

impl From<u64> for TokensInput {
    fn from(value: u64) -> Self {
        TokensInput::Count(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedPayload {
    #[serde(default)]
    total_tokens: u64,
    #[serde(default)]
    usage_log: Vec<UsageEntry>,
    #[serde(default)]
    last_updated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub enabled: bool,
    pub total_tokens: u64,
    pub call_count: usize,
    pub agent_breakdown: BTreeMap<String, u64>,
    pub agent_calls: BTreeMap<String, u64>,
    pub debugger_iterations: BTreeMap<u32, u64>,
    pub last_event: Option<UsageEntry>,
    pub log_file: String,
}

struct TrackerState {
    total_tokens: u64,
    usage_log: Vec<UsageEntry>,
    persisted_count: usize,
}

pub struct UsageTracker {
    enabled: bool,
    persist_path: PathBuf,
    state: Mutex<TrackerState>,
}

impl UsageTracker {
    pub fn new(enabled: bool, persist_path: PathBuf) -> Self {
        UsageTracker {
            enabled,
            persist_path,
            state: Mutex::new(TrackerState {
                total_tokens: 0,
                usage_log: Vec::new(),
                persisted_count: 0,
            }),
        }
    }

    /// `track(agent, tokens, iteration?, metadata?)`. Returns `None`
    /// when tracking is disabled, rather than recording a no-op entry.
    pub fn track(
        &self,
        agent: AgentKind,
        tokens: TokensInput,
        iteration: Option<u32>,
        metadata: Option<Value>,
    ) -> Result<Option<UsageEntry>, CodeforgeError> {
        if !self.enabled {
            return Ok(None);
        }

        let (tokens_count, mut metadata) = match tokens {
            TokensInput::Count(n) => (n, metadata.unwrap_or(Value::Object(Default::default()))),
            TokensInput::Detailed(map) => {
                let total = map.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
                let meta = metadata.unwrap_or_else(|| Value::Object(map));
                (total, meta)
            }
        };

        if let Some(iter) = iteration {
            if let Value::Object(ref mut map) = metadata {
                map.insert("iteration".to_string(), Value::from(iter));
            }
        }

        let entry = UsageEntry {
            agent: agent.as_str().to_string(),
            tokens: tokens_count,
            timestamp: now_iso8601(),
            iteration,
            metadata,
        };

        let mut state = self.state.lock().expect("usage tracker mutex poisoned");
        state.total_tokens += entry.tokens;
        state.usage_log.push(entry.clone());
        self.persist_locked(&mut state)?;

        Ok(Some(entry))
    }

    /// Read-merge-rewrite: reload whatever is on disk, append only the
    /// entries this instance has not yet written (tracked by
    /// `persisted_count`), and rewrite the file. This is what makes
    /// concurrent multi-process writers accumulate instead of
    /// clobbering each other.
    fn persist_locked(&self, state: &mut TrackerState) -> Result<(), CodeforgeError> {
        let existing = self.read_existing();

        let new_entries = &state.usage_log[state.persisted_count..];
        let new_tokens: u64 = new_entries.iter().map(|e| e.tokens).sum();

        let merged_total = existing.total_tokens + new_tokens;
        let mut merged_log = existing.usage_log;
        merged_log.extend_from_slice(new_entries);

        let payload = PersistedPayload {
            total_tokens: merged_total,
            usage_log: merged_log,
            last_updated: now_iso8601(),
        };

        let json = serde_json::to_string_pretty(&payload)
            .map_err(|e| CodeforgeError::Validation(format!("failed to serialize usage log: {e}")))?;
        write_file_atomic(&self.persist_path, &json)?;

        state.persisted_count = state.usage_log.len();
        Ok(())
    }

    fn read_existing(&self) -> PersistedPayload {
        std::fs::read_to_string(&self.persist_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> UsageStats {
        let state = self.state.lock().expect("usage tracker mutex poisoned");
        let mut agent_breakdown: HashMap<String, u64> = HashMap::new();
        let mut agent_calls: HashMap<String, u64> = HashMap::new();
        let mut debugger_iterations: HashMap<u32, u64> = HashMap::new();

        for entry in &state.usage_log {
            *agent_breakdown.entry(entry.agent.clone()).or_insert(0) += entry.tokens;
            *agent_calls.entry(entry.agent.clone()).or_insert(0) += 1;
            if entry.agent == "debugger" {
                if let Some(iter) = entry.iteration {
                    *debugger_iterations.entry(iter).or_insert(0) += entry.tokens;
                }
            }
        }

        UsageStats {
            enabled: self.enabled,
            total_tokens: state.total_tokens,
            call_count: state.usage_log.len(),
            agent_breakdown: agent_breakdown.into_iter().collect(),
            agent_calls: agent_calls.into_iter().collect(),
            debugger_iterations: debugger_iterations.into_iter().collect(),
            last_event: state.usage_log.last().cloned(),
            log_file: self.persist_path.display().to_string(),
        }
    }

    pub fn reset(&self) -> Result<(), CodeforgeError> {
        let mut state = self.state.lock().expect("usage tracker mutex poisoned");
        state.total_tokens = 0;
        state.usage_log.clear();
        state.persisted_count = 0;
        if self.persist_path.exists() {
            std::fs::remove_file(&self.persist_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_tokens_equals_sum_of_entries() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = UsageTracker::new(true, dir.path().join("usage.json"));
        tracker.track(AgentKind::Architect, 100.into(), None, None).unwrap();
        tracker.track(AgentKind::Coder, 50.into(), None, None).unwrap();
        assert_eq!(tracker.stats().total_tokens, 150);
        assert_eq!(tracker.stats().call_count, 2);
    }

    #[test]
    fn disabled_tracker_returns_none_and_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        let tracker = UsageTracker::new(false, path.clone());
        let result = tracker.track(AgentKind::Architect, 10.into(), None, None).unwrap();
        assert!(result.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn debugger_entries_are_tagged_by_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = UsageTracker::new(true, dir.path().join("usage.json"));
        tracker.track(AgentKind::Debugger, 30.into(), Some(1), None).unwrap();
        tracker.track(AgentKind::Debugger, 40.into(), Some(2), None).unwrap();
        let stats = tracker.stats();
        assert_eq!(stats.debugger_iterations[&1], 30);
        assert_eq!(stats.debugger_iterations[&2], 40);
    }

    #[test]
    fn concurrent_instances_merge_rather_than_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");

        let tracker_a = UsageTracker::new(true, path.clone());
        tracker_a.track(AgentKind::Architect, 10.into(), None, None).unwrap();

        // A second "process" instance with its own persisted_count of 0
        // writes after A; the merge should preserve A's entry.
        let tracker_b = UsageTracker::new(true, path.clone());
        tracker_b.track(AgentKind::Coder, 20.into(), None, None).unwrap();

        let on_disk: PersistedPayload =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.total_tokens, 30);
        assert_eq!(on_disk.usage_log.len(), 2);
    }

    #[test]
    fn reset_clears_memory_and_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        let tracker = UsageTracker::new(true, path.clone());
        tracker.track(AgentKind::Tester, 5.into(), None, None).unwrap();
        tracker.reset().unwrap();
        assert!(!path.exists());
        assert_eq!(tracker.stats().total_tokens, 0);
    }

    #[test]
    fn detailed_tokens_extract_total_and_keep_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = UsageTracker::new(true, dir.path().join("usage.json"));
        let mut detailed = serde_json::Map::new();
        detailed.insert("total_tokens".to_string(), Value::from(77));
        detailed.insert("prompt_tokens".to_string(), Value::from(50));
        let entry = tracker
            .track(AgentKind::Coder, TokensInput::Detailed(detailed), None, None)
            .unwrap()
            .unwrap();
        assert_eq!(entry.tokens, 77);
        assert_eq!(entry.metadata["prompt_tokens"], 50);
    }
}
