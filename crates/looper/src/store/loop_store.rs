use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::LoopConfig;
use crate::region::LoopRegion;

use super::kv::KeyValueStore;

/// The durable record of one video's loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLoopState {
    /// Carried in the key, not the value.
    #[serde(skip)]
    pub video_id: String,
    pub start: f64,
    pub end: f64,
    pub enabled: bool,
    /// Milliseconds since the Unix epoch.
    pub saved_at: u64,
}

impl PersistedLoopState {
    fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.end >= 0.0
    }
}

/// Best-effort persistence: nothing here ever fails the caller.
pub struct LoopStore {
    backend: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    namespace: String,
    ttl_ms: u64,
}

impl LoopStore {
    pub fn new(backend: Box<dyn KeyValueStore>, clock: Box<dyn Clock>, config: &LoopConfig) -> Self {
        Self {
            backend,
            clock,
            namespace: config.namespace.clone(),
            ttl_ms: config.ttl_ms(),
        }
    }

    pub fn key(&self, video_id: &str) -> String {
        format!("{}-{}", self.namespace, video_id)
    }

    fn prefix(&self) -> String {
        format!("{}-", self.namespace)
    }

    fn expired(&self, saved_at: u64, now: u64) -> bool {
        now.saturating_sub(saved_at) > self.ttl_ms
    }

    fn parse(raw: &str) -> Option<PersistedLoopState> {
        serde_json::from_str::<PersistedLoopState>(raw)
            .ok()
            .filter(PersistedLoopState::is_well_formed)
    }

    /// Overwrite the record for `video_id` with a fresh timestamp.
    pub fn save(&mut self, video_id: &str, region: &LoopRegion) {
        let key = self.key(video_id);
        let record = PersistedLoopState {
            video_id: video_id.to_string(),
            start: region.start(),
            end: region.end(),
            enabled: region.enabled(),
            saved_at: self.clock.now_ms(),
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!(video_id, error = %e, "cannot encode loop state");
                return;
            }
        };
        match self.backend.set(&key, &json) {
            Ok(()) => debug!(
                video_id,
                start = record.start,
                end = record.end,
                enabled = record.enabled,
                "saved loop state"
            ),
            Err(e) => warn!(video_id, error = %e, "loop state not saved"),
        }
    }

    /// The record for `video_id`, or `None` if absent, expired or
    /// unparsable. Expired and unparsable records are deleted.
    pub fn load(&mut self, video_id: &str) -> Option<PersistedLoopState> {
        let key = self.key(video_id);
        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(video_id, error = %e, "cannot read loop state");
                return None;
            }
        };

        let Some(mut record) = Self::parse(&raw) else {
            warn!(video_id, "discarding unparsable loop state");
            self.remove_quietly(&key);
            return None;
        };
        if self.expired(record.saved_at, self.clock.now_ms()) {
            debug!(video_id, saved_at = record.saved_at, "discarding expired loop state");
            self.remove_quietly(&key);
            return None;
        }
        record.video_id = video_id.to_string();
        Some(record)
    }

    /// Delete every expired or unparsable record in the namespace.
    /// Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cannot list stored keys");
                return 0;
            }
        };
        let prefix = self.prefix();
        let now = self.clock.now_ms();

        let doomed: Vec<String> = keys
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .filter(|key| match self.backend.get(key) {
                Ok(Some(raw)) => match Self::parse(&raw) {
                    Some(record) => self.expired(record.saved_at, now),
                    None => true,
                },
                Ok(None) => false,
                Err(_) => false,
            })
            .collect();

        for key in &doomed {
            self.remove_quietly(key);
        }
        if !doomed.is_empty() {
            info!(removed = doomed.len(), "swept stale loop states");
        }
        doomed.len()
    }

    fn remove_quietly(&mut self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            warn!(key, error = %e, "cannot remove loop state");
        }
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::ManualClock;

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn store_with(backend: MemoryStore) -> (LoopStore, ManualClock) {
        let clock = ManualClock::new(100 * DAY_MS);
        let store = LoopStore::new(
            Box::new(backend),
            Box::new(clock.clone()),
            &LoopConfig::default(),
        );
        (store, clock)
    }

    #[test]
    fn save_then_load_within_ttl() {
        let (mut store, clock) = store_with(MemoryStore::new());
        let region = LoopRegion::restored(30.0, 45.0, true, 120.0);
        store.save("abc12345678", &region);

        clock.advance(6 * DAY_MS);
        let loaded = store.load("abc12345678").expect("record");
        assert_eq!(loaded.video_id, "abc12345678");
        assert_eq!((loaded.start, loaded.end, loaded.enabled), (30.0, 45.0, true));
    }

    #[test]
    fn expired_record_is_removed_on_load() {
        let (mut store, clock) = store_with(MemoryStore::new());
        store.save("abc12345678", &LoopRegion::full(120.0));

        clock.advance(7 * DAY_MS + 1);
        assert_eq!(store.load("abc12345678"), None);
        assert_eq!(store.backend().get("yt-rapper-loop-abc12345678").unwrap(), None);
    }

    #[test]
    fn record_format_uses_camel_case() {
        let (mut store, _clock) = store_with(MemoryStore::new());
        store.save("abc12345678", &LoopRegion::restored(1.5, 9.0, false, 120.0));
        let raw = store
            .backend()
            .get("yt-rapper-loop-abc12345678")
            .unwrap()
            .expect("stored");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["start"], 1.5);
        assert_eq!(value["end"], 9.0);
        assert_eq!(value["enabled"], false);
        assert_eq!(value["savedAt"], 100 * DAY_MS);
        assert!(value.get("videoId").is_none());
    }

    #[test]
    fn unparsable_record_is_removed_on_load() {
        let mut backend = MemoryStore::new();
        backend.set("yt-rapper-loop-abc12345678", "{broken").unwrap();
        let (mut store, _clock) = store_with(backend);
        assert_eq!(store.load("abc12345678"), None);
        assert!(store.backend().keys().unwrap().is_empty());
    }

    #[test]
    fn quota_failure_is_swallowed() {
        let (mut store, _clock) = store_with(MemoryStore::with_quota(8));
        store.save("abc12345678", &LoopRegion::full(120.0));
        assert_eq!(store.load("abc12345678"), None);
    }

    #[test]
    fn sweep_only_touches_stale_namespace_keys() {
        let (mut store, clock) = store_with(MemoryStore::new());
        store.save("old00000000", &LoopRegion::full(60.0));
        clock.advance(8 * DAY_MS);
        store.save("new00000000", &LoopRegion::full(60.0));

        let mut raw = MemoryStore::new();
        for key in store.backend().keys().unwrap() {
            raw.set(&key, &store.backend().get(&key).unwrap().unwrap()).unwrap();
        }
        raw.set("yt-rapper-loop-garbage0000", "nope").unwrap();
        raw.set("unrelated-key", "nope").unwrap();

        let mut store = LoopStore::new(
            Box::new(raw),
            Box::new(clock.clone()),
            &LoopConfig::default(),
        );
        assert_eq!(store.sweep(), 2);
        assert_eq!(
            store.backend().keys().unwrap(),
            vec![
                "unrelated-key".to_string(),
                "yt-rapper-loop-new00000000".to_string()
            ]
        );
    }
}
