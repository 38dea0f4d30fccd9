//! Process-wide cache of encoded reference prompts.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};

use voxgate_core::{PromptReference, ReferenceAudio};

/// Default number of cached prompts.
pub const DEFAULT_PROMPT_CACHE_CAPACITY: usize = 64;

/// Content fingerprint of one reference sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(reference: &ReferenceAudio) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((reference.audio.len() as u64).to_le_bytes());
        hasher.update(&reference.audio);
        hasher.update(reference.text.as_bytes());
        Self(hasher.finalize().into())
    }
}

#[derive(Default)]
struct Entries {
    map: HashMap<Fingerprint, Arc<PromptReference>>,
    order: VecDeque<Fingerprint>,
}

/// Bounded FIFO cache of encoded prompts keyed by content fingerprint.
///
/// Identical samples submitted inline or from the store hit the same entry.
pub struct PromptCache {
    entries: Mutex<Entries>,
    capacity: usize,
}

impl PromptCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &Fingerprint) -> Option<Arc<PromptReference>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.map.get(key).cloned()
    }

    pub fn insert(&self, key: Fingerprint, prompt: Arc<PromptReference>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.map.insert(key, prompt).is_none() {
            entries.order.push_back(key);
        }
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.map.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.map.clear();
        entries.order.clear();
    }
}

impl Default for PromptCache {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_CACHE_CAPACITY)
    }
}
