//! Per-conversation input drafts.
//!
//! Incidental UI convenience: the text a user typed but did not send yet,
//! keyed by conversation and evicted on a successful send. Not part of any
//! delivery guarantee.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct DraftCache {
    drafts: Mutex<HashMap<String, String>>,
}

impl DraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the current draft. An empty draft removes the entry.
    pub fn set(&self, conversation_id: &str, text: &str) {
        let mut drafts = self.drafts.lock().unwrap();
        if text.is_empty() {
            drafts.remove(conversation_id);
        } else {
            drafts.insert(conversation_id.to_string(), text.to_string());
        }
    }

    pub fn get(&self, conversation_id: &str) -> Option<String> {
        self.drafts.lock().unwrap().get(conversation_id).cloned()
    }

    pub fn clear(&self, conversation_id: &str) {
        self.drafts.lock().unwrap().remove(conversation_id);
    }
}
