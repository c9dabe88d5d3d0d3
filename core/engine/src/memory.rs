use chrono::Utc;
use querybot_schemas::{
    MatchedCondition, MatchedIntent, MatchedResource, ResourceSource, SessionId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// What the previous resource-bearing turn of one conversation was about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub last_resources: Vec<MatchedResource>,
    pub last_conditions: Vec<MatchedCondition>,
    pub last_intents: Vec<String>,
    pub updated_at: Option<String>, // RFC3339
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every slot with this turn's matches
    pub fn remember(
        &mut self,
        resources: &[MatchedResource],
        conditions: &[MatchedCondition],
        intents: &[MatchedIntent],
    ) {
        self.last_resources = resources.to_vec();
        self.last_conditions = conditions.to_vec();
        self.last_intents = intents.iter().map(|i| i.name.clone()).collect();
        self.updated_at = Some(Utc::now().to_rfc3339());

        debug!(
            "Remembered resources: {:?}",
            self.last_resources.iter().map(|r| &r.name).collect::<Vec<_>>()
        );
    }

    /// The remembered primary resource, tagged as coming from memory.
    ///
    /// Its qualifier belonged to the earlier question and is dropped, so a
    /// follow-up can never be answered about an entity it did not name.
    pub fn recall(&self) -> Option<MatchedResource> {
        let mut resource = self.last_resources.first()?.clone();
        resource.source = ResourceSource::FromMemory;
        resource.qualifier = None;
        Some(resource)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.last_resources.is_empty()
    }
}

pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// One memory per conversation.
///
/// Only conversations with something remembered are kept. Past
/// `max_sessions`, the least recently updated conversation is dropped.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<SessionId, ConversationMemory>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions: max_sessions.max(1),
        }
    }

    /// A copy of the conversation's memory, empty if it was never stored
    pub fn checkout(&self, id: &SessionId) -> ConversationMemory {
        self.sessions.get(id).cloned().unwrap_or_default()
    }

    /// Save a conversation's memory after a turn
    pub fn store(&mut self, id: &SessionId, memory: ConversationMemory) {
        if let Some(existing) = self.sessions.get_mut(id) {
            *existing = memory;
            return;
        }
        if memory.is_empty() {
            return;
        }

        if self.sessions.len() >= self.max_sessions {
            self.evict_stalest();
        }
        info!("New conversation: {}", id);
        self.sessions.insert(id.clone(), memory);
    }

    fn evict_stalest(&mut self) {
        // RFC3339 UTC timestamps order lexically
        let stalest = self
            .sessions
            .iter()
            .min_by(|a, b| a.1.updated_at.cmp(&b.1.updated_at))
            .map(|(id, _)| id.clone());

        if let Some(id) = stalest {
            debug!("Evicting conversation {}", id);
            self.sessions.remove(&id);
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<&ConversationMemory> {
        self.sessions.get(id)
    }

    /// Forget a conversation; false if it was never seen
    pub fn clear(&mut self, id: &SessionId) -> bool {
        match self.sessions.get_mut(id) {
            Some(memory) => {
                memory.clear();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
