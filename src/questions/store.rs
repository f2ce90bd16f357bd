//! Bounded, insertion-ordered, in-memory store of pending questions.

use std::collections::VecDeque;

use tokio::sync::RwLock;
use tracing::debug;

use super::model::Question;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 100;

/// Bounded FIFO of unanswered questions, looked up by source message id.
///
/// Nothing is persisted. A question leaves the store only when a newer one
/// pushes it out; answering it does not remove it.
pub struct PendingQuestionStore {
    questions: RwLock<VecDeque<Question>>,
    capacity: usize,
}

impl PendingQuestionStore {
    /// Create a store holding at most `capacity` questions (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            questions: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a question, evicting the oldest one when full.
    ///
    /// Returns the evicted question, if any.
    pub async fn insert(&self, question: Question) -> Option<Question> {
        let mut questions = self.questions.write().await;

        let evicted = if questions.len() >= self.capacity {
            questions.pop_front()
        } else {
            None
        };

        if let Some(ref old) = evicted {
            debug!(
                message_id = old.source_message_id,
                chat_id = old.origin_chat_id,
                "Evicted oldest question"
            );
        }

        questions.push_back(question);
        evicted
    }

    /// First question (oldest to newest) whose source message id is `id`.
    pub async fn find_by_message_id(&self, id: i64) -> Option<Question> {
        let questions = self.questions.read().await;
        questions
            .iter()
            .find(|q| q.source_message_id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.questions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.questions.read().await.is_empty()
    }

    /// Copy of the held questions, oldest first.
    pub async fn snapshot(&self) -> Vec<Question> {
        self.questions.read().await.iter().cloned().collect()
    }
}

impl Default for PendingQuestionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
