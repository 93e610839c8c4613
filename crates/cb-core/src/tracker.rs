use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use crate::domain::MessageId;

/// Ids of inbox messages already admitted into the pipeline.
///
/// Append-only for the life of the process. The inbox marks a message before
/// processing it, so a redelivered id is a no-op even if the first attempt
/// never got to mark it read.
#[derive(Debug, Default)]
pub struct HandledMessages {
    ids: Mutex<HashSet<MessageId>>,
}

impl HandledMessages {
    fn lock(&self) -> MutexGuard<'_, HashSet<MessageId>> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn seen(&self, id: &MessageId) -> bool {
        self.lock().contains(id)
    }

    pub fn mark(&self, id: &MessageId) {
        self.lock().insert(id.clone());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
