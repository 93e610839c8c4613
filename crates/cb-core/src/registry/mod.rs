//! Channel registry: the in-memory working copy of all watched channels,
//! written through to a [`ChannelStore`] on every mutation.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{domain::Channel, errors::Error, ports::ChannelStore, Result};

/// Owner of every [`Channel`] record.
///
/// Callers only ever get clones; changes go back through [`Registry::append`]
/// or [`Registry::update`]. One lock serializes all writes, and the store is
/// written before the working copy changes, so a failed save leaves both as
/// they were.
pub struct Registry {
    store: Arc<dyn ChannelStore>,
    channels: Mutex<Vec<Channel>>,
}

impl Registry {
    /// Load the current channel list from `store`.
    pub fn open(store: Arc<dyn ChannelStore>) -> Result<Self> {
        let channels = store.load()?;
        Ok(Self {
            store,
            channels: Mutex::new(channels),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Channel>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn list(&self) -> Vec<Channel> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Channel> {
        self.lock()
            .get(index)
            .cloned()
            .ok_or(Error::UnknownChannel(index))
    }

    /// Store a new channel and return its index.
    ///
    /// No uniqueness check happens here; the dispatcher owns that policy.
    pub fn append(&self, channel: Channel) -> Result<usize> {
        let mut channels = self.lock();
        let mut next = channels.clone();
        next.push(channel);
        self.store.save(&next)?;
        *channels = next;
        Ok(channels.len() - 1)
    }

    /// Replace the channel at `index`.
    ///
    /// `channel_id`, `destination` and `feed_cursor` identify the row and must
    /// not change.
    pub fn update(&self, index: usize, channel: Channel) -> Result<()> {
        let mut channels = self.lock();
        let current = channels.get(index).ok_or(Error::UnknownChannel(index))?;
        if current.channel_id != channel.channel_id
            || current.destination != channel.destination
            || current.feed_cursor != channel.feed_cursor
        {
            return Err(Error::ChannelMismatch {
                index,
                expected: format!("{} -> /r/{}", current.channel_id, current.destination),
                actual: format!("{} -> /r/{}", channel.channel_id, channel.destination),
            });
        }

        let mut next = channels.clone();
        next[index] = channel;
        self.store.save(&next)?;
        *channels = next;
        Ok(())
    }
}
