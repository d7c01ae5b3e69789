//! Channels and their message stores
//!
//! A channel exclusively owns its message store and message-id counter; all
//! mutation happens under that channel's own lock, never a server-wide one.
//! The channel table itself is built once at startup and read-only after
//! that, so lookups take no lock at all.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use etcord_protocol::{ChannelInfo, ChannelType, ChatMessage};

use crate::config::ChannelConfig;

/// A named message topic with its own ordered message sequence
pub struct Channel {
    id: u16,
    parent_id: u16,
    name: String,
    kind: ChannelType,
    store: Mutex<ChannelStore>,
}

/// Mutable channel state, guarded by the channel's lock
struct ChannelStore {
    /// Strictly increases by 1 per accepted message; ids are a dense,
    /// gap-free sequence within the channel's lifetime
    last_message_id: u16,
    messages: BTreeMap<u16, ChatMessage>,
}

impl Channel {
    pub fn new(id: u16, parent_id: u16, name: impl Into<String>, kind: ChannelType) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            kind,
            store: Mutex::new(ChannelStore {
                last_message_id: 0,
                messages: BTreeMap::new(),
            }),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn kind(&self) -> ChannelType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> ChannelInfo {
        ChannelInfo {
            id: self.id,
            parent_id: self.parent_id,
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    /// Accept a message into this channel, assigning the next message id
    ///
    /// The critical section covers exactly the counter increment and the
    /// store insert; callers broadcast the result after the lock is gone.
    pub fn append(
        &self,
        sender_id: u16,
        sender_name: &str,
        content: &str,
    ) -> ChatMessage {
        let mut store = self.store.lock();
        store.last_message_id = store.last_message_id.wrapping_add(1);
        let message = ChatMessage {
            message_id: store.last_message_id,
            sender_id,
            sender_name: sender_name.to_string(),
            content: content.to_string(),
        };
        store.messages.insert(message.message_id, message.clone());
        message
    }

    /// Stored messages with id greater than `offset_id`, in id order
    ///
    /// Returns at most `count` messages; a count of 0 means no limit.
    pub fn history(&self, count: u16, offset_id: u16) -> Vec<ChatMessage> {
        let store = self.store.lock();
        let iter = store
            .messages
            .range(offset_id.saturating_add(1)..)
            .map(|(_, m)| m.clone());
        if count == 0 {
            iter.collect()
        } else {
            iter.take(count as usize).collect()
        }
    }

    pub fn message_count(&self) -> usize {
        self.store.lock().messages.len()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("message_count", &self.message_count())
            .finish()
    }
}

/// The channel table, immutable after startup
#[derive(Debug, Default)]
pub struct ChannelMap {
    channels: HashMap<u16, Arc<Channel>>,
}

impl ChannelMap {
    /// Build the table from configuration
    pub fn from_config(configs: &[ChannelConfig]) -> Self {
        let channels = configs
            .iter()
            .map(|c| {
                (
                    c.id,
                    Arc::new(Channel::new(c.id, c.parent_id, c.name.clone(), c.kind.into())),
                )
            })
            .collect();
        Self { channels }
    }

    /// Look up a channel by id; no lock, the table never changes
    pub fn get(&self, id: u16) -> Option<&Arc<Channel>> {
        self.channels.get(&id)
    }

    /// All channel infos, in id order
    pub fn infos(&self) -> Vec<ChannelInfo> {
        let mut infos: Vec<ChannelInfo> = self.channels.values().map(|c| c.info()).collect();
        infos.sort_by_key(|c| c.id);
        infos
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_channel() -> Channel {
        Channel::new(1, 0, "general", ChannelType::Text)
    }

    #[test]
    fn test_append_assigns_dense_ids() {
        let channel = text_channel();

        let first = channel.append(1, "ada", "hello");
        let second = channel.append(2, "grace", "hi");

        assert_eq!(first.message_id, 1);
        assert_eq!(second.message_id, 2);
        assert_eq!(channel.message_count(), 2);
    }

    #[test]
    fn test_concurrent_appends_no_gaps_no_duplicates() {
        let channel = Arc::new(text_channel());
        let n = 64;

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let channel = Arc::clone(&channel);
                std::thread::spawn(move || {
                    channel.append(i, "ada", "msg").message_id
                })
            })
            .collect();

        let mut ids: Vec<u16> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();

        let expected: Vec<u16> = (1..=n).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_history_offset_and_count() {
        let channel = text_channel();
        for i in 0..5 {
            channel.append(1, "ada", &format!("m{}", i));
        }

        let all = channel.history(0, 0);
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].message_id, 1);
        assert_eq!(all[4].message_id, 5);

        let after_two = channel.history(0, 2);
        assert_eq!(after_two.len(), 3);
        assert_eq!(after_two[0].message_id, 3);

        let limited = channel.history(2, 0);
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].message_id, 2);
    }

    #[test]
    fn test_history_past_end() {
        let channel = text_channel();
        channel.append(1, "ada", "only");
        assert!(channel.history(10, 1).is_empty());
        assert!(channel.history(10, 65535).is_empty());
    }

    #[test]
    fn test_channel_map_from_config() {
        use crate::config::{ChannelConfig, ChannelKind};

        let map = ChannelMap::from_config(&[
            ChannelConfig {
                id: 1,
                parent_id: 0,
                name: "general".into(),
                kind: ChannelKind::Text,
            },
            ChannelConfig {
                id: 2,
                parent_id: 0,
                name: "voice".into(),
                kind: ChannelKind::Voice,
            },
        ]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(1).unwrap().kind(), ChannelType::Text);
        assert_eq!(map.get(2).unwrap().kind(), ChannelType::Voice);
        assert!(map.get(3).is_none());

        let infos = map.infos();
        assert_eq!(infos[0].id, 1);
        assert_eq!(infos[1].id, 2);
    }
}
