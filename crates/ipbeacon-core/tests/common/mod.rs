//! Test doubles and common utilities for ipbeacon contract tests
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use ipbeacon_core::error::{Error, Result};
use ipbeacon_core::traits::{ChannelMessage, ChatChannel, IpSource};
use ipbeacon_core::{Poller, PollerConfig, PollerEvent};
use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Channel every test targets
pub const CHANNEL_ID: &str = "123456789012345678";

/// Parse an IP literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// An IpSource that replays a script of results
///
/// The last entry repeats forever once the script is exhausted.
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<std::result::Result<IpAddr, String>>>>,
    fetch_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(script: Vec<std::result::Result<IpAddr, String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that always reports `ip`
    pub fn fixed(ip: IpAddr) -> Self {
        Self::new(vec![Ok(ip)])
    }

    /// Append entries to the script
    pub fn push(&self, entry: std::result::Result<IpAddr, String>) {
        self.script.lock().unwrap().push_back(entry);
    }

    /// Get the number of times fetch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpSource for ScriptedIpSource {
    async fn fetch(&self) -> Result<IpAddr> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let mut script = self.script.lock().unwrap();
        let entry = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        match entry {
            Some(Ok(ip)) => Ok(ip),
            Some(Err(msg)) => Err(Error::network(msg)),
            None => Err(Error::network("script is empty")),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Chat operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Close,
    PinnedMessages,
    Send,
    Edit,
    Pin,
}

/// A recorded ChatChannel call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    PinnedMessages,
    Send { content: String },
    Edit { message_id: String, content: String },
    Pin { message_id: String },
}

#[derive(Default)]
struct ChannelState {
    messages: Vec<ChannelMessage>,
    pinned: Vec<String>,
    calls: Vec<ChannelCall>,
    failing: HashSet<Operation>,
    next_id: u64,
    open: bool,
}

impl ChannelState {
    fn insert(&mut self, content: &str) -> ChannelMessage {
        self.next_id += 1;
        let message = ChannelMessage::new(format!("m{}", self.next_id), content);
        self.messages.push(message.clone());
        message
    }

    fn check(&self, op: Operation, channel_id: &str) -> Result<()> {
        if channel_id != CHANNEL_ID {
            return Err(Error::platform("memory", format!("Unknown channel: {}", channel_id)));
        }
        if self.failing.contains(&op) {
            return Err(Error::platform("memory", format!("{:?} unavailable", op)));
        }
        Ok(())
    }
}

/// An in-memory chat channel that records every call
pub struct RecordingChannel {
    state: Mutex<ChannelState>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState::default()),
        }
    }

    /// Add a pinned message without recording a call
    pub fn seed_pinned(&self, content: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let message = state.insert(content);
        state.pinned.push(message.id.clone());
        message.id
    }

    /// Add an unpinned message without recording a call
    pub fn seed_message(&self, content: &str) -> String {
        self.state.lock().unwrap().insert(content).id
    }

    /// Make `op` fail until [`RecordingChannel::recover`] is called
    pub fn fail(&self, op: Operation) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Current pinned messages in pin order
    pub fn pinned(&self) -> Vec<ChannelMessage> {
        let state = self.state.lock().unwrap();
        state
            .pinned
            .iter()
            .filter_map(|id| state.messages.iter().find(|m| &m.id == id).cloned())
            .collect()
    }

    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn message(&self, id: &str) -> Option<ChannelMessage> {
        self.messages().into_iter().find(|m| m.id == id)
    }

    /// Sent messages whose content starts with `prefix`
    pub fn sent_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChannelCall::Send { content } if content.starts_with(prefix) => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}

#[async_trait]
impl ChatChannel for RecordingChannel {
    async fn open(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(&Operation::Open) {
            return Err(Error::connection("open refused"));
        }
        state.open = true;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(&Operation::Close) {
            return Err(Error::connection("close refused"));
        }
        state.open = false;
        Ok(())
    }

    async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<ChannelMessage>> {
        {
            let mut state = self.state.lock().unwrap();
            state.check(Operation::PinnedMessages, channel_id)?;
            state.calls.push(ChannelCall::PinnedMessages);
        }
        Ok(self.pinned())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<ChannelMessage> {
        let mut state = self.state.lock().unwrap();
        state.check(Operation::Send, channel_id)?;
        state.calls.push(ChannelCall::Send {
            content: content.to_string(),
        });
        Ok(state.insert(content))
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<ChannelMessage> {
        let mut state = self.state.lock().unwrap();
        state.check(Operation::Edit, channel_id)?;
        state.calls.push(ChannelCall::Edit {
            message_id: message_id.to_string(),
            content: content.to_string(),
        });

        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| Error::platform("memory", format!("Unknown message: {}", message_id)))?;
        message.content = content.to_string();
        Ok(message.clone())
    }

    async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check(Operation::Pin, channel_id)?;
        state.calls.push(ChannelCall::Pin {
            message_id: message_id.to_string(),
        });
        if !state.pinned.iter().any(|id| id == message_id) {
            state.pinned.push(message_id.to_string());
        }
        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "memory"
    }
}

/// Helper to create a PollerConfig for testing
pub fn test_config() -> PollerConfig {
    PollerConfig::new(CHANNEL_ID).with_interval(Duration::from_millis(10))
}

/// Helper to create a poller over the given doubles
pub fn test_poller(
    source: &ScriptedIpSource,
    channel: &Arc<RecordingChannel>,
) -> (Poller, mpsc::Receiver<PollerEvent>) {
    Poller::new(
        Box::new(source.clone()),
        channel.clone() as Arc<dyn ChatChannel>,
        test_config(),
    )
    .expect("poller construction succeeds")
}

/// Drain all events currently buffered
pub fn drain_events(rx: &mut mpsc::Receiver<PollerEvent>) -> Vec<PollerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
