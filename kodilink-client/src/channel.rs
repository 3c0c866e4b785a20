//! Listener channels and fan-out registry
//!
//! The host framework registers one callback per item it wants updated;
//! callbacks are grouped under a fixed set of logical channel names. The
//! registry is populated once during item registration and is read-only
//! during dispatch, so fan-out is a plain iteration.
//!
//! # Caller Tag
//!
//! Every callback receives the value together with [`SOURCE_TAG`], the
//! engine's own caller tag. An update that originates from this engine's
//! reply handling must never be re-sent back out; the host checks the
//! tag to break that loop (see `KodiEngine::update_item`).
//!
//! # Blocking
//!
//! Listeners run synchronously on the inbound-data path, inside the same
//! critical section that drives retries. They must not block for any
//! significant time.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Caller tag attached to every listener notification from this engine
pub const SOURCE_TAG: &str = "kodi";

/// Listener callback: `(value, caller_tag)`
pub type Listener = Arc<dyn Fn(&Value, &str) + Send + Sync>;

/// The fixed set of logical channels
///
/// Read channels (`Volume` through `Player`) receive values decoded from
/// device replies and pushes. The remaining channels are the writable
/// command kinds a host item can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Volume,
    Mute,
    Title,
    Media,
    State,
    Favourites,
    Player,
    Input,
    OnOff,
    Home,
    Macro,
    AudioStream,
    Subtitle,
    Seek,
    Speed,
}

impl Channel {
    /// Every channel, for registry pre-population and iteration.
    pub const ALL: [Channel; 15] = [
        Channel::Volume,
        Channel::Mute,
        Channel::Title,
        Channel::Media,
        Channel::State,
        Channel::Favourites,
        Channel::Player,
        Channel::Input,
        Channel::OnOff,
        Channel::Home,
        Channel::Macro,
        Channel::AudioStream,
        Channel::Subtitle,
        Channel::Seek,
        Channel::Speed,
    ];

    /// Canonical channel name as used by host item configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Volume => "volume",
            Channel::Mute => "mute",
            Channel::Title => "title",
            Channel::Media => "media",
            Channel::State => "state",
            Channel::Favourites => "favourites",
            Channel::Player => "player",
            Channel::Input => "input",
            Channel::OnOff => "on_off",
            Channel::Home => "home",
            Channel::Macro => "macro",
            Channel::AudioStream => "audiostream",
            Channel::Subtitle => "subtitle",
            Channel::Seek => "seek",
            Channel::Speed => "speed",
        }
    }

    /// Look up a channel by its configuration name
    ///
    /// Returns `None` for unknown names; callers log and skip rather
    /// than error, for forward compatibility with host configs.
    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    /// Whether host items may write to this channel.
    pub fn is_writable(&self) -> bool {
        !matches!(
            self,
            Channel::Title | Channel::Media | Channel::State | Channel::Favourites
        )
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry mapping channels to ordered listener lists
#[derive(Clone)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<HashMap<Channel, Vec<Listener>>>>,
}

impl ListenerRegistry {
    /// Create a registry with an empty listener list per channel.
    pub fn new() -> Self {
        let mut map = HashMap::new();
        for channel in Channel::ALL {
            map.insert(channel, Vec::new());
        }
        Self {
            listeners: Arc::new(Mutex::new(map)),
        }
    }

    /// Append a listener to a channel.
    pub fn register(&self, channel: Channel, listener: Listener) {
        tracing::debug!(channel = %channel, "registering listener");
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .entry(channel)
            .or_default()
            .push(listener);
    }

    /// Append a listener under a channel name from host configuration
    ///
    /// Unknown names are logged at warn level and skipped, never an error.
    pub fn register_named(&self, name: &str, listener: Listener) {
        match Channel::from_name(name) {
            Some(channel) => self.register(channel, listener),
            None => tracing::warn!(channel = name, "unknown channel name, skipping listener"),
        }
    }

    /// Fan a value out to every listener of a channel
    ///
    /// Invoked synchronously from the inbound-data path with the engine's
    /// own caller tag.
    pub fn notify(&self, channel: Channel, value: &Value) {
        let callbacks: Vec<Listener> = {
            let map = self.listeners.lock().expect("listener registry poisoned");
            map.get(&channel).cloned().unwrap_or_default()
        };
        if !callbacks.is_empty() {
            tracing::debug!(channel = %channel, count = callbacks.len(), "notifying listeners");
        }
        for callback in callbacks {
            callback(value, SOURCE_TAG);
        }
    }

    /// Number of listeners registered for a channel.
    pub fn listener_count(&self, channel: Channel) -> usize {
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .get(&channel)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
