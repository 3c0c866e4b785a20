//! Routing of unsolicited server pushes
//!
//! A push carries a `method` but no `id`; it announces a device-side
//! state change and never touches the pending queue. The known push
//! methods form a closed set, modeled as [`PushEvent`] with an explicit
//! `Unknown` fallthrough so new device firmware events degrade to a log
//! line instead of an error.

use crate::channel::{Channel, ListenerRegistry};
use crate::queue::CommandQueue;
use kodilink_core::{RpcPush, RpcRequest};
use serde_json::{json, Value};

/// Classified server push
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// `Player.OnPause`
    PlayerPaused,
    /// `Player.OnStop`
    PlayerStopped,
    /// `GUI.OnScreensaverActivated`
    ScreensaverActivated,
    /// `Player.OnPlay` or `Player.OnAVChange`: playback (re)started
    PlayerStarted,
    /// `Application.OnVolumeChanged` with the pushed values
    VolumeChanged {
        volume: Option<Value>,
        muted: Option<Value>,
    },
    /// Any other method name; logged and ignored
    Unknown(String),
}

impl PushEvent {
    /// Classify a push by method name.
    pub fn classify(push: &RpcPush) -> PushEvent {
        match push.method.as_str() {
            "Player.OnPause" => PushEvent::PlayerPaused,
            "Player.OnStop" => PushEvent::PlayerStopped,
            "GUI.OnScreensaverActivated" => PushEvent::ScreensaverActivated,
            "Player.OnPlay" | "Player.OnAVChange" => PushEvent::PlayerStarted,
            "Application.OnVolumeChanged" => {
                let data = push.params.as_ref().and_then(|p| p.get("data"));
                PushEvent::VolumeChanged {
                    volume: data.and_then(|d| d.get("volume")).cloned(),
                    muted: data.and_then(|d| d.get("muted")).cloned(),
                }
            }
            other => PushEvent::Unknown(other.to_string()),
        }
    }
}

/// Route one push to its listener-set updates
///
/// `PlayerStarted` enqueues a fresh `Player.GetActivePlayers` request,
/// coalesced by key with any already-queued one; the end-of-cycle retry
/// pass performs the actual send.
pub(crate) fn route_push(queue: &mut CommandQueue, listeners: &ListenerRegistry, push: &RpcPush) {
    match PushEvent::classify(push) {
        PushEvent::PlayerPaused => {
            tracing::debug!("player paused");
            listeners.notify(Channel::State, &json!("Paused"));
        }
        PushEvent::PlayerStopped => {
            tracing::debug!("player stopped");
            listeners.notify(Channel::State, &json!("Stopped"));
            listeners.notify(Channel::Media, &json!(""));
            listeners.notify(Channel::Title, &json!(""));
        }
        PushEvent::ScreensaverActivated => {
            tracing::debug!("screensaver activated");
            listeners.notify(Channel::State, &json!("Screensaver"));
        }
        PushEvent::PlayerStarted => {
            tracing::debug!("player started, querying active players");
            queue.enqueue(RpcRequest::new("Player.GetActivePlayers", None));
        }
        PushEvent::VolumeChanged { volume, muted } => {
            tracing::debug!(?volume, ?muted, "volume changed");
            if let Some(muted) = muted {
                listeners.notify(Channel::Mute, &muted);
            }
            if let Some(volume) = volume {
                listeners.notify(Channel::Volume, &volume);
            }
        }
        PushEvent::Unknown(method) => {
            tracing::debug!(method = %method, "ignoring unknown push method");
        }
    }
}
