//! Reply correlation and semantic reply handlers
//!
//! An inbound reply is matched against the pending queue by its request
//! key. On a match the entry is removed, its failure counter cleared,
//! and the reply is dispatched by identifier prefix to a semantic
//! handler that decodes the payload and fans values out to the listener
//! channels. Error replies are logged and removed without retry: only
//! *silent* non-replies are ever retried.
//!
//! All handlers run on the inbound-data path, inside the engine's state
//! critical section.

use crate::channel::{Channel, ListenerRegistry};
use crate::queue::CommandQueue;
use kodilink_core::{RpcReply, RpcRequest};
use serde_json::{json, Value};

/// Match a reply against the queue and run its semantic handler
///
/// Returns `None` when no pending entry carries the reply's key (e.g.
/// already removed by an earlier fragment of the same batch). On a match
/// returns the fire-and-forget follow-up requests the handler produced,
/// possibly empty.
pub(crate) fn handle_reply(
    queue: &mut CommandQueue,
    active_players: &mut Vec<i64>,
    listeners: &ListenerRegistry,
    reply: &RpcReply,
) -> Option<Vec<RpcRequest>> {
    let entry = queue.remove(&reply.id)?;
    queue.clear_failures(&reply.id);

    if let Some(error) = &reply.error {
        tracing::warn!(
            id = %reply.id,
            error = %error,
            "device rejected command, removing from queue"
        );
        return Some(Vec::new());
    }

    let id = reply.id.as_str();
    let followups = if id.starts_with("Player.GetActivePlayers") {
        handle_active_players(active_players, listeners, reply.result.as_ref())
    } else if id.starts_with("Application.GetProperties") {
        handle_application_properties(listeners, reply.result.as_ref());
        Vec::new()
    } else if id.starts_with("Favourites.GetFavourites") {
        handle_favourites(listeners, reply.result.as_ref());
        Vec::new()
    } else if id.starts_with("Player.GetItem") {
        handle_now_playing(listeners, reply.result.as_ref());
        Vec::new()
    } else {
        tracing::debug!(id = %entry.id, "command acknowledged");
        Vec::new()
    };

    Some(followups)
}

/// `Player.GetActivePlayers` reply: replace the active player list
///
/// More than one active player triggers one fire-and-forget
/// `Player.GetItem` per player id; "player" listeners are only notified
/// in the single-player case. An empty list clears state.
fn handle_active_players(
    active_players: &mut Vec<i64>,
    listeners: &ListenerRegistry,
    result: Option<&Value>,
) -> Vec<RpcRequest> {
    let players: Vec<i64> = result
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|p| p.get("playerid").and_then(Value::as_i64))
                .collect()
        })
        .unwrap_or_default();

    *active_players = players.clone();

    match players.len() {
        0 => {
            tracing::debug!("no active player");
            listeners.notify(Channel::State, &json!("No Active Player"));
            Vec::new()
        }
        1 => {
            listeners.notify(Channel::Player, &json!(players[0]));
            Vec::new()
        }
        n => {
            tracing::info!(players = n, "more than one active player, querying each");
            players
                .iter()
                .map(|playerid| {
                    RpcRequest::new(
                        "Player.GetItem",
                        Some(json!({
                            "properties": ["title", "artist"],
                            "playerid": playerid,
                        })),
                    )
                })
                .collect()
        }
    }
}

/// `Application.GetProperties` reply: push volume and mute state.
fn handle_application_properties(listeners: &ListenerRegistry, result: Option<&Value>) {
    let Some(result) = result else {
        return;
    };
    let muted = result.get("muted");
    let volume = result.get("volume");
    tracing::debug!(?volume, ?muted, "received application properties");
    if let Some(muted) = muted {
        listeners.notify(Channel::Mute, muted);
    }
    if let Some(volume) = volume {
        listeners.notify(Channel::Volume, volume);
    }
}

/// `Favourites.GetFavourites` reply: push a title-keyed favourites map.
fn handle_favourites(listeners: &ListenerRegistry, result: Option<&Value>) {
    let favourites = result
        .and_then(|r| r.get("favourites"))
        .and_then(Value::as_array);
    let Some(favourites) = favourites else {
        tracing::debug!("no favourites found");
        return;
    };

    let mut by_title = serde_json::Map::new();
    for entry in favourites {
        if let Some(title) = entry.get("title").and_then(Value::as_str) {
            by_title.insert(title.to_string(), entry.clone());
        }
    }
    tracing::debug!(count = by_title.len(), "favourites received");
    listeners.notify(Channel::Favourites, &Value::Object(by_title));
}

/// `Player.GetItem` reply: push now-playing media type and title
///
/// Falls back to the item label when no title is present; audio items
/// get an `artist - title` composite.
fn handle_now_playing(listeners: &ListenerRegistry, result: Option<&Value>) {
    let Some(item) = result.and_then(|r| r.get("item")) else {
        return;
    };

    let mut title = item
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .or_else(|| item.get("label").and_then(Value::as_str))
        .unwrap_or("")
        .to_string();

    let media = item
        .get("type")
        .and_then(Value::as_str)
        .map(capitalize)
        .unwrap_or_default();
    listeners.notify(Channel::Media, &json!(media));

    if let Some(artists) = item.get("artist").and_then(Value::as_array) {
        if !artists.is_empty() {
            let artist = artists[0].as_str().unwrap_or("unknown");
            title = format!("{artist} - {title}");
        }
    }
    tracing::debug!(title = %title, media = %media, "updated player info");
    listeners.notify(Channel::Title, &json!(title));
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodilink_core::RequestKey;
    use std::sync::{Arc, Mutex};

    fn capture(registry: &ListenerRegistry, channel: Channel) -> Arc<Mutex<Vec<Value>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register(
            channel,
            Arc::new(move |value, _caller| sink.lock().unwrap().push(value.clone())),
        );
        seen
    }

    fn reply(id: &str, result: Value) -> RpcReply {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }))
        .unwrap()
    }

    #[test]
    fn test_unmatched_reply_is_ignored() {
        let mut queue = CommandQueue::new();
        let mut players = Vec::new();
        let listeners = ListenerRegistry::new();

        let outcome = handle_reply(
            &mut queue,
            &mut players,
            &listeners,
            &reply("JSONRPC.Ping", json!("pong")),
        );
        assert!(outcome.is_none());
    }

    #[test]
    fn test_error_reply_removed_without_followups() {
        let mut queue = CommandQueue::new();
        queue.enqueue(RpcRequest::new("Input.Home", None));
        let mut players = Vec::new();
        let listeners = ListenerRegistry::new();

        let rejected: RpcReply = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": "Input.Home",
            "error": {"code": -32601, "message": "Method not found"},
        }))
        .unwrap();

        let followups = handle_reply(&mut queue, &mut players, &listeners, &rejected).unwrap();
        assert!(followups.is_empty());
        assert!(queue.is_empty());
        assert_eq!(queue.failure_count(&RequestKey::from("Input.Home")), 0);
    }

    #[test]
    fn test_properties_reply_notifies_volume_and_mute() {
        let mut queue = CommandQueue::new();
        queue.enqueue(RpcRequest::new("Application.GetProperties", None));
        let mut players = Vec::new();
        let listeners = ListenerRegistry::new();
        let volumes = capture(&listeners, Channel::Volume);
        let mutes = capture(&listeners, Channel::Mute);

        handle_reply(
            &mut queue,
            &mut players,
            &listeners,
            &reply("Application.GetProperties", json!({"volume": 42, "muted": false})),
        )
        .unwrap();

        assert_eq!(volumes.lock().unwrap().as_slice(), &[json!(42)]);
        assert_eq!(mutes.lock().unwrap().as_slice(), &[json!(false)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_two_active_players_fan_out_without_player_notify() {
        let mut queue = CommandQueue::new();
        queue.enqueue(RpcRequest::new("Player.GetActivePlayers", None));
        let mut players = Vec::new();
        let listeners = ListenerRegistry::new();
        let player_values = capture(&listeners, Channel::Player);

        let followups = handle_reply(
            &mut queue,
            &mut players,
            &listeners,
            &reply(
                "Player.GetActivePlayers",
                json!([{"playerid": 0, "type": "audio"}, {"playerid": 1, "type": "video"}]),
            ),
        )
        .unwrap();

        assert_eq!(followups.len(), 2);
        for (followup, playerid) in followups.iter().zip([0, 1]) {
            assert_eq!(followup.method, "Player.GetItem");
            assert_eq!(followup.params.as_ref().unwrap()["playerid"], json!(playerid));
        }
        assert_eq!(players, vec![0, 1]);
        assert!(player_values.lock().unwrap().is_empty());
    }

    #[test]
    fn test_single_active_player_notifies_player_channel() {
        let mut queue = CommandQueue::new();
        queue.enqueue(RpcRequest::new("Player.GetActivePlayers", None));
        let mut players = Vec::new();
        let listeners = ListenerRegistry::new();
        let player_values = capture(&listeners, Channel::Player);

        let followups = handle_reply(
            &mut queue,
            &mut players,
            &listeners,
            &reply("Player.GetActivePlayers", json!([{"playerid": 1, "type": "video"}])),
        )
        .unwrap();

        assert!(followups.is_empty());
        assert_eq!(players, vec![1]);
        assert_eq!(player_values.lock().unwrap().as_slice(), &[json!(1)]);
    }

    #[test]
    fn test_now_playing_audio_composes_artist_title() {
        let mut queue = CommandQueue::new();
        queue.enqueue(RpcRequest::new("Player.GetItem", None));
        let mut players = Vec::new();
        let listeners = ListenerRegistry::new();
        let titles = capture(&listeners, Channel::Title);
        let media = capture(&listeners, Channel::Media);

        handle_reply(
            &mut queue,
            &mut players,
            &listeners,
            &reply(
                "Player.GetItem",
                json!({"item": {"title": "Blue Train", "type": "song", "artist": ["Coltrane"]}}),
            ),
        )
        .unwrap();

        assert_eq!(titles.lock().unwrap().as_slice(), &[json!("Coltrane - Blue Train")]);
        assert_eq!(media.lock().unwrap().as_slice(), &[json!("Song")]);
    }

    #[test]
    fn test_favourites_keyed_by_title() {
        let mut queue = CommandQueue::new();
        queue.enqueue(RpcRequest::new("Favourites.GetFavourites", None));
        let mut players = Vec::new();
        let listeners = ListenerRegistry::new();
        let favourites = capture(&listeners, Channel::Favourites);

        handle_reply(
            &mut queue,
            &mut players,
            &listeners,
            &reply(
                "Favourites.GetFavourites",
                json!({"favourites": [
                    {"title": "Radio", "path": "plugin://radio"},
                    {"title": "Films", "window": "videos"},
                ]}),
            ),
        )
        .unwrap();

        let seen = favourites.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["Radio"]["path"], json!("plugin://radio"));
        assert_eq!(seen[0]["Films"]["window"], json!("videos"));
    }
}
