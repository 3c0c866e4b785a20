//! Command catalog: host item updates to device commands
//!
//! Maps writable channels to their JSON-RPC command templates, validates
//! input actions against the device's action vocabulary, expands macros,
//! and fans player-targeted commands out over the active player list.
//!
//! This is the collaborator surface the host framework calls when one of
//! its items changes: [`KodiEngine::update_item`]. An update whose caller
//! tag equals [`SOURCE_TAG`] originated from this engine's own reply
//! handling and is never re-sent (loop prevention).

use crate::channel::{Channel, SOURCE_TAG};
use crate::dispatcher::KodiEngine;
use kodilink_core::{RpcReply, RpcRequest};
use serde_json::{json, Value};
use std::time::Duration;

/// Input actions the device accepts outside a player context
pub const INPUT_ACTIONS: &[&str] = &[
    "left", "right", "up", "down", "pageup", "pagedown", "select", "highlight",
    "parentdir", "parentfolder", "back", "menu", "previousmenu", "osd", "playlist", "queue",
    "nextcalibration", "resetcalibration", "close", "fullscreen",
    "number0", "number1", "number2", "number3", "number4",
    "number5", "number6", "number7", "number8", "number9", "play", "playpause",
    "switchplayer", "delete", "copy", "moveitemup", "moveitemdown", "contextmenu",
    "move", "screenshot", "rename", "togglewatched", "scanitem", "reloadkeymaps",
    "volumeup", "volumedown", "mute", "backspace", "scrollup", "scrolldown",
    "shift", "symbols", "cursorleft", "cursorright", "showpreset", "nextpreset",
    "previouspreset", "lockpreset", "randompreset",
    "increasevisrating", "decreasevisrating", "showvideomenu", "enter", "increaserating",
    "decreaserating", "setrating", "togglefullscreen", "nextletter",
    "prevletter", "filter", "filterclear", "filtersms2", "filtersms3", "filtersms4", "filtersms5",
    "filtersms6", "filtersms7", "filtersms8", "filtersms9", "firstpage", "lastpage", "guiprofile",
    "red", "green", "yellow", "blue", "increasepar", "decreasepar", "volampup", "volampdown",
    "volumeamplification", "createbookmark", "createepisodebookmark", "settingsreset",
    "settingslevelchange", "channelup", "channeldown", "previouschannelgroup",
    "nextchannelgroup", "playpvr", "playpvrtv", "playpvrradio", "record", "togglecommskip",
    "showtimerrule", "leftclick", "rightclick", "middleclick", "doubleclick", "longclick",
    "wheelup", "wheeldown", "mousedrag", "mousemove", "tap", "longpress", "pangesture",
    "zoomgesture", "rotategesture", "swipeleft", "swiperight", "swipeup", "swipedown",
    "error", "noop",
];

/// Input actions that only make sense with an active player
pub const PLAYER_ACTIONS: &[&str] = &[
    "pause", "stop", "skipnext", "skipprevious", "aspectratio",
    "stepforward", "stepback", "bigstepforward", "bigstepback",
    "chapterorbigstepforward", "chapterorbigstepback", "showsubtitles",
    "nextsubtitle", "cyclesubtitle", "playerdebug", "codecinfo", "playerprocessinfo",
    "nextpicture", "previouspicture", "zoomout", "zoomin",
    "zoomnormal", "zoomlevel1", "zoomlevel2", "zoomlevel3", "zoomlevel4",
    "zoomlevel5", "zoomlevel6", "zoomlevel7", "zoomlevel8", "zoomlevel9",
    "analogmove", "analogmovex", "analogmovey", "rotate", "rotateccw", "subtitledelayminus",
    "subtitledelay", "subtitledelayplus", "audiodelayminus", "audiodelay",
    "audiodelayplus", "subtitleshiftup", "subtitleshiftdown", "subtitlealign",
    "audionextlanguage", "verticalshiftup", "verticalshiftdown", "nextresolution",
    "audiotoggledigital", "smallstepback", "fastforward", "rewind",
    "analogfastforward", "analogrewind", "showtime", "analogseekforward",
    "analogseekback", "nextscene", "previousscene", "jumpsms2", "jumpsms3",
    "jumpsms4", "jumpsms5", "jumpsms6", "jumpsms7", "jumpsms8",
    "jumpsms9", "stereomode", "nextstereomode", "previousstereomode",
    "togglestereomode", "stereomodetomono",
];

/// Commands issued right after connect to prime listener state
pub fn init_commands() -> Vec<(&'static str, Option<Value>)> {
    vec![
        ("JSONRPC.Ping", None),
        (
            "Application.GetProperties",
            Some(json!({"properties": ["volume", "muted"]})),
        ),
        (
            "Favourites.GetFavourites",
            Some(json!({"properties": ["window", "path", "thumbnail", "windowparameter"]})),
        ),
        ("Player.GetActivePlayers", None),
    ]
}

/// One step of a command macro
#[derive(Debug, Clone, Copy)]
pub enum MacroStep {
    /// `Input.ExecuteAction` with this action
    Action(&'static str),
    /// Pause between steps
    Wait(Duration),
}

const MACRO_RESUME: &[MacroStep] = &[
    MacroStep::Action("play"),
    MacroStep::Wait(Duration::from_secs(1)),
    MacroStep::Action("select"),
];

const MACRO_BEGINNING: &[MacroStep] = &[
    MacroStep::Action("play"),
    MacroStep::Wait(Duration::from_secs(1)),
    MacroStep::Action("down"),
    MacroStep::Action("select"),
];

/// Look up a macro by name.
pub fn macro_steps(name: &str) -> Option<&'static [MacroStep]> {
    match name {
        "resume" => Some(MACRO_RESUME),
        "beginning" => Some(MACRO_BEGINNING),
        _ => None,
    }
}

/// How an item update is executed
#[derive(Debug, Clone)]
pub(crate) enum CommandRoute {
    /// Single fire-and-forget request
    Direct(RpcRequest),
    /// Sent once per active player after refreshing the player list
    PlayerTargeted { method: &'static str, params: Value },
    /// Expand the named macro
    RunMacro(String),
    /// Nothing to send (logged at the decision point)
    Skip,
}

/// Translate a writable-channel update into its command route
pub(crate) fn route_update(channel: Channel, value: &Value) -> CommandRoute {
    match channel {
        Channel::Volume => CommandRoute::Direct(RpcRequest::new(
            "Application.SetVolume",
            Some(json!({ "volume": value })),
        )),
        Channel::Mute => CommandRoute::Direct(RpcRequest::new(
            "Application.SetMute",
            Some(json!({ "mute": value })),
        )),
        Channel::Home => CommandRoute::Direct(RpcRequest::new("Input.Home", None)),
        Channel::OnOff => {
            if value.as_bool().unwrap_or(false) {
                // Powering on means reconnecting, which is the host's
                // concern; only the shutdown direction is a command.
                tracing::debug!("on_off set true, connection management is up to the host");
                CommandRoute::Skip
            } else {
                CommandRoute::Direct(RpcRequest::new("System.Shutdown", None))
            }
        }
        Channel::Player => CommandRoute::Direct(RpcRequest::new("Player.GetActivePlayers", None)),
        Channel::Input => match value.as_str() {
            Some(action) if INPUT_ACTIONS.contains(&action) => CommandRoute::Direct(
                RpcRequest::new("Input.ExecuteAction", Some(json!({ "action": action }))),
            ),
            Some(action) if PLAYER_ACTIONS.contains(&action) => CommandRoute::PlayerTargeted {
                method: "Input.ExecuteAction",
                params: json!({ "action": action }),
            },
            Some(action) => {
                tracing::error!(action, "action not allowed for the input channel, skipping");
                CommandRoute::Skip
            }
            None => {
                tracing::error!(?value, "input channel requires a string action, skipping");
                CommandRoute::Skip
            }
        },
        Channel::Macro => match value.as_str() {
            Some(name) => CommandRoute::RunMacro(name.to_string()),
            None => {
                tracing::error!(?value, "macro channel requires a string name, skipping");
                CommandRoute::Skip
            }
        },
        Channel::AudioStream => CommandRoute::PlayerTargeted {
            method: "Player.SetAudioStream",
            params: json!({ "stream": value }),
        },
        Channel::Subtitle => match value.as_array() {
            Some(pair) if pair.len() == 2 => CommandRoute::PlayerTargeted {
                method: "Player.SetSubtitle",
                params: json!({ "subtitle": pair[0], "enable": pair[1] }),
            },
            _ => {
                tracing::error!(?value, "subtitle channel requires [subtitle, enable], skipping");
                CommandRoute::Skip
            }
        },
        Channel::Seek => CommandRoute::PlayerTargeted {
            method: "Player.Seek",
            params: json!({ "value": value }),
        },
        Channel::Speed => CommandRoute::PlayerTargeted {
            method: "Player.SetSpeed",
            params: json!({ "speed": value }),
        },
        Channel::Title | Channel::Media | Channel::State | Channel::Favourites => {
            tracing::info!(channel = %channel, "channel is not writable, skipping");
            CommandRoute::Skip
        }
    }
}

impl KodiEngine {
    /// Host callback for a changed item bound to a channel
    ///
    /// A no-op when `caller` equals [`SOURCE_TAG`]: the update originated
    /// from this engine's own reply handling and must not loop back out.
    pub async fn update_item(&self, channel: Channel, value: &Value, caller: &str) {
        if caller == SOURCE_TAG {
            tracing::debug!(channel = %channel, "ignoring own update");
            return;
        }
        tracing::debug!(channel = %channel, caller, "updating item");

        match route_update(channel, value) {
            CommandRoute::Direct(request) => {
                if channel == Channel::Player {
                    // The player list is being refreshed; reset bound items.
                    self.inner.listeners.notify(Channel::Player, &json!(0));
                }
                self.send_command(&request.method, request.params, false).await;
            }
            CommandRoute::PlayerTargeted { method, params } => {
                self.send_player_command(method, params).await;
            }
            CommandRoute::RunMacro(name) => self.run_macro(&name).await,
            CommandRoute::Skip => {}
        }
    }

    /// Send a command once per active player
    ///
    /// Refreshes the active player list first (blocking exchange), then
    /// issues the command fire-and-forget per player, injecting the
    /// `playerid` parameter when more than one player is active.
    pub async fn send_player_command(&self, method: &str, params: Value) {
        self.send_command("Player.GetActivePlayers", None, true).await;

        let players = self.active_players().await;
        tracing::debug!(?players, "active players");
        if players.is_empty() {
            tracing::warn!(method, "no active player found, skipping request");
            return;
        }
        if players.len() > 1 {
            tracing::info!("more than one active player, sending request to each");
        }
        for playerid in &players {
            let mut params = params.clone();
            if players.len() > 1 {
                params["playerid"] = json!(playerid);
            }
            self.send_command(method, Some(params), false).await;
        }
    }

    /// Run a named macro (`resume` or `beginning`)
    ///
    /// Unknown names are logged and skipped.
    pub async fn run_macro(&self, name: &str) {
        let Some(steps) = macro_steps(name) else {
            tracing::info!(name, "unknown macro, skipping");
            return;
        };
        for step in steps {
            match step {
                MacroStep::Action(action) => {
                    self.send_command(
                        "Input.ExecuteAction",
                        Some(json!({ "action": action })),
                        false,
                    )
                    .await;
                }
                MacroStep::Wait(pause) => {
                    tracing::debug!(seconds = pause.as_secs(), "macro waiting");
                    tokio::time::sleep(*pause).await;
                }
            }
        }
    }

    /// Display a notification on the device screen
    ///
    /// `display_time` is in milliseconds.
    pub async fn show_notification(
        &self,
        title: &str,
        message: &str,
        image: Option<&str>,
        display_time: u64,
    ) -> Option<RpcReply> {
        let mut params = json!({
            "title": title,
            "message": message,
            "displaytime": display_time,
        });
        if let Some(image) = image {
            params["image"] = json!(image);
        }
        self.send_command("GUI.ShowNotification", Some(params), true)
            .await
    }
}
