//! Built-in command phrases.

use super::registry::{CommandClass, CommandSpec};
use super::{invoke, CommandAction};
use crate::automation::{KeyChord, KeyCode, Modifiers};
use crate::ipc::events::ListeningMode;

pub const MODE_ON: &str = "system.mode_on";
pub const MODE_SLEEP: &str = "system.mode_sleep";
pub const MODE_OFF: &str = "system.mode_off";
pub const CANCEL: &str = "system.cancel";
pub const UNDO: &str = "system.undo";
pub const SUBMIT: &str = "system.submit";
pub const FORCE_END: &str = "system.force_end";
pub const WINDOW_NEXT: &str = "system.window_next";
pub const WINDOW_RECENT: &str = "system.window_recent";
pub const PROVIDER: &str = "system.provider";
pub const PANEL: &str = "system.panel";
pub const NOTE: &str = "system.note";
pub const RECORDING: &str = "system.recording";
pub const TRANSCRIBING: &str = "system.transcribing";
pub const SESSION: &str = "system.session";
pub const PRESS: &str = "system.press";

const RECENT_SLOTS: [(&str, &str); 5] = [
    ("1", "one"),
    ("2", "two"),
    ("3", "three"),
    ("4", "four"),
    ("5", "five"),
];

fn mode(mode: ListeningMode) -> CommandAction {
    CommandAction::ModeChange { mode }
}

/// Build the system command table. `providers` are the normalized provider
/// names reachable by "switch provider <name>".
pub fn system_commands(providers: &[String]) -> Vec<CommandSpec> {
    let mut out = Vec::new();

    for phrase in ["speech on", "wake up"] {
        out.push(
            CommandSpec::new(MODE_ON, phrase, mode(ListeningMode::On))
                .with_class(CommandClass::Wake)
                .halting(),
        );
    }
    for phrase in ["go to sleep", "speech sleep"] {
        out.push(
            CommandSpec::new(MODE_SLEEP, phrase, mode(ListeningMode::Sleep))
                .with_class(CommandClass::Mode)
                .halting(),
        );
    }
    for phrase in ["speech off", "stop listening"] {
        out.push(
            CommandSpec::new(MODE_OFF, phrase, mode(ListeningMode::Off))
                .with_class(CommandClass::Mode)
                .halting(),
        );
    }

    for phrase in ["cancel that", "scratch that"] {
        out.push(CommandSpec::new(CANCEL, phrase, CommandAction::invoke(invoke::SCRATCH)));
    }
    let undo = KeyChord::new(
        KeyCode::Char('Z'),
        Modifiers {
            command: true,
            ..Modifiers::NONE
        },
    );
    out.push(CommandSpec::new(
        UNDO,
        "undo that",
        CommandAction::Shortcut { chord: undo },
    ));
    for phrase in ["send it", "submit that"] {
        out.push(
            CommandSpec::new(SUBMIT, phrase, CommandAction::invoke(invoke::SUBMIT))
                .halting()
                .after_pause(),
        );
    }
    out.push(
        CommandSpec::new(
            FORCE_END,
            "end utterance",
            CommandAction::invoke(invoke::FORCE_END),
        )
        .halting(),
    );

    out.push(CommandSpec::new(
        WINDOW_NEXT,
        "next window",
        CommandAction::invoke(invoke::WINDOW_NEXT),
    ));
    out.push(CommandSpec::new(
        WINDOW_RECENT,
        "window recent",
        CommandAction::invoke(invoke::WINDOW_RECENT),
    ));
    for (digit, word) in RECENT_SLOTS {
        for spoken in [digit, word] {
            out.push(CommandSpec::new(
                WINDOW_RECENT,
                &format!("window recent {spoken}"),
                CommandAction::invoke_with(invoke::WINDOW_RECENT, digit),
            ));
        }
    }

    for name in providers {
        out.push(CommandSpec::new(
            PROVIDER,
            &format!("switch provider {name}"),
            CommandAction::invoke_with(invoke::PROVIDER_SWITCH, name.as_str()),
        ));
    }

    let toggles: [(&str, &str, &str); 8] = [
        (PANEL, "show panel", invoke::PANEL_SHOW),
        (PANEL, "hide panel", invoke::PANEL_HIDE),
        (NOTE, "take a note", invoke::NOTE_START),
        (NOTE, "end note", invoke::NOTE_END),
        (RECORDING, "start recording", invoke::RECORDING_START),
        (RECORDING, "stop recording", invoke::RECORDING_STOP),
        (TRANSCRIBING, "start transcribing", invoke::TRANSCRIBING_START),
        (TRANSCRIBING, "stop transcribing", invoke::TRANSCRIBING_STOP),
    ];
    for (key, phrase, name) in toggles {
        out.push(CommandSpec::new(key, phrase, CommandAction::invoke(name)));
    }
    out.push(
        CommandSpec::new(
            SESSION,
            "clear session",
            CommandAction::invoke(invoke::CLEAR_SESSION),
        )
        .halting(),
    );

    out
}
