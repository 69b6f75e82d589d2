use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use voiceflow_core::automation::RecordingAutomation;
use voiceflow_core::commands::{invoke, CommandAction};
use voiceflow_core::config::{UserActionConfig, UserCommandConfig, VocabularyEntry};
use voiceflow_core::engine::{DispatchDiagnostics, DispatcherContext, TurnDispatcher};
use voiceflow_core::filter::PushToTalkFilter;
use voiceflow_core::{
    AutomationHandle, EngineEvent, EngineSettings, KeyChord, KeyCode, ListeningMode, Modifiers,
    ProviderEvent, SettingsHandle, TranscriptTurn, Word,
};

struct Session {
    dispatcher: TurnDispatcher,
    out: RecordingAutomation,
    events: broadcast::Receiver<EngineEvent>,
    t0: Instant,
}

impl Session {
    fn new(edit: impl FnOnce(&mut EngineSettings)) -> Self {
        let mut settings = EngineSettings::default();
        edit(&mut settings);
        let out = RecordingAutomation::new();
        let (event_tx, events) = broadcast::channel(64);
        let dispatcher = TurnDispatcher::new(DispatcherContext {
            settings: SettingsHandle::new(settings),
            automation: AutomationHandle::new(out.clone()),
            provider: None,
            event_tx,
            diagnostics: Arc::new(DispatchDiagnostics::default()),
        });
        Self {
            dispatcher,
            out,
            events,
            t0: Instant::now(),
        }
    }

    fn at(&self, millis: u64) -> Instant {
        self.t0 + Duration::from_millis(millis)
    }

    fn send(&mut self, turn: TranscriptTurn, millis: u64) {
        let now = self.at(millis);
        self.dispatcher.handle_turn(&turn, now);
    }

    fn partial(&mut self, text: &str, millis: u64) {
        self.send(turn(text, false), millis);
    }

    fn finish(&mut self, text: &str, millis: u64) {
        self.send(turn(text, true), millis);
    }

    fn fire(&mut self, millis: u64) {
        let now = self.at(millis);
        self.dispatcher.fire_due(now);
    }

    fn executed(&mut self) -> Vec<(String, CommandAction)> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let EngineEvent::CommandExecuted { key, action } = event {
                out.push((key, action));
            }
        }
        out
    }
}

fn turn(text: &str, closes: bool) -> TranscriptTurn {
    TranscriptTurn {
        transcript: text.into(),
        words: text.split_whitespace().map(Word::new).collect(),
        end_of_turn: closes,
        is_formatted: closes,
        ..TranscriptTurn::default()
    }
}

fn no_delay(settings: &mut EngineSettings) {
    settings.command_delay_ms = 0;
}

#[test]
fn spoken_chord_is_pressed() {
    let mut s = Session::new(no_delay);
    s.finish("press command shift k", 0);
    let expected = KeyChord::new(
        KeyCode::Char('K'),
        Modifiers {
            command: true,
            shift: true,
            ..Modifiers::NONE
        },
    );
    assert_eq!(s.out.chords(), vec![expected]);
    assert_eq!(s.out.rendered_text(), "");
}

#[test]
fn wake_word_prefix_skips_the_debounce() {
    let mut s = Session::new(|_| {});
    s.partial("voiceflow undo that", 0);
    assert_eq!(s.out.chords().len(), 1);
    assert!(s.dispatcher.next_deadline().is_none());
}

#[test]
fn longer_phrase_replaces_pending_shorter_match() {
    let mut s = Session::new(|_| {});
    s.partial("window recent", 0);
    assert_eq!(s.dispatcher.next_deadline(), Some(s.at(350)));

    s.partial("window recent two", 100);
    s.fire(350);
    assert!(s.executed().is_empty());

    s.fire(450);
    assert_eq!(
        s.executed(),
        vec![(
            "system.window_recent".to_string(),
            CommandAction::invoke_with(invoke::WINDOW_RECENT, "2")
        )]
    );
}

#[test]
fn mode_phrase_inside_a_sentence_is_dictation() {
    let mut s = Session::new(no_delay);
    s.finish("Oddly enough, speech off", 0);
    assert_eq!(s.dispatcher.mode(), ListeningMode::On);
    assert_eq!(s.out.rendered_text(), "Oddly enough, speech off");
}

#[test]
fn sleep_mode_waits_for_wake_phrase() {
    let mut s = Session::new(no_delay);
    s.finish("go to sleep", 0);
    assert_eq!(s.dispatcher.mode(), ListeningMode::Sleep);
    s.finish("nobody should see this", 1_000);
    s.finish("undo that", 2_000);
    assert!(s.out.ops().is_empty());

    s.finish("wake up", 3_000);
    assert_eq!(s.dispatcher.mode(), ListeningMode::On);
    s.finish("back again", 4_000);
    assert_eq!(s.out.rendered_text(), "back again");
}

#[test]
fn speaker_isolation_keeps_the_first_voice() {
    let mut s = Session::new(|settings| settings.isolate_speaker = true);
    let words = [("hello", 1), ("there", 2), ("world", 1)]
        .into_iter()
        .map(|(text, speaker)| Word {
            speaker_id: Some(speaker),
            ..Word::new(text)
        })
        .collect();
    s.send(
        TranscriptTurn {
            words,
            end_of_turn: true,
            is_formatted: true,
            ..TranscriptTurn::default()
        },
        0,
    );
    assert_eq!(s.out.rendered_text(), "hello world");
}

#[test]
fn push_to_talk_window_drops_outside_words() {
    let mut s = Session::new(|settings| {
        settings.push_to_talk = Some(PushToTalkFilter::new(1.0, Some(2.0)));
    });
    s.send(
        TranscriptTurn {
            words: vec![
                Word::new("early").with_timing(0.2, 0.4),
                Word::new("inside").with_timing(1.5, 1.7),
                Word::new("late").with_timing(3.0, 3.2),
            ],
            end_of_turn: true,
            is_formatted: true,
            ..TranscriptTurn::default()
        },
        0,
    );
    assert_eq!(s.out.rendered_text(), "inside");
}

#[test]
fn leading_say_types_the_rest_verbatim() {
    let mut s = Session::new(no_delay);
    s.finish("say undo that comma", 0);
    assert_eq!(s.out.rendered_text(), "undo that comma");
    assert!(s.out.chords().is_empty());
}

#[test]
fn user_shortcut_command() {
    let mut s = Session::new(|settings| {
        no_delay(settings);
        settings.user_commands.push(UserCommandConfig {
            id: "mail".into(),
            phrase: "open mail".into(),
            action: UserActionConfig::Shortcut {
                chord: "cmd+shift+m".into(),
            },
            halts_processing: false,
            requires_pause: false,
            enabled: true,
        });
    });
    s.finish("open mail", 0);
    let executed = s.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].0, "user.mail");
    assert_eq!(s.out.chords()[0].to_string(), "Command+Shift+M");
}

#[test]
fn vocabulary_applies_to_dictation() {
    let mut s = Session::new(|settings| {
        settings.literal_vocabulary.push(VocabularyEntry {
            term: "Voiceflow".into(),
            aliases: vec!["voice flow".into()],
            enabled: true,
        });
    });
    s.finish("I love voice flow", 0);
    assert_eq!(s.out.rendered_text(), "I love Voiceflow");
}

#[test]
fn back_space_split_across_utterances() {
    let mut s = Session::new(|_| {});
    s.finish("hello world back", 0);
    assert_eq!(s.out.rendered_text(), "hello world");
    s.finish("space 5", 500);
    assert_eq!(s.out.rendered_text(), "hello ");
    assert_eq!(s.out.presses_of(KeyCode::Delete), 5);
}

#[test]
fn recorded_provider_stream_replays() {
    let stream = [
        r#"{"type":"connected"}"#,
        r#"{"type":"turn","words":[{"text":"ship","isFinal":true},{"text":"it","isFinal":false}],"endOfTurn":false}"#,
        r#"{"type":"turn","transcript":"Ship it new line","endOfTurn":true,"isFormatted":true,"turnOrder":0}"#,
        r#"{"type":"turn","transcript":"Done.","endOfTurn":true,"isFormatted":true,"turnOrder":1}"#,
    ];
    let mut s = Session::new(|_| {});
    for (i, line) in stream.iter().enumerate() {
        let event: ProviderEvent = serde_json::from_str(line).expect("valid provider line");
        if let ProviderEvent::Turn(turn) = event {
            s.send(turn, i as u64 * 100);
        }
    }
    assert_eq!(s.out.rendered_text(), "Ship it\nDone.");
}

#[test]
fn command_waits_for_its_words_to_be_final() {
    let mut s = Session::new(no_delay);
    s.send(
        TranscriptTurn {
            words: vec![Word::new("undo").with_final(true), Word::new("that").with_final(false)],
            ..TranscriptTurn::default()
        },
        0,
    );
    assert!(s.out.chords().is_empty());

    s.send(
        TranscriptTurn {
            words: vec![Word::new("undo").with_final(true), Word::new("that").with_final(true)],
            ..TranscriptTurn::default()
        },
        100,
    );
    s.finish("Undo that.", 200);
    assert_eq!(s.executed().len(), 1);
    assert_eq!(s.out.chords().len(), 1);
    assert_eq!(s.out.rendered_text(), "");
}

#[test]
fn force_ended_utterance_is_typed_once() {
    let mut s = Session::new(|_| {});
    s.partial("hello world", 0);
    s.dispatcher.force_end(false, s.at(100));

    let mut unformatted = turn("hello world", false);
    unformatted.end_of_turn = true;
    s.send(unformatted, 150);
    s.finish("Hello world.", 200);
    assert_eq!(s.out.rendered_text(), "hello world");

    s.finish("Next.", 1_000);
    assert_eq!(s.out.rendered_text(), "hello world Next.");
}
