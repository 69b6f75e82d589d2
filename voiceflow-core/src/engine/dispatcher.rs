//! Turn dispatcher: the single owner of utterance and session state.
//!
//! ## Per turn
//!
//! ```text
//! 1. Drop turns of a force-ended utterance (until its closing turn)
//! 2. Word filters (speaker isolation, push-to-talk window)
//! 3. Command candidates → resolver → execute now / defer on the scheduler
//!    (skipped while the utterance is literal)
//! 4. Dictation through the keyword rewrite engine:
//!    turn mode  – formatted turns only
//!    live mode  – newly final words, holding back an unfinished tail
//! 5. On close: pending commands, remaining dictation, deferred newlines,
//!    cross-utterance carry, session reset
//! ```
//!
//! Time is always passed in. The dispatcher never sleeps; the engine actor
//! waits for `next_deadline()` and calls `fire_due`.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info, info_span, trace, warn};

use super::resolver::{resolve, Disposition, ResolverConfig};
use super::scheduler::{PendingExecutionKey, Scheduler, TimerKey};
use super::session::{CrossBoundaryState, PendingCommand, SessionCarryState, UtteranceSession};
use crate::automation::{AutomationHandle, KeyChord, KeyCode};
use crate::commands::{
    generate, invoke, CommandAction, CommandCandidate, CommandRegistry, GenerateContext,
};
use crate::config::{DictationMode, EngineSettings, SettingsHandle};
use crate::filter::{SpeakerIsolation, WordFilter};
use crate::ipc::events::{EngineEvent, ListeningMode, TranscriptTurn, Word};
use crate::keywords::{could_begin_keyword, rewrite, RewriteOptions, RewriteOutput, LITERAL_ESCAPE};
use crate::provider::ProviderHandle;
use crate::text::tokenize;

/// Counters for the host's diagnostics view.
#[derive(Default)]
pub struct DispatchDiagnostics {
    pub turns_in: AtomicUsize,
    pub turns_dropped: AtomicUsize,
    pub commands_executed: AtomicUsize,
    pub commands_deferred: AtomicUsize,
    pub chunks_typed: AtomicUsize,
    pub keywords_triggered: AtomicUsize,
}

impl DispatchDiagnostics {
    pub fn reset(&self) {
        self.turns_in.store(0, Ordering::Relaxed);
        self.turns_dropped.store(0, Ordering::Relaxed);
        self.commands_executed.store(0, Ordering::Relaxed);
        self.commands_deferred.store(0, Ordering::Relaxed);
        self.chunks_typed.store(0, Ordering::Relaxed);
        self.keywords_triggered.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            turns_in: self.turns_in.load(Ordering::Relaxed),
            turns_dropped: self.turns_dropped.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            commands_deferred: self.commands_deferred.load(Ordering::Relaxed),
            chunks_typed: self.chunks_typed.load(Ordering::Relaxed),
            keywords_triggered: self.keywords_triggered.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub turns_in: usize,
    pub turns_dropped: usize,
    pub commands_executed: usize,
    pub commands_deferred: usize,
    pub chunks_typed: usize,
    pub keywords_triggered: usize,
}

/// Collaborators the dispatcher talks to.
pub struct DispatcherContext {
    pub settings: SettingsHandle,
    pub automation: AutomationHandle,
    pub provider: Option<ProviderHandle>,
    pub event_tx: broadcast::Sender<EngineEvent>,
    pub diagnostics: Arc<DispatchDiagnostics>,
}

pub struct TurnDispatcher {
    ctx: DispatcherContext,
    /// Settings snapshot in effect for the current call.
    settings: EngineSettings,
    registry: CommandRegistry,
    mode: ListeningMode,
    session: UtteranceSession,
    carry: SessionCarryState,
    scheduler: Scheduler,
    speaker: SpeakerIsolation,
    /// An utterance is being closed; a force-end issued now needs no
    /// provider round-trip.
    closing: bool,
}

impl TurnDispatcher {
    pub fn new(ctx: DispatcherContext) -> Self {
        let settings = ctx.settings.snapshot();
        let registry = CommandRegistry::from_settings(&settings);
        Self {
            mode: settings.initial_mode,
            settings,
            registry,
            ctx,
            session: UtteranceSession::default(),
            carry: SessionCarryState::default(),
            scheduler: Scheduler::new(),
            speaker: SpeakerIsolation::new(),
            closing: false,
        }
    }

    pub fn mode(&self) -> ListeningMode {
        self.mode
    }

    pub fn session(&self) -> &UtteranceSession {
        &self.session
    }

    pub fn carry(&self) -> &SessionCarryState {
        &self.carry
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    pub fn handle_turn(&mut self, turn: &TranscriptTurn, now: Instant) {
        self.refresh_settings();
        self.ctx.diagnostics.turns_in.fetch_add(1, Ordering::Relaxed);

        if self.carry.force_end_pending.is_some() {
            self.ctx.diagnostics.turns_dropped.fetch_add(1, Ordering::Relaxed);
            if self.provider_closes(turn) {
                self.carry.force_end_pending = None;
                self.scheduler.cancel_key(&TimerKey::ForceEndTimeout);
                debug!("provider closed the force-ended utterance");
            } else {
                trace!("dropping turn of force-ended utterance");
            }
            return;
        }
        if std::mem::take(&mut self.carry.formatted_copy_expected)
            && !self.session.started
            && turn.end_of_turn
            && turn.is_formatted
        {
            self.ctx.diagnostics.turns_dropped.fetch_add(1, Ordering::Relaxed);
            trace!("formatted copy of a closed utterance");
            return;
        }
        if !self.session.started
            && turn.turn_order.is_some()
            && turn.turn_order == self.carry.last_closed_turn_order
        {
            self.ctx.diagnostics.turns_dropped.fetch_add(1, Ordering::Relaxed);
            trace!(turn_order = ?turn.turn_order, "late turn for closed utterance");
            return;
        }

        let words = self.filter_words(turn.effective_words().into_owned(), turn.speaker_id);
        if words.is_empty() && !self.session.started {
            trace!("empty turn outside an utterance");
            return;
        }

        let span = info_span!("utterance", generation = self.session.generation);
        let _enter = span.enter();

        if !self.session.started {
            self.begin_utterance(now);
        }
        self.session.turn_order = turn.turn_order.or(self.session.turn_order);
        self.session.words = words;

        let tokens = tokenize(&self.session.words);
        self.session.literal_escape = tokens.first().is_some_and(|t| t.token == LITERAL_ESCAPE);

        let closes = turn.end_of_turn
            && (self.settings.dictation_mode == DictationMode::Live
                || turn.is_formatted
                || !self.settings.await_formatted);

        let generation = self.session.generation;
        self.closing = closes;
        if !self.session.is_literal() {
            let candidates = generate(
                &self.registry,
                &GenerateContext {
                    words: &self.session.words,
                    tokens: &tokens,
                    mode: self.mode,
                    end_of_turn: turn.end_of_turn,
                    min_confidence: self.settings.min_command_confidence,
                },
            );
            self.process_candidates(candidates, now);
        }

        if self.session.generation == generation {
            if closes {
                self.carry.formatted_copy_expected =
                    !turn.is_formatted && self.settings.await_formatted;
                self.close_utterance(now);
            } else {
                self.emit_dictation(turn.is_formatted);
            }
        }
        self.closing = false;
    }

    /// Whether `turn` is the provider's last word on its utterance: with
    /// `await_formatted`, only the formatted end of turn counts.
    fn provider_closes(&self, turn: &TranscriptTurn) -> bool {
        turn.end_of_turn && (turn.is_formatted || !self.settings.await_formatted)
    }

    /// End the current utterance now instead of waiting for the provider.
    /// With `submit`, Enter is pressed after the flush.
    pub fn force_end(&mut self, submit: bool, now: Instant) {
        self.refresh_settings();
        let awaiting_provider = !self.closing && self.session.started;
        if self.session.started {
            info!(submit, "forcing end of utterance");
            self.close_utterance(now);
        } else {
            self.flush_newlines();
        }

        if awaiting_provider {
            self.carry.force_end_pending = Some(now);
            self.scheduler.reschedule(
                TimerKey::ForceEndTimeout,
                now + self.settings.force_end_timeout(),
            );
            if let Some(provider) = &self.ctx.provider {
                if let Err(e) = provider.0.lock().request_finalize() {
                    warn!("provider finalize request failed: {e}");
                }
            }
        }

        if submit {
            self.press(KeyChord::key(KeyCode::Return));
        }
    }

    /// Run every timer due at `now`.
    pub fn fire_due(&mut self, now: Instant) {
        self.refresh_settings();
        for key in self.scheduler.pop_due(now) {
            match key {
                TimerKey::Command(pending_key) => {
                    let Some(pending) = self.session.pending.remove(&pending_key) else {
                        trace!(key = %pending_key.key, "stale command timer");
                        continue;
                    };
                    if !self.mode_permits(&pending.candidate) {
                        debug!(key = %pending_key.key, "deferred command dropped after mode change");
                        continue;
                    }
                    let span = info_span!("utterance", generation = self.session.generation);
                    let _enter = span.enter();
                    debug!(key = %pending_key.key, "debounce elapsed");
                    self.execute(pending.candidate, now);
                    self.emit_dictation(false);
                }
                TimerKey::KeywordContinuation => {
                    match std::mem::take(&mut self.carry.boundary) {
                        CrossBoundaryState::AwaitingKeywordContinuation { fragment, .. } => {
                            debug!(%fragment, "continuation window expired");
                            self.type_fragment(&fragment);
                        }
                        other => self.carry.boundary = other,
                    }
                }
                TimerKey::ForceEndTimeout => {
                    if self.carry.force_end_pending.take().is_some() {
                        debug!("force-end timed out without a closing turn");
                    }
                }
            }
        }
    }

    pub fn set_mode(&mut self, mode: ListeningMode) {
        if self.mode == mode {
            return;
        }
        info!(from = ?self.mode, to = ?mode, "listening mode changed");
        self.mode = mode;
        let _ = self.ctx.event_tx.send(EngineEvent::ModeChanged { mode });
    }

    /// Drop all cross-utterance carry state and the locked speaker.
    pub fn clear_session(&mut self) {
        info!("session cleared");
        self.carry.clear();
        self.speaker.reset();
        self.scheduler.cancel_key(&TimerKey::KeywordContinuation);
    }

    // -----------------------------------------------------------------------
    // Utterance lifecycle
    // -----------------------------------------------------------------------

    fn begin_utterance(&mut self, now: Instant) {
        self.session.started = true;
        match std::mem::take(&mut self.carry.boundary) {
            CrossBoundaryState::Normal => {}
            CrossBoundaryState::Literal => {
                debug!("utterance inherits literal mode");
                self.session.carried_literal = true;
            }
            CrossBoundaryState::AwaitingKeywordContinuation { fragment, since } => {
                self.scheduler.cancel_key(&TimerKey::KeywordContinuation);
                if now.duration_since(since) <= self.settings.continuation_window() {
                    debug!(%fragment, "keyword fragment carried into utterance");
                    self.session.carried_fragment = Some(fragment);
                } else {
                    self.type_fragment(&fragment);
                }
            }
        }
    }

    fn close_utterance(&mut self, now: Instant) {
        let was_closing = std::mem::replace(&mut self.closing, true);
        let generation = self.session.generation;

        for pending in self.session.take_pending_before(usize::MAX) {
            self.scheduler
                .cancel_key(&TimerKey::Command(pending_key(&pending.candidate)));
            if !self.mode_permits(&pending.candidate) {
                continue;
            }
            self.run_command(pending.candidate, now);
            if self.session.generation != generation {
                self.closing = was_closing;
                return;
            }
        }

        let mut tail = RewriteOutput::default();
        if self.mode == ListeningMode::On {
            let from = self.session.next_unconsumed();
            let len = self.session.words.len();
            if from < len || self.session.carried_fragment.is_some() {
                tail = self.type_range(from, len, true);
            }
        }
        // A bare "say" may already have been consumed by a live chunk.
        let bare_say = self.session.literal_escape && tokenize(&self.session.words).len() == 1;

        self.flush_newlines();

        if let Some(fragment) = tail.withheld_fragment {
            debug!(%fragment, "withholding keyword fragment for next utterance");
            self.scheduler.reschedule(
                TimerKey::KeywordContinuation,
                now + self.settings.continuation_window(),
            );
            self.carry.boundary = CrossBoundaryState::AwaitingKeywordContinuation {
                fragment,
                since: now,
            };
        } else if self.mode == ListeningMode::On && (tail.literal_pending || bare_say) {
            debug!("next utterance is literal");
            self.carry.boundary = CrossBoundaryState::Literal;
        }

        debug!(
            command_fired = self.session.command_fired,
            words = self.session.words.len(),
            "utterance closed"
        );
        self.carry.last_closed_turn_order = self.session.turn_order;
        self.scheduler.cancel_commands();
        self.session = self.session.next();
        self.closing = was_closing;
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn process_candidates(&mut self, candidates: Vec<CommandCandidate>, now: Instant) {
        if candidates.is_empty() {
            return;
        }
        let config = ResolverConfig {
            command_delay: self.settings.command_delay(),
            pause_delay: self.settings.pause_delay(),
        };
        let generation = self.session.generation;
        for accepted in resolve(candidates, &mut self.session, &config, now) {
            if self.session.generation != generation {
                break;
            }
            for key in &accepted.preempts {
                debug!(key = %key.key, "pending command pre-empted");
                self.scheduler.cancel_key(&TimerKey::Command(key.clone()));
            }
            match accepted.disposition {
                Disposition::Execute => self.execute(accepted.candidate, now),
                Disposition::Defer { at } => {
                    let key = accepted.pending_key();
                    if self.scheduler.schedule(TimerKey::Command(key.clone()), at) {
                        debug!(
                            key = %key.key,
                            end = key.end_word_index,
                            "command deferred"
                        );
                        self.ctx
                            .diagnostics
                            .commands_deferred
                            .fetch_add(1, Ordering::Relaxed);
                        self.session.pending.insert(
                            key,
                            PendingCommand {
                                candidate: accepted.candidate,
                                due: at,
                            },
                        );
                    }
                }
            }
        }
    }

    /// Execute `candidate`, first running any pending command spoken before
    /// it so actions keep their spoken order.
    fn execute(&mut self, candidate: CommandCandidate, now: Instant) {
        let generation = self.session.generation;
        for pending in self.session.take_pending_before(candidate.start_word_index) {
            self.scheduler
                .cancel_key(&TimerKey::Command(pending_key(&pending.candidate)));
            self.run_command(pending.candidate, now);
            if self.session.generation != generation {
                return;
            }
        }
        self.run_command(candidate, now);
    }

    fn run_command(&mut self, candidate: CommandCandidate, now: Instant) {
        self.flush_before(candidate.start_word_index);
        self.session.consume_through(candidate.end_word_index);
        self.session.command_fired = true;
        self.ctx
            .diagnostics
            .commands_executed
            .fetch_add(1, Ordering::Relaxed);
        debug!(
            key = %candidate.key,
            start = candidate.start_word_index,
            end = candidate.end_word_index,
            prefixed = candidate.is_prefixed,
            "executing command"
        );

        let CommandCandidate { key, action, .. } = candidate;
        self.perform(&action, now);
        let _ = self
            .ctx
            .event_tx
            .send(EngineEvent::CommandExecuted { key, action });
    }

    fn perform(&mut self, action: &CommandAction, now: Instant) {
        match action {
            CommandAction::ModeChange { mode } => self.set_mode(*mode),
            CommandAction::Shortcut { chord } => self.press(*chord),
            CommandAction::TypeText { text } => self.type_text(text),
            CommandAction::Invoke { name, .. } => match name.as_str() {
                invoke::SCRATCH => self.scratch(),
                invoke::SUBMIT => self.force_end(true, now),
                invoke::FORCE_END => self.force_end(false, now),
                invoke::CLEAR_SESSION => self.clear_session(),
                other => trace!(name = other, "action forwarded to host"),
            },
        }
    }

    fn mode_permits(&self, candidate: &CommandCandidate) -> bool {
        self.mode == ListeningMode::On
            || matches!(
                candidate.action,
                CommandAction::ModeChange {
                    mode: ListeningMode::On
                }
            )
    }

    // -----------------------------------------------------------------------
    // Dictation
    // -----------------------------------------------------------------------

    /// Type the words between the last consumed index and `start`.
    fn flush_before(&mut self, start: usize) {
        if self.mode != ListeningMode::On {
            self.session.carried_fragment = None;
            return;
        }
        let from = self.session.next_unconsumed();
        if from >= start && self.session.carried_fragment.is_none() {
            return;
        }
        self.type_range(from, start.max(from), false);
    }

    /// Emit whatever dictation the current (non-closing) turn allows.
    fn emit_dictation(&mut self, formatted: bool) {
        if self.mode != ListeningMode::On || !self.session.started {
            return;
        }
        let limit = match self.settings.dictation_mode {
            DictationMode::Turn if formatted => self.session.words.len(),
            DictationMode::Turn => return,
            DictationMode::Live => self.live_limit(),
        };
        let limit = self
            .session
            .first_pending_start()
            .map_or(limit, |p| limit.min(p));
        let from = self.session.next_unconsumed();
        if from >= limit {
            return;
        }
        self.type_range(from, limit, false);
    }

    /// Exclusive end of the final words that can be typed now. A trailing
    /// run that could still grow into a keyword or command is held back.
    fn live_limit(&self) -> usize {
        let words = &self.session.words;
        let finals = words.iter().take_while(|w| !w.is_interim()).count();
        let from = self.session.next_unconsumed();
        if finals <= from || self.session.is_literal() {
            return finals;
        }
        let tokens = tokenize(&words[from..finals]);
        let tail: Vec<&str> = tokens.iter().map(|t| t.token.as_str()).collect();
        let mut hold = self.registry.unfinished_tail_len(&tail).min(tokens.len());
        if hold == 0 && tail.last().is_some_and(|t| could_begin_keyword(t)) {
            hold = 1;
        }
        if hold == 0 {
            return finals;
        }
        let first_held = from + tokens[tokens.len() - hold].word_index;
        trace!(held = finals - first_held, "holding back unfinished tail");
        first_held
    }

    /// Rewrite and type `words[from..to]`, marking them consumed.
    fn type_range(&mut self, from: usize, to: usize, closing: bool) -> RewriteOutput {
        let len = self.session.words.len();
        let (from, to) = (from.min(len), to.min(len));
        let fragment = self.session.carried_fragment.take();
        let carried_literal = self.session.carried_literal;
        let out = rewrite(
            &self.session.words[from..to],
            &RewriteOptions {
                gap_ceiling_secs: self.settings.keyword_gap_ceiling_secs(),
                vocabulary: &self.settings.literal_vocabulary,
                wake_tokens: self.registry.wake_tokens(),
                carried_fragment: fragment.as_deref(),
                at_utterance_start: from == 0 && !carried_literal,
                literal: carried_literal || (self.session.literal_escape && from > 0),
                withhold_trailing_fragment: closing && to == len,
            },
        );
        if to > from {
            self.session.consume_through(to - 1);
        }
        self.render(&out);
        out
    }

    fn type_fragment(&mut self, fragment: &str) {
        if self.mode != ListeningMode::On {
            return;
        }
        let out = rewrite(
            &[],
            &RewriteOptions {
                carried_fragment: Some(fragment),
                ..RewriteOptions::default()
            },
        );
        self.render(&out);
    }

    fn render(&mut self, out: &RewriteOutput) {
        if let Some(label) = &out.keyword_label {
            self.ctx
                .diagnostics
                .keywords_triggered
                .fetch_add(1, Ordering::Relaxed);
            let _ = self.ctx.event_tx.send(EngineEvent::KeywordTriggered {
                label: label.clone(),
            });
        }
        for _ in 0..out.leading_deletes {
            self.press(KeyChord::key(KeyCode::Delete));
        }
        self.carry.typed_tail.delete(out.leading_deletes);
        if out.text.is_empty() {
            return;
        }
        let mut text = String::with_capacity(out.text.len() + 1);
        let tail = &self.carry.typed_tail;
        if out.wants_leading_space
            && (tail.is_unknown() || tail.last_char().is_some_and(wants_space_after))
        {
            text.push(' ');
        }
        text.push_str(&out.text);
        self.type_text(&text);
    }

    fn type_text(&mut self, text: &str) {
        let terminal = self.ctx.automation.0.lock().foreground_is_terminal();
        let typed = if terminal && text.contains('\n') {
            self.carry.pending_newlines += text.matches('\n').count();
            text.replace('\n', "")
        } else {
            text.to_string()
        };
        if !typed.is_empty() {
            if let Err(e) = self.ctx.automation.0.lock().type_literal(&typed) {
                warn!("type_literal failed: {e}");
            }
        }
        self.carry.typed_tail.push(text);
        self.carry.last_chunk_len = typed.chars().count();
        self.ctx.diagnostics.chunks_typed.fetch_add(1, Ordering::Relaxed);
        debug!(chars = text.chars().count(), "dictation typed");
        let _ = self.ctx.event_tx.send(EngineEvent::DictationTyped {
            text: text.to_string(),
        });
    }

    /// Delete the most recent dictation chunk.
    fn scratch(&mut self) {
        let n = std::mem::take(&mut self.carry.last_chunk_len);
        debug!(chars = n, "scratching last chunk");
        for _ in 0..n {
            self.press(KeyChord::key(KeyCode::Delete));
        }
        self.carry.typed_tail.delete(n);
    }

    fn flush_newlines(&mut self) {
        let n = std::mem::take(&mut self.carry.pending_newlines);
        for _ in 0..n {
            self.press(KeyChord::key(KeyCode::Return));
        }
    }

    fn press(&mut self, chord: KeyChord) {
        if let Err(e) = self.ctx.automation.0.lock().press_chord(chord) {
            warn!(%chord, "press_chord failed: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn refresh_settings(&mut self) {
        let latest = self.ctx.settings.snapshot();
        if latest != self.settings {
            debug!("settings changed; rebuilding command registry");
            self.registry = CommandRegistry::from_settings(&latest);
            self.settings = latest;
        }
    }

    fn filter_words(&mut self, words: Vec<Word>, turn_speaker: Option<i32>) -> Vec<Word> {
        let mut words = words;
        if self.settings.isolate_speaker {
            words = self.speaker.apply(words, turn_speaker);
        }
        if let Some(mut window) = self.settings.push_to_talk {
            words = window.apply(words, turn_speaker);
        }
        words
    }
}

fn pending_key(candidate: &CommandCandidate) -> PendingExecutionKey {
    PendingExecutionKey {
        key: candidate.key.clone(),
        end_word_index: candidate.end_word_index,
    }
}

/// Whether a word typed after `c` needs a separating space.
fn wants_space_after(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | ',' | '?' | '!' | ':' | ';' | ')' | ']' | '}' | '%')
}
