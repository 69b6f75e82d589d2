//! Turn → command candidates.

use tracing::trace;

use super::registry::{CommandClass, CommandRegistry, CommandSpec};
use super::{press, system, CommandAction, CommandCandidate};
use crate::ipc::events::{ListeningMode, Word};
use crate::text::{find_matches, is_stable, NormalizedToken};

/// Everything the generator needs to know about the current turn.
#[derive(Debug, Clone, Copy)]
pub struct GenerateContext<'a> {
    pub words: &'a [Word],
    pub tokens: &'a [NormalizedToken],
    pub mode: ListeningMode,
    /// The turn closes the utterance; its words can no longer change.
    pub end_of_turn: bool,
    pub min_confidence: f32,
}

/// All command candidates present in the turn, unordered.
pub fn generate(registry: &CommandRegistry, ctx: &GenerateContext<'_>) -> Vec<CommandCandidate> {
    let token_strs: Vec<&str> = ctx.tokens.iter().map(|t| t.token.as_str()).collect();
    let mut out = Vec::new();

    for spec in registry.specs() {
        if !class_allowed(spec.class, ctx.mode) {
            continue;
        }
        for span in find_matches(&spec.phrase, ctx.tokens) {
            let prefix = registry.wake_prefix_len(&token_strs, span.start);
            let start = span.start - prefix.unwrap_or(0);
            if spec.class.is_anchored() && prefix.is_none() && start != 0 {
                trace!(key = %spec.key, "mode command not at utterance start");
                continue;
            }
            if ctx.mode == ListeningMode::Off && prefix.is_none() {
                continue;
            }
            if let Some(candidate) = build(spec, ctx, start, span.end, prefix.is_some()) {
                out.push(candidate);
            }
        }
    }

    if ctx.mode == ListeningMode::On {
        for (pos, _) in token_strs
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == press::TRIGGER)
        {
            let prefix = registry.wake_prefix_len(&token_strs, pos);
            let Some(found) = press::parse_at(&token_strs, pos, prefix.is_some()) else {
                continue;
            };
            let spec = CommandSpec {
                key: system::PRESS.to_string(),
                phrase: Vec::new(),
                action: CommandAction::Shortcut { chord: found.chord },
                class: CommandClass::Ordinary,
                halts_processing: false,
                requires_pause: false,
            };
            let start = pos - prefix.unwrap_or(0);
            if let Some(candidate) = build(&spec, ctx, start, found.end, prefix.is_some()) {
                out.push(candidate);
            }
        }
    }

    out
}

fn class_allowed(class: CommandClass, mode: ListeningMode) -> bool {
    match mode {
        ListeningMode::On => true,
        ListeningMode::Sleep | ListeningMode::Off => class == CommandClass::Wake,
    }
}

/// Turn a token-position match into a word-index candidate, applying the
/// stability and confidence gates.
fn build(
    spec: &CommandSpec,
    ctx: &GenerateContext<'_>,
    start_token: usize,
    end_token: usize,
    prefixed: bool,
) -> Option<CommandCandidate> {
    let start_word_index = ctx.tokens[start_token].word_index;
    let end_word_index = ctx.tokens[end_token].word_index;

    let low_confidence = ctx.words[start_word_index..=end_word_index]
        .iter()
        .any(|w| w.confidence.is_some_and(|c| c < ctx.min_confidence));
    if low_confidence {
        trace!(key = %spec.key, "command dropped below confidence threshold");
        return None;
    }

    Some(CommandCandidate {
        key: spec.key.clone(),
        start_word_index,
        end_word_index,
        is_prefixed: prefixed,
        is_stable: prefixed || is_stable(ctx.words, start_word_index..=end_word_index),
        requires_pause: spec.requires_pause,
        halts_processing: spec.halts_processing,
        skip_stability_check: ctx.end_of_turn,
        action: spec.action.clone(),
    })
}
