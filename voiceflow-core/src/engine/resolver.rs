//! Conflict resolution: which candidates run, and when.

use std::time::{Duration, Instant};

use tracing::trace;

use super::scheduler::PendingExecutionKey;
use super::session::UtteranceSession;
use crate::commands::CommandCandidate;

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub command_delay: Duration,
    pub pause_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Execute,
    Defer { at: Instant },
}

/// A candidate that passed every gate.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub candidate: CommandCandidate,
    pub disposition: Disposition,
    /// Pending executions whose spans this candidate covers; they are void.
    pub preempts: Vec<PendingExecutionKey>,
}

impl Accepted {
    pub fn pending_key(&self) -> PendingExecutionKey {
        PendingExecutionKey {
            key: self.candidate.key.clone(),
            end_word_index: self.candidate.end_word_index,
        }
    }
}

/// Order and filter `candidates` against the session. Accepted end indices
/// are recorded in `session` before returning; pre-empted entries are removed
/// from `session.pending` (their timers are the caller's to cancel).
pub fn resolve(
    mut candidates: Vec<CommandCandidate>,
    session: &mut UtteranceSession,
    config: &ResolverConfig,
    now: Instant,
) -> Vec<Accepted> {
    candidates.sort_by(|a, b| {
        a.start_word_index
            .cmp(&b.start_word_index)
            .then(b.end_word_index.cmp(&a.end_word_index))
    });

    let mut accepted: Vec<Accepted> = Vec::new();
    for (idx, c) in candidates.iter().enumerate() {
        if !c.is_actionable() {
            trace!(key = %c.key, "candidate unstable");
            continue;
        }
        if session
            .last_executed_end
            .get(&c.key)
            .is_some_and(|&end| c.end_word_index <= end)
        {
            trace!(key = %c.key, end = c.end_word_index, "already executed");
            continue;
        }
        if accepted.iter().any(|a| a.candidate.overlaps(c)) {
            trace!(key = %c.key, "overlaps accepted candidate");
            continue;
        }
        if session
            .halted_through
            .is_some_and(|h| c.start_word_index <= h)
        {
            trace!(key = %c.key, "behind halting command");
            continue;
        }
        if session
            .consumed_through
            .is_some_and(|h| c.start_word_index <= h)
        {
            trace!(key = %c.key, "words already consumed");
            continue;
        }

        session
            .last_executed_end
            .insert(c.key.clone(), c.end_word_index);

        let followed = candidates[idx + 1..]
            .iter()
            .any(|o| o.is_actionable() && o.start_word_index == c.end_word_index + 1);
        let delay = if c.requires_pause {
            config.command_delay.max(config.pause_delay)
        } else {
            config.command_delay
        };
        let disposition = if c.is_prefixed || c.halts_processing || delay.is_zero() || followed {
            Disposition::Execute
        } else {
            Disposition::Defer { at: now + delay }
        };

        let preempts: Vec<PendingExecutionKey> = session
            .pending
            .iter()
            .filter(|(_, p)| p.candidate.overlaps(c))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &preempts {
            session.pending.remove(key);
        }

        accepted.push(Accepted {
            candidate: c.clone(),
            disposition,
            preempts,
        });

        if c.halts_processing {
            session.halted_through = Some(c.end_word_index);
            break;
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandAction;
    use crate::engine::session::PendingCommand;

    const CONFIG: ResolverConfig = ResolverConfig {
        command_delay: Duration::from_millis(300),
        pause_delay: Duration::from_millis(800),
    };

    fn cand(key: &str, start: usize, end: usize) -> CommandCandidate {
        CommandCandidate {
            key: key.into(),
            start_word_index: start,
            end_word_index: end,
            is_prefixed: false,
            is_stable: true,
            requires_pause: false,
            halts_processing: false,
            skip_stability_check: false,
            action: CommandAction::TypeText { text: key.into() },
        }
    }

    #[test]
    fn idempotent_across_turns() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        let first = resolve(vec![cand("system.undo", 0, 1)], &mut session, &CONFIG, now);
        assert_eq!(first.len(), 1);
        let again = resolve(vec![cand("system.undo", 0, 1)], &mut session, &CONFIG, now);
        assert!(again.is_empty());
    }

    #[test]
    fn unstable_candidates_wait() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        let mut c = cand("system.undo", 0, 1);
        c.is_stable = false;
        assert!(resolve(vec![c.clone()], &mut session, &CONFIG, now).is_empty());
        c.skip_stability_check = true;
        assert_eq!(resolve(vec![c], &mut session, &CONFIG, now).len(), 1);
    }

    #[test]
    fn longest_match_wins_at_same_start() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        let out = resolve(
            vec![cand("short", 0, 1), cand("long", 0, 2)],
            &mut session,
            &CONFIG,
            now,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate.key, "long");
    }

    #[test]
    fn dispositions() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        let mut prefixed = cand("p", 0, 1);
        prefixed.is_prefixed = true;
        let plain = cand("plain", 3, 4);
        let mut paused = cand("paused", 6, 7);
        paused.requires_pause = true;
        let out = resolve(vec![prefixed, plain, paused], &mut session, &CONFIG, now);
        assert_eq!(out[0].disposition, Disposition::Execute);
        assert_eq!(
            out[1].disposition,
            Disposition::Defer {
                at: now + CONFIG.command_delay
            }
        );
        assert_eq!(
            out[2].disposition,
            Disposition::Defer {
                at: now + CONFIG.pause_delay
            }
        );
    }

    #[test]
    fn candidate_followed_by_another_runs_now() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        let out = resolve(
            vec![cand("a", 0, 1), cand("b", 2, 3)],
            &mut session,
            &CONFIG,
            now,
        );
        assert_eq!(out[0].disposition, Disposition::Execute);
        assert!(matches!(out[1].disposition, Disposition::Defer { .. }));
    }

    #[test]
    fn halting_stops_the_pass_and_blocks_earlier_starts() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        let mut halt = cand("halt", 0, 1);
        halt.halts_processing = true;
        let out = resolve(
            vec![halt, cand("after", 2, 3)],
            &mut session,
            &CONFIG,
            now,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(session.halted_through, Some(1));
        assert_eq!(
            resolve(vec![cand("after", 2, 3)], &mut session, &CONFIG, now).len(),
            1
        );
        assert!(resolve(vec![cand("inside", 1, 2)], &mut session, &CONFIG, now).is_empty());
    }

    #[test]
    fn longer_phrase_preempts_pending_shorter_one() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        let short = cand("system.window_recent", 0, 1);
        session.pending.insert(
            PendingExecutionKey {
                key: short.key.clone(),
                end_word_index: 1,
            },
            PendingCommand {
                candidate: short.clone(),
                due: now,
            },
        );
        session.last_executed_end.insert(short.key.clone(), 1);

        let out = resolve(
            vec![short, cand("system.window_recent", 0, 2)],
            &mut session,
            &CONFIG,
            now,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate.end_word_index, 2);
        assert_eq!(out[0].preempts.len(), 1);
        assert!(session.pending.is_empty());
    }

    #[test]
    fn consumed_words_cannot_start_a_command() {
        let now = Instant::now();
        let mut session = UtteranceSession::default();
        session.consume_through(2);
        assert!(resolve(vec![cand("late", 1, 3)], &mut session, &CONFIG, now).is_empty());
    }
}
