//! Single-pass keyword rewrite over a run of dictated words.

use super::punctuation::{self, Attach, SpokenPunctuation};
use super::vocabulary::apply_vocabulary;
use super::{is_command_starter, parse_count, CARRY_FRAGMENTS, LITERAL_ESCAPE};
use crate::config::VocabularyEntry;
use crate::ipc::events::Word;
use crate::text::{gap_acceptable, normalize};

/// Maximum number of words folded into one `@tag` / `#tag`.
const MAX_TAG_WORDS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions<'a> {
    /// Longest silence (seconds) allowed inside a multi-word keyword.
    pub gap_ceiling_secs: f64,
    pub vocabulary: &'a [VocabularyEntry],
    /// Normalized wake phrase tokens; they end tag groups.
    pub wake_tokens: &'a [String],
    /// Fragment withheld by the previous utterance, replayed as a virtual
    /// first word.
    pub carried_fragment: Option<&'a str>,
    /// The words start the utterance, so a leading "say" escapes the rest.
    pub at_utterance_start: bool,
    /// Type everything verbatim.
    pub literal: bool,
    /// These words close the utterance: withhold a trailing bare fragment.
    pub withhold_trailing_fragment: bool,
}

impl Default for RewriteOptions<'_> {
    fn default() -> Self {
        Self {
            gap_ceiling_secs: 1.2,
            vocabulary: &[],
            wake_tokens: &[],
            carried_fragment: None,
            at_utterance_start: false,
            literal: false,
            withhold_trailing_fragment: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutput {
    /// Text to type after the deletes.
    pub text: String,
    /// Delete presses owed to text typed by earlier chunks. Always issued
    /// before `text`.
    pub leading_deletes: usize,
    /// First keyword that fired, for UI feedback.
    pub keyword_label: Option<String>,
    pub withheld_fragment: Option<String>,
    /// The words were a bare "say": the next utterance is literal.
    pub literal_pending: bool,
    /// The text begins with a word-like piece that should be separated from
    /// previously typed text.
    pub wants_leading_space: bool,
}

/// Rewrite `words` into output text.
pub fn rewrite(words: &[Word], opts: &RewriteOptions<'_>) -> RewriteOutput {
    let mut pieces = Vec::with_capacity(words.len() + 1);
    if let Some(fragment) = opts.carried_fragment {
        pieces.push(Piece {
            raw: fragment,
            token: normalize(fragment),
            word: None,
        });
    }
    let first_real = pieces.len();
    pieces.extend(words.iter().map(|w| Piece {
        raw: w.text.as_str(),
        token: normalize(&w.text),
        word: Some(w),
    }));

    let mut rewriter = Rewriter {
        pieces,
        first_real,
        opts,
        buf: Buffer::default(),
        label: None,
        withheld: None,
        literal_pending: false,
    };
    rewriter.run();
    rewriter.finish()
}

struct Piece<'w> {
    raw: &'w str,
    token: String,
    word: Option<&'w Word>,
}

impl Piece<'_> {
    fn close_to(&self, next: &Piece<'_>, ceiling: f64) -> bool {
        match (self.word, next.word) {
            (Some(a), Some(b)) => gap_acceptable(a, b, ceiling),
            _ => true,
        }
    }
}

/// Output buffer with separator bookkeeping.
#[derive(Default)]
struct Buffer {
    text: String,
    deletes: usize,
    /// Suppress the separator before the next piece.
    glue_next: bool,
    lower_next: bool,
    started: bool,
    wants_leading_space: bool,
}

impl Buffer {
    fn begin(&mut self, spaced: bool) {
        if !self.started {
            self.started = true;
            self.wants_leading_space = spaced && !self.glue_next;
        }
    }

    fn needs_separator(&self) -> bool {
        !self.glue_next && self.text.chars().last().is_some_and(|c| !c.is_whitespace())
    }

    fn push_spaced(&mut self, piece: &str) {
        self.begin(true);
        if self.needs_separator() {
            self.text.push(' ');
        }
        self.text.push_str(piece);
        self.glue_next = false;
    }

    fn push_word(&mut self, word: &str) {
        if std::mem::take(&mut self.lower_next) {
            self.push_spaced(&word.to_lowercase());
        } else {
            self.push_spaced(word);
        }
    }

    fn push_attached(&mut self, piece: &str) {
        self.begin(false);
        self.text.push_str(piece);
        self.glue_next = false;
    }

    fn push_punctuation(&mut self, mark: &SpokenPunctuation) {
        match mark.attach {
            Attach::Closing => self.push_attached(mark.text),
            Attach::Spaced => self.push_spaced(mark.text),
            Attach::Opening => {
                self.push_spaced(mark.text);
                self.glue_next = true;
            }
            Attach::Joining => {
                self.push_attached(mark.text);
                self.glue_next = true;
            }
        }
    }

    /// Remove `n` characters, buffered ones first; the rest are owed as real
    /// delete presses.
    fn backspace(&mut self, n: usize) {
        let mut remaining = n;
        while remaining > 0 && self.text.pop().is_some() {
            remaining -= 1;
        }
        self.deletes += remaining;
        if self.text.is_empty() {
            // The next piece leads the chunk again.
            self.started = false;
        }
    }
}

struct Rewriter<'w, 'o> {
    pieces: Vec<Piece<'w>>,
    first_real: usize,
    opts: &'o RewriteOptions<'o>,
    buf: Buffer,
    label: Option<String>,
    withheld: Option<String>,
    literal_pending: bool,
}

impl Rewriter<'_, '_> {
    fn hit(&mut self, label: &str) {
        if self.label.is_none() {
            self.label = Some(label.to_string());
        }
    }

    /// Token of the piece after `i`, if it is close enough in time to pair
    /// with it.
    fn next_token(&self, i: usize) -> Option<&str> {
        let next = self.pieces.get(i + 1)?;
        self.pieces[i]
            .close_to(next, self.opts.gap_ceiling_secs)
            .then_some(next.token.as_str())
    }

    fn run(&mut self) {
        if self.opts.literal {
            for i in 0..self.pieces.len() {
                let raw = self.pieces[i].raw;
                self.buf.push_spaced(raw);
            }
            return;
        }

        let mut i = 0;
        while i < self.pieces.len() {
            if i == self.first_real
                && self.opts.at_utterance_start
                && self.pieces[i].token == LITERAL_ESCAPE
            {
                self.hit(LITERAL_ESCAPE);
                if i + 1 == self.pieces.len() {
                    self.literal_pending = true;
                }
                for j in i + 1..self.pieces.len() {
                    let raw = self.pieces[j].raw;
                    self.buf.push_spaced(raw);
                }
                return;
            }
            i += self.step(i);
        }
    }

    /// Handle the piece at `i` and return how many pieces were consumed.
    fn step(&mut self, i: usize) -> usize {
        let token = self.pieces[i].token.clone();
        let next = self.next_token(i).map(str::to_string);
        let next = next.as_deref();

        match (token.as_str(), next) {
            ("", _) => {
                let raw = self.pieces[i].raw;
                self.buf.push_attached(raw);
                1
            }
            ("no", Some("caps")) | ("nocaps", _) => {
                self.buf.lower_next = true;
                self.hit("no caps");
                if token == "no" { 2 } else { 1 }
            }
            ("letter", Some(_)) => {
                let letter = self.pieces[i + 1].raw.chars().find(|c| c.is_alphanumeric());
                match letter {
                    Some(c) => {
                        self.buf.push_word(&c.to_string());
                        self.hit("letter");
                        2
                    }
                    None => self.plain(i),
                }
            }
            ("new", Some("line")) | ("newline", _) => {
                self.buf.push_attached("\n");
                self.hit("new line");
                if token == "new" { 2 } else { 1 }
            }
            ("new", Some("paragraph")) => {
                self.buf.push_attached("\n\n");
                self.hit("new paragraph");
                2
            }
            ("space", Some("bar")) | ("spacebar", _) => {
                self.buf.push_attached(" ");
                self.hit("space bar");
                if token == "space" { 2 } else { 1 }
            }
            ("no", Some("space")) | ("nospace", _) => {
                self.buf.glue_next = true;
                self.hit("no space");
                if token == "no" { 2 } else { 1 }
            }
            ("backspace", _) => 1 + self.backspace(i),
            ("back", Some("space")) => 2 + self.backspace(i + 1),
            ("at", Some("sign")) => 2 + self.tag('@', i + 1),
            ("hashtag", _) => 1 + self.tag('#', i),
            ("hash", Some("tag")) => 2 + self.tag('#', i + 1),
            (tok, Some(second)) if punctuation::pair(tok, second).is_some() => {
                if let Some(mark) = punctuation::pair(tok, second) {
                    self.buf.push_punctuation(mark);
                    self.hit(&mark.phrase.join(" "));
                }
                2
            }
            (tok, _) if punctuation::single(tok).is_some() => {
                if let Some(mark) = punctuation::single(tok) {
                    self.buf.push_punctuation(mark);
                    self.hit(tok);
                }
                1
            }
            (tok, _)
                if self.opts.withhold_trailing_fragment
                    && i + 1 == self.pieces.len()
                    && CARRY_FRAGMENTS.contains(&tok) =>
            {
                self.withheld = Some(self.pieces[i].raw.to_string());
                1
            }
            _ => self.plain(i),
        }
    }

    fn plain(&mut self, i: usize) -> usize {
        let raw = self.pieces[i].raw;
        self.buf.push_word(raw);
        1
    }

    /// Apply a backspace keyword whose last word sits at `last`. Returns the
    /// number of extra pieces consumed by an explicit count.
    fn backspace(&mut self, last: usize) -> usize {
        self.hit("backspace");
        match self.next_token(last).and_then(parse_count) {
            Some(n) => {
                self.buf.backspace(n);
                1
            }
            None => {
                self.buf.backspace(1);
                0
            }
        }
    }

    /// Fold up to `MAX_TAG_WORDS` words after `last` into one tag. Returns
    /// the number of words folded.
    fn tag(&mut self, prefix: char, last: usize) -> usize {
        self.hit(if prefix == '@' { "at sign" } else { "hashtag" });
        let mut tag = String::from(prefix);
        let mut taken = 0;
        let mut at = last;
        while taken < MAX_TAG_WORDS {
            let Some(token) = self.next_token(at) else {
                break;
            };
            if token.is_empty() || is_command_starter(token, self.opts.wake_tokens) {
                break;
            }
            at += 1;
            taken += 1;
            tag.extend(self.pieces[at].raw.chars().filter(|c| c.is_alphanumeric()));
        }
        self.buf.push_word(&tag);
        taken
    }

    fn finish(self) -> RewriteOutput {
        let text = if self.opts.vocabulary.is_empty() {
            self.buf.text
        } else {
            apply_vocabulary(&self.buf.text, self.opts.vocabulary)
        };
        RewriteOutput {
            text,
            leading_deletes: self.buf.deletes,
            keyword_label: self.label,
            withheld_fragment: self.withheld,
            literal_pending: self.literal_pending,
            wants_leading_space: self.buf.wants_leading_space,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<Word> {
        text.split_whitespace().map(Word::new).collect()
    }

    fn run(text: &str) -> RewriteOutput {
        rewrite(&words(text), &RewriteOptions::default())
    }

    #[test]
    fn plain_words_are_space_separated() {
        let out = run("hello there world");
        assert_eq!(out.text, "hello there world");
        assert!(out.keyword_label.is_none());
        assert!(out.wants_leading_space);
    }

    #[test]
    fn backspace_consumes_buffer_first() {
        let out = run("hello world backspace 5");
        assert_eq!(out.text, "hello ");
        assert_eq!(out.leading_deletes, 0);
        assert_eq!(out.keyword_label.as_deref(), Some("backspace"));
    }

    #[test]
    fn backspace_remainder_becomes_real_deletes() {
        let out = run("hello backspace 20");
        assert_eq!(out.text, "");
        assert_eq!(out.leading_deletes, 15);
    }

    #[test]
    fn back_space_with_number_word_and_default_count() {
        assert_eq!(run("abc back space two").text, "a");
        assert_eq!(run("abc backspace").text, "ab");
        let out = run("backspace three then more");
        assert_eq!(out.leading_deletes, 3);
        assert_eq!(out.text, "then more");
    }

    #[test]
    fn punctuation_attaches_by_class() {
        assert_eq!(run("hello comma world period").text, "hello, world.");
        assert_eq!(
            run("call open paren maybe close paren now").text,
            "call (maybe) now"
        );
        assert_eq!(run("well hyphen known").text, "well-known");
        assert_eq!(run("this ampersand that").text, "this & that");
        assert_eq!(run("really question mark").text, "really?");
    }

    #[test]
    fn structural_keywords() {
        assert_eq!(run("one new line two").text, "one\ntwo");
        assert_eq!(run("one new paragraph two").text, "one\n\ntwo");
        let spaced = run("space bar b");
        assert_eq!(spaced.text, " b");
        assert!(!spaced.wants_leading_space);
        assert_eq!(run("foot no space ball").text, "football");
        assert_eq!(run("no caps Hello World").text, "hello World");
        assert_eq!(run("letter B letter c").text, "B c");
    }

    #[test]
    fn multi_word_keyword_needs_small_gap() {
        let split = vec![
            Word::new("new").with_timing(0.0, 0.2),
            Word::new("line").with_timing(3.0, 3.2),
        ];
        assert_eq!(rewrite(&split, &RewriteOptions::default()).text, "new line");

        let tight = vec![
            Word::new("new").with_timing(0.0, 0.2),
            Word::new("line").with_timing(0.4, 0.6),
        ];
        assert_eq!(rewrite(&tight, &RewriteOptions::default()).text, "\n");
    }

    #[test]
    fn tags_fold_following_words() {
        assert_eq!(run("ping at sign john smith").text, "ping @johnsmith");
        assert_eq!(run("hashtag rust lang rocks").text, "#rustlangrocks");
        assert_eq!(run("hashtag a b c d e").text, "#abcd e");
        assert_eq!(run("hashtag rust comma").text, "#rust,");
    }

    #[test]
    fn leading_say_escapes_keywords() {
        let opts = RewriteOptions {
            at_utterance_start: true,
            ..RewriteOptions::default()
        };
        let out = rewrite(&words("say new line period"), &opts);
        assert_eq!(out.text, "new line period");
        assert_eq!(out.keyword_label.as_deref(), Some("say"));

        let bare = rewrite(&words("say"), &opts);
        assert!(bare.literal_pending);
        assert!(bare.text.is_empty());

        assert_eq!(run("I say comma").text, "I say,");
    }

    #[test]
    fn literal_mode_is_verbatim_with_vocabulary() {
        let vocab = [VocabularyEntry {
            term: "Voiceflow".into(),
            aliases: vec!["voice flow".into()],
            enabled: true,
        }];
        let opts = RewriteOptions {
            literal: true,
            vocabulary: &vocab,
            ..RewriteOptions::default()
        };
        let out = rewrite(&words("open voice flow comma"), &opts);
        assert_eq!(out.text, "open Voiceflow comma");
    }

    #[test]
    fn trailing_fragment_is_withheld_only_when_closing() {
        let closing = RewriteOptions {
            withhold_trailing_fragment: true,
            ..RewriteOptions::default()
        };
        let out = rewrite(&words("first part new"), &closing);
        assert_eq!(out.text, "first part");
        assert_eq!(out.withheld_fragment.as_deref(), Some("new"));

        assert_eq!(run("first part new").text, "first part new");
    }

    #[test]
    fn carried_fragment_completes_keyword() {
        let opts = RewriteOptions {
            carried_fragment: Some("new"),
            at_utterance_start: true,
            ..RewriteOptions::default()
        };
        let out = rewrite(&words("line second"), &opts);
        assert_eq!(out.text, "\nsecond");
        assert!(!out.wants_leading_space);

        let unrelated = rewrite(&words("idea here"), &opts);
        assert_eq!(unrelated.text, "new idea here");
    }

    #[test]
    fn leading_punctuation_does_not_want_space() {
        let out = run("comma then");
        assert_eq!(out.text, ", then");
        assert!(!out.wants_leading_space);
        assert!(!run("no space ing").wants_leading_space);
    }

    #[test]
    fn word_after_erased_punctuation_wants_space() {
        let out = run("comma backspace 2 there");
        assert_eq!(out.leading_deletes, 1);
        assert_eq!(out.text, "there");
        assert!(out.wants_leading_space);
    }
}
