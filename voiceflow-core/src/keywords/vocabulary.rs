//! Custom vocabulary: rewrite recogniser variants to their canonical spelling.

use crate::config::VocabularyEntry;

/// Replace every enabled alias in `text` with its entry's term, whole-word
/// and case-aware. Longer aliases are applied first so "voice flow" wins over
/// a hypothetical "voice".
pub fn apply_vocabulary(text: &str, entries: &[VocabularyEntry]) -> String {
    let mut pairs: Vec<(&str, &str)> = entries
        .iter()
        .filter(|e| e.enabled)
        .flat_map(|e| {
            e.aliases
                .iter()
                .map(move |alias| (alias.trim(), e.term.trim()))
        })
        .filter(|(alias, term)| !alias.is_empty() && !term.is_empty())
        .collect();
    pairs.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.chars().count()));

    pairs.into_iter().fold(text.to_string(), |acc, (alias, term)| {
        replace_word_case_aware(&acc, alias, term)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

/// Case-insensitive whole-word replacement. The replacement copies the
/// capitalisation style of the text it replaces.
fn replace_word_case_aware(text: &str, needle: &str, replacement: &str) -> String {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() || text.is_empty() {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;
    while i < chars.len() {
        let end = i + needle.len();
        let hit = end <= chars.len()
            && chars[i..end]
                .iter()
                .zip(&needle)
                .all(|(c, n)| c.to_lowercase().eq(std::iter::once(*n)))
            && (i == 0 || !is_word_char(chars[i - 1]))
            && (end == chars.len() || !is_word_char(chars[end]));
        if hit {
            let source: String = chars[i..end].iter().collect();
            out.push_str(&match_case(&source, replacement));
            i = end;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn match_case(source: &str, replacement: &str) -> String {
    let letters: Vec<char> = source.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    if letters.first().is_some_and(|c| c.is_uppercase()) {
        let mut chars = replacement.chars();
        if let Some(first) = chars.next() {
            return first.to_uppercase().chain(chars).collect();
        }
    }
    replacement.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(term: &str, aliases: &[&str]) -> VocabularyEntry {
        VocabularyEntry {
            term: term.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            enabled: true,
        }
    }

    #[test]
    fn replaces_whole_words_only() {
        let vocab = [entry("Kubernetes", &["cooper netties"])];
        assert_eq!(
            apply_vocabulary("deploy to cooper netties now", &vocab),
            "deploy to Kubernetes now"
        );
        assert_eq!(
            apply_vocabulary("cooper nettiesque", &vocab),
            "cooper nettiesque"
        );
    }

    #[test]
    fn follows_source_capitalisation() {
        let vocab = [entry("postgres", &["post grass"])];
        assert_eq!(apply_vocabulary("Post grass rocks", &vocab), "Postgres rocks");
        assert_eq!(apply_vocabulary("POST GRASS", &vocab), "POSTGRES");
    }

    #[test]
    fn disabled_entries_are_ignored() {
        let mut e = entry("Rust", &["rusty"]);
        e.enabled = false;
        assert_eq!(apply_vocabulary("rusty", &[e]), "rusty");
    }

    #[test]
    fn longer_alias_wins() {
        let vocab = [entry("VF", &["voice"]), entry("Voiceflow", &["voice flow"])];
        assert_eq!(apply_vocabulary("voice flow and voice", &vocab), "Voiceflow and VF");
    }
}
