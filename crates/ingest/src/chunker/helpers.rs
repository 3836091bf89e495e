//! Text utilities backing the chunker.
//!
//! All length arithmetic is in characters (Unicode scalar values), not
//! bytes, so multi-byte text cannot blow past the configured chunk size.

use std::sync::OnceLock;

use regex::Regex;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"))
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence pattern is valid"))
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Strip markup remnants and normalize whitespace while keeping paragraph
/// boundaries intact. Blank-line runs separate paragraphs; within a
/// paragraph, any whitespace run collapses to a single space.
pub(crate) fn clean_paragraphs(text: &str) -> Vec<String> {
    let stripped = tag_re().replace_all(text, " ");
    paragraph_re()
        .split(&stripped)
        .map(|para| ws_re().replace_all(para, " ").trim().to_string())
        .filter(|para| !para.is_empty())
        .collect()
}

/// Split on sentence-ending punctuation followed by whitespace. The
/// terminator stays with its sentence; the trailing fragment is kept even
/// without a terminator. Text with no terminators comes back whole.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for m in sentence_re().find_iter(text) {
        // The terminator is a single ASCII char; keep it, drop the
        // whitespace that follows.
        let sentence = text[last..m.start() + 1].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Last `overlap` characters of `text`, used to seed the next chunk.
pub(crate) fn overlap_tail(text: &str, overlap: usize) -> String {
    let len = char_len(text);
    if len <= overlap {
        return text.to_string();
    }
    let skip = len - overlap;
    text.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_tags_and_collapses_whitespace_within_paragraphs() {
        let paras = clean_paragraphs("<p>first   para</p>\n\n  second\tpara  ");
        assert_eq!(paras, vec!["first para", "second para"]);
    }

    #[test]
    fn clean_drops_empty_paragraphs() {
        let paras = clean_paragraphs("one\n\n\n   \n\ntwo");
        assert_eq!(paras, vec!["one", "two"]);
    }

    #[test]
    fn sentences_keep_terminators() {
        let s = split_sentences("First. Second! Third? Trailing fragment");
        assert_eq!(s, vec!["First.", "Second!", "Third?", "Trailing fragment"]);
    }

    #[test]
    fn unpunctuated_text_is_one_sentence() {
        let s = split_sentences("no terminators here at all");
        assert_eq!(s, vec!["no terminators here at all"]);
    }

    #[test]
    fn overlap_tail_counts_characters() {
        assert_eq!(overlap_tail("abcdef", 3), "def");
        assert_eq!(overlap_tail("ab", 5), "ab");
        // 4 two-byte characters, tail of 2.
        assert_eq!(overlap_tail("éééé", 2), "éé");
    }
}
