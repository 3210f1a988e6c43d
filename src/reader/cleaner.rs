//! Text helpers for deep reads: cleanup, sentence-level summaries and the plain-language
//! explanation shown above an excerpt.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::NO_SUMMARY;

const NO_EXCERPT: &str = "No excerpt available, open the original link for the full text.";
const DEFAULT_IMPACT: &str = "The author highlights a practice you can apply directly.";

/// Decode entities, replace tags with spaces, collapse whitespace.
pub fn clean_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));

    let decoded = html_escape::decode_html_entities(text);
    let stripped = re_tags.replace_all(&decoded, " ");
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？')
}

/// Split after sentence punctuation that is followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        cur.push(c);
        if is_terminator(c) && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            out.push(std::mem::take(&mut cur));
        }
    }
    out.push(cur);
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Cut to `max_chars`, ending with `…` when shortened.
pub fn truncate_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", head.trim_end())
}

/// First `max_sentences` sentences of the cleaned text, capped at `max_chars`.
pub fn summarize_text(text: &str, max_sentences: usize, max_chars: usize) -> String {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return NO_SUMMARY.to_string();
    }
    let sentences = split_sentences(&cleaned);
    let summary = if sentences.is_empty() {
        cleaned
    } else {
        sentences
            .iter()
            .take(max_sentences)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let summary = truncate_ellipsis(summary.trim(), max_chars);
    if summary.is_empty() {
        NO_SUMMARY.to_string()
    } else {
        summary
    }
}

/// Excerpt block for the deep-read message.
pub fn deep_read_snippet(body: &str, max_chars: usize) -> String {
    let cleaned = clean_text(body);
    if cleaned.is_empty() {
        return NO_EXCERPT.to_string();
    }
    truncate_ellipsis(&cleaned, max_chars)
}

fn mentions(lower: &str, word: &str) -> bool {
    if word.contains(' ') {
        return lower.contains(word);
    }
    lower.split(|c: char| !c.is_alphanumeric()).any(|t| t == word)
}

fn pick_scene(body: &str) -> &'static str {
    let lower = body.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| mentions(&lower, w));
    if any(&["team", "teams", "collaboration"]) {
        "Useful when you are pushing a team project forward."
    } else if any(&["model", "models", "ai", "llm", "llms", "machine learning"]) {
        "Useful if you want a quick grip on how an AI or model approach works."
    } else if any(&["product", "design", "user experience"]) {
        "Useful when making product or user-experience decisions."
    } else {
        "Useful when you want the core idea of a technical article fast."
    }
}

fn pick_impact(body: &str) -> String {
    let short = summarize_text(body, 1, 100);
    if short == NO_SUMMARY {
        DEFAULT_IMPACT.to_string()
    } else {
        short
    }
}

fn pick_example(body: &str) -> Option<String> {
    let sentences = split_sentences(&clean_text(body));
    let cut = |s: &str| s.chars().take(120).collect::<String>();
    sentences
        .iter()
        .filter(|s| s.chars().count() >= 20)
        .find(|s| {
            let lower = s.to_lowercase();
            ["for example", "for instance", "case"].iter().any(|k| lower.contains(k))
        })
        .or_else(|| sentences.iter().find(|s| s.chars().count() >= 40))
        .map(|s| cut(s))
}

/// Five-line explanation for a non-expert reader.
pub fn plain_explanation(title: &str, summary: &str, body: &str) -> String {
    let mut title = clean_text(title);
    if title.is_empty() {
        title = "this article".to_string();
    }
    let basis = if summary.trim().is_empty() { body } else { summary };
    let key_point = summarize_text(basis, 2, 220);
    let example = pick_example(body).unwrap_or_else(|| pick_impact(body));

    format!(
        "In one line: this is mainly about “{title}”.\n\
         Scene: {}\n\
         Key point: {key_point}\n\
         Example: {example}\n\
         Tip: skim the first three paragraphs of the original first, then come back here.",
        pick_scene(body)
    )
}
