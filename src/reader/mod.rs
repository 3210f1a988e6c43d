// src/reader/mod.rs
//! Deep read: fetch an article body, keep the readable lines, and build the explanation +
//! excerpt pair shown by the `read` command.

pub mod cleaner;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;

use crate::model::ContentItem;
pub use cleaner::{clean_text, deep_read_snippet, plain_explanation, summarize_text};

const USER_AGENT: &str = concat!("brush-recommender/", env!("CARGO_PKG_VERSION"));
/// Body budget requested for a deep read.
pub const DEEP_READ_MAX_CHARS: usize = 6500;
const SNIPPET_MAX_CHARS: usize = 900;
const MIN_LINE_CHARS: usize = 30;
const MAX_LINES: usize = 25;
const BOILERPLATE_PREFIXES: [&str; 5] = ["cookie", "privacy", "subscribe", "share this", "related posts"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderStatus {
    Ok,
    NoContent,
    EmptyUrl,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyText {
    pub text: String,
    pub status: ReaderStatus,
}

impl BodyText {
    fn empty(status: ReaderStatus) -> Self {
        Self {
            text: String::new(),
            status,
        }
    }
}

#[async_trait]
pub trait BodyReader: Send + Sync {
    /// Never fails; network and decode problems come back as [`ReaderStatus::Error`].
    async fn fetch_body(&self, url: &str, timeout: Duration, max_chars: usize) -> BodyText;
}

pub struct HttpBodyReader {
    client: Client,
}

impl HttpBodyReader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building body reader client")?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<String> {
        self.client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .context("body get")?
            .error_for_status()
            .context("body non-2xx")?
            .text()
            .await
            .context("body text")
    }
}

#[async_trait]
impl BodyReader for HttpBodyReader {
    async fn fetch_body(&self, url: &str, timeout: Duration, max_chars: usize) -> BodyText {
        let url = url.trim();
        if url.is_empty() {
            return BodyText::empty(ReaderStatus::EmptyUrl);
        }
        match self.get(url, timeout).await {
            Ok(html) => {
                let text = extract_readable_text(&html, max_chars);
                let status = if text.is_empty() {
                    ReaderStatus::NoContent
                } else {
                    ReaderStatus::Ok
                };
                BodyText { text, status }
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "deep read fetch failed");
                BodyText::empty(ReaderStatus::Error)
            }
        }
    }
}

fn noise_patterns() -> &'static [Regex] {
    static RE_NOISE: OnceCell<Vec<Regex>> = OnceCell::new();
    RE_NOISE.get_or_init(|| {
        let mut v: Vec<Regex> = ["script", "style", "noscript", "svg", "nav", "footer", "header", "aside"]
            .iter()
            .map(|t| Regex::new(&format!(r"(?is)<{t}[^>]*>.*?</{t}>")).expect("static regex"))
            .collect();
        v.push(Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
        v
    })
}

fn content_block(html: &str) -> &str {
    static RE_BLOCKS: OnceCell<Vec<Regex>> = OnceCell::new();
    let blocks = RE_BLOCKS.get_or_init(|| {
        ["article", "main", "body"]
            .iter()
            .map(|t| Regex::new(&format!(r"(?is)<{t}[^>]*>(.*?)</{t}>")).expect("static regex"))
            .collect()
    });
    blocks
        .iter()
        .find_map(|re| re.captures(html).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
        .unwrap_or(html)
}

/// Readable article text out of a full HTML page: noise blocks dropped, the most specific
/// content container kept, block tags turned into line breaks, short and boilerplate lines
/// filtered, at most 25 lines, capped at `max_chars`.
pub fn extract_readable_text(html: &str, max_chars: usize) -> String {
    let mut page = html.to_string();
    for re in noise_patterns() {
        page = re.replace_all(&page, " ").into_owned();
    }

    static RE_BREAK: OnceCell<Regex> = OnceCell::new();
    static RE_TAG: OnceCell<Regex> = OnceCell::new();
    let re_break = RE_BREAK.get_or_init(|| {
        Regex::new(r"(?i)</?(p|br|li|h[1-6]|div|section)\b[^>]*>").expect("static regex")
    });
    let re_tag = RE_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"));

    let block = content_block(&page);
    let broken = re_break.replace_all(block, "\n");
    let text = re_tag.replace_all(&broken, "");
    let text = html_escape::decode_html_entities(&text);

    let lines: Vec<String> = text
        .lines()
        .map(clean_text)
        .filter(|l| l.chars().count() >= MIN_LINE_CHARS)
        .filter(|l| {
            let lower = l.to_lowercase();
            !BOILERPLATE_PREFIXES.iter().any(|p| lower.starts_with(p))
        })
        .take(MAX_LINES)
        .collect();

    cleaner::truncate_ellipsis(&lines.join("\n"), max_chars)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepReadStatus {
    Ok,
    NoLinkFallback,
    FetchFailedFallback,
}

impl DeepReadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeepReadStatus::Ok => "ok",
            DeepReadStatus::NoLinkFallback => "no_link_fallback",
            DeepReadStatus::FetchFailedFallback => "fetch_failed_fallback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeepRead {
    pub explain: String,
    pub excerpt: String,
    pub status: DeepReadStatus,
}

fn summary_fallback(item: &ContentItem, status: DeepReadStatus) -> DeepRead {
    DeepRead {
        explain: plain_explanation(&item.title, &item.summary, &item.summary),
        excerpt: summarize_text(&item.summary, 3, 420),
        status,
    }
}

/// Explanation and excerpt for `item`, from its body when reachable, else from its summary.
pub async fn deep_read(reader: &dyn BodyReader, item: &ContentItem, timeout: Duration) -> DeepRead {
    let link = item.link().trim();
    if link.is_empty() {
        return summary_fallback(item, DeepReadStatus::NoLinkFallback);
    }
    let body = reader.fetch_body(link, timeout, DEEP_READ_MAX_CHARS).await;
    if body.text.is_empty() {
        tracing::debug!(url = link, status = ?body.status, "deep read falling back to summary");
        return summary_fallback(item, DeepReadStatus::FetchFailedFallback);
    }
    DeepRead {
        explain: plain_explanation(&item.title, &item.summary, &body.text),
        excerpt: deep_read_snippet(&body.text, SNIPPET_MAX_CHARS),
        status: DeepReadStatus::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedReader(BodyText);

    #[async_trait]
    impl BodyReader for FixedReader {
        async fn fetch_body(&self, _url: &str, _timeout: Duration, _max: usize) -> BodyText {
            self.0.clone()
        }
    }

    const PAGE: &str = r#"<html><head><style>p{color:red}</style></head><body>
<nav>Home | About | A very long navigation line that should vanish</nav>
<article><h1>Short</h1>
<p>The first paragraph is long enough to survive the line filter.</p>
<!-- a comment that is long enough to be a line if it leaked -->
<p>Subscribe to our newsletter for more posts like this one!</p>
<p>Second paragraph has &amp; entities and <b>inline</b> markup inside it.</p>
<script>var x = "a script line long enough to be kept otherwise";</script>
</article><footer>Copyright footer line that is definitely long enough</footer></body></html>"#;

    #[test]
    fn extract_keeps_article_lines_only() {
        let text = extract_readable_text(PAGE, 6500);
        assert_eq!(
            text,
            "The first paragraph is long enough to survive the line filter.\n\
             Second paragraph has & entities and inline markup inside it."
        );
    }

    #[test]
    fn extract_caps_length() {
        let text = extract_readable_text(PAGE, 20);
        assert_eq!(text.chars().count(), 20);
        assert!(text.ends_with('…'));
    }

    fn item(url: Option<&str>) -> ContentItem {
        ContentItem {
            item_key: "k".into(),
            title: "Model tuning".into(),
            summary: "Tuning models takes care. It also takes data. And patience.".into(),
            url: url.map(str::to_string),
            source: "Blog".into(),
            tags: vec!["ai".into()],
            category: "ai_ml".into(),
            fetched_at: None,
            published_at: None,
            recommended_count: 0,
        }
    }

    #[tokio::test]
    async fn deep_read_without_link_uses_summary() {
        let reader = FixedReader(BodyText::empty(ReaderStatus::Error));
        let out = deep_read(&reader, &item(None), Duration::from_secs(1)).await;
        assert_eq!(out.status, DeepReadStatus::NoLinkFallback);
        assert_eq!(out.excerpt, "Tuning models takes care. It also takes data. And patience.");
    }

    #[tokio::test]
    async fn deep_read_failure_falls_back() {
        let reader = FixedReader(BodyText::empty(ReaderStatus::Error));
        let out = deep_read(&reader, &item(Some("https://x.test/a")), Duration::from_secs(1)).await;
        assert_eq!(out.status, DeepReadStatus::FetchFailedFallback);
        assert!(out.explain.contains("Model tuning"));
    }

    #[tokio::test]
    async fn deep_read_uses_body_when_present() {
        let body = "An LLM is a model trained on text. For example, a chatbot answers questions from it.";
        let reader = FixedReader(BodyText {
            text: body.into(),
            status: ReaderStatus::Ok,
        });
        let out = deep_read(&reader, &item(Some("https://x.test/a")), Duration::from_secs(1)).await;
        assert_eq!(out.status, DeepReadStatus::Ok);
        assert_eq!(out.excerpt, body);
        assert!(out.explain.contains("AI or model approach"));
        assert!(out.explain.contains("Example: For example, a chatbot answers questions from it."));
    }
}
