use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::types::{ArticleSource, RawArticle};
use crate::ingest::{normalize_text, truncate_chars};

const USER_AGENT: &str = concat!("brush-recommender/", env!("CARGO_PKG_VERSION"));
const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<Text>,
    link: Option<Text>,
    description: Option<Text>,
    summary: Option<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<Text>,
    #[serde(rename = "category", default)]
    categories: Vec<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<Text>,
    content: Option<Text>,
    published: Option<Text>,
    updated: Option<Text>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term", default)]
    term: String,
}

/// Element text, ignoring any attributes (`type="html"`, `domain=...`).
#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

fn text(t: &Option<Text>) -> &str {
    t.as_ref().map(|t| t.value.trim()).unwrap_or_default()
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn clean_summary(raw: &str) -> String {
    truncate_chars(&normalize_text(raw), SUMMARY_MAX_CHARS)
}

/// Newest entry of an RSS 2.0 or Atom document (first `<item>`, else first `<entry>`).
pub fn parse_feed_xml(xml: &str) -> Result<Option<RawArticle>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let parsed = match from_str::<Rss>(&xml_clean) {
        Ok(rss) if !rss.channel.item.is_empty() => rss.channel.item.into_iter().next().map(from_rss),
        rss_result => {
            let atom: std::result::Result<AtomFeed, _> = from_str(&xml_clean);
            match (rss_result, atom) {
                (_, Ok(feed)) => feed.entry.into_iter().next().map(from_atom),
                (Ok(_), Err(_)) => None,
                (Err(e), Err(_)) => return Err(e).context("parsing feed xml"),
            }
        }
    };

    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(parsed)
}

fn from_rss(it: RssItem) -> RawArticle {
    RawArticle {
        title: text(&it.title).to_string(),
        link: text(&it.link).to_string(),
        summary: clean_summary(first_non_empty(&[text(&it.description), text(&it.summary)])),
        tags: it
            .categories
            .into_iter()
            .map(|c| c.value.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        published_at: it.pub_date.as_ref().and_then(|d| parse_rfc2822(&d.value)),
    }
}

fn from_atom(e: AtomEntry) -> RawArticle {
    let link = e
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")) && !l.href.trim().is_empty())
        .or_else(|| e.links.iter().find(|l| !l.href.trim().is_empty()))
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();
    let published = first_non_empty(&[text(&e.published), text(&e.updated)]);

    RawArticle {
        title: text(&e.title).to_string(),
        link,
        summary: clean_summary(first_non_empty(&[text(&e.summary), text(&e.content)])),
        tags: e
            .categories
            .into_iter()
            .map(|c| c.term.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        published_at: parse_rfc3339(published).or_else(|| parse_rfc2822(published)),
    }
}

/// Fetches feeds over HTTP. The caller applies the per-source deadline; the client
/// timeout is a backstop.
pub struct RssArticleSource {
    client: reqwest::Client,
}

impl RssArticleSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArticleSource for RssArticleSource {
    async fn fetch_one(&self, feed_url: &str) -> Result<Option<RawArticle>> {
        let body = match self.client.get(feed_url).send().await {
            Ok(resp) => resp
                .error_for_status()
                .context("feed http status")?
                .text()
                .await
                .context("feed http .text()")?,
            Err(e) => {
                tracing::warn!(error = ?e, feed_url, "feed http error");
                counter!("ingest_http_errors_total").increment(1);
                return Err(e).context("feed http get()");
            }
        };
        parse_feed_xml(&body)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

// XML has no named entities beyond the core five; feeds still ship HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_first_item_wins() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Lab</title>
<item><title>First &amp; best</title><link>https://lab.test/1</link>
<description><![CDATA[<p>Hello&nbsp;<b>agents</b></p>]]></description>
<pubDate>Tue, 10 Jun 2025 08:00:00 +0000</pubDate><category>AI</category></item>
<item><title>Second</title><link>https://lab.test/2</link></item>
</channel></rss>"#;
        let a = parse_feed_xml(xml).unwrap().unwrap();
        assert_eq!(a.title, "First & best");
        assert_eq!(a.link, "https://lab.test/1");
        assert_eq!(a.summary, "Hello agents");
        assert_eq!(a.tags, vec!["AI".to_string()]);
        assert_eq!(
            a.published_at.map(|d| d.to_rfc3339()),
            Some("2025-06-10T08:00:00+00:00".to_string())
        );
    }

    #[test]
    fn atom_entry_uses_href_and_summary() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Design</title>
<entry><title type="html">Grids</title>
<link rel="alternate" href="https://design.test/grids"/>
<summary type="html">&lt;p&gt;Layout notes&lt;/p&gt;</summary>
<updated>2025-06-01T12:00:00Z</updated><category term="ux"/></entry>
</feed>"#;
        let a = parse_feed_xml(xml).unwrap().unwrap();
        assert_eq!(a.title, "Grids");
        assert_eq!(a.link, "https://design.test/grids");
        assert_eq!(a.summary, "Layout notes");
        assert_eq!(a.tags, vec!["ux".to_string()]);
        assert!(a.published_at.is_some());
    }

    #[test]
    fn empty_channel_is_none() {
        let xml = r#"<rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(parse_feed_xml(xml).unwrap().is_none());
    }

    #[test]
    fn long_summary_is_truncated() {
        let body = "word ".repeat(100);
        let xml = format!(
            "<rss><channel><item><title>t</title><description>{body}</description></item></channel></rss>"
        );
        let a = parse_feed_xml(&xml).unwrap().unwrap();
        assert_eq!(a.summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(a.summary.ends_with("..."));
    }
}
