//! Atom activity-stream parsing.
//!
//! Bamboo's `/plugins/servlet/streams` feed is plain Atom with a pile of
//! Atlassian activity extensions. Only the link, timestamp, categories and
//! HTML content of each entry matter here; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use bambot_shared::{BambotError, FeedItem, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
    #[serde(default)]
    content: Option<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: String,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an Atom document into feed items, newest first.
///
/// Entries without a usable link or timestamp are dropped with a warning
/// rather than failing the whole feed.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)
        .map_err(|e| BambotError::parse(format!("invalid Atom feed: {e}")))?;

    let mut items: Vec<FeedItem> = feed
        .entries
        .into_iter()
        .filter_map(|entry| match into_item(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "skipping malformed feed entry");
                None
            }
        })
        .collect();

    items.sort_by(|a, b| b.published.cmp(&a.published));
    Ok(items)
}

fn into_item(entry: AtomEntry) -> Result<FeedItem> {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())
        .ok_or_else(|| BambotError::parse("feed entry has no link"))?;

    let stamp = entry
        .published
        .or(entry.updated)
        .ok_or_else(|| BambotError::parse(format!("feed entry {link} has no timestamp")))?;
    let published = DateTime::parse_from_rfc3339(stamp.trim())
        .map_err(|e| BambotError::parse(format!("feed entry {link}: bad timestamp '{stamp}': {e}")))?
        .with_timezone(&Utc);

    Ok(FeedItem {
        link,
        published,
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
        content: entry.content.map(|c| c.value).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/bamboo/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn parses_fixture_newest_first() {
        let items = parse_feed(&load_fixture("feed.atom.xml")).expect("parse feed");
        assert_eq!(items.len(), 4);
        assert!(items.windows(2).all(|w| w[0].published >= w[1].published));

        let newest = &items[0];
        assert!(newest.link.ends_with("CRAB-CWS144-JOB1-33"));
        assert_eq!(newest.categories, vec!["build.failed"]);
        assert!(newest.content.contains("<a href"));
    }

    #[test]
    fn keeps_success_and_ci_diagnosed_entries() {
        let items = parse_feed(&load_fixture("feed.atom.xml")).unwrap();
        assert!(items.iter().any(|i| i.is_successful()));
        assert!(items.iter().any(|i| i.content.contains("tests failed")));
    }

    #[test]
    fn prefers_alternate_link() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
          <entry>
            <link rel="http://streams.atlassian.com/syndication/icon" href="https://bamboo/icon.png"/>
            <title>x</title>
            <link rel="alternate" href="https://bamboo/browse/CRAB-A1-JOB1-2"/>
            <published>2026-10-17T09:00:00Z</published>
          </entry>
        </feed>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0].link, "https://bamboo/browse/CRAB-A1-JOB1-2");
        assert!(items[0].content.is_empty());
    }

    #[test]
    fn drops_entries_without_timestamp() {
        let xml = r#"<feed>
          <entry><link href="https://bamboo/browse/CRAB-A1-JOB1-2"/></entry>
          <entry><link href="https://bamboo/browse/CRAB-A1-JOB1-3"/><updated>2026-10-17T09:00:00.000+02:00</updated></entry>
        </feed>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].link.ends_with("-3"));
    }

    #[test]
    fn empty_feed_is_empty() {
        assert!(parse_feed("<feed></feed>").unwrap().is_empty());
    }

    #[test]
    fn garbage_is_parse_error() {
        let err = parse_feed("<feed><entry></feed>").unwrap_err();
        assert!(matches!(err, BambotError::Parse { .. }));
    }
}
