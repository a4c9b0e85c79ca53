//! Atom feed parsing for arXiv API responses.
//!
//! The arXiv query API returns an Atom feed; entries map onto [`PaperMeta`]
//! descriptors. Entries missing an id or title are skipped rather than
//! failing the whole feed.

use feed_rs::model::Entry;
use paperdigest_shared::{PaperdigestError, PaperMeta, Result};

/// Parse an Atom response body into paper descriptors, in feed order
/// (the API returns newest first when sorted by submission date).
pub fn parse_feed(body: &[u8]) -> Result<Vec<PaperMeta>> {
    let feed = feed_rs::parser::parse(body)
        .map_err(|e| PaperdigestError::parse(format!("invalid Atom feed: {e}")))?;

    Ok(feed.entries.into_iter().filter_map(entry_to_meta).collect())
}

/// Convert one Atom entry to a [`PaperMeta`]. Returns `None` when the entry
/// has no usable id or title.
fn entry_to_meta(entry: Entry) -> Option<PaperMeta> {
    if entry.id.is_empty() {
        return None;
    }

    let title = entry
        .title
        .map(|t| collapse_whitespace(&t.content))
        .filter(|t| !t.is_empty())?;

    let authors: Vec<String> = entry
        .authors
        .into_iter()
        .map(|person| person.name)
        .filter(|name| !name.is_empty())
        .collect();

    let abstract_text = entry
        .summary
        .map(|s| collapse_whitespace(&s.content))
        .unwrap_or_default();

    // feed-rs does not surface <arxiv:primary_category>; the first plain
    // category term carries the same value in practice.
    let primary_category = entry
        .categories
        .first()
        .map(|c| c.term.clone())
        .unwrap_or_default();

    let pdf_url = entry
        .links
        .iter()
        .find(|link| {
            link.media_type.as_deref() == Some("application/pdf")
                || link.title.as_deref() == Some("pdf")
        })
        .map(|link| link.href.clone());

    Some(PaperMeta {
        arxiv_id: entry.id,
        title,
        authors,
        abstract_text,
        published: entry.published,
        primary_category,
        pdf_url,
    })
}

/// Collapse internal whitespace runs (arXiv titles and abstracts wrap with
/// embedded newlines) and trim.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: search_query=cat:cs.LG</title>
  <id>http://arxiv.org/api/feed</id>
  <updated>2026-08-07T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2608.01001v1</id>
    <updated>2026-08-06T12:00:00Z</updated>
    <published>2026-08-06T12:00:00Z</published>
    <title>Gradient Descent
        Considered Helpful</title>
    <summary>We revisit gradient descent
        and find it helpful.</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2608.01001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2608.01001v1" rel="related" type="application/pdf"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="stat.ML" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2608.01002v1</id>
    <updated>2026-08-05T09:30:00Z</updated>
    <published>2026-08-05T09:30:00Z</published>
    <title>Untitled No More</title>
    <summary>Second entry.</summary>
    <author><name>Grace Hopper</name></author>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_in_feed_order() {
        let papers = parse_feed(FEED.as_bytes()).expect("parse feed");
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].arxiv_id, "http://arxiv.org/abs/2608.01001v1");
        assert_eq!(papers[1].arxiv_id, "http://arxiv.org/abs/2608.01002v1");
    }

    #[test]
    fn collapses_wrapped_title_and_abstract() {
        let papers = parse_feed(FEED.as_bytes()).expect("parse feed");
        assert_eq!(papers[0].title, "Gradient Descent Considered Helpful");
        assert_eq!(
            papers[0].abstract_text,
            "We revisit gradient descent and find it helpful."
        );
    }

    #[test]
    fn extracts_authors_category_and_pdf_link() {
        let papers = parse_feed(FEED.as_bytes()).expect("parse feed");
        assert_eq!(papers[0].authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(papers[0].primary_category, "cs.LG");
        assert_eq!(
            papers[0].pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/2608.01001v1")
        );
        // Second entry has no pdf link
        assert!(papers[1].pdf_url.is_none());
    }

    #[test]
    fn skips_entry_without_title() {
        let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>http://arxiv.org/api/feed</id>
  <updated>2026-08-07T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2608.09999v1</id>
    <updated>2026-08-06T12:00:00Z</updated>
  </entry>
</feed>"#;
        let papers = parse_feed(feed.as_bytes()).expect("parse feed");
        assert!(papers.is_empty());
    }

    #[test]
    fn rejects_non_feed_body() {
        let result = parse_feed(b"<html><body>not a feed</body></html>");
        assert!(result.is_err());
    }
}
