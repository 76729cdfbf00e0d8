use crate::feed::FeedEntry;
use anyhow::Result;
use feed_rs::parser;

/// Parses RSS/Atom/JSON Feed bytes into entries.
///
/// Summary falls back to the entry's content body when the feed has no
/// summary; the link is the entry's first link. Publication time falls back
/// to the updated timestamp.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let published = entry.published.or(entry.updated);

            FeedEntry {
                title,
                summary,
                link,
                published,
            }
        })
        .collect();

    Ok(entries)
}
