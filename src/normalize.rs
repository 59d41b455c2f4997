//! Result normalization: stable numbering for title lists and first-seen
//! deduplication for download entries. Pure functions, no I/O.

use std::collections::HashSet;

use crate::models::{DownloadEntry, ListingEntry, SearchHit};

/// Render titles as `"{n}. {title} ({site})"`, 1-indexed, in input order.
/// The number is the index space users select from.
pub fn number_titles(entries: &[ListingEntry], site: &str) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| format!("{}. {} ({})", index + 1, entry.title, site))
        .collect()
}

/// Same numbering across a merged multi-site list; each line carries its
/// entry's own site label.
pub fn number_hits(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .enumerate()
        .map(|(index, hit)| format!("{}. {} ({})", index + 1, hit.entry.title, hit.site))
        .collect()
}

/// Drop download entries whose rendered `"label: url"` string has already
/// been seen, preserving first-occurrence order.
pub fn dedupe_downloads(entries: Vec<DownloadEntry>) -> Vec<DownloadEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.render()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteKey;

    fn entry(title: &str) -> ListingEntry {
        ListingEntry {
            title: title.to_string(),
            url: format!("https://site.example/{title}"),
        }
    }

    fn download(label: &str, url: &str) -> DownloadEntry {
        DownloadEntry {
            label: label.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn numbering_is_one_indexed_in_input_order() {
        let numbered = number_titles(&[entry("Foo"), entry("Bar")], "hdhub4u");
        assert_eq!(numbered, ["1. Foo (hdhub4u)", "2. Bar (hdhub4u)"]);
    }

    #[test]
    fn numbering_empty_input_is_empty() {
        assert!(number_titles(&[], "cinevood").is_empty());
    }

    #[test]
    fn merged_hits_number_sequentially_across_sites() {
        let hits = vec![
            SearchHit {
                site: SiteKey::Cinevood,
                entry: entry("Foo"),
            },
            SearchHit {
                site: SiteKey::Hdmovie2,
                entry: entry("Bar"),
            },
        ];
        assert_eq!(
            number_hits(&hits),
            ["1. Foo (cinevood)", "2. Bar (hdmovie2)"]
        );
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let deduped = dedupe_downloads(vec![
            download("1080p", "http://a"),
            download("1080p", "http://a"),
            download("720p", "http://b"),
        ]);
        let rendered: Vec<String> = deduped.iter().map(DownloadEntry::render).collect();
        assert_eq!(rendered, ["1080p: http://a", "720p: http://b"]);
    }

    #[test]
    fn same_url_different_label_is_not_a_duplicate() {
        let deduped = dedupe_downloads(vec![
            download("1080p", "http://a"),
            download("1080p x264", "http://a"),
        ]);
        assert_eq!(deduped.len(), 2);
    }
}
