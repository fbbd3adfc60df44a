//! Search result excerpts with keyword highlighting.
//!
//! All positions are counted in characters so that multi-byte text (Vietnamese titles and
//! chapters in particular) is never split inside a code point.

use regex::{Captures, RegexBuilder};

/// Characters kept on each side of a match.
pub const EXCERPT_WINDOW: usize = 50;

const MARK_OPEN: &str = r#"<span class="highlight">"#;
const MARK_CLOSE: &str = "</span>";

/// Lower-cased whitespace-delimited tokens of a query.
pub fn keywords(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Cut a window around the first case-insensitive occurrence of `query` in `text`.
///
/// Falls back to the first token of the query when the whole query is absent, and to the
/// start of the text when neither is found. The window always extends
/// `query.len() + EXCERPT_WINDOW` characters past the match start, even on fallback.
pub fn find_excerpt(text: &str, query: &str) -> String {
    let query = query.trim();
    let haystack: Vec<char> = text.chars().collect();
    let needle: Vec<char> = query.chars().collect();

    let position = find_case_insensitive(&haystack, &needle)
        .or_else(|| {
            let first: Vec<char> = query.split_whitespace().next()?.chars().collect();
            find_case_insensitive(&haystack, &first)
        })
        .unwrap_or(0);

    let start = position.saturating_sub(EXCERPT_WINDOW);
    let end = (position + needle.len() + EXCERPT_WINDOW).min(haystack.len());

    haystack[start..end].iter().collect()
}

/// Wrap every case-insensitive occurrence of each keyword in a highlight marker.
///
/// Keywords are applied one after another to the already-marked snippet, so a keyword that
/// occurs inside another keyword's match is wrapped twice.
pub fn highlight<S: AsRef<str>>(snippet: &str, keywords: &[S]) -> String {
    let mut marked = snippet.to_string();

    for keyword in keywords {
        let keyword = keyword.as_ref();
        if keyword.is_empty() {
            continue;
        }

        let Ok(pattern) = RegexBuilder::new(&regex::escape(keyword))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };

        marked = pattern
            .replace_all(&marked, |caps: &Captures| {
                format!("{}{}{}", MARK_OPEN, &caps[0], MARK_CLOSE)
            })
            .into_owned();
    }

    marked
}

/// Excerpt plus highlighting, as shown next to content search results.
pub fn highlighted_excerpt(text: &str, query: &str) -> String {
    highlight(&find_excerpt(text, query), &keywords(query))
}

fn find_case_insensitive(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }

    (0..=haystack.len() - needle.len()).find(|&start| {
        haystack[start..start + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
    })
}
