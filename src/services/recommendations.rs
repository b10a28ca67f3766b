use std::collections::HashSet;

use crate::models::ContentItem;

/// Maximum number of suggested items
pub const MAX_SUGGESTIONS: usize = 10;

/// Runs shorter than this are too generic to group a series by
const MIN_SERIES_PREFIX_LEN: usize = 4;

/// Derives the series key used to group a title with its siblings
///
/// This is the leading run of letters and spaces, trimmed and lowercased. A run
/// of three characters or fewer falls back to the whole lowercased title.
pub fn base_title(title: &str) -> String {
    let run: String = title
        .chars()
        .take_while(|c| c.is_alphabetic() || *c == ' ')
        .collect();
    let run = run.trim();

    if run.chars().count() < MIN_SERIES_PREFIX_LEN {
        title.to_lowercase()
    } else {
        run.to_lowercase()
    }
}

/// Orders suggestions for the item being watched
///
/// Items of the same series come first in catalog order, then everything else
/// by votes (highest first, ties in catalog order). The current item is never
/// suggested, ids appear at most once and the list holds at most
/// [`MAX_SUGGESTIONS`] entries.
pub fn suggest<'a>(current: Option<&ContentItem>, catalog: &'a [ContentItem]) -> Vec<&'a ContentItem> {
    let Some(current) = current else {
        return Vec::new();
    };

    let base = base_title(&current.title);

    let (same_series, mut others): (Vec<&ContentItem>, Vec<&ContentItem>) = catalog
        .iter()
        .filter(|item| item.id != current.id)
        .partition(|item| !base.is_empty() && item.title.to_lowercase().starts_with(&base));

    others.sort_by(|a, b| b.votes.cmp(&a.votes));

    let mut seen = HashSet::new();
    same_series
        .into_iter()
        .chain(others)
        .filter(|item| seen.insert(item.id.as_str()))
        .take(MAX_SUGGESTIONS)
        .collect()
}
