//! Survivor selection for a duplicate group.
//!
//! Candidates are ranked by rule priority (lower first), then link count
//! (higher first), then modification time (older first), then path. The
//! survivor is the best-ranked candidate whose path is not a symlink.

use std::cmp::Ordering;

use crate::scanner::Item;

/// Total order used to rank candidates.
#[must_use]
pub fn compare_items(a: &Item, b: &Item) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.nlink.cmp(&a.nlink))
        .then_with(|| a.time.cmp(&b.time))
        .then_with(|| a.path.cmp(&b.path))
}

/// Sort `items` best first and return the index of the survivor, or
/// `None` when every candidate is a symlink.
pub fn select_survivor(items: &mut [Item]) -> Option<usize> {
    items.sort_by(compare_items);
    items.iter().position(|item| !item.is_symlink)
}
