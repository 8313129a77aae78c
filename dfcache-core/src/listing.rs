//! Paging over sorted object listings

use crate::{BucketListOptions, ObjectEntry, ObjectProperties};

/// Page size used when the caller leaves it unset
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// True if `marker` is at or past `name`, i.e. the object was already listed
pub fn marker_covers(marker: &str, name: &str) -> bool {
    !marker.is_empty() && marker >= name
}

/// Build one listing page from entries sorted by name.
///
/// Applies the prefix filter, skips everything up to and including the page
/// marker, truncates at the page size and projects each entry down to the
/// requested properties. The returned marker is the last listed name when more
/// entries remain, and empty otherwise.
pub fn paginate<'a, I>(sorted: I, opts: &BucketListOptions) -> ObjectProperties
where
    I: IntoIterator<Item = &'a ObjectEntry>,
{
    let page_size = if opts.pagesize == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        opts.pagesize
    };
    let props = opts.requested_props();

    let mut candidates = sorted
        .into_iter()
        .filter(|e| e.name.starts_with(opts.prefix.as_str()))
        .filter(|e| !marker_covers(&opts.pagemarker, &e.name))
        .peekable();

    let mut entries = Vec::new();
    while entries.len() < page_size {
        match candidates.next() {
            Some(entry) => entries.push(entry.project(&props)),
            None => break,
        }
    }

    let pagemarker = match (candidates.peek(), entries.last()) {
        (Some(_), Some(last)) => last.name.clone(),
        _ => String::new(),
    };

    ObjectProperties {
        entries,
        pagemarker,
    }
}
