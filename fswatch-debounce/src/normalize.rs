//! Change Normalizer & Filter: a pure function from an
//! accumulated raw-event set to the batch a consumer sees.

use crate::config::FilterPredicate;
use fswatch_types::{ChangeBatch, RawEvent};
use std::collections::HashSet;

/// Turn one debounce cycle's accumulator into a delivered batch.
///
/// Duplicate `(kind, path)` pairs are already collapsed by construction —
/// the accumulator is itself a `HashSet<RawEvent>` — so this step is the
/// predicate application. No cross-kind reconciliation happens here: an
/// `Added` and a `Modified` for the same path both survive as distinct
/// records.
pub(crate) fn normalize_and_filter(raw: HashSet<RawEvent>, filter: Option<&FilterPredicate>) -> ChangeBatch {
    raw.into_iter()
        .filter_map(|event| {
            let record = fswatch_types::ChangeRecord::from(event);
            match filter {
                Some(f) if !f(record.kind, &record.path) => None,
                _ => Some(record),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fswatch_types::ChangeKind;
    use std::path::PathBuf;

    #[test]
    fn no_filter_passes_everything_through() {
        let mut raw = HashSet::new();
        raw.insert(RawEvent::new(ChangeKind::Added, "/a"));
        raw.insert(RawEvent::new(ChangeKind::Modified, "/a"));
        let batch = normalize_and_filter(raw, None);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn filter_drops_rejected_records() {
        let mut raw = HashSet::new();
        raw.insert(RawEvent::new(ChangeKind::Added, "/keep"));
        raw.insert(RawEvent::new(ChangeKind::Added, "/drop"));
        let filter: FilterPredicate =
            std::sync::Arc::new(|_: ChangeKind, path: &std::path::Path| path != PathBuf::from("/drop").as_path());
        let batch = normalize_and_filter(raw, Some(&filter));
        assert_eq!(batch.len(), 1);
        assert!(batch.iter().all(|r| r.path != PathBuf::from("/drop")));
    }
}
