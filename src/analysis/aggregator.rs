//! Category counting and ranking.
//!
//! This module turns multi-valued survey answers into ranked category
//! counts: split answers into labels, count occurrences, rank by count and
//! fold the long tail into a single "Other" bucket.

use crate::models::{
    AggregationResult, CategoryCount, CategoryCounts, Delimiter, Record, TieBreak, OTHER_LABEL,
};
use std::cmp::Reverse;

/// Split a raw answer into trimmed, non-empty labels.
pub fn split_labels<'a>(raw: &'a str, delimiters: &[Delimiter]) -> Vec<&'a str> {
    raw.split(|c: char| delimiters.iter().any(|d| d.matches(c)))
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Count label occurrences in `field` across all records.
///
/// Blank answers contribute nothing. A label repeated within one answer is
/// counted once per occurrence.
pub fn count_categories(
    records: &[Record],
    field: &str,
    delimiters: &[Delimiter],
) -> CategoryCounts {
    records
        .iter()
        .filter_map(|record| record.answer(field))
        .flat_map(|raw| split_labels(raw, delimiters))
        .fold(CategoryCounts::new(), |mut counts, label| {
            counts.add(label, 1);
            counts
        })
}

/// Number of records with a non-blank answer in `field`.
pub fn count_answered(records: &[Record], field: &str) -> usize {
    records
        .iter()
        .filter(|record| record.answer(field).is_some())
        .count()
}

/// Rank counts and fold the long tail into "Other".
///
/// Singletons always go to "Other". Labels ranked below `top_n` are folded
/// into it as well, and "Other" is kept even when that makes the result one
/// entry longer than `top_n`.
pub fn rank_and_bucket(
    counts: &CategoryCounts,
    top_n: usize,
    tie_break: TieBreak,
) -> AggregationResult {
    if counts.is_empty() {
        return Vec::new();
    }

    let mut other = 0;
    let mut pool: Vec<CategoryCount> = Vec::with_capacity(counts.len() + 1);

    for (label, count) in counts.iter() {
        if count == 0 {
            continue;
        }
        // A literal "Other" answer shares the synthetic bucket
        if count == 1 || label == OTHER_LABEL {
            other += count;
        } else {
            pool.push(CategoryCount::new(label, count));
        }
    }

    if other > 0 {
        pool.push(CategoryCount::new(OTHER_LABEL, other));
    }
    sort_ranked(&mut pool, tie_break);

    let cut = if pool.len() > top_n {
        pool.split_off(top_n)
    } else {
        Vec::new()
    };
    let folded: usize = cut.iter().map(|entry| entry.count).sum();

    if folded > 0 {
        match pool.iter_mut().find(|entry| entry.is_other()) {
            Some(bucket) => bucket.count += folded,
            None => pool.push(CategoryCount::new(OTHER_LABEL, folded)),
        }
        sort_ranked(&mut pool, tie_break);
    }

    pool
}

/// Rank every label without folding (map charts show each country).
pub fn rank_all(counts: &CategoryCounts, tie_break: TieBreak) -> AggregationResult {
    let mut ranked: Vec<CategoryCount> = counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| CategoryCount::new(label, count))
        .collect();
    sort_ranked(&mut ranked, tie_break);
    ranked
}

/// Sort by count descending; equal counts per `tie_break`.
fn sort_ranked(entries: &mut [CategoryCount], tie_break: TieBreak) {
    match tie_break {
        // sort_by_key is stable, so first-seen order survives ties
        TieBreak::Stable => entries.sort_by_key(|entry| Reverse(entry.count)),
        TieBreak::Alphabetical => entries.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.label.cmp(&b.label))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_delimiters;

    fn record(value: &str) -> Record {
        Record::from_pairs([("F", value)])
    }

    fn counts(pairs: &[(&str, usize)]) -> CategoryCounts {
        pairs.iter().map(|(label, n)| (*label, *n)).collect()
    }

    fn entries(pairs: &[(&str, usize)]) -> AggregationResult {
        pairs
            .iter()
            .map(|(label, n)| CategoryCount::new(*label, *n))
            .collect()
    }

    #[test]
    fn test_count_categories_skips_blank_records() {
        let records = vec![record("A;B"), record("B"), record(""), record("A")];
        let result = count_categories(&records, "F", &default_delimiters());

        assert_eq!(result.get("A"), Some(2));
        assert_eq!(result.get("B"), Some(2));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_count_categories_counts_repeats_within_record() {
        let records = vec![record("A; A; B")];
        let result = count_categories(&records, "F", &default_delimiters());

        assert_eq!(result.get("A"), Some(2));
        assert_eq!(result.get("B"), Some(1));
    }

    #[test]
    fn test_count_categories_missing_field() {
        let records = vec![Record::from_pairs([("G", "A")])];
        let result = count_categories(&records, "F", &default_delimiters());
        assert!(result.is_empty());
    }

    #[test]
    fn test_split_labels_mixed_delimiters() {
        assert_eq!(
            split_labels("X\nY; Z", &default_delimiters()),
            vec!["X", "Y", "Z"]
        );
        assert_eq!(
            split_labels(";;A;\r\n\r\nB ;", &default_delimiters()),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_split_labels_comma_only() {
        let labels = split_labels("IAEA, University; Lab", &[Delimiter::Comma]);
        assert_eq!(labels, vec!["IAEA", "University; Lab"]);
    }

    #[test]
    fn test_long_tail_folding() {
        let input = counts(&[("A", 5), ("B", 3), ("C", 1), ("D", 1)]);
        let result = rank_and_bucket(&input, 2, TieBreak::Stable);
        assert_eq!(result, entries(&[("A", 5), ("B", 3), ("Other", 2)]));
    }

    #[test]
    fn test_no_other_without_singletons() {
        let input = counts(&[("A", 5), ("B", 4), ("C", 3)]);
        let result = rank_and_bucket(&input, 5, TieBreak::Stable);
        assert_eq!(result, entries(&[("A", 5), ("B", 4), ("C", 3)]));
        assert!(result.iter().all(|e| !e.is_other()));
    }

    #[test]
    fn test_singletons_folded_even_inside_window() {
        let input = counts(&[("A", 2), ("B", 1)]);
        let result = rank_and_bucket(&input, 10, TieBreak::Stable);
        assert_eq!(result, entries(&[("A", 2), ("Other", 1)]));
    }

    #[test]
    fn test_truncated_labels_fold_into_other() {
        let input = counts(&[("A", 9), ("B", 6), ("C", 4), ("D", 3), ("E", 1)]);
        let result = rank_and_bucket(&input, 2, TieBreak::Stable);

        assert_eq!(result, entries(&[("A", 9), ("Other", 8), ("B", 6)]));
        assert_eq!(
            result.iter().map(|e| e.count).sum::<usize>(),
            input.total()
        );
    }

    #[test]
    fn test_other_inside_window_absorbs_cut_labels() {
        let input = counts(&[("A", 10), ("B", 2), ("C", 1), ("D", 1), ("E", 1), ("F", 1)]);
        let result = rank_and_bucket(&input, 2, TieBreak::Stable);
        assert_eq!(result, entries(&[("A", 10), ("Other", 6)]));
    }

    #[test]
    fn test_literal_other_label_merges_with_bucket() {
        let input = counts(&[("A", 4), ("Other", 3), ("B", 1)]);
        let result = rank_and_bucket(&input, 5, TieBreak::Stable);
        assert_eq!(result, entries(&[("A", 4), ("Other", 4)]));
    }

    #[test]
    fn test_rank_and_bucket_is_pure() {
        let input = counts(&[("A", 5), ("B", 3), ("C", 1), ("D", 1)]);
        let snapshot = input.clone();

        let first = rank_and_bucket(&input, 2, TieBreak::Stable);
        let second = rank_and_bucket(&input, 2, TieBreak::Stable);

        assert_eq!(first, second);
        assert_eq!(input, snapshot);
    }

    #[test]
    fn test_answered_diverges_from_occurrences() {
        let records = vec![record("A;B"), record("C"), record("")];
        let answered = count_answered(&records, "F");
        let occurrences = count_categories(&records, "F", &default_delimiters()).total();

        assert_eq!(answered, 2);
        assert_eq!(occurrences, 3);
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<Record> = Vec::new();
        assert!(count_categories(&records, "F", &default_delimiters()).is_empty());
        assert_eq!(count_answered(&records, "F"), 0);
        for n in [0, 1, 10] {
            assert!(rank_and_bucket(&CategoryCounts::new(), n, TieBreak::Stable).is_empty());
        }
    }

    #[test]
    fn test_stable_tie_break_keeps_first_seen_order() {
        let input = counts(&[("Zeta", 2), ("Alpha", 2), ("Mid", 3)]);
        let result = rank_and_bucket(&input, 5, TieBreak::Stable);
        assert_eq!(result, entries(&[("Mid", 3), ("Zeta", 2), ("Alpha", 2)]));
    }

    #[test]
    fn test_alphabetical_tie_break() {
        let input = counts(&[("Zeta", 2), ("Alpha", 2), ("Mid", 3)]);
        let result = rank_and_bucket(&input, 5, TieBreak::Alphabetical);
        assert_eq!(result, entries(&[("Mid", 3), ("Alpha", 2), ("Zeta", 2)]));
    }

    #[test]
    fn test_rank_all_keeps_singletons() {
        let input = counts(&[("France", 1), ("Austria", 4), ("Chile", 1)]);
        let result = rank_all(&input, TieBreak::Alphabetical);
        assert_eq!(
            result,
            entries(&[("Austria", 4), ("Chile", 1), ("France", 1)])
        );
    }

    #[test]
    fn test_top_n_zero_leaves_only_other() {
        let input = counts(&[("A", 3), ("B", 2)]);
        let result = rank_and_bucket(&input, 0, TieBreak::Stable);
        assert_eq!(result, entries(&[("Other", 5)]));
    }
}
