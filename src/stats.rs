//! Derived views over the document set.
//!
//! Aggregate statistics, the author index, and the category index are all
//! recomputed from the full collection on demand; none of them is stored
//! as its own entity.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::{Author, Bip, BipStatus, BipType, Stats};

/// One category with the documents carrying its tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
    pub bips: Vec<u32>,
}

/// Recompute aggregate statistics from the full document set.
pub fn compute_stats(bips: &[Bip]) -> Stats {
    let mut contributors: BTreeSet<&str> = BTreeSet::new();
    let mut stats = Stats {
        total_bips: bips.len(),
        final_bips: 0,
        active_bips: 0,
        draft_bips: 0,
        standards_track: 0,
        informational: 0,
        process: 0,
        contributors: 0,
    };

    for bip in bips {
        match bip.status {
            BipStatus::Final => stats.final_bips += 1,
            BipStatus::Active => stats.active_bips += 1,
            BipStatus::Draft => {
                stats.active_bips += 1;
                stats.draft_bips += 1;
            }
            _ => {}
        }
        match bip.kind {
            BipType::StandardsTrack => stats.standards_track += 1,
            BipType::Informational => stats.informational += 1,
            BipType::Process => stats.process += 1,
        }
        for author in &bip.authors {
            contributors.insert(author);
        }
    }

    stats.contributors = contributors.len();
    stats
}

/// Group documents by author name, sorted by document count descending
/// (ties broken by name).
pub fn build_author_index(bips: &[Bip]) -> Vec<Author> {
    let mut by_name: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for bip in bips {
        for author in &bip.authors {
            let numbers = by_name.entry(author).or_default();
            if !numbers.contains(&bip.number) {
                numbers.push(bip.number);
            }
        }
    }

    let mut authors: Vec<Author> = by_name
        .into_iter()
        .map(|(name, numbers)| Author {
            name: name.to_string(),
            bip_count: numbers.len(),
            bips: numbers,
        })
        .collect();

    authors.sort_by(|a, b| b.bip_count.cmp(&a.bip_count).then_with(|| a.name.cmp(&b.name)));
    authors
}

/// Group documents by category tag, sorted by document count descending
/// (ties broken by name).
pub fn build_category_index(bips: &[Bip]) -> Vec<CategorySummary> {
    let mut by_tag: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for bip in bips {
        for tag in &bip.categories {
            let numbers = by_tag.entry(tag).or_default();
            if !numbers.contains(&bip.number) {
                numbers.push(bip.number);
            }
        }
    }

    let mut categories: Vec<CategorySummary> = by_tag
        .into_iter()
        .map(|(name, numbers)| CategorySummary {
            name: name.to_string(),
            count: numbers.len(),
            bips: numbers,
        })
        .collect();

    categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bip(
        number: u32,
        authors: &[&str],
        status: BipStatus,
        kind: BipType,
        categories: &[&str],
    ) -> Bip {
        Bip {
            number,
            title: format!("BIP {}", number),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            status,
            kind,
            created: String::new(),
            layer: None,
            abstract_text: String::new(),
            content: String::new(),
            explanation: None,
            source_filename: format!("bip-{:04}.mediawiki", number),
            source_url: String::new(),
            replaces: vec![],
            replaced_by: vec![],
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn stats_buckets_count_as_expected() {
        let docs = vec![
            bip(1, &["A"], BipStatus::Final, BipType::Process, &["process"]),
            bip(2, &["A", "B"], BipStatus::Active, BipType::Informational, &["governance"]),
            bip(3, &["C"], BipStatus::Draft, BipType::StandardsTrack, &["consensus"]),
            bip(4, &["B"], BipStatus::Withdrawn, BipType::StandardsTrack, &["consensus"]),
        ];

        let stats = compute_stats(&docs);
        assert_eq!(stats.total_bips, 4);
        assert_eq!(stats.final_bips, 1);
        // Active bucket counts Active and Draft documents.
        assert_eq!(stats.active_bips, 2);
        assert_eq!(stats.draft_bips, 1);
        assert_eq!(stats.standards_track, 2);
        assert_eq!(stats.informational, 1);
        assert_eq!(stats.process, 1);
        assert_eq!(stats.contributors, 3);
    }

    #[test]
    fn author_index_sorts_by_count_then_name() {
        let docs = vec![
            bip(1, &["B"], BipStatus::Final, BipType::Process, &[]),
            bip(2, &["A", "B"], BipStatus::Draft, BipType::Process, &[]),
            bip(3, &["A"], BipStatus::Draft, BipType::Process, &[]),
        ];

        let authors = build_author_index(&docs);
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].name, "A");
        assert_eq!(authors[0].bip_count, 2);
        assert_eq!(authors[0].bips, vec![2, 3]);
        assert_eq!(authors[1].name, "B");
        assert_eq!(authors[1].bips, vec![1, 2]);
    }

    #[test]
    fn category_index_groups_by_tag() {
        let docs = vec![
            bip(1, &["A"], BipStatus::Draft, BipType::Process, &["governance", "process"]),
            bip(2, &["A"], BipStatus::Draft, BipType::Process, &["governance"]),
        ];

        let categories = build_category_index(&docs);
        assert_eq!(categories[0].name, "governance");
        assert_eq!(categories[0].count, 2);
        assert_eq!(categories[0].bips, vec![1, 2]);
        assert_eq!(categories[1].name, "process");
        assert_eq!(categories[1].count, 1);
    }

    #[test]
    fn empty_collection_yields_zero_stats() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_bips, 0);
        assert_eq!(stats.contributors, 0);
        assert!(build_author_index(&[]).is_empty());
        assert!(build_category_index(&[]).is_empty());
    }
}
