use compact_str::CompactString;

use super::FolderGroup;

/// One bar of the ranked size summary.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub label: CompactString,
    pub size_gib: f64,
    /// Size relative to the largest entry (1.0 for the largest)
    pub relative: f64,
}

/// Rank every file across all groups by size, largest first.
/// Equal sizes keep their folder-then-child encounter order.
pub fn rank(groups: &[FolderGroup]) -> Vec<RankedEntry> {
    let entries = groups
        .iter()
        .flat_map(|g| g.children.iter())
        .map(|c| (c.name.clone(), c.size_gib));
    rank_pairs(entries)
}

/// Rank folders by the summed size of their files, largest first.
pub fn rank_folders(groups: &[FolderGroup]) -> Vec<RankedEntry> {
    rank_pairs(groups.iter().map(|g| (g.label.clone(), g.total_gib())))
}

fn rank_pairs(pairs: impl Iterator<Item = (CompactString, f64)>) -> Vec<RankedEntry> {
    let mut pairs: Vec<(CompactString, f64)> = pairs.collect();
    // sort_by is stable, so ties keep encounter order
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));

    let max = pairs.first().map(|p| p.1).unwrap_or(0.0);
    pairs
        .into_iter()
        .map(|(label, size_gib)| RankedEntry {
            label,
            size_gib,
            relative: if max > 0.0 { size_gib / max } else { 0.0 },
        })
        .collect()
}
