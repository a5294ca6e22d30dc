//! Headline numbers and chart series derived from `/api/publications/stats`.

use bioscience_common::entities::{Publication, PublicationStats};

const FALLBACK_TOTAL: u64 = 608;
const FALLBACK_RECENT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatCard {
    pub label: &'static str,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_publications: u64,
    pub research_areas: u64,
    pub years_covered: u64,
    pub recent_studies: u64,
}

impl DashboardStats {
    /// Before stats arrive the totals fall back to the known corpus size.
    pub fn from_stats(stats: Option<&PublicationStats>) -> Self {
        match stats {
            Some(s) => Self {
                total_publications: s.total,
                research_areas: s.by_tag.len() as u64,
                years_covered: s.by_year.len() as u64,
                recent_studies: s.recent.len() as u64,
            },
            None => Self {
                total_publications: FALLBACK_TOTAL,
                research_areas: 0,
                years_covered: 0,
                recent_studies: FALLBACK_RECENT,
            },
        }
    }

    pub fn cards(&self) -> [StatCard; 4] {
        [
            StatCard { label: "Total Publications", value: self.total_publications },
            StatCard { label: "Research Areas", value: self.research_areas },
            StatCard { label: "Years Covered", value: self.years_covered },
            StatCard { label: "Recent Studies", value: self.recent_studies },
        ]
    }
}

/// `(year, count)` pairs in ascending year order. Keys that are not years
/// sort after the numeric ones.
pub fn year_series(stats: &PublicationStats) -> Vec<(String, u64)> {
    let mut series: Vec<(String, u64)> = stats.by_year.iter().map(|(y, c)| (y.clone(), *c)).collect();
    series.sort_by_key(|(y, _)| (y.parse::<i32>().unwrap_or(i32::MAX), y.clone()));
    series
}

/// The `n` largest tags, most frequent first, ties broken by name.
pub fn top_tags(stats: &PublicationStats, n: usize) -> Vec<(String, u64)> {
    let mut tags: Vec<(String, u64)> = stats.by_tag.iter().map(|(t, c)| (t.clone(), *c)).collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tags.truncate(n);
    tags
}

pub fn recent(stats: &PublicationStats, n: usize) -> &[Publication] {
    &stats.recent[..stats.recent.len().min(n)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn stats() -> PublicationStats {
        PublicationStats {
            total: 12,
            by_year: BTreeMap::from([("2021".into(), 7), ("2020".into(), 5)]),
            by_tag: BTreeMap::from([("ISS".into(), 4), ("Bone Health".into(), 2), ("Arabidopsis".into(), 4)]),
            recent: bioscience_common::fixtures::sample_publications(),
        }
    }

    #[test]
    fn test_cards_from_stats() {
        let d = DashboardStats::from_stats(Some(&stats()));
        assert_eq!(d.years_covered, 2);
        assert_eq!(d.research_areas, 3);
        assert_eq!(d.total_publications, 12);
        assert_eq!(d.recent_studies, 5);
        assert_eq!(d.cards()[2], StatCard { label: "Years Covered", value: 2 });
    }

    #[test]
    fn test_fallbacks_without_stats() {
        let d = DashboardStats::from_stats(None);
        assert_eq!(d.total_publications, 608);
        assert_eq!(d.recent_studies, 10);
        assert_eq!(d.research_areas, 0);
    }

    #[test]
    fn test_zero_total_is_not_replaced() {
        let empty = PublicationStats { total: 0, by_year: BTreeMap::new(), by_tag: BTreeMap::new(), recent: vec![] };
        let d = DashboardStats::from_stats(Some(&empty));
        assert_eq!(d.total_publications, 0);
        assert_eq!(d.recent_studies, 0);
    }

    #[test]
    fn test_series_ordering() {
        let s = stats();
        assert_eq!(year_series(&s), vec![("2020".to_string(), 5), ("2021".to_string(), 7)]);
        assert_eq!(
            top_tags(&s, 2),
            vec![("Arabidopsis".to_string(), 4), ("ISS".to_string(), 4)]
        );
        assert_eq!(recent(&s, 3).len(), 3);
        assert_eq!(recent(&s, 50).len(), 5);
    }
}
