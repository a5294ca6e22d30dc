//! Plain-text rendering for terminal output.

use bioscience_client::dashboard::DashboardStats;
use bioscience_client::PageItem;
use bioscience_common::entities::{HealthResponse, Publication};

const BAR_WIDTH: usize = 40;

pub fn publication_row(p: &Publication) -> String {
    format!("[{}] {} ({}) · {:.0}% relevance", p.id, p.title, p.year, p.relevance)
}

pub fn publication_detail(p: &Publication) -> String {
    let mut out = format!("{}\n{}\n", p.title, "=".repeat(p.title.chars().count().min(80)));
    out.push_str(&format!("Authors: {}\nYear:    {}\n", p.authors, p.year));
    if !p.tags.is_empty() {
        out.push_str(&format!("Tags:    {}\n", p.tags.join(", ")));
    }
    if let Some(ref pmc) = p.pmc_id {
        out.push_str(&format!("PMC:     {}\n", pmc));
    }
    out.push_str(&format!("Link:    {}\n\n{}\n", p.link, p.r#abstract));
    out
}

pub fn health_line(h: &HealthResponse) -> String {
    let mut line = if h.is_healthy() { "● healthy".to_string() } else { "○ unhealthy".to_string() };
    if let Some(ref model) = h.model {
        line.push_str(&format!(" · model {}", model));
    }
    if let Some(ref err) = h.error {
        line.push_str(&format!(" · {}", err));
    }
    line
}

/// `‹ 1 … 4 5 [6] 7 8 … 10 ›`
pub fn page_bar(items: &[PageItem], current: u32) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|item| match item {
            PageItem::Page(n) if *n == current => format!("[{}]", n),
            PageItem::Page(n) => n.to_string(),
            PageItem::Ellipsis => "…".to_string(),
        })
        .collect();
    format!("‹ {} ›", parts.join(" "))
}

pub fn stat_cards(stats: &DashboardStats) -> String {
    stats
        .cards()
        .iter()
        .map(|c| format!("{:>20}: {}", c.label, c.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Horizontal bar chart, scaled to the largest value.
pub fn bar_chart(series: &[(String, u64)]) -> String {
    let max = series.iter().map(|(_, v)| *v).max().unwrap_or(0);
    let label_width = series.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    series
        .iter()
        .map(|(label, value)| {
            let len = if max == 0 { 0 } else { (*value as usize * BAR_WIDTH).div_ceil(max as usize) };
            format!("{:>w$} │{} {}", label, "█".repeat(len), value, w = label_width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioscience_common::fixtures::sample_publications;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_bar_marks_current_page() {
        let items = [PageItem::Page(1), PageItem::Ellipsis, PageItem::Page(5), PageItem::Page(6)];
        assert_eq!(page_bar(&items, 5), "‹ 1 … [5] 6 ›");
    }

    #[test]
    fn test_publication_row() {
        let p = &sample_publications()[0];
        assert_eq!(
            publication_row(p),
            "[1] Effects of Microgravity on Bone Density in Long-Duration Spaceflight (2022) · 98% relevance"
        );
        assert!(publication_detail(p).contains("Tags:    Human Physiology, Bone Health, ISS, Long-Duration"));
    }

    #[test]
    fn test_bar_chart_scales_to_max() {
        let chart = bar_chart(&[("2020".into(), 5), ("2021".into(), 10)]);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0].matches('█').count(), 20);
        assert_eq!(lines[1].matches('█').count(), 40);
        assert!(bar_chart(&[]).is_empty());
    }

    #[test]
    fn test_stat_cards_fallback() {
        let text = stat_cards(&DashboardStats::from_stats(None));
        assert!(text.contains("Total Publications: 608"));
        assert!(text.contains("Recent Studies: 10"));
    }
}
