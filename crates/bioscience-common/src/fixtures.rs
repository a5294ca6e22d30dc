//! Sample publication dataset.
//!
//! Five representative space-biology records used for offline browsing and
//! as a fixed dataset in tests.

use crate::entities::{Publication, PublicationId};

fn record(
    id: i64,
    title: &str,
    authors: &str,
    year: i32,
    abstract_text: &str,
    tags: &[&str],
    relevance: f64,
) -> Publication {
    Publication {
        id: PublicationId::Number(id),
        title: title.to_string(),
        link: format!("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC{:07}/", 1_000_000 + id),
        authors: authors.to_string(),
        year,
        r#abstract: abstract_text.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        relevance,
        pmc_id: Some(format!("PMC{:07}", 1_000_000 + id)),
    }
}

pub fn sample_publications() -> Vec<Publication> {
    vec![
        record(
            1,
            "Effects of Microgravity on Bone Density in Long-Duration Spaceflight",
            "Smith, J., Anderson, K., Martinez, R.",
            2022,
            "This study examines the effects of prolonged exposure to microgravity on bone \
             mineral density in astronauts during extended missions aboard the International \
             Space Station...",
            &["Human Physiology", "Bone Health", "ISS", "Long-Duration"],
            98.0,
        ),
        record(
            2,
            "Plant Growth Responses to Reduced Gravity Environments: Arabidopsis Studies",
            "Chen, L., Wilson, P., Thompson, M.",
            2022,
            "Investigation of plant morphology, gene expression, and growth patterns in \
             Arabidopsis thaliana under simulated and actual microgravity conditions...",
            &["Plant Biology", "Arabidopsis", "Gene Expression", "Microgravity"],
            95.0,
        ),
        record(
            3,
            "Microbial Behavior and Biofilm Formation in Space Station Environments",
            "Johnson, R., Davis, A., Kumar, S.",
            2021,
            "Analysis of bacterial growth patterns, antibiotic resistance, and biofilm \
             formation in the ISS environment, with implications for crew health and hardware \
             maintenance...",
            &["Microbiology", "Biofilm", "ISS", "Crew Health"],
            92.0,
        ),
        record(
            4,
            "Cardiovascular Adaptations During Spaceflight: A Longitudinal Study",
            "Lee, H., Brown, T., Garcia, F.",
            2021,
            "Comprehensive examination of cardiovascular system changes including cardiac \
             output, blood pressure regulation, and vascular remodeling during and after \
             spaceflight...",
            &["Human Physiology", "Cardiovascular", "Adaptation", "ISS"],
            89.0,
        ),
        record(
            5,
            "Circadian Rhythm Disruption in Space: Molecular Mechanisms",
            "Wang, X., Rodriguez, M., Taylor, S.",
            2020,
            "Study of molecular clock gene expression and melatonin production in astronauts, \
             examining the effects of altered light-dark cycles on sleep patterns...",
            &["Human Physiology", "Circadian Rhythm", "Gene Expression", "Sleep"],
            87.0,
        ),
    ]
}

/// Case-insensitive match over title, abstract, tags and authors.
pub fn matches(publication: &Publication, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    publication.title.to_lowercase().contains(&term)
        || publication.r#abstract.to_lowercase().contains(&term)
        || publication.tags.iter().any(|t| t.to_lowercase().contains(&term))
        || publication.authors.to_lowercase().contains(&term)
}

/// Filters `publications` by a free-text query. Blank queries return everything.
pub fn search<'a>(query: &str, publications: &'a [Publication]) -> Vec<&'a Publication> {
    publications.iter().filter(|p| matches(p, query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bone_query_finds_bone_density_only() {
        let pubs = sample_publications();
        let hits = search("bone", &pubs);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].title.contains("Bone Density"));
    }

    #[test]
    fn test_blank_query_returns_all() {
        let pubs = sample_publications();
        assert_eq!(search("   ", &pubs).len(), pubs.len());
    }

    #[test]
    fn test_search_covers_tags_and_authors() {
        let pubs = sample_publications();
        let iss: Vec<_> = search("iss", &pubs).iter().map(|p| p.id.to_string()).collect();
        assert_eq!(iss, vec!["1", "3", "4"]);

        let by_author = search("Kumar", &pubs);
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].id, PublicationId::Number(3));
    }
}
