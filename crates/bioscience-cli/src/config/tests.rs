#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_match_backend_policies() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.policies(), QueryPolicies::default());
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [api]
            base_url = "https://bio.example.org"

            [cache]
            stats_stale_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://bio.example.org");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache.publications_stale_secs, 300);
        assert_eq!(config.policies().publication_stats.stale_time, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_health_interval_rejected() {
        let err = Config::from_toml("[health]\ninterval_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn test_search_section_only_tunes_debounce() {
        // Page size is fixed; a stray key is ignored.
        let config = Config::from_toml("[search]\npage_size = 50\ndebounce_ms = 150\n").unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(150));
        assert_eq!(config.search, SearchConfig { debounce_ms: 150 });
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[health]\nretries = 5\ninterval_secs = 10").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.policies().health.retry.max_retries, 5);
        assert_eq!(config.policies().health.refetch_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
