//! Host-suffix trust scoring for live web results (§4.6): trusted suffixes score 0.9, blocked
//! suffixes score 0.0, everything else 0.5. Disableable by configuration (always 0.5).

/// Configured trust lists plus the enable/disable switch.
#[derive(Debug, Clone, Default)]
pub struct TrustConfig {
    pub trusted_suffixes: Vec<String>,
    pub blocked_suffixes: Vec<String>,
    pub enabled: bool,
}

fn host_of(url: &str) -> Option<String> {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme.split(['/', '?', '#']).next()?;
    let host = host.rsplit('@').next()?;
    Some(host.split(':').next().unwrap_or(host).to_lowercase())
}

fn matches_suffix(host: &str, suffix: &str) -> bool {
    let suffix = suffix.to_lowercase();
    host == suffix || host.ends_with(&format!(".{suffix}"))
}

/// Computes `trust(url)` per the configured suffix lists.
pub fn trust_score(url: &str, config: &TrustConfig) -> f32 {
    if !config.enabled {
        return 0.5;
    }
    let Some(host) = host_of(url) else {
        return 0.5;
    };
    if config.blocked_suffixes.iter().any(|s| matches_suffix(&host, s)) {
        return 0.0;
    }
    if config.trusted_suffixes.iter().any(|s| matches_suffix(&host, s)) {
        return 0.9;
    }
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrustConfig {
        TrustConfig {
            trusted_suffixes: vec!["docs.rs".to_string(), "rust-lang.org".to_string()],
            blocked_suffixes: vec!["spam.example".to_string()],
            enabled: true,
        }
    }

    #[test]
    fn trusted_suffix_scores_high() {
        assert_eq!(trust_score("https://doc.rust-lang.org/std/", &config()), 0.9);
    }

    #[test]
    fn blocked_suffix_scores_zero() {
        assert_eq!(trust_score("https://sub.spam.example/page", &config()), 0.0);
    }

    #[test]
    fn unknown_host_scores_neutral() {
        assert_eq!(trust_score("https://example.org/page", &config()), 0.5);
    }

    #[test]
    fn disabled_trust_always_neutral() {
        let mut cfg = config();
        cfg.enabled = false;
        assert_eq!(trust_score("https://doc.rust-lang.org", &cfg), 0.5);
    }

    #[test]
    fn exact_domain_match_without_subdomain() {
        assert_eq!(trust_score("https://docs.rs/serde", &config()), 0.9);
    }
}
