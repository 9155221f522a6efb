use crate::config::WikipediaConfig;
use std::collections::HashSet;
use tracing::{info, warn};

/// Picks the topic of a ranked source: the most popular candidate that is
/// neither denylisted nor an administrative page.
pub struct TopicResolver {
    denylist: HashSet<String>,
    namespace_prefixes: Vec<String>,
    default_topic: String,
}

impl TopicResolver {
    pub fn new(
        denylist: impl IntoIterator<Item = String>,
        namespace_prefixes: Vec<String>,
        default_topic: impl Into<String>,
    ) -> Self {
        Self {
            denylist: denylist.into_iter().collect(),
            namespace_prefixes,
            default_topic: default_topic.into(),
        }
    }

    pub fn from_config(cfg: &WikipediaConfig) -> Self {
        Self::new(
            cfg.denylist.iter().cloned(),
            cfg.namespace_prefixes.clone(),
            cfg.default_topic.clone(),
        )
    }

    #[cfg(test)]
    pub fn default_topic(&self) -> &str {
        &self.default_topic
    }

    pub fn is_allowed(&self, candidate: &str) -> bool {
        !self.denylist.contains(candidate)
            && !self
                .namespace_prefixes
                .iter()
                .any(|prefix| candidate.starts_with(prefix.as_str()))
    }

    /// Returns the first allowed candidate in rank order, or the configured
    /// default when none survives.
    pub fn resolve<'a>(&self, ranked: impl IntoIterator<Item = &'a str>) -> String {
        match ranked.into_iter().find(|c| self.is_allowed(c)) {
            Some(topic) => {
                info!("🌟 Top trend found: {}", topic);
                topic.to_string()
            }
            None => {
                warn!(
                    "No usable ranked candidate, falling back to {}",
                    self.default_topic
                );
                self.default_topic.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TopicResolver {
        TopicResolver::from_config(&WikipediaConfig::default())
    }

    #[test]
    fn skips_denylisted_and_namespaced_entries() {
        let ranked = ["Hauptseite", "Spezial:Suche", "RealTopic", "Other"];
        assert_eq!(resolver().resolve(ranked), "RealTopic");
    }

    #[test]
    fn prefix_match_covers_unlisted_pages() {
        let ranked = ["Datei:Logo.png", "Wikipedia:Beliebig", "Spezial:Neu", "Eric_Dane"];
        assert_eq!(resolver().resolve(ranked), "Eric_Dane");
    }

    #[test]
    fn denylist_is_exact_match() {
        let r = resolver();
        assert!(!r.is_allowed("Cleopatra"));
        assert!(r.is_allowed("Cleopatra_VII."));
    }

    #[test]
    fn degenerate_ranking_yields_default() {
        let r = resolver();
        assert_eq!(r.resolve(["Hauptseite", "Spezial:Suche"]), "Künstliche_Intelligenz");
        assert_eq!(r.resolve(Vec::<&str>::new()), r.default_topic());
    }

    #[test]
    fn never_returns_a_filtered_candidate_when_a_valid_one_exists() {
        let r = resolver();
        let pool = [
            "Hauptseite",
            "Wikipedia:Impressum",
            "Spezial:Anmelden",
            "-_Hauptseite",
            "Datei:X.jpg",
            "Berlin",
        ];
        for start in 0..pool.len() {
            let rotated: Vec<&str> = pool[start..].iter().chain(pool[..start].iter()).copied().collect();
            let picked = r.resolve(rotated.iter().copied());
            assert_eq!(picked, "Berlin");
        }
    }
}
