//! Network fingerprint matching against signature ports and service names.

use std::collections::BTreeSet;

use minesense_core::{Modality, NetworkObservation};

use super::{MatcherConfig, ModalityMatcher};
use crate::catalogue::SignatureCatalogue;
use crate::domain::ModalityScore;

/// Service name fragments of mining software and protocols.
pub const MINING_SERVICE_KEYWORDS: &[&str] = &[
    "stratum",
    "xmrig",
    "cgminer",
    "bfgminer",
    "ccminer",
    "ethminer",
    "phoenixminer",
    "nbminer",
    "teamredminer",
    "gminer",
    "lolminer",
];

const SSH_PORT: u16 = 22;
const WEB_PORTS: [u16; 2] = [80, 443];

/// Returns `true` if `keyword` is a known mining service fragment.
pub fn is_known_service_keyword(keyword: &str) -> bool {
    MINING_SERVICE_KEYWORDS.contains(&keyword)
}

/// Scores open ports and running services against network signatures.
#[derive(Debug, Clone)]
pub struct NetworkMatcher {
    port_increment: f64,
    service_increment: f64,
    ssh_increment: f64,
    web_increment: f64,
}

impl NetworkMatcher {
    /// Create a new network matcher
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            port_increment: config.port_increment,
            service_increment: config.service_increment,
            ssh_increment: config.ssh_increment,
            web_increment: config.web_increment,
        }
    }
}

impl Default for NetworkMatcher {
    fn default() -> Self {
        Self::new(&MatcherConfig::default())
    }
}

impl ModalityMatcher for NetworkMatcher {
    type Features = NetworkObservation;

    fn modality(&self) -> Modality {
        Modality::Network
    }

    fn match_features(
        &self,
        observation: &NetworkObservation,
        catalogue: &SignatureCatalogue,
    ) -> Vec<ModalityScore> {
        if observation.is_empty() {
            return Vec::new();
        }

        let open: BTreeSet<u16> = observation.open_ports.iter().copied().collect();
        let services: Vec<String> = observation
            .services
            .iter()
            .map(|s| s.to_lowercase())
            .collect();

        catalogue
            .signatures_for(Modality::Network)
            .filter_map(|signature| {
                let mut score = 0.0;
                let mut evidence = BTreeSet::new();

                for port in signature.ports.iter().filter(|p| open.contains(p)) {
                    score += self.port_increment;
                    evidence.insert(format!("port_{port}"));
                }
                let matched_services: Vec<&String> = signature
                    .pattern_names
                    .iter()
                    .filter(|keyword| services.iter().any(|s| s.contains(keyword.as_str())))
                    .collect();
                if !matched_services.is_empty() {
                    score += self.service_increment;
                    evidence.extend(matched_services.into_iter().map(|k| format!("service_{k}")));
                }

                // auxiliary ports only corroborate a signature hit
                if score <= 0.0 {
                    return None;
                }
                if open.contains(&SSH_PORT) {
                    score += self.ssh_increment;
                    evidence.insert("ssh_open".to_string());
                }
                if WEB_PORTS.iter().any(|p| open.contains(p)) {
                    score += self.web_increment;
                    evidence.insert("web_open".to_string());
                }

                Some(ModalityScore::new(
                    signature.device_class.clone(),
                    Modality::Network,
                    score,
                    evidence,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratum_port_and_service() {
        let observation = NetworkObservation::new(vec![22, 3333], vec!["Stratum-Proxy".into()]);
        let scores = NetworkMatcher::default().match_features(&observation, &SignatureCatalogue::builtin());

        let bitcoin = scores.iter().find(|s| s.device_class == "bitcoin").unwrap();
        assert!(bitcoin.has_evidence("port_3333"));
        assert!(bitcoin.has_evidence("service_stratum"));
        assert!(bitcoin.has_evidence("ssh_open"));
        assert!((bitcoin.score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_auxiliary_ports_alone_score_nothing() {
        let observation = NetworkObservation::new(vec![22, 80, 443], vec!["nginx".into()]);
        assert!(NetworkMatcher::default()
            .match_features(&observation, &SignatureCatalogue::builtin())
            .is_empty());
    }

    #[test]
    fn test_xmrig_only_matches_monero() {
        let observation = NetworkObservation::new(vec![18081], vec!["xmrig".into()]);
        let scores = NetworkMatcher::default().match_features(&observation, &SignatureCatalogue::builtin());
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].device_class, "monero");
        assert!((scores[0].score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_table() {
        assert!(is_known_service_keyword("stratum"));
        assert!(!is_known_service_keyword("nginx"));
    }
}
