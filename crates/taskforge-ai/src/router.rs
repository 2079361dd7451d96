//! Intent Router (C4): classifies a prompt into a domain, complexity,
//! and sub-agent recommendation, preferring an LLM judgment and falling
//! back to a deterministic keyword heuristic — grounded on the teacher's
//! `llm/switcher.rs` dispatch shape, with vocabularies covering Korean and
//! English per the domain-distribution requirement.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use taskforge_traits::Domain;

use crate::llm::{CompletionRequest, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    pub domain: Domain,
    pub confidence: f32,
    pub complexity: Complexity,
    pub requires_sub_agents: bool,
    pub reasoning: String,
}

const CLASSIFY_INSTRUCTION: &str = r#"Classify the user's task. Respond with a single JSON object only, matching:
{"domain": "coding|research|data|general", "confidence": 0.0-1.0, "complexity": "simple|moderate|complex|critical", "requires_sub_agents": true|false, "reasoning": "..."}"#;

struct Vocabulary {
    domain: Domain,
    words: &'static [&'static str],
}

const VOCABULARIES: &[Vocabulary] = &[
    Vocabulary {
        domain: Domain::Coding,
        words: &[
            "code", "function", "bug", "refactor", "compile", "implement", "코드", "함수", "버그", "구현",
        ],
    },
    Vocabulary {
        domain: Domain::Research,
        words: &[
            "research", "investigate", "compare", "survey", "analyze literature", "조사", "연구", "비교",
        ],
    },
    Vocabulary {
        domain: Domain::Data,
        words: &[
            "dataset", "csv", "dataframe", "sql", "pipeline", "clean data", "데이터", "전처리",
        ],
    },
    Vocabulary {
        domain: Domain::General,
        words: &["help", "explain", "what is", "설명", "도와줘"],
    },
];

const HEURISTIC_CONFIDENCE: f32 = 0.4;

fn heuristic_classify(prompt: &str) -> IntentClassification {
    let lower = prompt.to_lowercase();
    let mut best: Option<(Domain, usize)> = None;

    for vocab in VOCABULARIES {
        let hits = vocab.words.iter().filter(|w| lower.contains(*w)).count();
        if hits > 0 && best.map(|(_, best_hits)| hits > best_hits).unwrap_or(true) {
            best = Some((vocab.domain, hits));
        }
    }

    let (domain, hits) = best.unwrap_or((Domain::General, 0));
    let requires_sub_agents = prompt.split_whitespace().count() > 40;
    let complexity = if requires_sub_agents {
        Complexity::Complex
    } else if hits > 1 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    };

    IntentClassification {
        domain,
        confidence: HEURISTIC_CONFIDENCE,
        complexity,
        requires_sub_agents,
        reasoning: "keyword heuristic fallback".to_string(),
    }
}

fn parse_llm_classification(text: &str) -> Option<IntentClassification> {
    let trimmed = text.trim();
    let json_slice = trimmed
        .find('{')
        .and_then(|start| trimmed.rfind('}').map(|end| &trimmed[start..=end]))
        .unwrap_or(trimmed);
    serde_json::from_str(json_slice).ok()
}

/// Routes prompts to a domain/complexity classification, grounded on the
/// `classify(prompt)` contract: LLM-first, deterministic-heuristic
/// fallback, with a domain-distribution counter for observability.
pub struct IntentRouter {
    confidence_threshold: f32,
    domain_counts: DashMap<&'static str, AtomicU64>,
}

impl IntentRouter {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            domain_counts: DashMap::new(),
        }
    }

    pub async fn classify(
        &self,
        gateway: &crate::llm::CachingLlmGateway,
        prompt: &str,
    ) -> IntentClassification {
        let request = CompletionRequest::new(vec![
            Message::system(CLASSIFY_INSTRUCTION),
            Message::user(prompt),
        ])
        .with_temperature(0.0);

        let classification = match gateway.complete(request).await {
            Ok(response) => response
                .content
                .as_deref()
                .and_then(parse_llm_classification)
                .filter(|c| c.confidence >= self.confidence_threshold)
                .unwrap_or_else(|| heuristic_classify(prompt)),
            Err(_) => heuristic_classify(prompt),
        };

        self.domain_counts
            .entry(classification.domain.as_str())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);

        classification
    }

    pub fn domain_distribution(&self) -> Vec<(&'static str, u64)> {
        self.domain_counts
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect()
    }
}
