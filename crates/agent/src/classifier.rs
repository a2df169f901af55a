use serde::Deserialize;
use tracing::{debug, warn};

use concierge_core::{AgentKind, Classification, Intent};

use crate::runner::AgentRunner;

const ORDER_KEYWORDS: &[&str] = &["order", "delivery", "track", "return", "refund"];
const PRODUCT_KEYWORDS: &[&str] =
    &["product", "ingredient", "recommend", "shampoo", "detergent", "soap", "cleaner"];

const SUMMARY_LIMIT: usize = 100;

#[derive(Deserialize)]
struct TriageReply {
    classification: String,
    summary: String,
}

/// Places a message in the closed intent set. Degrades, never fails: backend
/// trouble falls back to keyword rules, an unparseable reply falls back to
/// `GENERAL` carrying the raw reply as its summary.
pub struct Classifier {
    runner: Option<AgentRunner>,
}

impl Classifier {
    pub fn live(runner: AgentRunner) -> Self {
        Self { runner: Some(runner) }
    }

    pub fn offline() -> Self {
        Self { runner: None }
    }

    pub async fn classify(&self, message: &str) -> Classification {
        let Some(runner) = &self.runner else {
            return keyword_classification(message);
        };

        match runner.run_single_turn(AgentKind::Triage, message).await {
            Ok(reply) => match parse_triage_reply(&reply) {
                Some(classification) => classification,
                None => {
                    debug!(
                        event_name = "classifier.unparseable_reply",
                        "triage reply was not classification JSON"
                    );
                    Classification::general(reply.trim())
                }
            },
            Err(err) => {
                warn!(
                    event_name = "classifier.backend_degraded",
                    error = %err,
                    "falling back to keyword classification"
                );
                keyword_classification(message)
            }
        }
    }
}

fn parse_triage_reply(reply: &str) -> Option<Classification> {
    // Tolerate prose or code fences around the JSON object.
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    let parsed: TriageReply = serde_json::from_str(reply.get(start..=end)?).ok()?;
    Some(Classification::new(Intent::parse(&parsed.classification), parsed.summary))
}

fn keyword_classification(message: &str) -> Classification {
    let lowered = message.to_lowercase();
    let intent = if ORDER_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Intent::Order
    } else if PRODUCT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Intent::Product
    } else {
        Intent::General
    };

    let summary: String = message.chars().take(SUMMARY_LIMIT).collect();
    Classification::new(intent, summary)
}
