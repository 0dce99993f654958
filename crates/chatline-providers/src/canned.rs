//! Local canned replies, the last resort when every remote strategy failed.
//!
//! Replies are picked by keyword, then by a digest of the message, so the same
//! message always yields the same reply.

use sha2::{Digest, Sha256};

struct Topic {
    terms: &'static [&'static str],
    replies: &'static [&'static str],
}

const TOPICS: &[Topic] = &[
    Topic {
        terms: &["kafka", "consumer", "producer", "partition"],
        replies: &[
            "Kafka's architecture is built around a distributed commit log. Producers write data, consumers read it, and brokers store it in partitions. What aspect would you like to explore?",
            "When working with Kafka, consumer groups are crucial: each partition is consumed by exactly one consumer in a group, which enables parallel processing while keeping order within a partition.",
        ],
    },
    Topic {
        terms: &["distributed", "consensus", "replication"],
        replies: &[
            "In distributed systems the core challenge is keeping nodes consistent while tolerating network partitions. The CAP theorem says you can only guarantee two of consistency, availability, and partition tolerance.",
            "Consensus algorithms like Raft and Paxos get several nodes to agree on a value. Raft is usually easier to follow: it elects a leader that coordinates all writes.",
        ],
    },
    Topic {
        terms: &["kubernetes", "k8s", "pod", "container"],
        replies: &[
            "Kubernetes orchestrates containerized applications across a cluster. The basic unit is a **Pod**, managed by higher-level objects like Deployments and StatefulSets.",
            "For cost optimization in Kubernetes, consider:\n- right-sizing your pods\n- the Horizontal Pod Autoscaler\n- spot instances for fault-tolerant workloads",
        ],
    },
    Topic {
        terms: &["machine learning", "ml", "model", "ai"],
        replies: &[
            "ML systems have their own infrastructure challenges: data pipelines, feature stores, model serving, and drift monitoring. Are you focused on training or on serving?",
            "The ML lifecycle covers data preparation, feature engineering, training, validation, deployment, and monitoring. Which stage are you working on?",
        ],
    },
];

const PATTERNS: &[Topic] = &[
    Topic {
        terms: &["yes", "sure", "okay", "interested"],
        replies: &[
            "Great! Let's dive deeper. Should I start with the fundamentals or jump into more advanced topics?",
            "Excellent! Would you prefer a high-level overview first?",
        ],
    },
    Topic {
        terms: &["no", "not now", "later", "busy"],
        replies: &[
            "No problem! Feel free to ask me anything else whenever you're ready.",
            "Understood! We can pick this up when you have more time.",
        ],
    },
    Topic {
        terms: &["more", "detail", "explain", "how", "why"],
        replies: &[
            "Let me break this down further. The concept involves several connected ideas. Which aspect should I elaborate on?",
            "Happy to go deeper! The key is understanding the *why* behind the design decisions. Which part interests you most?",
        ],
    },
    Topic {
        terms: &["example", "show", "demo", "code"],
        replies: &[
            "Here's a practical example: imagine a system processing thousands of events per second. The challenge is processing each event exactly once, even when failures occur.",
            "A concrete example: large platforms rely on idempotent operations and transaction logs to survive partial failures.",
        ],
    },
    Topic {
        terms: &["thanks", "thank you", "helpful"],
        replies: &[
            "You're welcome! Is there anything else you'd like to explore?",
            "Glad I could help! Feel free to ask more questions.",
        ],
    },
];

const DEFAULT_REPLIES: &[&str] = &[
    "That's an interesting point! Could you tell me more about what you'd like to focus on?",
    "I'd like to understand your question better. Are you looking for a conceptual explanation or practical guidance?",
    "Good question! Could you share more context about what you're working on?",
];

/// Generates replies locally without any network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

impl CannedResponder {
    pub fn new() -> Self {
        Self
    }

    /// Returns a reply for `message`. Never fails.
    pub fn reply(&self, message: &str) -> String {
        let normalized = normalize(message);
        let replies = TOPICS
            .iter()
            .chain(PATTERNS)
            .find(|topic| topic.terms.iter().any(|term| normalized.contains(&padded(term))))
            .map_or(DEFAULT_REPLIES, |topic| topic.replies);

        replies[pick_index(message, replies.len())].to_string()
    }

    /// Splits a reply into word-sized chunks for simulated streaming.
    ///
    /// Concatenating the chunks yields `reply` exactly.
    pub fn chunks(reply: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for (i, word) in reply.split(' ').enumerate() {
            if i > 0 {
                chunks.push(" ".to_string());
            }
            if !word.is_empty() {
                chunks.push(word.to_string());
            }
        }
        chunks
    }
}

/// Lowercases and replaces punctuation with spaces, padded on both ends so
/// terms only match whole words.
fn normalize(message: &str) -> String {
    let words: String = message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let collapsed = words.split_whitespace().collect::<Vec<_>>().join(" ");
    padded(&collapsed)
}

fn padded(term: &str) -> String {
    format!(" {term} ")
}

fn pick_index(message: &str, len: usize) -> usize {
    let digest = Sha256::digest(message.trim().as_bytes());
    let seed = u64::from_le_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ]);
    (seed % len as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_match() {
        let reply = CannedResponder::new().reply("How do Kafka partitions work?");
        assert!(reply.contains("Kafka"));
    }

    #[test]
    fn test_whole_word_matching() {
        // "know" must not trigger the "no" pattern, "html" must not trigger "ml".
        let reply = CannedResponder::new().reply("I know html");
        assert!(DEFAULT_REPLIES.contains(&reply.as_str()));
    }

    #[test]
    fn test_multi_word_term() {
        let reply = CannedResponder::new().reply("Thank you!");
        assert!(PATTERNS[4].replies.contains(&reply.as_str()));
    }

    #[test]
    fn test_deterministic() {
        let responder = CannedResponder::new();
        assert_eq!(
            responder.reply("tell me something"),
            responder.reply("tell me something")
        );
    }

    #[test]
    fn test_empty_message_gets_default() {
        let reply = CannedResponder::new().reply("");
        assert!(DEFAULT_REPLIES.contains(&reply.as_str()));
    }

    #[test]
    fn test_chunks_reassemble_exactly() {
        for reply in ["one", "two words", "double  space", " leading", "trailing "] {
            assert_eq!(CannedResponder::chunks(reply).concat(), reply);
        }
        assert_eq!(CannedResponder::chunks("a b"), vec!["a", " ", "b"]);
    }
}
