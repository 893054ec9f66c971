use serde::{Deserialize, Serialize};

/// Token accounting reported by the completion service.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Tokens consumed by the conversation history.
    #[serde(default)]
    pub prompt_tokens: u64,

    /// Tokens produced in the reply.
    #[serde(default)]
    pub completion_tokens: u64,

    /// Sum of the two, as reported by the service.
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Create a new `Usage` with the given prompt and completion tokens.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::Add for Usage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn usage_tolerates_missing_fields() {
        let usage: Usage = serde_json::from_value(json!({"prompt_tokens": 12})).unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn usage_add() {
        let total = Usage::new(10, 5) + Usage::new(1, 2);
        assert_eq!(total, Usage::new(11, 7));
        assert_eq!(total.total_tokens, 18);
    }
}
