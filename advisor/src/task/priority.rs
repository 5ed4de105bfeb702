use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Urgency classification of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Error returned when a priority string is not in the recognised table.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PriorityError {
    #[error("Invalid priority '{0}', expected one of: low, medium, high")]
    Invalid(String),
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PriorityError;

    /// Parses a priority case-insensitively after trimming whitespace.
    /// Portuguese spellings (`baixa`, `media`, `média`, `alta`) are accepted too.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "low" | "baixa" => Ok(Priority::Low),
            "medium" | "media" | "média" => Ok(Priority::Medium),
            "high" | "alta" => Ok(Priority::High),
            _ => Err(PriorityError::Invalid(input.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_recognised_priorities() {
        let cases = [
            ("low", Priority::Low),
            ("baixa", Priority::Low),
            ("medium", Priority::Medium),
            ("media", Priority::Medium),
            ("média", Priority::Medium),
            ("high", Priority::High),
            ("alta", Priority::High),
        ];

        for (input, expected) in cases {
            assert_eq!(input.parse::<Priority>(), Ok(expected), "input: {input}");
        }
    }

    #[test]
    fn can_parse_ignoring_case_and_whitespace() {
        assert_eq!("  HIGH ".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("Média".parse::<Priority>(), Ok(Priority::Medium));
        assert_eq!("\tBaixa\n".parse::<Priority>(), Ok(Priority::Low));
    }

    #[test]
    fn rejects_unknown_priorities() {
        for input in ["", "   ", "urgent", "lowest", "med", "hi gh"] {
            assert_eq!(
                input.parse::<Priority>(),
                Err(PriorityError::Invalid(input.to_string())),
                "input: {input:?}"
            );
        }
    }

    #[test]
    fn can_display_canonical_name() {
        assert_eq!(Priority::Medium.to_string(), "medium");
        assert_eq!(
            serde_json::to_string(&Priority::High).unwrap(),
            "\"high\""
        );
    }
}
