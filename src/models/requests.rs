//! Request DTOs for the cache administration API
//!
//! Defines the structure of incoming HTTP request bodies.

use regex::Regex;
use serde::Deserialize;

/// Maximum accepted pattern length in bytes
const MAX_PATTERN_LENGTH: usize = 256;

/// Request body for POST /cache/invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Regular expression tested against every cache key
    pub pattern: String,
}

impl InvalidateRequest {
    /// Compiles the pattern, returning an error message if it is unusable.
    pub fn compile(&self) -> Result<Regex, String> {
        if self.pattern.is_empty() {
            return Err("Pattern cannot be empty".to_string());
        }
        if self.pattern.len() > MAX_PATTERN_LENGTH {
            return Err(format!(
                "Pattern exceeds maximum length of {} characters",
                MAX_PATTERN_LENGTH
            ));
        }
        Regex::new(&self.pattern).map_err(|err| format!("Invalid pattern: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_request_deserialize() {
        let json = r#"{"pattern": "^event:"}"#;
        let req: InvalidateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.pattern, "^event:");
        assert!(req.compile().is_ok());
    }

    #[test]
    fn test_compile_empty_pattern() {
        let req = InvalidateRequest {
            pattern: "".to_string(),
        };
        assert!(req.compile().is_err());
    }

    #[test]
    fn test_compile_invalid_regex() {
        let req = InvalidateRequest {
            pattern: "(event".to_string(),
        };
        assert!(req.compile().unwrap_err().starts_with("Invalid pattern"));
    }
}
