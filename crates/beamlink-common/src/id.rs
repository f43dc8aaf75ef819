use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::errors::RoutingError;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifies one call session between a sharer and a viewer.
///
/// Codes are short and human-typeable; uniqueness is best-effort only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareCode(String);

impl ShareCode {
    /// Generate a 6-character base-36 code: three random characters followed
    /// by three characters taken from the millisecond clock.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut code: String = (0..3)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        code.extend(to_base36(millis).chars().skip(2).take(3));
        Self(code)
    }

    /// Parse a user-entered code. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, RoutingError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RoutingError::MissingShareCode { channel: "input" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ShareCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ShareCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}
