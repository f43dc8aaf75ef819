use serde::{Deserialize, Serialize};
use std::fmt;

use rand::Rng;

use crate::id::ShareCode;

/// Name a client announces in its `login` message.
///
/// Used by the relay to address traffic and for display and logging only;
/// it carries no authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantIdentity(String);

impl ParticipantIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// A viewer logs in under its own share code so that calls addressed to
    /// that code reach it.
    pub fn viewer() -> (Self, ShareCode) {
        let code = ShareCode::generate();
        (Self(code.as_str().to_string()), code)
    }

    /// Sharers get a throwaway `shareuserNN` name.
    pub fn sharer() -> Self {
        let n: u32 = rand::thread_rng().gen_range(0..100);
        Self(format!("shareuser{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
