use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached daily quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
    pub fetched_at: DateTime<Utc>,
}
