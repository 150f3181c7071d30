//! Memory record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single memorized item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub importance: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl MemoryRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if now > expiry)
    }
}

/// A category suggestion shown alongside the stored categories
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedCategory {
    pub name: &'static str,
    pub description: &'static str,
}

/// Categories recommended for organizing memories
pub const SUGGESTED_CATEGORIES: [SuggestedCategory; 8] = [
    SuggestedCategory {
        name: "user_context",
        description:
            "Information about the user's location, profession, interests, and personal details",
    },
    SuggestedCategory {
        name: "preferences",
        description: "How information should be presented, preferred tools and methods",
    },
    SuggestedCategory {
        name: "projects",
        description: "Ongoing work, previous discussions, and project-specific details",
    },
    SuggestedCategory {
        name: "learnings",
        description: "Things learned about the user's specific situation and needs",
    },
    SuggestedCategory {
        name: "corrections",
        description: "When initial assumptions or responses were incorrect",
    },
    SuggestedCategory {
        name: "facts",
        description: "Important factual information that should be remembered",
    },
    SuggestedCategory {
        name: "reminders",
        description: "Things to remember for future interactions",
    },
    SuggestedCategory {
        name: "best_practices",
        description: "Guidelines, procedures, and effective methods to follow",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_at: Option<DateTime<Utc>>) -> MemoryRecord {
        let now = Utc::now();
        MemoryRecord {
            id: "m-1".to_string(),
            content: "test".to_string(),
            created_at: now,
            last_modified: now,
            tags: Vec::new(),
            category: None,
            importance: 3,
            expires_at,
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_no_expiry_never_expires() {
        assert!(!record(None).is_expired(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        assert!(record(Some(now - Duration::hours(1))).is_expired(now));
        assert!(!record(Some(now + Duration::hours(1))).is_expired(now));
    }
}
