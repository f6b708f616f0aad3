use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionStatus {
    Received,
    Answered,
    Closed,
}

impl QuestionStatus {
    pub fn from_value(value: i64) -> Result<Self> {
        match value {
            0 => Ok(QuestionStatus::Received),
            1 => Ok(QuestionStatus::Answered),
            2 => Ok(QuestionStatus::Closed),
            other => Err(ShopError::InvalidEnumValue {
                kind: "question status",
                value: other,
            }),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            QuestionStatus::Received => 0,
            QuestionStatus::Answered => 1,
            QuestionStatus::Closed => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub rating: u8,
    pub is_published: bool,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An inquiry from the contact form. Submitters are not required to hold an
/// account, so contact details are captured inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerQuestion {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub body: String,
    pub status: QuestionStatus,
    pub answer: Option<String>,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_status_values() {
        for raw in 0..3 {
            assert_eq!(QuestionStatus::from_value(raw).unwrap().value(), raw);
        }
        assert!(matches!(
            QuestionStatus::from_value(9),
            Err(ShopError::InvalidEnumValue { kind: "question status", value: 9 })
        ));
    }
}
