//! review.rs - Reviewer decisions on reported entities.
//!
//! Review state and feedback form an audit trail. Applying an update never
//! touches the artifact or triggers a rescan.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::{DocshieldError, RecordKind, Result};
use crate::report::{RedactedEntity, RedactionReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Confirmed,
    Flagged,
}

impl ReviewState {
    pub fn of(entity: &RedactedEntity) -> Self {
        if entity.confirmed {
            ReviewState::Confirmed
        } else {
            ReviewState::Flagged
        }
    }
}

/// A reviewer's requested change. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityUpdate {
    pub confirmed: Option<bool>,
    pub feedback: Option<String>,
}

impl EntityUpdate {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_none() && self.feedback.is_none()
    }
}

/// Record of one applied review update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub document_id: String,
    pub entity_id: String,
    pub previous_state: ReviewState,
    pub new_state: ReviewState,
    pub feedback_attached: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewFeedbackEngine;

impl ReviewFeedbackEngine {
    /// Sets an entity's review state. Feedback is left as is.
    pub fn set_state(&self, report: &mut RedactionReport, entity_id: &str, confirmed: bool) -> Result<ReviewEvent> {
        self.apply(report, entity_id, &EntityUpdate { confirmed: Some(confirmed), feedback: None })
    }

    /// Attaches feedback without changing state. Blank text clears it.
    pub fn submit_feedback(&self, report: &mut RedactionReport, entity_id: &str, text: &str) -> Result<ReviewEvent> {
        self.apply(report, entity_id, &EntityUpdate { confirmed: None, feedback: Some(text.to_string()) })
    }

    /// Applies `update` to a single entity of `report` in place.
    pub fn apply(&self, report: &mut RedactionReport, entity_id: &str, update: &EntityUpdate) -> Result<ReviewEvent> {
        if update.is_empty() {
            return Err(DocshieldError::InvalidInput(
                "an entity update needs `confirmed`, `feedback` or both".to_string(),
            ));
        }
        let document_id = report.document_id.clone();
        let entity = report
            .entity_mut(entity_id)
            .ok_or_else(|| DocshieldError::not_found(RecordKind::Entity, entity_id))?;

        let previous_state = ReviewState::of(entity);
        if let Some(confirmed) = update.confirmed {
            entity.confirmed = confirmed;
        }
        if let Some(text) = &update.feedback {
            let text = text.trim();
            entity.feedback = if text.is_empty() { None } else { Some(text.to_string()) };
        }
        let new_state = ReviewState::of(entity);

        info!(
            "Entity '{}' of document '{}' reviewed: {:?} -> {:?}.",
            entity_id, document_id, previous_state, new_state
        );
        Ok(ReviewEvent {
            document_id,
            entity_id: entity_id.to_string(),
            previous_state,
            new_state,
            feedback_attached: entity.feedback.is_some(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redaction_match::Match;
    use crate::report::ReportBuilder;

    fn report() -> RedactionReport {
        let text = "Jane 123-45-6789";
        ReportBuilder.build(
            "d1",
            "t1",
            text,
            &[Match::ai(text, 0, 4, "name", 0.9), Match::ai(text, 5, 16, "ssn", 0.9)],
        )
    }

    #[test]
    fn flagging_changes_only_the_target_entity() {
        let mut r = report();
        let before = r.clone();
        let target = r.redacted_entities[1].id.clone();
        let event = ReviewFeedbackEngine
            .apply(
                &mut r,
                &target,
                &EntityUpdate { confirmed: Some(false), feedback: Some("not a real SSN".to_string()) },
            )
            .unwrap();
        assert_eq!(event.previous_state, ReviewState::Confirmed);
        assert_eq!(event.new_state, ReviewState::Flagged);
        assert!(event.feedback_attached);
        assert_eq!(r.redacted_entities[0], before.redacted_entities[0]);
        assert_eq!(r.redacted_entities[1].feedback.as_deref(), Some("not a real SSN"));
    }

    #[test]
    fn feedback_alone_keeps_state() {
        let mut r = report();
        let id = r.redacted_entities[0].id.clone();
        let event = ReviewFeedbackEngine.submit_feedback(&mut r, &id, "  looks right ").unwrap();
        assert_eq!(event.previous_state, event.new_state);
        assert_eq!(r.redacted_entities[0].feedback.as_deref(), Some("looks right"));

        ReviewFeedbackEngine.submit_feedback(&mut r, &id, "   ").unwrap();
        assert!(r.redacted_entities[0].feedback.is_none());
    }

    #[test]
    fn empty_update_and_unknown_entity_are_rejected() {
        let mut r = report();
        let id = r.redacted_entities[0].id.clone();
        let err = ReviewFeedbackEngine.apply(&mut r, &id, &EntityUpdate::default()).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        let err = ReviewFeedbackEngine.set_state(&mut r, "nope", true).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
