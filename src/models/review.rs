use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::ServiceError;
use crate::models::validation::invalid;

pub const MAX_SUBMISSION_VERSION: i64 = 1000;
pub const SCORECARD_MAX_SCORE: f64 = 100.0;

/// Review state of a submitted portfolio version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Submitted by the student, waiting for a reviewer
    AwaitingReview,
    /// A reviewer has picked it up
    UnderReview,
    /// Review finished without a final decision
    Reviewed,
    /// Sent back to the student for changes
    RevisionRequested,
    /// Accepted; requires a scorecard for the current version
    Approved,
}

impl SubmissionStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "awaiting_review" => Some(SubmissionStatus::AwaitingReview),
            "under_review" => Some(SubmissionStatus::UnderReview),
            "reviewed" => Some(SubmissionStatus::Reviewed),
            "revision_requested" => Some(SubmissionStatus::RevisionRequested),
            "approved" => Some(SubmissionStatus::Approved),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::AwaitingReview => "awaiting_review",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::Reviewed => "reviewed",
            SubmissionStatus::RevisionRequested => "revision_requested",
            SubmissionStatus::Approved => "approved",
        }
    }

    /// Transitions a reviewer may make. Returning to awaiting_review only happens by resubmitting.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (AwaitingReview, UnderReview)
                | (AwaitingReview, Reviewed)
                | (AwaitingReview, RevisionRequested)
                | (AwaitingReview, Approved)
                | (UnderReview, Reviewed)
                | (UnderReview, RevisionRequested)
                | (UnderReview, Approved)
                | (Reviewed, UnderReview)
                | (Reviewed, RevisionRequested)
                | (Reviewed, Approved)
        )
    }

    /// Check a reviewer transition, with the error the API reports
    pub fn transition(self, next: SubmissionStatus) -> Result<SubmissionStatus, ServiceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ServiceError::conflict(format!(
                "invalid status transition from {} to {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }

    /// A student resubmission reopens only revision requests and approvals
    pub fn resubmit(self) -> Result<SubmissionStatus, ServiceError> {
        match self {
            SubmissionStatus::RevisionRequested | SubmissionStatus::Approved => Ok(SubmissionStatus::AwaitingReview),
            _ => Err(ServiceError::conflict(format!(
                "invalid status transition from {} to {}",
                self.as_str(),
                SubmissionStatus::AwaitingReview.as_str()
            ))),
        }
    }

    /// Human readable label used in student notifications
    pub fn label(self) -> &'static str {
        match self {
            SubmissionStatus::AwaitingReview => "รอการตรวจ",
            SubmissionStatus::UnderReview => "กำลังตรวจ",
            SubmissionStatus::Reviewed => "ตรวจแล้ว",
            SubmissionStatus::RevisionRequested => "ขอให้แก้ไข",
            SubmissionStatus::Approved => "อนุมัติแล้ว",
        }
    }
}

pub fn parse_submission_status(value: &str) -> Result<SubmissionStatus, ServiceError> {
    SubmissionStatus::parse(value.trim()).ok_or_else(|| ServiceError::validation("invalid submission status"))
}

pub fn validate_version(version: i64) -> Result<(), ServiceError> {
    if !(1..=MAX_SUBMISSION_VERSION).contains(&version) {
        return invalid("version must be between 1 and 1000");
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSubmission {
    #[serde(rename = "ID")]
    pub id: i64,
    pub version: i64,
    pub status: String,
    pub submission_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub portfolio_id: i64,
    pub portfolio_name: Option<String>,
    pub user_id: i64,
    pub student_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scorecard {
    #[serde(rename = "ID")]
    pub id: i64,
    pub total_score: f64,
    pub max_score: f64,
    pub general_comment: String,
    pub submission_version: i64,
    pub portfolio_submission_id: i64,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score_criteria: Vec<ScoreCriteria>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreCriteria {
    #[serde(rename = "ID")]
    pub id: i64,
    pub criteria_number: i64,
    pub criteria_name: String,
    pub max_score: f64,
    pub score: f64,
    pub weight_percent: f64,
    pub comment: String,
    pub order_index: i64,
    pub scorecard_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriteriaInput {
    /// Existing criterion to update; absent for new ones
    #[serde(rename = "ID", alias = "id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub criteria_number: i64,
    #[serde(default)]
    pub criteria_name: String,
    #[serde(default)]
    pub max_score: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub weight_percent: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub order_index: i64,
}

impl CriteriaInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.criteria_number <= 0 {
            return invalid("criteria number must be positive");
        }
        if self.criteria_name.trim().is_empty() {
            return invalid("criteria name is required");
        }
        if self.max_score <= 0.0 {
            return invalid("max score must be positive");
        }
        if !(0.0..=100.0).contains(&self.weight_percent) {
            return invalid("weight percent must be between 0 and 100");
        }
        if self.score < 0.0 || self.score > self.max_score {
            return invalid("score must be between 0 and max score");
        }
        if self.order_index <= 0 {
            return invalid("order index must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorecardInput {
    pub portfolio_submission_id: Option<i64>,
    #[serde(default)]
    pub general_comment: String,
    #[serde(default)]
    pub score_criteria: Vec<CriteriaInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScorecardUpdate {
    #[serde(default)]
    pub general_comment: String,
    #[serde(default)]
    pub score_criteria: Vec<CriteriaInput>,
}

/// Scorecard, optional feedback and approval submitted together
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalInput {
    #[serde(default)]
    pub general_comment: String,
    #[serde(default)]
    pub score_criteria: Vec<CriteriaInput>,
    pub feedback: Option<FeedbackUpdate>,
}

/// Weighted total: each criterion contributes score * weight / 100
pub fn weighted_total<I>(criteria: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    criteria
        .into_iter()
        .map(|(score, weight)| score * weight / 100.0)
        .sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct Feedback {
    #[serde(rename = "ID")]
    pub id: i64,
    pub overall_comment: String,
    pub strengths: String,
    pub areas_for_improvement: String,
    pub portfolio_submission_id: i64,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackInput {
    pub portfolio_submission_id: Option<i64>,
    #[serde(default)]
    pub overall_comment: String,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub areas_for_improvement: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackUpdate {
    #[serde(default)]
    pub overall_comment: String,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub areas_for_improvement: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion() -> CriteriaInput {
        CriteriaInput {
            id: None,
            criteria_number: 1,
            criteria_name: "Presentation".to_string(),
            max_score: 100.0,
            score: 80.0,
            weight_percent: 40.0,
            comment: String::new(),
            order_index: 1,
        }
    }

    #[test]
    fn test_reviewer_transitions() {
        use SubmissionStatus::*;
        assert!(AwaitingReview.can_transition_to(UnderReview));
        assert!(UnderReview.can_transition_to(Approved));
        assert!(Reviewed.can_transition_to(RevisionRequested));
        assert!(!Approved.can_transition_to(UnderReview));
        assert!(!RevisionRequested.can_transition_to(Approved));
        assert!(!UnderReview.can_transition_to(AwaitingReview));
    }

    #[test]
    fn test_resubmit_only_after_decision() {
        use SubmissionStatus::*;
        assert_eq!(RevisionRequested.resubmit().unwrap(), AwaitingReview);
        assert_eq!(Approved.resubmit().unwrap(), AwaitingReview);
        for status in [AwaitingReview, UnderReview, Reviewed] {
            assert!(matches!(status.resubmit(), Err(ServiceError::Conflict(_))));
        }
    }

    #[test]
    fn test_invalid_transition_is_conflict() {
        match SubmissionStatus::Approved.transition(SubmissionStatus::Reviewed) {
            Err(ServiceError::Conflict(msg)) => {
                assert_eq!(msg, "invalid status transition from approved to reviewed")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(parse_submission_status("under_review").unwrap(), SubmissionStatus::UnderReview);
        assert!(parse_submission_status("rejected").is_err());
        assert!(parse_submission_status("awaiting").is_err());
    }

    #[test]
    fn test_version_bounds() {
        assert!(validate_version(1).is_ok());
        assert!(validate_version(1000).is_ok());
        assert!(validate_version(0).is_err());
        assert!(validate_version(1001).is_err());
    }

    #[test]
    fn test_weighted_total() {
        let total = weighted_total(vec![(80.0, 40.0), (90.0, 60.0)]);
        assert!((total - 86.0).abs() < 1e-9);
        assert_eq!(weighted_total(Vec::new()), 0.0);
    }

    #[test]
    fn test_criteria_rules() {
        assert!(criterion().validate().is_ok());

        let cases = vec![
            (CriteriaInput { criteria_number: 0, ..criterion() }, "criteria number must be positive"),
            (CriteriaInput { criteria_name: " ".to_string(), ..criterion() }, "criteria name is required"),
            (CriteriaInput { max_score: 0.0, ..criterion() }, "max score must be positive"),
            (CriteriaInput { weight_percent: 120.0, ..criterion() }, "weight percent must be between 0 and 100"),
            (CriteriaInput { score: -1.0, ..criterion() }, "score must be between 0 and max score"),
            (CriteriaInput { score: 101.0, ..criterion() }, "score must be between 0 and max score"),
            (CriteriaInput { order_index: 0, ..criterion() }, "order index must be positive"),
        ];
        for (input, expected) in cases {
            match input.validate() {
                Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, expected),
                other => panic!("expected {:?}, got {:?}", expected, other),
            }
        }
    }
}
