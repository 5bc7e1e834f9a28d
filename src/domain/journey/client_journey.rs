//! Client journey - the per-client step state machine.
//!
//! The active step is always the first step whose `complete` flag is
//! false. Completion only moves forward: no operation here sets a step
//! back to incomplete except replacing the whole list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ClientId, ReportId, Timestamp};

use super::errors::JourneyError;
use super::step::{MediaRef, StepDescriptor};

/// Journey-level state derived from the step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
    /// No live steps installed.
    NotStarted,
    /// At least one step remains incomplete.
    InProgress,
    /// Every step is complete.
    AllComplete,
}

/// A client's verification journey.
///
/// Besides the live step list, a journey carries steps staged at contact
/// registration, which only become live when the client starts the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientJourney {
    client_id: ClientId,
    report_id: Option<ReportId>,
    steps: Vec<StepDescriptor>,
    #[serde(default)]
    staged_steps: Vec<StepDescriptor>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl ClientJourney {
    /// Creates an empty journey for a client.
    pub fn new(client_id: ClientId) -> Self {
        let now = Timestamp::now();
        Self {
            client_id,
            report_id: None,
            steps: Vec::new(),
            staged_steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the external case id.
    pub fn with_report_id(mut self, report_id: ReportId) -> Self {
        self.report_id = Some(report_id);
        self
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn report_id(&self) -> Option<&ReportId> {
        self.report_id.as_ref()
    }

    pub fn set_report_id(&mut self, report_id: ReportId) {
        self.report_id = Some(report_id);
        self.touch();
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn staged_steps(&self) -> &[StepDescriptor] {
        &self.staged_steps
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Installs a fresh live step list, replacing any prior one and its
    /// progress.
    pub fn initialize(&mut self, steps: Vec<StepDescriptor>) -> Result<(), JourneyError> {
        validate_steps(&steps)?;
        self.steps = steps;
        self.touch();
        Ok(())
    }

    /// Stores steps to be installed when the client starts the flow.
    pub fn stage(&mut self, steps: Vec<StepDescriptor>) -> Result<(), JourneyError> {
        validate_steps(&steps)?;
        self.staged_steps = steps;
        self.touch();
        Ok(())
    }

    /// Promotes the staged steps to the live journey, restarting it.
    pub fn activate_staged(&mut self) -> Result<(), JourneyError> {
        if self.staged_steps.is_empty() {
            return Err(JourneyError::NothingStaged);
        }
        let staged = std::mem::take(&mut self.staged_steps);
        self.initialize(staged)
    }

    pub fn status(&self) -> JourneyStatus {
        if self.steps.is_empty() {
            JourneyStatus::NotStarted
        } else if self.steps.iter().all(|s| s.complete) {
            JourneyStatus::AllComplete
        } else {
            JourneyStatus::InProgress
        }
    }

    /// The first incomplete step, if any.
    pub fn active_step(&self) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| !s.complete)
    }

    fn active_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| !s.complete)
    }

    /// Completes the active step and returns the new active step.
    ///
    /// `None` means the journey reached `AllComplete`. Replaying an advance
    /// for a step that is already complete yields `AlreadyComplete` and
    /// changes nothing.
    pub fn advance(&mut self, function_id: &str) -> Result<Option<&StepDescriptor>, JourneyError> {
        let index = self.checked_active_index(function_id)?;
        self.steps[index].complete = true;
        self.touch();
        Ok(self.active_step())
    }

    /// Appends a media reference to the active step.
    ///
    /// Returns the number of media items now held by the step.
    pub fn record_media(&mut self, function_id: &str, media: MediaRef) -> Result<usize, JourneyError> {
        let index = self.checked_active_index(function_id)?;
        let step = &mut self.steps[index];
        step.images.push(media);
        let count = step.images.len();
        self.touch();
        Ok(count)
    }

    /// Clears the active step's media so the client can resubmit.
    pub fn reset_media(&mut self, function_id: &str) -> Result<(), JourneyError> {
        let index = self.checked_active_index(function_id)?;
        self.steps[index].images.clear();
        self.touch();
        Ok(())
    }

    fn checked_active_index(&self, function_id: &str) -> Result<usize, JourneyError> {
        if self.steps.is_empty() {
            return Err(JourneyError::NoSteps);
        }
        let Some(step) = self.steps.iter().find(|s| s.function_id == function_id) else {
            return Err(JourneyError::UnknownStep(function_id.to_string()));
        };
        if step.complete {
            return Err(JourneyError::AlreadyComplete(function_id.to_string()));
        }
        let index = self.active_index().ok_or(JourneyError::AllComplete)?;
        if self.steps[index].function_id != function_id {
            return Err(JourneyError::NotActiveStep {
                requested: function_id.to_string(),
                active: self.steps[index].function_id.clone(),
            });
        }
        Ok(index)
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

fn validate_steps(steps: &[StepDescriptor]) -> Result<(), JourneyError> {
    let mut seen = HashSet::new();
    for step in steps {
        if step.function_id.trim().is_empty() {
            return Err(JourneyError::InvalidSteps("step without function".to_string()));
        }
        if !seen.insert(step.function_id.as_str()) {
            return Err(JourneyError::InvalidSteps(format!(
                "duplicate function '{}'",
                step.function_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientId {
        ClientId::new("5215512345678").unwrap()
    }

    fn step(function: &str) -> StepDescriptor {
        StepDescriptor::new(function, format!("{} value", function), "summary")
    }

    fn journey_abc() -> ClientJourney {
        let mut journey = ClientJourney::new(client());
        journey
            .initialize(vec![step("a"), step("b"), step("c")])
            .unwrap();
        journey
    }

    #[test]
    fn empty_journey_is_not_started() {
        let journey = ClientJourney::new(client());
        assert_eq!(journey.status(), JourneyStatus::NotStarted);
        assert!(journey.active_step().is_none());
    }

    #[test]
    fn first_incomplete_step_is_active() {
        let journey = journey_abc();
        assert_eq!(journey.active_step().unwrap().function_id, "a");
        assert_eq!(journey.status(), JourneyStatus::InProgress);
    }

    #[test]
    fn advance_moves_to_next_step_then_all_complete() {
        let mut journey = journey_abc();

        let next = journey.advance("a").unwrap().map(|s| s.function_id.clone());
        assert_eq!(next.as_deref(), Some("b"));

        journey.advance("b").unwrap();
        let last = journey.advance("c").unwrap();
        assert!(last.is_none());
        assert_eq!(journey.status(), JourneyStatus::AllComplete);
    }

    #[test]
    fn replayed_advance_is_a_no_op() {
        let mut journey = journey_abc();
        journey.advance("a").unwrap();

        let replay = journey.advance("a").unwrap_err();
        assert!(replay.is_replay());
        assert_eq!(journey.active_step().unwrap().function_id, "b");
        assert!(journey.steps()[0].complete);
        assert!(!journey.steps()[1].complete);
    }

    #[test]
    fn advance_of_non_active_step_is_rejected() {
        let mut journey = journey_abc();
        let err = journey.advance("c").unwrap_err();
        assert_eq!(
            err,
            JourneyError::NotActiveStep {
                requested: "c".to_string(),
                active: "a".to_string()
            }
        );
        assert!(!journey.steps()[2].complete);
    }

    #[test]
    fn advance_without_steps_reports_no_steps() {
        let mut journey = ClientJourney::new(client());
        assert_eq!(journey.advance("a").unwrap_err(), JourneyError::NoSteps);
    }

    #[test]
    fn advance_of_unknown_step_is_rejected() {
        let mut journey = journey_abc();
        assert_eq!(
            journey.advance("zz").unwrap_err(),
            JourneyError::UnknownStep("zz".to_string())
        );
    }

    #[test]
    fn record_then_reset_media_leaves_step_open_and_empty() {
        let mut journey = journey_abc();

        assert_eq!(journey.record_media("a", MediaRef::new("u1")).unwrap(), 1);
        assert_eq!(journey.record_media("a", MediaRef::new("u2")).unwrap(), 2);
        assert!(!journey.active_step().unwrap().complete);

        journey.reset_media("a").unwrap();
        let active = journey.active_step().unwrap();
        assert_eq!(active.function_id, "a");
        assert!(active.images.is_empty());
    }

    #[test]
    fn media_for_non_active_step_is_rejected() {
        let mut journey = journey_abc();
        assert!(journey.record_media("b", MediaRef::new("u")).is_err());
        assert!(journey.steps()[1].images.is_empty());
    }

    #[test]
    fn initialize_rejects_duplicate_functions() {
        let mut journey = ClientJourney::new(client());
        let result = journey.initialize(vec![step("a"), step("a")]);
        assert!(matches!(result, Err(JourneyError::InvalidSteps(_))));
    }

    #[test]
    fn staged_steps_become_live_on_activation() {
        let mut journey = ClientJourney::new(client());
        journey.stage(vec![step("a"), step("b")]).unwrap();
        assert_eq!(journey.status(), JourneyStatus::NotStarted);

        journey.activate_staged().unwrap();
        assert_eq!(journey.active_step().unwrap().function_id, "a");
        assert!(journey.staged_steps().is_empty());
        assert_eq!(journey.activate_staged().unwrap_err(), JourneyError::NothingStaged);
    }

    #[test]
    fn staging_does_not_touch_live_progress() {
        let mut journey = journey_abc();
        journey.advance("a").unwrap();
        journey.stage(vec![step("x")]).unwrap();
        assert_eq!(journey.active_step().unwrap().function_id, "b");
    }

    #[test]
    fn activating_restaged_steps_restarts_the_journey() {
        let mut journey = journey_abc();
        journey.advance("a").unwrap();
        journey.stage(vec![step("x"), step("y")]).unwrap();

        journey.activate_staged().unwrap();
        let ids: Vec<_> = journey.steps().iter().map(|s| s.function_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(journey.active_step().unwrap().function_id, "x");
    }

    #[test]
    fn serde_round_trip_preserves_progress() {
        let mut journey = journey_abc().with_report_id(ReportId::new("rep-1").unwrap());
        journey.advance("a").unwrap();

        let json = serde_json::to_string(&journey).unwrap();
        let restored: ClientJourney = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, journey);
        assert_eq!(restored.active_step().unwrap().function_id, "b");
    }
}
