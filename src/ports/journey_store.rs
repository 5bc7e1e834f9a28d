//! Journey Store Port - persistence of client journeys.
//!
//! Adapters only implement `load`, `save` and `delete`; the journey
//! operations are provided on top of them and apply the domain rules of
//! [`ClientJourney`]. Each operation is a read-modify-write, so callers
//! must serialize operations per client (the orchestrator does).
//!
//! # Example
//!
//! ```ignore
//! let store: Arc<dyn JourneyStore> = Arc::new(InMemoryJourneyStore::new());
//!
//! store.initialize_journey(&client, steps).await?;
//! let next = store.advance(&client, "check_email_valid").await?;
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{ClientId, ReportId};
use crate::domain::journey::{ClientJourney, JourneyError, MediaRef, StepDescriptor};

/// Errors from journey storage.
#[derive(Debug, Error)]
pub enum JourneyStoreError {
    #[error("no journey for client {0}")]
    NotFound(ClientId),

    #[error("journey state inconsistency: {0}")]
    Inconsistent(#[from] JourneyError),

    #[error("journey store unavailable: {0}")]
    Unavailable(String),

    #[error("journey serialization failed: {0}")]
    Serialization(String),
}

impl JourneyStoreError {
    /// True for state inconsistencies, which callers treat as no-ops.
    pub fn is_inconsistency(&self) -> bool {
        matches!(
            self,
            JourneyStoreError::Inconsistent(_) | JourneyStoreError::NotFound(_)
        )
    }
}

/// Port for journey persistence.
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Load a client's journey.
    async fn load(&self, client_id: &ClientId) -> Result<Option<ClientJourney>, JourneyStoreError>;

    /// Insert or replace a journey.
    async fn save(&self, journey: &ClientJourney) -> Result<(), JourneyStoreError>;

    /// Delete a journey. Returns false if there was none.
    async fn delete(&self, client_id: &ClientId) -> Result<bool, JourneyStoreError>;

    /// Load a journey that must exist.
    async fn require(&self, client_id: &ClientId) -> Result<ClientJourney, JourneyStoreError> {
        self.load(client_id)
            .await?
            .ok_or_else(|| JourneyStoreError::NotFound(client_id.clone()))
    }

    /// The client's active step, if the client exists and has one.
    async fn get_active_step(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<StepDescriptor>, JourneyStoreError> {
        Ok(self
            .load(client_id)
            .await?
            .and_then(|journey| journey.active_step().cloned()))
    }

    /// Install a fresh live step list, creating the client if needed.
    async fn initialize_journey(
        &self,
        client_id: &ClientId,
        steps: Vec<StepDescriptor>,
    ) -> Result<(), JourneyStoreError> {
        let mut journey = self
            .load(client_id)
            .await?
            .unwrap_or_else(|| ClientJourney::new(client_id.clone()));
        journey.initialize(steps)?;
        self.save(&journey).await
    }

    /// Complete the active step; returns the new active step.
    async fn advance(
        &self,
        client_id: &ClientId,
        function_id: &str,
    ) -> Result<Option<StepDescriptor>, JourneyStoreError> {
        let mut journey = self.require(client_id).await?;
        let next = journey.advance(function_id)?.cloned();
        self.save(&journey).await?;
        Ok(next)
    }

    /// Append media to the active step; returns the step's media count.
    async fn append_image(
        &self,
        client_id: &ClientId,
        function_id: &str,
        media: MediaRef,
    ) -> Result<usize, JourneyStoreError> {
        let mut journey = self.require(client_id).await?;
        let count = journey.record_media(function_id, media)?;
        self.save(&journey).await?;
        Ok(count)
    }

    /// Clear the active step's media.
    async fn reset_images(
        &self,
        client_id: &ClientId,
        function_id: &str,
    ) -> Result<(), JourneyStoreError> {
        let mut journey = self.require(client_id).await?;
        journey.reset_media(function_id)?;
        self.save(&journey).await
    }

    /// Create or refresh a contact and stage its steps.
    ///
    /// The live journey is left untouched.
    async fn register_contact(
        &self,
        client_id: &ClientId,
        report_id: ReportId,
        steps: Vec<StepDescriptor>,
    ) -> Result<(), JourneyStoreError> {
        let mut journey = self
            .load(client_id)
            .await?
            .unwrap_or_else(|| ClientJourney::new(client_id.clone()));
        journey.set_report_id(report_id);
        journey.stage(steps)?;
        self.save(&journey).await
    }

    /// Promote staged steps to the live journey; returns the first step.
    async fn activate_staged(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<StepDescriptor>, JourneyStoreError> {
        let mut journey = self.require(client_id).await?;
        journey.activate_staged()?;
        self.save(&journey).await?;
        Ok(journey.active_step().cloned())
    }
}
