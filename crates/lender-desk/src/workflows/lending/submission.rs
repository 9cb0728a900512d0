use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{FileId, LenderId, OpportunityId, OpportunityStage};
use super::gateway::{NoticePublisher, OpportunityRepository, RemoteCallError, SubmissionDispatcher};
use super::notice::Notice;
use super::selection::SelectionSet;

/// Position of a submission run in its linear lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    StageUpdating,
    Notifying,
    CreatingSubmissions,
    Done,
    Failed,
}

/// One remote call in the submission sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStep {
    StageUpdate,
    Notification,
    SubmissionRecords,
}

impl SubmissionStep {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStep::StageUpdate => "stage update",
            SubmissionStep::Notification => "lender notification",
            SubmissionStep::SubmissionRecords => "submission record creation",
        }
    }

    const fn state(self) -> SubmissionState {
        match self {
            SubmissionStep::StageUpdate => SubmissionState::StageUpdating,
            SubmissionStep::Notification => SubmissionState::Notifying,
            SubmissionStep::SubmissionRecords => SubmissionState::CreatingSubmissions,
        }
    }
}

impl fmt::Display for SubmissionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Preconditions refused before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select at least one file before submitting.")]
    NoFilesSelected,
    #[error("Please select at least one lender before submitting.")]
    NoLendersSelected,
    #[error("A submission for opportunity {0} is already in progress.")]
    SubmissionInFlight(OpportunityId),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{step} failed: {source}")]
    Remote {
        step: SubmissionStep,
        completed_steps: Vec<SubmissionStep>,
        trail: Vec<SubmissionState>,
        #[source]
        source: RemoteCallError,
    },
}

impl SubmissionError {
    /// Final state of the run that produced this error.
    pub fn state(&self) -> SubmissionState {
        match self {
            SubmissionError::Validation(_) => SubmissionState::Idle,
            SubmissionError::Remote { .. } => SubmissionState::Failed,
        }
    }
}

/// Outcome of a run that reached `Done`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReport {
    pub opportunity_id: OpportunityId,
    pub stage: OpportunityStage,
    pub lender_ids: Vec<LenderId>,
    pub file_ids: Vec<FileId>,
    pub completed_steps: Vec<SubmissionStep>,
    pub trail: Vec<SubmissionState>,
    pub completed_at: DateTime<Utc>,
}

/// Sequences stage update, lender notification, and submission-record creation.
///
/// Steps run strictly one after another. A failed step halts the run; earlier
/// steps are not rolled back.
pub struct SubmissionOrchestrator {
    opportunities: Arc<dyn OpportunityRepository>,
    dispatcher: Arc<dyn SubmissionDispatcher>,
    notices: Arc<dyn NoticePublisher>,
    target_stage: OpportunityStage,
    in_flight: Mutex<HashSet<OpportunityId>>,
}

impl SubmissionOrchestrator {
    pub fn new(
        opportunities: Arc<dyn OpportunityRepository>,
        dispatcher: Arc<dyn SubmissionDispatcher>,
        notices: Arc<dyn NoticePublisher>,
        target_stage: OpportunityStage,
    ) -> Self {
        Self {
            opportunities,
            dispatcher,
            notices,
            target_stage,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn target_stage(&self) -> &OpportunityStage {
        &self.target_stage
    }

    /// Run the submission for the current selection, clearing it on success.
    pub async fn submit(
        &self,
        opportunity_id: &OpportunityId,
        selection: &mut SelectionSet,
    ) -> Result<SubmissionReport, SubmissionError> {
        let file_ids = selection.file_ids();
        let lender_ids = selection.lender_ids();

        if let Err(error) = check_preconditions(&file_ids, &lender_ids) {
            self.notices.publish(Notice::error(error.to_string()));
            return Err(error.into());
        }

        let _guard = match InFlightGuard::acquire(&self.in_flight, opportunity_id) {
            Some(guard) => guard,
            None => {
                let error = ValidationError::SubmissionInFlight(opportunity_id.clone());
                self.notices.publish(Notice::error(error.to_string()));
                return Err(error.into());
            }
        };

        let mut run = SubmissionRun::new(opportunity_id);

        run.enter(SubmissionStep::StageUpdate);
        let result = self
            .opportunities
            .update_opportunity_stage(opportunity_id, &self.target_stage)
            .await;
        self.settle(
            &mut run,
            result,
            format!("Opportunity stage updated to {}", self.target_stage),
        )?;

        run.enter(SubmissionStep::Notification);
        let result = self
            .dispatcher
            .send_notification(opportunity_id, &file_ids, &lender_ids)
            .await;
        self.settle(&mut run, result, "Email sent successfully".to_string())?;

        run.enter(SubmissionStep::SubmissionRecords);
        let result = self
            .dispatcher
            .create_submission_records(opportunity_id, &lender_ids)
            .await;
        self.settle(
            &mut run,
            result,
            format!(
                "Submission records created for {} lender(s)",
                lender_ids.len()
            ),
        )?;

        run.finish();
        selection.clear();

        info!(
            opportunity = %opportunity_id,
            lenders = lender_ids.len(),
            files = file_ids.len(),
            "opportunity submitted to lenders"
        );

        Ok(SubmissionReport {
            opportunity_id: opportunity_id.clone(),
            stage: self.target_stage.clone(),
            lender_ids,
            file_ids,
            completed_steps: run.completed,
            trail: run.trail,
            completed_at: Utc::now(),
        })
    }

    fn settle(
        &self,
        run: &mut SubmissionRun,
        result: Result<(), RemoteCallError>,
        success_message: String,
    ) -> Result<(), SubmissionError> {
        match result {
            Ok(()) => {
                run.complete();
                self.notices.publish(Notice::success(success_message));
                Ok(())
            }
            Err(source) => {
                let step = run.current;
                run.fail();
                warn!(
                    opportunity = %run.opportunity_id,
                    step = step.label(),
                    error = %source,
                    completed = run.completed.len(),
                    "submission step failed"
                );
                self.notices.publish(Notice::error(source.message()));
                Err(SubmissionError::Remote {
                    step,
                    completed_steps: run.completed.clone(),
                    trail: run.trail.clone(),
                    source,
                })
            }
        }
    }
}

fn check_preconditions(file_ids: &[FileId], lender_ids: &[LenderId]) -> Result<(), ValidationError> {
    if file_ids.is_empty() {
        return Err(ValidationError::NoFilesSelected);
    }
    if lender_ids.is_empty() {
        return Err(ValidationError::NoLendersSelected);
    }
    Ok(())
}

struct SubmissionRun {
    opportunity_id: OpportunityId,
    current: SubmissionStep,
    completed: Vec<SubmissionStep>,
    trail: Vec<SubmissionState>,
}

impl SubmissionRun {
    fn new(opportunity_id: &OpportunityId) -> Self {
        Self {
            opportunity_id: opportunity_id.clone(),
            current: SubmissionStep::StageUpdate,
            completed: Vec::new(),
            trail: vec![SubmissionState::Idle],
        }
    }

    fn enter(&mut self, step: SubmissionStep) {
        self.current = step;
        self.trail.push(step.state());
        debug!(
            opportunity = %self.opportunity_id,
            step = step.label(),
            "submission step started"
        );
    }

    fn complete(&mut self) {
        self.completed.push(self.current);
    }

    fn fail(&mut self) {
        self.trail.push(SubmissionState::Failed);
    }

    fn finish(&mut self) {
        self.trail.push(SubmissionState::Done);
    }
}

/// Holds an opportunity id in the in-flight set until dropped.
struct InFlightGuard<'a> {
    registry: &'a Mutex<HashSet<OpportunityId>>,
    opportunity_id: OpportunityId,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(registry: &'a Mutex<HashSet<OpportunityId>>, id: &OpportunityId) -> Option<Self> {
        let mut active = registry.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(id.clone()) {
            return None;
        }
        Some(Self {
            registry,
            opportunity_id: id.clone(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        active.remove(&self.opportunity_id);
    }
}
