//! Boundaries to the record store, lender catalog, mail transport, and UI shell.
//!
//! Remote collaborators are async; the toast and navigation hooks are
//! fire-and-forget and therefore synchronous.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{
    FileId, FileRecord, LenderAccount, LenderId, Opportunity, OpportunityId, OpportunityStage,
    RecordId,
};
use super::drafts::RecordFieldEdit;
use super::notice::{NavigationTarget, Notice};

/// Failure of any remote collaborator call. The upstream message is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteCallError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Upstream(String),
}

impl RemoteCallError {
    pub fn message(&self) -> &str {
        match self {
            RemoteCallError::NotFound(message)
            | RemoteCallError::PermissionDenied(message)
            | RemoteCallError::Upstream(message) => message,
        }
    }
}

#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    async fn fetch_opportunity(&self, id: &OpportunityId) -> Result<Opportunity, RemoteCallError>;
    async fn update_opportunity_stage(
        &self,
        id: &OpportunityId,
        stage: &OpportunityStage,
    ) -> Result<(), RemoteCallError>;
}

#[async_trait]
pub trait LenderDirectory: Send + Sync {
    async fn fetch_lender_accounts(&self) -> Result<Vec<LenderAccount>, RemoteCallError>;
}

/// Outbound package delivery: the lender e-mail and the per-lender submission records.
#[async_trait]
pub trait SubmissionDispatcher: Send + Sync {
    async fn send_notification(
        &self,
        opportunity_id: &OpportunityId,
        file_ids: &[FileId],
        lender_ids: &[LenderId],
    ) -> Result<(), RemoteCallError>;

    async fn create_submission_records(
        &self,
        opportunity_id: &OpportunityId,
        lender_ids: &[LenderId],
    ) -> Result<(), RemoteCallError>;
}

/// Per-record result of a bulk field update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdateStatus {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordUpdateStatus {
    pub fn ok(id: RecordId) -> Self {
        Self { id, error: None }
    }

    pub fn failed(id: RecordId, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait]
pub trait RecordEditor: Send + Sync {
    async fn update_record_fields(
        &self,
        batch: &[RecordFieldEdit],
    ) -> Result<Vec<RecordUpdateStatus>, RemoteCallError>;
}

/// Document storage attached to an opportunity, including the upload widget's selection.
#[async_trait]
pub trait FileLibrary: Send + Sync {
    async fn selected_file_ids(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<FileId>, RemoteCallError>;

    async fn files_for_record(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<FileRecord>, RemoteCallError>;

    async fn file_type_options(&self) -> Result<Vec<String>, RemoteCallError>;
}

pub trait NoticePublisher: Send + Sync {
    fn publish(&self, notice: Notice);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, target: NavigationTarget);
}
