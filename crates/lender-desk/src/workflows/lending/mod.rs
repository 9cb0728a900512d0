//! Loan opportunity submission workflow.
//!
//! Lenders are filtered against the opportunity's credit score, amount, and
//! industry; the user picks lenders and supporting documents; the package is
//! submitted through a fixed sequence of remote calls. Document categories and
//! notes are edited inline and saved as one batch.

pub mod domain;
pub mod drafts;
pub mod eligibility;
pub mod gateway;
pub mod import;
pub mod notice;
pub mod router;
pub mod selection;
pub mod submission;
pub mod uploads;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use domain::{
    FileId, FileRecord, LenderAccount, LenderId, Opportunity, OpportunityId, OpportunityStage,
    RecordId,
};
pub use drafts::{
    DraftEditBuffer, DraftFlushError, EditableField, FieldValues, FileGrid, FlushReport,
    RecordFieldEdit,
};
pub use eligibility::{
    apply_filter, assess, is_qualified, DataShapeError, EligibilityAssessment,
    EligibilityFailure, FilterMode, SelectionColumnPolicy,
};
pub use gateway::{
    FileLibrary, LenderDirectory, Navigator, NoticePublisher, OpportunityRepository,
    RecordEditor, RecordUpdateStatus, RemoteCallError, SubmissionDispatcher,
};
pub use import::{LenderCsvImporter, LenderImportError};
pub use notice::{NavigationTarget, Notice, NoticeMode, NoticeVariant};
pub use router::lending_router;
pub use selection::SelectionSet;
pub use submission::{
    SubmissionError, SubmissionOrchestrator, SubmissionReport, SubmissionState, SubmissionStep,
    ValidationError,
};
pub use workspace::{
    LenderBoard, LenderRow, LendingGateways, LendingService, SubmissionWorkspace, WorkspaceError,
};
