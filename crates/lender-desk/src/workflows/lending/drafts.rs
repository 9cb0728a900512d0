use std::collections::BTreeMap;
use std::mem;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{FileRecord, OpportunityId, RecordId};
use super::gateway::{
    FileLibrary, NoticePublisher, RecordEditor, RecordUpdateStatus, RemoteCallError,
};
use super::notice::{Notice, NoticeMode};
use super::uploads::UploadPolicy;

/// Grid columns that accept inline edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableField {
    FileType,
    SubmissionNote,
}

pub type FieldValues = BTreeMap<EditableField, String>;

/// Changed field values for one record, as sent in a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFieldEdit {
    pub id: RecordId,
    pub fields: FieldValues,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub updated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftFlushError {
    #[error("bulk update failed: {0}")]
    Remote(#[from] RemoteCallError),
    #[error("{} of {attempted} record update(s) failed: {}", .failed.len(), describe_failures(.failed))]
    Partial {
        attempted: usize,
        failed: Vec<RecordUpdateStatus>,
    },
}

fn describe_failures(failed: &[RecordUpdateStatus]) -> String {
    failed
        .iter()
        .map(|status| {
            format!(
                "{} ({})",
                status.id,
                status.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unsaved inline edits keyed by record id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftEditBuffer {
    entries: BTreeMap<RecordId, FieldValues>,
}

impl DraftEditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `fields` into the entry for `id`; later values win per field.
    pub fn record_edit(&mut self, id: RecordId, fields: FieldValues) {
        self.entries.entry(id).or_default().extend(fields);
    }

    pub fn get(&self, id: &RecordId) -> Option<&FieldValues> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending(&self) -> Vec<RecordFieldEdit> {
        self.entries
            .iter()
            .map(|(id, fields)| RecordFieldEdit {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect()
    }

    pub fn discard(&mut self) {
        self.entries.clear();
    }

    /// Send every buffered edit as one batch. The buffer is empty afterwards
    /// whatever the outcome.
    pub async fn flush(&mut self, editor: &dyn RecordEditor) -> Result<FlushReport, DraftFlushError> {
        let batch: Vec<RecordFieldEdit> = mem::take(&mut self.entries)
            .into_iter()
            .map(|(id, fields)| RecordFieldEdit { id, fields })
            .collect();

        if batch.is_empty() {
            return Ok(FlushReport::default());
        }

        let attempted = batch.len();
        let mut statuses: BTreeMap<RecordId, RecordUpdateStatus> = editor
            .update_record_fields(&batch)
            .await?
            .into_iter()
            .map(|status| (status.id.clone(), status))
            .collect();

        // Every edit needs a status of its own; an unanswered record is not saved.
        let mut updated = 0;
        let mut failed = Vec::new();
        for edit in batch {
            match statuses.remove(&edit.id) {
                Some(status) if status.is_ok() => updated += 1,
                Some(status) => failed.push(status),
                None => failed.push(RecordUpdateStatus::failed(edit.id, "no status returned")),
            }
        }

        if failed.is_empty() {
            Ok(FlushReport { updated })
        } else {
            Err(DraftFlushError::Partial { attempted, failed })
        }
    }
}

/// Document grid for one opportunity: visible rows, the last-saved snapshot,
/// and pending inline edits.
#[derive(Debug, Clone)]
pub struct FileGrid {
    opportunity_id: OpportunityId,
    rows: Vec<FileRecord>,
    last_saved: Vec<FileRecord>,
    type_options: Vec<String>,
    drafts: DraftEditBuffer,
    uploads: UploadPolicy,
}

impl FileGrid {
    pub async fn load(
        opportunity_id: OpportunityId,
        library: &dyn FileLibrary,
    ) -> Result<Self, RemoteCallError> {
        let type_options = library.file_type_options().await?;
        let rows = library.files_for_record(&opportunity_id).await?;

        Ok(Self {
            opportunity_id,
            last_saved: rows.clone(),
            rows,
            type_options,
            drafts: DraftEditBuffer::new(),
            uploads: UploadPolicy::default(),
        })
    }

    pub fn opportunity_id(&self) -> &OpportunityId {
        &self.opportunity_id
    }

    pub fn rows(&self) -> &[FileRecord] {
        &self.rows
    }

    pub fn type_options(&self) -> &[String] {
        &self.type_options
    }

    pub fn drafts(&self) -> &DraftEditBuffer {
        &self.drafts
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.uploads
    }

    /// Reload rows from the library; this becomes the new last-saved snapshot.
    pub async fn refresh(&mut self, library: &dyn FileLibrary) -> Result<(), RemoteCallError> {
        let rows = library.files_for_record(&self.opportunity_id).await?;
        self.last_saved = rows.clone();
        self.rows = rows;
        Ok(())
    }

    /// Apply cell edits to the visible rows and stage them for the next save.
    pub fn cell_changed(&mut self, edits: Vec<RecordFieldEdit>) {
        for edit in edits {
            if let Some(row) = self
                .rows
                .iter_mut()
                .find(|row| RecordId::from(&row.id) == edit.id)
            {
                for (field, value) in &edit.fields {
                    match field {
                        EditableField::FileType => row.file_type = Some(value.clone()),
                        EditableField::SubmissionNote => row.submission_note = Some(value.clone()),
                    }
                }
            }
            self.drafts.record_edit(edit.id, edit.fields);
        }
    }

    /// Drop pending edits and restore the last-saved rows.
    pub fn cancel(&mut self) {
        self.rows = self.last_saved.clone();
        self.drafts.discard();
    }

    /// Flush pending edits, then reload rows from the library regardless of the outcome.
    pub async fn save(
        &mut self,
        editor: &dyn RecordEditor,
        library: &dyn FileLibrary,
        notices: &dyn NoticePublisher,
    ) -> Result<FlushReport, DraftFlushError> {
        let result = self.drafts.flush(editor).await;

        match &result {
            Ok(report) => {
                info!(opportunity = %self.opportunity_id, updated = report.updated, "draft edits saved");
                notices.publish(Notice::success("Records updated successfully"));
            }
            Err(error) => {
                warn!(opportunity = %self.opportunity_id, %error, "draft edits failed to save");
                notices.publish(Notice::error(error.to_string()));
            }
        }

        if let Err(error) = self.refresh(library).await {
            warn!(opportunity = %self.opportunity_id, %error, "file grid refresh failed");
            self.rows = self.last_saved.clone();
        }

        result
    }

    /// Acknowledge files added by the upload widget and reload the grid.
    pub async fn upload_finished(
        &mut self,
        file_names: &[String],
        library: &dyn FileLibrary,
        notices: &dyn NoticePublisher,
    ) -> Result<(), RemoteCallError> {
        let rejected: Vec<&str> = file_names
            .iter()
            .map(String::as_str)
            .filter(|name| self.uploads.classify(name).is_err())
            .collect();

        if rejected.len() < file_names.len() {
            notices.publish(Notice::success("File uploaded successfully"));
        }
        if !rejected.is_empty() {
            let message = format!(
                "Accepted formats are {}; skipped {}",
                self.uploads.accepted_list(),
                rejected.join(", ")
            );
            notices.publish(
                Notice::warning("Unsupported format", message).with_mode(NoticeMode::Sticky),
            );
        }

        self.refresh(library).await
    }
}
