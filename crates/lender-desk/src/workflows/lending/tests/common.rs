use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::config::WorkflowConfig;
use crate::workflows::lending::domain::{
    FileId, FileRecord, LenderAccount, LenderId, Opportunity, OpportunityId, OpportunityStage,
    RecordId,
};
use crate::workflows::lending::drafts::{EditableField, FieldValues, RecordFieldEdit};
use crate::workflows::lending::gateway::{
    FileLibrary, LenderDirectory, Navigator, NoticePublisher, OpportunityRepository,
    RecordEditor, RecordUpdateStatus, RemoteCallError, SubmissionDispatcher,
};
use crate::workflows::lending::notice::{NavigationTarget, Notice};
use crate::workflows::lending::workspace::{LendingGateways, LendingService};

pub(super) const OPPORTUNITY: &str = "006BAKERY";

/// Ordered record of every remote call made by the fakes.
pub(super) type CallLog = Arc<Mutex<Vec<String>>>;

fn log(calls: &CallLog, entry: impl Into<String>) {
    calls.lock().expect("call log mutex poisoned").push(entry.into());
}

pub(super) fn opportunity_id() -> OpportunityId {
    OpportunityId(OPPORTUNITY.to_string())
}

pub(super) fn opportunity() -> Opportunity {
    Opportunity {
        id: opportunity_id(),
        name: "Main Street Bakery".to_string(),
        credit_score: Some(700),
        amount: Some(5000.0),
        industry: Some("Retail".to_string()),
        stage: OpportunityStage::Proposal,
    }
}

pub(super) fn lender(
    id: &str,
    minimum_credit_score: Option<u16>,
    minimum_monthly_deposit: Option<f64>,
    restricted: &[&str],
) -> LenderAccount {
    LenderAccount {
        id: LenderId(id.to_string()),
        name: format!("{id} Lending"),
        minimum_credit_score,
        minimum_monthly_deposit,
        restricted_industries: restricted.iter().map(|value| value.to_string()).collect(),
        record_type: None,
    }
}

/// Harbor and Prairie qualify; Summit fails on credit, Beacon restricts retail.
pub(super) fn lender_catalog() -> Vec<LenderAccount> {
    vec![
        lender("harbor", Some(650), Some(4000.0), &["Gambling"]),
        lender("summit", Some(750), Some(4000.0), &[]),
        lender("beacon", Some(600), Some(3000.0), &["Retail"]),
        lender("prairie", Some(700), Some(5000.0), &[]),
    ]
}

pub(super) fn lender_ids(ids: &[&str]) -> Vec<LenderId> {
    ids.iter().map(|id| LenderId(id.to_string())).collect()
}

pub(super) fn file_ids(ids: &[&str]) -> Vec<FileId> {
    ids.iter().map(|id| FileId(id.to_string())).collect()
}

pub(super) fn file(id: &str, title: &str) -> FileRecord {
    FileRecord {
        id: FileId(id.to_string()),
        document_id: format!("069{id}"),
        title: title.to_string(),
        file_type: None,
        content_size: 48_213,
        submission_note: None,
    }
}

pub(super) fn edit(id: &str, field: EditableField, value: &str) -> RecordFieldEdit {
    let mut fields = FieldValues::new();
    fields.insert(field, value.to_string());
    RecordFieldEdit {
        id: RecordId(id.to_string()),
        fields,
    }
}

#[derive(Default)]
pub(super) struct MemoryOpportunities {
    records: Mutex<BTreeMap<OpportunityId, Opportunity>>,
    stage_failure: Mutex<Option<RemoteCallError>>,
    calls: CallLog,
}

impl MemoryOpportunities {
    pub(super) fn new(records: Vec<Opportunity>, calls: CallLog) -> Self {
        Self {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|record| (record.id.clone(), record))
                    .collect(),
            ),
            stage_failure: Mutex::new(None),
            calls,
        }
    }

    pub(super) fn fail_stage_update(&self, error: RemoteCallError) {
        *self.stage_failure.lock().expect("stage mutex poisoned") = Some(error);
    }

    pub(super) fn stage_of(&self, id: &OpportunityId) -> Option<OpportunityStage> {
        self.records
            .lock()
            .expect("opportunity mutex poisoned")
            .get(id)
            .map(|record| record.stage.clone())
    }

    pub(super) fn replace(&self, record: Opportunity) {
        self.records
            .lock()
            .expect("opportunity mutex poisoned")
            .insert(record.id.clone(), record);
    }
}

#[async_trait]
impl OpportunityRepository for MemoryOpportunities {
    async fn fetch_opportunity(&self, id: &OpportunityId) -> Result<Opportunity, RemoteCallError> {
        self.records
            .lock()
            .expect("opportunity mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteCallError::NotFound(format!("Opportunity {id} not found")))
    }

    async fn update_opportunity_stage(
        &self,
        id: &OpportunityId,
        stage: &OpportunityStage,
    ) -> Result<(), RemoteCallError> {
        tokio::task::yield_now().await;
        log(&self.calls, format!("stage:{id}:{stage}"));
        if let Some(error) = self.stage_failure.lock().expect("stage mutex poisoned").clone() {
            return Err(error);
        }
        let mut records = self.records.lock().expect("opportunity mutex poisoned");
        let record = records
            .get_mut(id)
            .ok_or_else(|| RemoteCallError::NotFound(format!("Opportunity {id} not found")))?;
        record.stage = stage.clone();
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryLenders {
    lenders: Mutex<Vec<LenderAccount>>,
}

impl MemoryLenders {
    pub(super) fn new(lenders: Vec<LenderAccount>) -> Self {
        Self {
            lenders: Mutex::new(lenders),
        }
    }

    pub(super) fn push(&self, lender: LenderAccount) {
        self.lenders
            .lock()
            .expect("lender mutex poisoned")
            .push(lender);
    }
}

#[async_trait]
impl LenderDirectory for MemoryLenders {
    async fn fetch_lender_accounts(&self) -> Result<Vec<LenderAccount>, RemoteCallError> {
        Ok(self.lenders.lock().expect("lender mutex poisoned").clone())
    }
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    notification_failure: Mutex<Option<RemoteCallError>>,
    records_failure: Mutex<Option<RemoteCallError>>,
    calls: CallLog,
}

impl RecordingDispatcher {
    pub(super) fn new(calls: CallLog) -> Self {
        Self {
            notification_failure: Mutex::new(None),
            records_failure: Mutex::new(None),
            calls,
        }
    }

    pub(super) fn fail_records(&self, error: RemoteCallError) {
        *self
            .records_failure
            .lock()
            .expect("dispatcher mutex poisoned") = Some(error);
    }

    pub(super) fn fail_notification(&self, error: RemoteCallError) {
        *self
            .notification_failure
            .lock()
            .expect("dispatcher mutex poisoned") = Some(error);
    }
}

#[async_trait]
impl SubmissionDispatcher for RecordingDispatcher {
    async fn send_notification(
        &self,
        opportunity_id: &OpportunityId,
        file_ids: &[FileId],
        lender_ids: &[LenderId],
    ) -> Result<(), RemoteCallError> {
        log(
            &self.calls,
            format!(
                "notify:{opportunity_id}:{}files:{}lenders",
                file_ids.len(),
                lender_ids.len()
            ),
        );
        match self
            .notification_failure
            .lock()
            .expect("dispatcher mutex poisoned")
            .clone()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn create_submission_records(
        &self,
        opportunity_id: &OpportunityId,
        lender_ids: &[LenderId],
    ) -> Result<(), RemoteCallError> {
        log(
            &self.calls,
            format!("records:{opportunity_id}:{}lenders", lender_ids.len()),
        );
        match self
            .records_failure
            .lock()
            .expect("dispatcher mutex poisoned")
            .clone()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Document store backing both the file grid and the bulk record editor.
pub(super) struct MemoryFiles {
    files: Mutex<Vec<FileRecord>>,
    selected: Mutex<Vec<FileId>>,
    rejected: Mutex<BTreeSet<RecordId>>,
    outage: Mutex<Option<RemoteCallError>>,
    batches: Mutex<Vec<Vec<RecordFieldEdit>>>,
}

impl MemoryFiles {
    pub(super) fn new(files: Vec<FileRecord>) -> Self {
        Self {
            files: Mutex::new(files),
            selected: Mutex::new(Vec::new()),
            rejected: Mutex::new(BTreeSet::new()),
            outage: Mutex::new(None),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn select(&self, ids: Vec<FileId>) {
        *self.selected.lock().expect("selection mutex poisoned") = ids;
    }

    pub(super) fn reject(&self, id: &str) {
        self.rejected
            .lock()
            .expect("rejection mutex poisoned")
            .insert(RecordId(id.to_string()));
    }

    pub(super) fn fail_updates(&self, error: RemoteCallError) {
        *self.outage.lock().expect("outage mutex poisoned") = Some(error);
    }

    pub(super) fn batches(&self) -> Vec<Vec<RecordFieldEdit>> {
        self.batches.lock().expect("batch mutex poisoned").clone()
    }

    pub(super) fn stored(&self, id: &str) -> Option<FileRecord> {
        self.files
            .lock()
            .expect("file mutex poisoned")
            .iter()
            .find(|record| record.id.0 == id)
            .cloned()
    }
}

#[async_trait]
impl FileLibrary for MemoryFiles {
    async fn selected_file_ids(
        &self,
        _opportunity_id: &OpportunityId,
    ) -> Result<Vec<FileId>, RemoteCallError> {
        Ok(self.selected.lock().expect("selection mutex poisoned").clone())
    }

    async fn files_for_record(
        &self,
        _opportunity_id: &OpportunityId,
    ) -> Result<Vec<FileRecord>, RemoteCallError> {
        Ok(self.files.lock().expect("file mutex poisoned").clone())
    }

    async fn file_type_options(&self) -> Result<Vec<String>, RemoteCallError> {
        Ok(vec![
            "Bank Statement".to_string(),
            "Tax Return".to_string(),
            "Application".to_string(),
        ])
    }
}

#[async_trait]
impl RecordEditor for MemoryFiles {
    async fn update_record_fields(
        &self,
        batch: &[RecordFieldEdit],
    ) -> Result<Vec<RecordUpdateStatus>, RemoteCallError> {
        self.batches
            .lock()
            .expect("batch mutex poisoned")
            .push(batch.to_vec());
        if let Some(error) = self.outage.lock().expect("outage mutex poisoned").clone() {
            return Err(error);
        }

        let rejected = self.rejected.lock().expect("rejection mutex poisoned").clone();
        let mut files = self.files.lock().expect("file mutex poisoned");
        let mut statuses = Vec::with_capacity(batch.len());
        for edit in batch {
            if rejected.contains(&edit.id) {
                statuses.push(RecordUpdateStatus::failed(
                    edit.id.clone(),
                    "FIELD_CUSTOM_VALIDATION_EXCEPTION",
                ));
                continue;
            }
            if let Some(record) = files
                .iter_mut()
                .find(|record| RecordId::from(&record.id) == edit.id)
            {
                for (field, value) in &edit.fields {
                    match field {
                        EditableField::FileType => record.file_type = Some(value.clone()),
                        EditableField::SubmissionNote => {
                            record.submission_note = Some(value.clone())
                        }
                    }
                }
            }
            statuses.push(RecordUpdateStatus::ok(edit.id.clone()));
        }
        Ok(statuses)
    }
}

#[derive(Default)]
pub(super) struct MemoryNotices {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotices {
    pub(super) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }

    pub(super) fn messages(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .map(|notice| notice.message)
            .collect()
    }
}

impl NoticePublisher for MemoryNotices {
    fn publish(&self, notice: Notice) {
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
    }
}

#[derive(Default)]
pub(super) struct MemoryNavigator {
    targets: Mutex<Vec<NavigationTarget>>,
}

impl MemoryNavigator {
    pub(super) fn targets(&self) -> Vec<NavigationTarget> {
        self.targets.lock().expect("navigator mutex poisoned").clone()
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, target: NavigationTarget) {
        self.targets
            .lock()
            .expect("navigator mutex poisoned")
            .push(target);
    }
}

/// All fakes for one test, sharing a single call log.
pub(super) struct Harness {
    pub calls: CallLog,
    pub opportunities: Arc<MemoryOpportunities>,
    pub lenders: Arc<MemoryLenders>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub files: Arc<MemoryFiles>,
    pub notices: Arc<MemoryNotices>,
    pub navigator: Arc<MemoryNavigator>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let calls = CallLog::default();
        Self {
            opportunities: Arc::new(MemoryOpportunities::new(
                vec![opportunity()],
                calls.clone(),
            )),
            lenders: Arc::new(MemoryLenders::new(lender_catalog())),
            dispatcher: Arc::new(RecordingDispatcher::new(calls.clone())),
            files: Arc::new(MemoryFiles::new(vec![
                file("068A", "March bank statement.pdf"),
                file("068B", "2024 tax return.pdf"),
            ])),
            notices: Arc::new(MemoryNotices::default()),
            navigator: Arc::new(MemoryNavigator::default()),
            calls,
        }
    }

    pub(super) fn gateways(&self) -> LendingGateways {
        LendingGateways {
            opportunities: self.opportunities.clone(),
            lenders: self.lenders.clone(),
            dispatcher: self.dispatcher.clone(),
            editor: self.files.clone(),
            files: self.files.clone(),
            notices: self.notices.clone(),
            navigator: self.navigator.clone(),
        }
    }

    pub(super) fn service(&self) -> Arc<LendingService> {
        Arc::new(LendingService::new(self.gateways(), WorkflowConfig::default()))
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
