use async_trait::async_trait;
use lender_desk::workflows::lending::{
    EditableField, FileId, FileLibrary, FileRecord, LenderAccount, LenderDirectory, LenderId,
    LendingGateways, NavigationTarget, Navigator, Notice, NoticePublisher, NoticeVariant,
    Opportunity, OpportunityId, OpportunityRepository, OpportunityStage, RecordEditor,
    RecordFieldEdit, RecordId, RecordUpdateStatus, RemoteCallError, SubmissionDispatcher,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryOpportunityRepository {
    records: Arc<Mutex<HashMap<OpportunityId, Opportunity>>>,
}

impl InMemoryOpportunityRepository {
    pub(crate) fn insert(&self, opportunity: Opportunity) {
        let mut guard = self.records.lock().expect("opportunity mutex poisoned");
        guard.insert(opportunity.id.clone(), opportunity);
    }
}

#[async_trait]
impl OpportunityRepository for InMemoryOpportunityRepository {
    async fn fetch_opportunity(&self, id: &OpportunityId) -> Result<Opportunity, RemoteCallError> {
        let guard = self.records.lock().expect("opportunity mutex poisoned");
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteCallError::NotFound(format!("Opportunity {id} was not found")))
    }

    async fn update_opportunity_stage(
        &self,
        id: &OpportunityId,
        stage: &OpportunityStage,
    ) -> Result<(), RemoteCallError> {
        let mut guard = self.records.lock().expect("opportunity mutex poisoned");
        let record = guard
            .get_mut(id)
            .ok_or_else(|| RemoteCallError::NotFound(format!("Opportunity {id} was not found")))?;
        record.stage = stage.clone();
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLenderDirectory {
    lenders: Arc<Mutex<Vec<LenderAccount>>>,
}

impl InMemoryLenderDirectory {
    pub(crate) fn new(lenders: Vec<LenderAccount>) -> Self {
        Self {
            lenders: Arc::new(Mutex::new(lenders)),
        }
    }
}

#[async_trait]
impl LenderDirectory for InMemoryLenderDirectory {
    async fn fetch_lender_accounts(&self) -> Result<Vec<LenderAccount>, RemoteCallError> {
        Ok(self.lenders.lock().expect("lender mutex poisoned").clone())
    }
}

/// Outbound package as it would have been handed to the mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DispatchedPackage {
    pub(crate) opportunity_id: OpportunityId,
    pub(crate) file_ids: Vec<FileId>,
    pub(crate) lender_ids: Vec<LenderId>,
}

#[derive(Default, Clone)]
pub(crate) struct LoggingSubmissionDispatcher {
    packages: Arc<Mutex<Vec<DispatchedPackage>>>,
    submissions: Arc<Mutex<Vec<(OpportunityId, LenderId)>>>,
}

impl LoggingSubmissionDispatcher {
    pub(crate) fn packages(&self) -> Vec<DispatchedPackage> {
        self.packages.lock().expect("package mutex poisoned").clone()
    }

    pub(crate) fn submissions(&self) -> Vec<(OpportunityId, LenderId)> {
        self.submissions
            .lock()
            .expect("submission mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl SubmissionDispatcher for LoggingSubmissionDispatcher {
    async fn send_notification(
        &self,
        opportunity_id: &OpportunityId,
        file_ids: &[FileId],
        lender_ids: &[LenderId],
    ) -> Result<(), RemoteCallError> {
        info!(
            opportunity = %opportunity_id,
            files = file_ids.len(),
            lenders = lender_ids.len(),
            "lender package e-mailed"
        );
        let mut guard = self.packages.lock().expect("package mutex poisoned");
        guard.push(DispatchedPackage {
            opportunity_id: opportunity_id.clone(),
            file_ids: file_ids.to_vec(),
            lender_ids: lender_ids.to_vec(),
        });
        Ok(())
    }

    async fn create_submission_records(
        &self,
        opportunity_id: &OpportunityId,
        lender_ids: &[LenderId],
    ) -> Result<(), RemoteCallError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        guard.extend(
            lender_ids
                .iter()
                .map(|lender| (opportunity_id.clone(), lender.clone())),
        );
        Ok(())
    }
}

/// Documents per opportunity plus the upload widget's current selection.
#[derive(Default, Clone)]
pub(crate) struct InMemoryFileLibrary {
    files: Arc<Mutex<HashMap<OpportunityId, Vec<FileRecord>>>>,
    selected: Arc<Mutex<HashMap<OpportunityId, Vec<FileId>>>>,
    type_options: Vec<String>,
}

impl InMemoryFileLibrary {
    pub(crate) fn new(type_options: Vec<String>) -> Self {
        Self {
            type_options,
            ..Self::default()
        }
    }

    pub(crate) fn attach(&self, opportunity_id: &OpportunityId, record: FileRecord) {
        let mut guard = self.files.lock().expect("file mutex poisoned");
        guard.entry(opportunity_id.clone()).or_default().push(record);
    }

    pub(crate) fn select(&self, opportunity_id: &OpportunityId, ids: Vec<FileId>) {
        let mut guard = self.selected.lock().expect("selection mutex poisoned");
        guard.insert(opportunity_id.clone(), ids);
    }
}

/// Content type shown next to a document title.
pub(crate) fn content_type(record: &FileRecord) -> String {
    mime_guess::from_path(&record.title)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[async_trait]
impl FileLibrary for InMemoryFileLibrary {
    async fn selected_file_ids(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<FileId>, RemoteCallError> {
        let guard = self.selected.lock().expect("selection mutex poisoned");
        Ok(guard.get(opportunity_id).cloned().unwrap_or_default())
    }

    async fn files_for_record(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<FileRecord>, RemoteCallError> {
        let guard = self.files.lock().expect("file mutex poisoned");
        Ok(guard.get(opportunity_id).cloned().unwrap_or_default())
    }

    async fn file_type_options(&self) -> Result<Vec<String>, RemoteCallError> {
        Ok(self.type_options.clone())
    }
}

#[async_trait]
impl RecordEditor for InMemoryFileLibrary {
    async fn update_record_fields(
        &self,
        batch: &[RecordFieldEdit],
    ) -> Result<Vec<RecordUpdateStatus>, RemoteCallError> {
        let mut guard = self.files.lock().expect("file mutex poisoned");
        let statuses = batch
            .iter()
            .map(|edit| {
                let record = guard
                    .values_mut()
                    .flat_map(|records| records.iter_mut())
                    .find(|record| RecordId::from(&record.id) == edit.id);
                match record {
                    Some(record) => {
                        for (field, value) in &edit.fields {
                            match field {
                                EditableField::FileType => {
                                    record.file_type = Some(value.clone())
                                }
                                EditableField::SubmissionNote => {
                                    record.submission_note = Some(value.clone())
                                }
                            }
                        }
                        RecordUpdateStatus::ok(edit.id.clone())
                    }
                    None => RecordUpdateStatus::failed(
                        edit.id.clone(),
                        format!("ContentVersion {} does not exist", edit.id),
                    ),
                }
            })
            .collect();
        Ok(statuses)
    }
}

/// Notices have no screen here; they become log lines and stay readable for the demo.
#[derive(Default, Clone)]
pub(crate) struct TracingNoticePublisher {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl TracingNoticePublisher {
    pub(crate) fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().expect("notice mutex poisoned"))
    }
}

impl NoticePublisher for TracingNoticePublisher {
    fn publish(&self, notice: Notice) {
        match notice.variant {
            NoticeVariant::Error | NoticeVariant::Warning => {
                warn!(title = %notice.title, "{}", notice.message)
            }
            NoticeVariant::Success | NoticeVariant::Info => {
                info!(title = %notice.title, "{}", notice.message)
            }
        }
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
    }
}

#[derive(Default, Clone)]
pub(crate) struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, target: NavigationTarget) {
        info!(?target, "navigation requested");
    }
}

/// Seeded collaborators backing the service and the demo.
#[derive(Clone)]
pub(crate) struct InMemoryBackoffice {
    pub(crate) opportunities: InMemoryOpportunityRepository,
    pub(crate) lenders: InMemoryLenderDirectory,
    pub(crate) dispatcher: LoggingSubmissionDispatcher,
    pub(crate) files: InMemoryFileLibrary,
    pub(crate) notices: TracingNoticePublisher,
}

impl InMemoryBackoffice {
    pub(crate) fn seeded() -> Self {
        let backoffice = Self::with_lenders(sample_lenders());
        let opportunity = sample_opportunity();
        for (suffix, title, size) in [
            ("A", "Operating account - March.pdf", 184_220),
            ("B", "2024 business tax return.pdf", 402_118),
            ("C", "Signed application.docx", 58_004),
        ] {
            backoffice.files.attach(
                &opportunity.id,
                FileRecord {
                    id: FileId(format!("068DEMO{suffix}")),
                    document_id: format!("069DEMO{suffix}"),
                    title: title.to_string(),
                    file_type: None,
                    content_size: size,
                    submission_note: None,
                },
            );
        }
        backoffice.opportunities.insert(opportunity);
        backoffice
    }

    pub(crate) fn with_lenders(lenders: Vec<LenderAccount>) -> Self {
        Self {
            opportunities: InMemoryOpportunityRepository::default(),
            lenders: InMemoryLenderDirectory::new(lenders),
            dispatcher: LoggingSubmissionDispatcher::default(),
            files: InMemoryFileLibrary::new(
                [
                    "Bank Statement",
                    "Tax Return",
                    "Application",
                    "Voided Check",
                    "Driver License",
                ]
                .into_iter()
                .map(str::to_string)
                .collect(),
            ),
            notices: TracingNoticePublisher::default(),
        }
    }

    pub(crate) fn gateways(&self) -> LendingGateways {
        LendingGateways {
            opportunities: Arc::new(self.opportunities.clone()),
            lenders: Arc::new(self.lenders.clone()),
            dispatcher: Arc::new(self.dispatcher.clone()),
            editor: Arc::new(self.files.clone()),
            files: Arc::new(self.files.clone()),
            notices: Arc::new(self.notices.clone()),
            navigator: Arc::new(TracingNavigator),
        }
    }
}

pub(crate) const SAMPLE_OPPORTUNITY: &str = "006DEMO0001";

pub(crate) fn sample_opportunity() -> Opportunity {
    Opportunity {
        id: OpportunityId(SAMPLE_OPPORTUNITY.to_string()),
        name: "Main Street Bakery - Equipment Expansion".to_string(),
        credit_score: Some(700),
        amount: Some(5000.0),
        industry: Some("Retail".to_string()),
        stage: OpportunityStage::Proposal,
    }
}

pub(crate) fn sample_lenders() -> Vec<LenderAccount> {
    let lender = |id: &str, name: &str, credit: u16, deposit: f64, restricted: &[&str]| {
        LenderAccount {
            id: LenderId(id.to_string()),
            name: name.to_string(),
            minimum_credit_score: Some(credit),
            minimum_monthly_deposit: Some(deposit),
            restricted_industries: restricted.iter().map(|value| value.to_string()).collect(),
            record_type: Some("Lender".to_string()),
        }
    };

    vec![
        lender("001DEMOHRB", "Harbor Capital", 650, 4000.0, &["Gambling"]),
        lender("001DEMOSMT", "Summit Business Credit", 750, 4000.0, &[]),
        lender(
            "001DEMOBCN",
            "Beacon Merchant Funding",
            600,
            3000.0,
            &["Retail", "Restaurants"],
        ),
        lender("001DEMOPRA", "Prairie Funding Group", 680, 5000.0, &["Cannabis"]),
        lender("001DEMOATL", "Atlas Revenue Partners", 620, 8000.0, &[]),
    ]
}
