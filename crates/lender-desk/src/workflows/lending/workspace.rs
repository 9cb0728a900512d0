use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    FileId, LenderAccount, LenderId, Opportunity, OpportunityId, OpportunityStage,
};
use super::drafts::{DraftFlushError, FileGrid, FlushReport, RecordFieldEdit};
use super::eligibility::{
    apply_filter, assess, DataShapeError, FilterMode, FilterOption, SelectionColumnPolicy,
};
use super::gateway::{
    FileLibrary, LenderDirectory, Navigator, NoticePublisher, OpportunityRepository,
    RecordEditor, RemoteCallError, SubmissionDispatcher,
};
use super::notice::{NavigationTarget, Notice};
use super::selection::SelectionSet;
use super::submission::{SubmissionError, SubmissionOrchestrator, SubmissionReport};
use crate::config::WorkflowConfig;

const DEFAULT_CARD_TITLE: &str = "Opportunity";

/// Every external collaborator the workflow talks to.
#[derive(Clone)]
pub struct LendingGateways {
    pub opportunities: Arc<dyn OpportunityRepository>,
    pub lenders: Arc<dyn LenderDirectory>,
    pub dispatcher: Arc<dyn SubmissionDispatcher>,
    pub editor: Arc<dyn RecordEditor>,
    pub files: Arc<dyn FileLibrary>,
    pub notices: Arc<dyn NoticePublisher>,
    pub navigator: Arc<dyn Navigator>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
    #[error(transparent)]
    DataShape(#[from] DataShapeError),
}

/// Shared entry point composing the collaborators, the orchestrator, and workflow settings.
pub struct LendingService {
    gateways: LendingGateways,
    orchestrator: SubmissionOrchestrator,
    selection_columns: SelectionColumnPolicy,
}

impl LendingService {
    pub fn new(gateways: LendingGateways, config: WorkflowConfig) -> Self {
        let orchestrator = SubmissionOrchestrator::new(
            gateways.opportunities.clone(),
            gateways.dispatcher.clone(),
            gateways.notices.clone(),
            config.submission_stage,
        );

        Self {
            gateways,
            orchestrator,
            selection_columns: config.selection_columns,
        }
    }

    pub fn gateways(&self) -> &LendingGateways {
        &self.gateways
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator {
        &self.orchestrator
    }

    /// Load the opportunity and lender catalog into a fresh session using the
    /// default filter.
    pub async fn open_workspace(
        self: &Arc<Self>,
        opportunity_id: OpportunityId,
    ) -> Result<SubmissionWorkspace, WorkspaceError> {
        self.open_workspace_with(opportunity_id, FilterMode::default())
            .await
    }

    pub async fn open_workspace_with(
        self: &Arc<Self>,
        opportunity_id: OpportunityId,
        mode: FilterMode,
    ) -> Result<SubmissionWorkspace, WorkspaceError> {
        let mut workspace = self.blank_workspace(opportunity_id, mode);
        workspace.refresh().await?;
        Ok(workspace)
    }

    /// One-shot lender view for `mode`, used by stateless callers. Failures are
    /// returned to the caller and never published as notices.
    pub async fn lender_board(
        self: &Arc<Self>,
        opportunity_id: OpportunityId,
        mode: FilterMode,
    ) -> Result<LenderBoard, WorkspaceError> {
        let mut workspace = self.blank_workspace(opportunity_id, mode);
        workspace.reload().await?;
        workspace.recompute(mode)?;
        Ok(workspace.board())
    }

    fn blank_workspace(
        self: &Arc<Self>,
        opportunity_id: OpportunityId,
        mode: FilterMode,
    ) -> SubmissionWorkspace {
        SubmissionWorkspace {
            service: Arc::clone(self),
            opportunity: placeholder_opportunity(&opportunity_id),
            opportunity_id,
            lenders: Vec::new(),
            mode,
            visible: Vec::new(),
            selection_column_visible: false,
            selection: SelectionSet::new(),
            error: None,
        }
    }

    /// Submit an explicit selection. Without `file_ids`, the upload widget's
    /// current selection is used.
    pub async fn submit_selection(
        &self,
        opportunity_id: &OpportunityId,
        lender_ids: Vec<LenderId>,
        file_ids: Option<Vec<FileId>>,
    ) -> Result<SubmissionReport, SubmissionError> {
        let file_ids = match file_ids {
            Some(ids) => ids,
            None => match self.gateways.files.selected_file_ids(opportunity_id).await {
                Ok(ids) => ids,
                Err(error) => {
                    warn!(opportunity = %opportunity_id, %error, "file selection unavailable");
                    Vec::new()
                }
            },
        };

        let mut selection = SelectionSet::new();
        selection.record_lender_selection(lender_ids);
        selection.record_file_selection(file_ids);
        self.orchestrator.submit(opportunity_id, &mut selection).await
    }

    pub async fn file_grid(&self, opportunity_id: OpportunityId) -> Result<FileGrid, RemoteCallError> {
        FileGrid::load(opportunity_id, self.gateways.files.as_ref()).await
    }

    /// Apply grid edits and save them as one batch, returning the reloaded grid.
    pub async fn save_file_edits(
        &self,
        opportunity_id: OpportunityId,
        edits: Vec<RecordFieldEdit>,
    ) -> Result<(FileGrid, Result<FlushReport, DraftFlushError>), RemoteCallError> {
        let mut grid = self.file_grid(opportunity_id).await?;
        grid.cell_changed(edits);
        let outcome = grid
            .save(
                self.gateways.editor.as_ref(),
                self.gateways.files.as_ref(),
                self.gateways.notices.as_ref(),
            )
            .await;
        Ok((grid, outcome))
    }
}

fn placeholder_opportunity(id: &OpportunityId) -> Opportunity {
    Opportunity {
        id: id.clone(),
        name: String::new(),
        credit_score: None,
        amount: None,
        industry: None,
        stage: OpportunityStage::Prospecting,
    }
}

/// Screen-lifetime state of the submission workflow for one opportunity.
pub struct SubmissionWorkspace {
    service: Arc<LendingService>,
    opportunity_id: OpportunityId,
    opportunity: Opportunity,
    lenders: Vec<LenderAccount>,
    mode: FilterMode,
    visible: Vec<LenderAccount>,
    selection_column_visible: bool,
    selection: SelectionSet,
    error: Option<WorkspaceError>,
}

impl SubmissionWorkspace {
    pub fn opportunity(&self) -> &Opportunity {
        &self.opportunity
    }

    pub fn lenders(&self) -> &[LenderAccount] {
        &self.lenders
    }

    pub fn visible_lenders(&self) -> &[LenderAccount] {
        &self.visible
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_column_visible(&self) -> bool {
        self.selection_column_visible
    }

    /// Last load or filter failure, cleared by the next successful recompute.
    pub fn error(&self) -> Option<&WorkspaceError> {
        self.error.as_ref()
    }

    pub fn card_title(&self) -> &str {
        if self.opportunity.name.trim().is_empty() {
            DEFAULT_CARD_TITLE
        } else {
            &self.opportunity.name
        }
    }

    /// Re-fetch the opportunity and lender catalog, then recompute the visible lenders.
    ///
    /// A data-shape problem does not fail the refresh; it is kept as the
    /// workspace error, published as a notice, and the visible list is left empty.
    pub async fn refresh(&mut self) -> Result<(), WorkspaceError> {
        self.reload().await?;
        if let Err(error) = self.change_filter(self.mode) {
            debug!(opportunity = %self.opportunity_id, %error, "workspace refreshed with data-shape error");
        }
        Ok(())
    }

    /// Switch the active filter and rebuild the visible list from the full catalog.
    pub fn change_filter(&mut self, mode: FilterMode) -> Result<(), DataShapeError> {
        self.recompute(mode).map_err(|error| {
            self.service
                .gateways
                .notices
                .publish(Notice::error(error.to_string()));
            error
        })
    }

    async fn reload(&mut self) -> Result<(), RemoteCallError> {
        let gateways = self.service.gateways.clone();

        let opportunity = gateways
            .opportunities
            .fetch_opportunity(&self.opportunity_id)
            .await
            .map_err(|error| self.remember(error))?;
        let lenders = gateways
            .lenders
            .fetch_lender_accounts()
            .await
            .map_err(|error| self.remember(error))?;

        info!(
            opportunity = %self.opportunity_id,
            lenders = lenders.len(),
            "submission workspace loaded"
        );

        self.opportunity = opportunity;
        self.lenders = lenders;
        self.error = None;
        Ok(())
    }

    fn recompute(&mut self, mode: FilterMode) -> Result<(), DataShapeError> {
        self.mode = mode;
        self.selection_column_visible = self.service.selection_columns.shows_selection(mode);

        match apply_filter(mode, &self.opportunity, &self.lenders) {
            Ok(visible) => {
                self.visible = visible;
                self.error = None;
                Ok(())
            }
            Err(error) => {
                warn!(opportunity = %self.opportunity_id, filter = %mode, %error, "lender filter refused");
                self.visible.clear();
                self.error = Some(WorkspaceError::DataShape(error.clone()));
                Err(error)
            }
        }
    }

    /// Replace the lender selection with the rows checked in the grid.
    pub fn select_lenders(&mut self, ids: impl IntoIterator<Item = LenderId>) {
        self.selection.record_lender_selection(ids);
    }

    pub fn select_files(&mut self, ids: impl IntoIterator<Item = FileId>) {
        self.selection.record_file_selection(ids);
    }

    /// Pull the current document selection from the upload collaborator.
    pub async fn sync_file_selection(&mut self) -> Result<(), RemoteCallError> {
        let ids = self
            .service
            .gateways
            .files
            .selected_file_ids(&self.opportunity_id)
            .await?;
        self.selection.record_file_selection(ids);
        Ok(())
    }

    pub async fn submit(&mut self) -> Result<SubmissionReport, SubmissionError> {
        let service = Arc::clone(&self.service);
        let result = service
            .orchestrator
            .submit(&self.opportunity_id, &mut self.selection)
            .await;

        if result.is_ok() {
            if let Err(error) = self.refresh().await {
                warn!(opportunity = %self.opportunity_id, %error, "refresh after submission failed");
            }
        }
        result
    }

    /// Leave the workflow and return to the opportunity record page.
    pub fn cancel(&self) {
        self.service
            .gateways
            .navigator
            .navigate(NavigationTarget::opportunity_view(&self.opportunity_id));
    }

    pub fn board(&self) -> LenderBoard {
        let selected = self.selection.lenders();
        let lenders = self
            .visible
            .iter()
            .map(|lender| LenderRow::build(&self.opportunity, lender, selected.contains(&lender.id)))
            .collect();

        LenderBoard {
            opportunity: OpportunitySummary::from(&self.opportunity),
            card_title: self.card_title().to_string(),
            filter: self.mode,
            filter_options: FilterMode::options(),
            selection_column_visible: self.selection_column_visible,
            error: self.error.as_ref().map(ToString::to_string),
            lenders,
        }
    }

    fn remember(&mut self, error: RemoteCallError) -> RemoteCallError {
        self.error = Some(WorkspaceError::Remote(error.clone()));
        error
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunitySummary {
    pub id: OpportunityId,
    pub name: String,
    pub stage: String,
    pub credit_score: Option<u16>,
    pub amount: Option<f64>,
    pub industry: Option<String>,
    pub record_link: String,
}

impl From<&Opportunity> for OpportunitySummary {
    fn from(opportunity: &Opportunity) -> Self {
        Self {
            id: opportunity.id.clone(),
            name: opportunity.name.clone(),
            stage: opportunity.stage.label().to_string(),
            credit_score: opportunity.credit_score,
            amount: opportunity.amount,
            industry: opportunity.industry.clone(),
            record_link: opportunity.record_link(),
        }
    }
}

/// Lender grid row with its eligibility outcome.
#[derive(Debug, Clone, Serialize)]
pub struct LenderRow {
    pub id: LenderId,
    pub name: String,
    pub record_link: String,
    pub minimum_credit_score: Option<u16>,
    pub minimum_monthly_deposit: Option<f64>,
    pub restricted_industries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified: Option<bool>,
    pub notes: String,
    pub selected: bool,
}

impl LenderRow {
    fn build(opportunity: &Opportunity, lender: &LenderAccount, selected: bool) -> Self {
        let (qualified, notes) = match assess(opportunity, lender) {
            Ok(assessment) => (Some(assessment.qualified), assessment.summary()),
            Err(error) => (None, error.to_string()),
        };

        Self {
            id: lender.id.clone(),
            name: lender.name.clone(),
            record_link: lender.record_link(),
            minimum_credit_score: lender.minimum_credit_score,
            minimum_monthly_deposit: lender.minimum_monthly_deposit,
            restricted_industries: lender.restricted_industries.iter().cloned().collect(),
            qualified,
            notes,
            selected,
        }
    }
}

/// Serializable snapshot of the lender panel.
#[derive(Debug, Clone, Serialize)]
pub struct LenderBoard {
    pub opportunity: OpportunitySummary,
    pub card_title: String,
    pub filter: FilterMode,
    pub filter_options: Vec<FilterOption>,
    pub selection_column_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub lenders: Vec<LenderRow>,
}
