use super::common::*;
use crate::workflows::lending::domain::{OpportunityId, OpportunityStage};
use crate::workflows::lending::eligibility::{DataShapeError, FilterMode};
use crate::workflows::lending::gateway::RemoteCallError;
use crate::workflows::lending::notice::{NavigationTarget, NoticeVariant};
use crate::workflows::lending::submission::{SubmissionError, ValidationError};
use crate::workflows::lending::workspace::WorkspaceError;

fn visible_ids(workspace: &crate::workflows::lending::SubmissionWorkspace) -> Vec<String> {
    workspace
        .visible_lenders()
        .iter()
        .map(|lender| lender.id.0.clone())
        .collect()
}

#[tokio::test]
async fn opens_with_qualified_lenders_and_selection_column() {
    let harness = Harness::new();
    let workspace = harness
        .service()
        .open_workspace(opportunity_id())
        .await
        .expect("workspace opens");

    assert_eq!(workspace.mode(), FilterMode::Qualified);
    assert_eq!(visible_ids(&workspace), vec!["harbor", "prairie"]);
    assert!(workspace.selection_column_visible());
    assert_eq!(workspace.card_title(), "Main Street Bakery");
    assert!(workspace.error().is_none());
}

#[tokio::test]
async fn changing_filter_recomputes_from_full_catalog() {
    let harness = Harness::new();
    let mut workspace = harness
        .service()
        .open_workspace(opportunity_id())
        .await
        .expect("workspace opens");

    workspace
        .change_filter(FilterMode::NotQualified)
        .expect("complete records");
    assert_eq!(visible_ids(&workspace), vec!["summit", "beacon"]);
    assert!(!workspace.selection_column_visible());

    workspace.change_filter(FilterMode::All).expect("all");
    assert_eq!(workspace.visible_lenders().len(), 4);

    workspace
        .change_filter(FilterMode::ApiLenders)
        .expect("api lenders");
    assert!(workspace.visible_lenders().is_empty());
    assert_eq!(workspace.lenders().len(), 4, "catalog is never narrowed");
}

#[tokio::test]
async fn incomplete_lender_surfaces_error_instead_of_partial_list() {
    let harness = Harness::new();
    harness.lenders.push(lender("incomplete", None, Some(2500.0), &[]));

    let mut workspace = harness
        .service()
        .open_workspace(opportunity_id())
        .await
        .expect("data shape problems do not fail the load");

    assert!(workspace.visible_lenders().is_empty());
    assert!(matches!(
        workspace.error(),
        Some(WorkspaceError::DataShape(DataShapeError::Lender { .. }))
    ));
    let board = workspace.board();
    assert_eq!(
        board.error.as_deref(),
        Some("lender incomplete has no usable minimum credit score")
    );
    assert_eq!(
        harness.notices.notices()[0].variant,
        NoticeVariant::Error
    );

    workspace.change_filter(FilterMode::All).expect("all never fails");
    assert_eq!(workspace.visible_lenders().len(), 5);
    assert!(workspace.error().is_none());
}

#[tokio::test]
async fn lender_board_reports_data_shape_errors() {
    let harness = Harness::new();
    let mut record = opportunity();
    record.credit_score = None;
    harness.opportunities.replace(record);

    let error = harness
        .service()
        .lender_board(opportunity_id(), FilterMode::Qualified)
        .await
        .expect_err("credit score missing");

    assert!(matches!(
        error,
        WorkspaceError::DataShape(DataShapeError::Opportunity {
            field: "credit score",
            ..
        })
    ));
    assert!(
        harness.notices.notices().is_empty(),
        "read-only board requests publish no notices"
    );
}

#[tokio::test]
async fn unknown_opportunity_fails_to_open() {
    let harness = Harness::new();
    let result = harness
        .service()
        .open_workspace(OpportunityId("006MISSING".to_string()))
        .await;

    assert!(matches!(
        result,
        Err(WorkspaceError::Remote(RemoteCallError::NotFound(_)))
    ));
}

#[tokio::test]
async fn board_marks_selected_rows_and_falls_back_to_default_title() {
    let harness = Harness::new();
    let mut record = opportunity();
    record.name = "  ".to_string();
    harness.opportunities.replace(record);

    let mut workspace = harness
        .service()
        .open_workspace(opportunity_id())
        .await
        .expect("workspace opens");
    workspace.select_lenders(lender_ids(&["prairie"]));

    let board = workspace.board();
    assert_eq!(board.card_title, "Opportunity");
    let selected: Vec<_> = board
        .lenders
        .iter()
        .filter(|row| row.selected)
        .map(|row| row.id.0.as_str())
        .collect();
    assert_eq!(selected, vec!["prairie"]);
    assert!(board.lenders.iter().all(|row| row.qualified == Some(true)));
}

#[tokio::test]
async fn submit_from_workspace_clears_selection_and_reloads() {
    let harness = Harness::new();
    harness.files.select(file_ids(&["068A"]));
    let mut workspace = harness
        .service()
        .open_workspace(opportunity_id())
        .await
        .expect("workspace opens");

    workspace.select_lenders(lender_ids(&["harbor"]));
    workspace
        .sync_file_selection()
        .await
        .expect("upload selection available");
    assert_eq!(workspace.selection().files().len(), 1);

    workspace.submit().await.expect("submission succeeds");

    assert!(workspace.selection().is_empty());
    assert_eq!(workspace.opportunity().stage, OpportunityStage::Underwriting);
}

#[tokio::test]
async fn submit_without_files_reports_validation_error() {
    let harness = Harness::new();
    let mut workspace = harness
        .service()
        .open_workspace(opportunity_id())
        .await
        .expect("workspace opens");
    workspace.select_lenders(lender_ids(&["harbor"]));

    let error = workspace.submit().await.expect_err("no files");

    assert_eq!(
        error,
        SubmissionError::Validation(ValidationError::NoFilesSelected)
    );
    assert!(harness.calls().is_empty());
}

#[tokio::test]
async fn submit_selection_falls_back_to_upload_widget_files() {
    let harness = Harness::new();
    harness.files.select(file_ids(&["068A", "068B"]));

    let report = harness
        .service()
        .submit_selection(&opportunity_id(), lender_ids(&["harbor"]), None)
        .await
        .expect("submission succeeds");

    assert_eq!(report.file_ids, file_ids(&["068A", "068B"]));
}

#[tokio::test]
async fn cancel_returns_to_the_opportunity_page() {
    let harness = Harness::new();
    let workspace = harness
        .service()
        .open_workspace(opportunity_id())
        .await
        .expect("workspace opens");

    workspace.cancel();

    assert_eq!(
        harness.navigator.targets(),
        vec![NavigationTarget::opportunity_view(&opportunity_id())]
    );
}

#[test]
fn submission_page_carries_record_id_and_cache_buster() {
    let target = NavigationTarget::submission_page("Lender_Submission", &opportunity_id(), 42);
    assert_eq!(target.opportunity_id(), Some(opportunity_id()));
    match target {
        NavigationTarget::NamedPage { api_name, state } => {
            assert_eq!(api_name, "Lender_Submission");
            assert_eq!(state.get("c__t").map(String::as_str), Some("42"));
        }
        other => panic!("expected named page, got {other:?}"),
    }
}
