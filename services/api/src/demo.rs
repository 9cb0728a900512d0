use crate::infra::{content_type, sample_opportunity, InMemoryBackoffice, SAMPLE_OPPORTUNITY};
use clap::Args;
use lender_desk::config::WorkflowConfig;
use lender_desk::error::AppError;
use lender_desk::workflows::lending::{
    EditableField, FieldValues, FilterMode, LenderBoard, LenderCsvImporter, LendingService,
    NoticeVariant, OpportunityId, RecordFieldEdit, RecordId, WorkspaceError,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct LenderReportArgs {
    /// Opportunity to evaluate
    #[arg(long, default_value = SAMPLE_OPPORTUNITY)]
    pub(crate) opportunity: String,
    /// Lender filter: Qualified, Not Qualified, API Lenders, or All
    #[arg(long, default_value = "Qualified")]
    pub(crate) filter: FilterMode,
    /// Lender catalog exported as CSV, replacing the seeded lenders
    #[arg(long)]
    pub(crate) lenders_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop after document tagging without submitting to lenders.
    #[arg(long)]
    pub(crate) skip_submission: bool,
}

pub(crate) async fn run_lender_report(args: LenderReportArgs) -> Result<(), AppError> {
    let LenderReportArgs {
        opportunity,
        filter,
        lenders_csv,
    } = args;

    let backoffice = match lenders_csv {
        Some(path) => {
            let lenders = LenderCsvImporter::from_path(&path)?;
            let backoffice = InMemoryBackoffice::with_lenders(lenders);
            backoffice.opportunities.insert(sample_opportunity());
            backoffice
        }
        None => InMemoryBackoffice::seeded(),
    };

    let service = Arc::new(LendingService::new(
        backoffice.gateways(),
        WorkflowConfig::default(),
    ));
    let board = service
        .lender_board(OpportunityId(opportunity), filter)
        .await?;
    render_board(&board);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let backoffice = InMemoryBackoffice::seeded();
    let service = Arc::new(LendingService::new(
        backoffice.gateways(),
        WorkflowConfig::default(),
    ));
    let opportunity_id = OpportunityId(SAMPLE_OPPORTUNITY.to_string());

    println!("Lender desk demo");
    let mut workspace = service.open_workspace(opportunity_id.clone()).await?;
    render_board(&workspace.board());

    workspace
        .change_filter(FilterMode::All)
        .map_err(WorkspaceError::from)?;
    println!(
        "\nAll lenders: {} in catalog, selection column {}",
        workspace.visible_lenders().len(),
        if workspace.selection_column_visible() {
            "shown"
        } else {
            "hidden"
        }
    );

    workspace
        .change_filter(FilterMode::Qualified)
        .map_err(WorkspaceError::from)?;
    let chosen: Vec<_> = workspace
        .visible_lenders()
        .iter()
        .map(|lender| lender.id.clone())
        .collect();
    workspace.select_lenders(chosen);

    println!("\nSupporting documents");
    let mut grid = service
        .file_grid(opportunity_id.clone())
        .await
        .map_err(WorkspaceError::from)?;
    for record in grid.rows() {
        println!(
            "- {} ({}, {} bytes)",
            record.title,
            content_type(record),
            record.content_size
        );
    }

    let categories = ["Bank Statement", "Tax Return", "Application"];
    let edits = grid
        .rows()
        .iter()
        .zip(categories)
        .map(|(record, category)| {
            let mut fields = FieldValues::new();
            fields.insert(EditableField::FileType, category.to_string());
            RecordFieldEdit {
                id: RecordId::from(&record.id),
                fields,
            }
        })
        .collect();
    grid.cell_changed(edits);
    let gateways = service.gateways();
    match grid
        .save(
            gateways.editor.as_ref(),
            gateways.files.as_ref(),
            gateways.notices.as_ref(),
        )
        .await
    {
        Ok(report) => println!("Tagged {} document(s)", report.updated),
        Err(error) => println!("Tagging failed: {error}"),
    }
    for record in grid.rows() {
        println!(
            "  - {}: {}",
            record.title,
            record.file_type.as_deref().unwrap_or("(untagged)")
        );
    }

    backoffice.files.select(
        &opportunity_id,
        grid.rows().iter().map(|record| record.id.clone()).collect(),
    );
    workspace
        .sync_file_selection()
        .await
        .map_err(WorkspaceError::from)?;

    if args.skip_submission {
        println!("\nSubmission skipped");
    } else {
        println!("\nSubmitting to {} lender(s)", workspace.selection().lenders().len());
        match workspace.submit().await {
            Ok(report) => {
                let steps: Vec<_> = report
                    .completed_steps
                    .iter()
                    .map(|step| step.label())
                    .collect();
                println!("- steps: {}", steps.join(" -> "));
                println!("- opportunity stage: {}", workspace.opportunity().stage);
                for package in backoffice.dispatcher.packages() {
                    println!(
                        "- e-mail for {}: {} file(s) to {} lender(s)",
                        package.opportunity_id,
                        package.file_ids.len(),
                        package.lender_ids.len()
                    );
                }
                for (opportunity, lender) in backoffice.dispatcher.submissions() {
                    println!("- submission record {opportunity} -> {lender}");
                }
            }
            Err(error) => println!("- submission halted: {error}"),
        }
    }

    println!("\nNotices");
    for notice in backoffice.notices.drain() {
        let marker = match notice.variant {
            NoticeVariant::Success => "ok",
            NoticeVariant::Error => "error",
            NoticeVariant::Warning => "warn",
            NoticeVariant::Info => "info",
        };
        println!("- [{marker}] {}", notice.message);
    }

    Ok(())
}

fn render_board(board: &LenderBoard) {
    let opportunity = &board.opportunity;
    println!("{} ({})", board.card_title, opportunity.id);
    println!(
        "Stage {} | credit score {} | amount {} | industry {}",
        opportunity.stage,
        opportunity
            .credit_score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "n/a".to_string()),
        opportunity
            .amount
            .map(|amount| format!("{amount:.2}"))
            .unwrap_or_else(|| "n/a".to_string()),
        opportunity.industry.as_deref().unwrap_or("n/a"),
    );
    println!("{} lenders ({}):", board.filter, board.lenders.len());
    if board.lenders.is_empty() {
        println!("  (none)");
    }
    for lender in &board.lenders {
        println!("  - {} [{}]: {}", lender.name, lender.id, lender.notes);
    }
}
