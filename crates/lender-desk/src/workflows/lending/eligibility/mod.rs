mod filter;
mod rules;

pub use filter::{
    apply_filter, FilterMode, FilterOption, SelectionColumnPolicy, UnknownFilterMode,
};

use super::domain::{LenderAccount, LenderId, Opportunity, OpportunityId};
use serde::Serialize;

/// Raised when a record lacks a numeric field the eligibility rule depends on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataShapeError {
    #[error("opportunity {opportunity} has no usable {field}")]
    Opportunity {
        opportunity: OpportunityId,
        field: &'static str,
    },
    #[error("lender {lender} has no usable {field}")]
    Lender {
        lender: LenderId,
        field: &'static str,
    },
}

/// A single eligibility condition the opportunity did not meet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum EligibilityFailure {
    CreditScoreBelowMinimum { required: u16, actual: u16 },
    AmountBelowMinimumDeposit { required: f64, actual: f64 },
    RestrictedIndustry(String),
}

impl EligibilityFailure {
    pub fn summary(&self) -> String {
        match self {
            EligibilityFailure::CreditScoreBelowMinimum { required, actual } => {
                format!("credit score {actual} below minimum {required}")
            }
            EligibilityFailure::AmountBelowMinimumDeposit { required, actual } => format!(
                "amount {:.2} below minimum monthly deposit {:.2}",
                actual, required
            ),
            EligibilityFailure::RestrictedIndustry(industry) => {
                format!("industry {industry} is restricted")
            }
        }
    }
}

/// Eligibility decision for one lender, with every failed condition listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityAssessment {
    pub lender_id: LenderId,
    pub qualified: bool,
    pub failures: Vec<EligibilityFailure>,
}

impl EligibilityAssessment {
    pub fn summary(&self) -> String {
        if self.qualified {
            "meets all lender requirements".to_string()
        } else {
            self.failures
                .iter()
                .map(EligibilityFailure::summary)
                .collect::<Vec<_>>()
                .join("; ")
        }
    }
}

/// Compare an opportunity against a lender's minimums and restrictions.
pub fn assess(
    opportunity: &Opportunity,
    lender: &LenderAccount,
) -> Result<EligibilityAssessment, DataShapeError> {
    let signals = rules::read_signals(opportunity, lender)?;
    let failures = rules::failed_conditions(&signals, opportunity, lender);

    Ok(EligibilityAssessment {
        lender_id: lender.id.clone(),
        qualified: failures.is_empty(),
        failures,
    })
}

pub fn is_qualified(
    opportunity: &Opportunity,
    lender: &LenderAccount,
) -> Result<bool, DataShapeError> {
    assess(opportunity, lender).map(|assessment| assessment.qualified)
}
