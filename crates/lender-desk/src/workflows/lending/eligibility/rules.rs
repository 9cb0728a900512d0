use super::super::domain::{LenderAccount, Opportunity};
use super::{DataShapeError, EligibilityFailure};

/// Numeric inputs resolved from both records before any comparison runs.
pub(crate) struct EligibilitySignals {
    pub credit_score: u16,
    pub amount: f64,
    pub minimum_credit_score: u16,
    pub minimum_monthly_deposit: f64,
}

pub(crate) fn read_signals(
    opportunity: &Opportunity,
    lender: &LenderAccount,
) -> Result<EligibilitySignals, DataShapeError> {
    let credit_score = opportunity
        .credit_score
        .ok_or_else(|| DataShapeError::Opportunity {
            opportunity: opportunity.id.clone(),
            field: "credit score",
        })?;

    let amount = opportunity
        .amount
        .filter(|value| value.is_finite())
        .ok_or_else(|| DataShapeError::Opportunity {
            opportunity: opportunity.id.clone(),
            field: "amount",
        })?;

    let minimum_credit_score =
        lender
            .minimum_credit_score
            .ok_or_else(|| DataShapeError::Lender {
                lender: lender.id.clone(),
                field: "minimum credit score",
            })?;

    let minimum_monthly_deposit = lender
        .minimum_monthly_deposit
        .filter(|value| value.is_finite())
        .ok_or_else(|| DataShapeError::Lender {
            lender: lender.id.clone(),
            field: "minimum monthly deposit",
        })?;

    Ok(EligibilitySignals {
        credit_score,
        amount,
        minimum_credit_score,
        minimum_monthly_deposit,
    })
}

pub(crate) fn failed_conditions(
    signals: &EligibilitySignals,
    opportunity: &Opportunity,
    lender: &LenderAccount,
) -> Vec<EligibilityFailure> {
    let mut failures = Vec::new();

    if signals.credit_score < signals.minimum_credit_score {
        failures.push(EligibilityFailure::CreditScoreBelowMinimum {
            required: signals.minimum_credit_score,
            actual: signals.credit_score,
        });
    }

    if signals.amount < signals.minimum_monthly_deposit {
        failures.push(EligibilityFailure::AmountBelowMinimumDeposit {
            required: signals.minimum_monthly_deposit,
            actual: signals.amount,
        });
    }

    // An opportunity without an industry cannot hit a restriction.
    if let Some(industry) = opportunity.industry.as_deref() {
        if lender.restricts(industry) {
            failures.push(EligibilityFailure::RestrictedIndustry(
                industry.trim().to_string(),
            ));
        }
    }

    failures
}
