use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::super::domain::{LenderAccount, Opportunity};
use super::{is_qualified, DataShapeError};

/// Lender list filter selected by the user. Exactly one is active at a time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FilterMode {
    #[default]
    Qualified,
    #[serde(rename = "Not Qualified")]
    NotQualified,
    #[serde(rename = "API Lenders")]
    ApiLenders,
    All,
}

impl FilterMode {
    pub const ALL_MODES: [FilterMode; 4] = [
        FilterMode::Qualified,
        FilterMode::NotQualified,
        FilterMode::ApiLenders,
        FilterMode::All,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            FilterMode::Qualified => "Qualified",
            FilterMode::NotQualified => "Not Qualified",
            FilterMode::ApiLenders => "API Lenders",
            FilterMode::All => "All",
        }
    }

    /// Label/value pairs for a combobox, in display order.
    pub fn options() -> Vec<FilterOption> {
        Self::ALL_MODES
            .iter()
            .map(|mode| FilterOption {
                label: mode.label(),
                value: *mode,
            })
            .collect()
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lender filter '{0}'")]
pub struct UnknownFilterMode(pub String);

impl FromStr for FilterMode {
    type Err = UnknownFilterMode;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "qualified" => Ok(FilterMode::Qualified),
            "notqualified" => Ok(FilterMode::NotQualified),
            "apilenders" => Ok(FilterMode::ApiLenders),
            "all" => Ok(FilterMode::All),
            _ => Err(UnknownFilterMode(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub label: &'static str,
    pub value: FilterMode,
}

/// Which filter modes render the lender grid with a selection checkbox column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionColumnPolicy {
    visible_for: BTreeSet<FilterMode>,
}

impl SelectionColumnPolicy {
    pub fn new(visible_for: impl IntoIterator<Item = FilterMode>) -> Self {
        Self {
            visible_for: visible_for.into_iter().collect(),
        }
    }

    pub fn from_labels<'a>(
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, UnknownFilterMode> {
        let modes = labels
            .into_iter()
            .filter(|label| !label.trim().is_empty())
            .map(FilterMode::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { visible_for: modes })
    }

    pub fn shows_selection(&self, mode: FilterMode) -> bool {
        self.visible_for.contains(&mode)
    }
}

impl Default for SelectionColumnPolicy {
    fn default() -> Self {
        Self::new([FilterMode::Qualified])
    }
}

/// Derive the visible lender subset for `mode`, preserving input order.
///
/// `ApiLenders` has no eligibility rule yet and always yields an empty list.
pub fn apply_filter(
    mode: FilterMode,
    opportunity: &Opportunity,
    lenders: &[LenderAccount],
) -> Result<Vec<LenderAccount>, DataShapeError> {
    let wanted = match mode {
        FilterMode::All => return Ok(lenders.to_vec()),
        FilterMode::ApiLenders => return Ok(Vec::new()),
        FilterMode::Qualified => true,
        FilterMode::NotQualified => false,
    };

    let mut visible = Vec::new();
    for lender in lenders {
        if is_qualified(opportunity, lender)? == wanted {
            visible.push(lender.clone());
        }
    }
    Ok(visible)
}
