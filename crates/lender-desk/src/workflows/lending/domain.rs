use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier wrapper for opportunity records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpportunityId(pub String);

/// Identifier wrapper for lender account records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LenderId(pub String);

/// Identifier wrapper for uploaded supporting documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

/// Identifier for any record targeted by an inline grid edit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

display_id!(OpportunityId, LenderId, FileId, RecordId);

impl From<&FileId> for RecordId {
    fn from(value: &FileId) -> Self {
        RecordId(value.0.clone())
    }
}

/// Loan application record evaluated against lender thresholds.
///
/// Financial attributes are optional because the record store does not
/// guarantee them; the eligibility filter refuses to guess when they are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub name: String,
    #[serde(default)]
    pub credit_score: Option<u16>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub industry: Option<String>,
    pub stage: OpportunityStage,
}

impl Opportunity {
    pub fn record_link(&self) -> String {
        record_link("Opportunity", &self.id.0)
    }
}

/// Financial institution with published eligibility thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LenderAccount {
    pub id: LenderId,
    pub name: String,
    #[serde(default)]
    pub minimum_credit_score: Option<u16>,
    #[serde(default)]
    pub minimum_monthly_deposit: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_industries")]
    pub restricted_industries: BTreeSet<String>,
    #[serde(default)]
    pub record_type: Option<String>,
}

impl LenderAccount {
    pub fn record_link(&self) -> String {
        record_link("Account", &self.id.0)
    }

    /// Case-insensitive membership test against the restricted industry list.
    pub fn restricts(&self, industry: &str) -> bool {
        let needle = industry.trim();
        self.restricted_industries
            .iter()
            .any(|restricted| restricted.eq_ignore_ascii_case(needle))
    }
}

/// Split a multi-select picklist value (`"Gambling;Cannabis"`) into a set.
pub fn parse_industry_list(raw: &str) -> BTreeSet<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndustryField {
    Picklist(String),
    List(Vec<String>),
}

fn deserialize_industries<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndustryField>::deserialize(deserializer)?;
    Ok(match raw {
        Some(IndustryField::Picklist(value)) => parse_industry_list(&value),
        Some(IndustryField::List(values)) => values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect(),
        None => BTreeSet::new(),
    })
}

/// Pipeline stage of an opportunity, serialized as its display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OpportunityStage {
    Prospecting,
    Qualification,
    NeedsAnalysis,
    Proposal,
    Negotiation,
    Underwriting,
    ClosedWon,
    ClosedLost,
    Custom(String),
}

impl OpportunityStage {
    pub fn label(&self) -> &str {
        match self {
            OpportunityStage::Prospecting => "Prospecting",
            OpportunityStage::Qualification => "Qualification",
            OpportunityStage::NeedsAnalysis => "Needs Analysis",
            OpportunityStage::Proposal => "Proposal",
            OpportunityStage::Negotiation => "Negotiation",
            OpportunityStage::Underwriting => "Underwriting",
            OpportunityStage::ClosedWon => "Closed Won",
            OpportunityStage::ClosedLost => "Closed Lost",
            OpportunityStage::Custom(label) => label,
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw.trim() {
            "Prospecting" => OpportunityStage::Prospecting,
            "Qualification" => OpportunityStage::Qualification,
            "Needs Analysis" => OpportunityStage::NeedsAnalysis,
            "Proposal" => OpportunityStage::Proposal,
            "Negotiation" => OpportunityStage::Negotiation,
            "Underwriting" => OpportunityStage::Underwriting,
            "Closed Won" => OpportunityStage::ClosedWon,
            "Closed Lost" => OpportunityStage::ClosedLost,
            other => OpportunityStage::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for OpportunityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for OpportunityStage {
    fn from(value: String) -> Self {
        OpportunityStage::from_label(&value)
    }
}

impl From<OpportunityStage> for String {
    fn from(value: OpportunityStage) -> Self {
        value.label().to_string()
    }
}

/// Supporting document attached to an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub document_id: String,
    pub title: String,
    #[serde(default)]
    pub file_type: Option<String>,
    pub content_size: u64,
    #[serde(default)]
    pub submission_note: Option<String>,
}

impl FileRecord {
    pub fn view_url(&self) -> String {
        record_link("ContentDocument", &self.document_id)
    }
}

/// Relative record page URL used by grid link columns.
pub fn record_link(object: &str, id: &str) -> String {
    format!("/lightning/r/{object}/{id}/view")
}
