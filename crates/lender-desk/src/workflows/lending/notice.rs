use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::OpportunityId;

/// Visual treatment of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Success,
    Error,
    Warning,
    Info,
}

/// How long a notice stays on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeMode {
    #[default]
    Dismissible,
    Pester,
    Sticky,
}

/// Toast-style message surfaced after a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub variant: NoticeVariant,
    #[serde(default)]
    pub mode: NoticeMode,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            title: "Success".to_string(),
            message: message.into(),
            variant: NoticeVariant::Success,
            mode: NoticeMode::Dismissible,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            message: message.into(),
            variant: NoticeVariant::Error,
            mode: NoticeMode::Dismissible,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            variant: NoticeVariant::Warning,
            mode: NoticeMode::Dismissible,
        }
    }

    pub fn with_mode(mut self, mode: NoticeMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Destination handed to the navigation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationTarget {
    RecordPage {
        record_id: String,
        object_api_name: String,
        action: String,
    },
    NamedPage {
        api_name: String,
        state: BTreeMap<String, String>,
    },
}

impl NavigationTarget {
    /// View page of the opportunity the workflow was opened from.
    pub fn opportunity_view(id: &OpportunityId) -> Self {
        NavigationTarget::RecordPage {
            record_id: id.0.clone(),
            object_api_name: "Opportunity".to_string(),
            action: "view".to_string(),
        }
    }

    /// Workflow page for an opportunity; `cache_buster` keeps repeated launches distinct.
    pub fn submission_page(api_name: &str, id: &OpportunityId, cache_buster: i64) -> Self {
        let mut state = BTreeMap::new();
        state.insert("c__recordId".to_string(), id.0.clone());
        state.insert("c__t".to_string(), cache_buster.to_string());
        NavigationTarget::NamedPage {
            api_name: api_name.to_string(),
            state,
        }
    }

    /// Opportunity id carried in a named page's state, if any.
    pub fn opportunity_id(&self) -> Option<OpportunityId> {
        match self {
            NavigationTarget::RecordPage { record_id, .. } => {
                Some(OpportunityId(record_id.clone()))
            }
            NavigationTarget::NamedPage { state, .. } => state
                .get("c__recordId")
                .map(|value| OpportunityId(value.clone())),
        }
    }
}
