use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToastStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ToastStatus {
    /// Completed and failed toasts never change status again and are eligible for auto-removal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToastStatus::Completed | ToastStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            ToastStatus::Pending => 0,
            ToastStatus::Processing => 1,
            ToastStatus::Completed | ToastStatus::Failed => 2,
        }
    }

    /// Transitions are monotonic: pending → processing → {completed | failed}.
    /// Re-asserting the current status is allowed; leaving a terminal status is not.
    pub fn can_transition_to(&self, next: ToastStatus) -> bool {
        if *self == next {
            return true;
        }
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl Display for ToastStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ToastStatus::Pending => write!(f, "pending"),
            ToastStatus::Processing => write!(f, "processing"),
            ToastStatus::Completed => write!(f, "completed"),
            ToastStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ToastStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ToastStatus::Pending),
            "processing" => Ok(ToastStatus::Processing),
            "completed" => Ok(ToastStatus::Completed),
            "failed" => Ok(ToastStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid toast status: {}", s)),
        }
    }
}

/// An upload-status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    /// Opaque random token.
    pub id: String,
    pub message: String,
    pub status: ToastStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Partial update merged into an existing toast. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToastUpdate {
    pub message: Option<String>,
    pub status: Option<ToastStatus>,
    pub filename: Option<String>,
}

impl ToastUpdate {
    pub fn status(status: ToastStatus, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            status: Some(status),
            filename: None,
        }
    }
}
