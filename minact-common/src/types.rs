//! Closed workflow vocabularies
//!
//! Task status is a closed set: every transition handler matches on the
//! variant, and unknown status strings coming in through the API are
//! rejected before any mutation happens.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Capture Inbox")]
    CaptureInbox,
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "Manager Approval Pending")]
    ManagerApprovalPending,
    #[serde(rename = "Doing")]
    Doing,
    #[serde(rename = "Planned for Tomorrow")]
    PlannedForTomorrow,
    #[serde(rename = "Submitted")]
    Submitted,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::CaptureInbox => "Capture Inbox",
            TaskStatus::ToDo => "To Do",
            TaskStatus::ManagerApprovalPending => "Manager Approval Pending",
            TaskStatus::Doing => "Doing",
            TaskStatus::PlannedForTomorrow => "Planned for Tomorrow",
            TaskStatus::Submitted => "Submitted",
            TaskStatus::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Capture Inbox" => Ok(TaskStatus::CaptureInbox),
            "To Do" => Ok(TaskStatus::ToDo),
            "Manager Approval Pending" => Ok(TaskStatus::ManagerApprovalPending),
            "Doing" => Ok(TaskStatus::Doing),
            "Planned for Tomorrow" => Ok(TaskStatus::PlannedForTomorrow),
            "Submitted" => Ok(TaskStatus::Submitted),
            "Done" => Ok(TaskStatus::Done),
            other => Err(Error::InvalidInput(format!("Unknown task status: {}", other))),
        }
    }
}

/// Effort size bucket assigned at extraction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortTag {
    Small,
    Medium,
    Large,
}

impl EffortTag {
    /// Nominal focus hours for the bucket
    pub fn hours(&self) -> i64 {
        match self {
            EffortTag::Small => 1,
            EffortTag::Medium => 3,
            EffortTag::Large => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffortTag::Small => "small",
            EffortTag::Medium => "medium",
            EffortTag::Large => "large",
        }
    }
}

impl fmt::Display for EffortTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffortTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(EffortTag::Small),
            "medium" => Ok(EffortTag::Medium),
            "large" => Ok(EffortTag::Large),
            other => Err(Error::InvalidInput(format!("Unknown effort tag: {}", other))),
        }
    }
}
