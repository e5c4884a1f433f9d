//! Wire types of the job tracker backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Application pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    PhoneScreen,
    OnSite,
    Remote,
    Offer,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Applied,
        ApplicationStatus::PhoneScreen,
        ApplicationStatus::OnSite,
        ApplicationStatus::Remote,
        ApplicationStatus::Offer,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    /// Value used on the wire and in query filters.
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::PhoneScreen => "phone_screen",
            ApplicationStatus::OnSite => "on_site",
            ApplicationStatus::Remote => "remote",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::PhoneScreen => "Phone Screen",
            ApplicationStatus::OnSite => "On Site Interview",
            ApplicationStatus::Remote => "Remote Interview",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown status '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// One recorded status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAudit {
    pub id: u64,
    pub previous_status: String,
    pub new_status: String,
    pub changed_at: DateTime<Utc>,
}

/// A job application as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: u64,
    pub company_name: String,
    pub position: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub applied_date: Option<NaiveDate>,
    pub current_status: ApplicationStatus,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    /// Server-computed; never derived client-side.
    #[serde(default)]
    pub needs_followup: bool,
    /// Append-only, in server order.
    #[serde(default)]
    pub audits: Vec<StatusAudit>,
}

impl JobApplication {
    /// The last `n` audit entries, oldest first, exactly as the server sent them.
    pub fn recent_audits(&self, n: usize) -> &[StatusAudit] {
        let start = self.audits.len().saturating_sub(n);
        &self.audits[start..]
    }
}

/// Body of a create call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub company_name: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<NaiveDate>,
    pub current_status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl NewApplication {
    pub fn new(company_name: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            position: position.into(),
            location: String::new(),
            applied_date: None,
            current_status: ApplicationStatus::Applied,
            contact_name: None,
            contact_email: None,
        }
    }
}

/// Body of a partial update. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<ApplicationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl ApplicationPatch {
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            current_status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Pagination envelope. `next` and `previous` are opaque links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Per-status application count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub current_status: ApplicationStatus,
    pub count: u64,
}

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub status_counts: Vec<StatusCount>,
    #[serde(default)]
    pub avg_days: Vec<serde_json::Value>,
}

impl DashboardStats {
    pub fn total(&self) -> u64 {
        self.status_counts.iter().map(|c| c.count).sum()
    }

    pub fn count_for(&self, status: ApplicationStatus) -> u64 {
        self.status_counts
            .iter()
            .filter(|c| c.current_status == status)
            .map(|c| c.count)
            .sum()
    }
}
