use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Status value that marks a container as archived.
pub const STATUS_DUMPED: &str = "Dumped";

/// Status filter value meaning "any status".
pub const STATUS_ALL: &str = "All";

/// Recorded as `updatedBy` on every write until real users exist.
pub const SYSTEM_USER: &str = "System";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub status: String,
    pub location: String,
    pub contents: Option<String>,
    pub assigned_to: Option<String>,
    pub date_dropped: Option<NaiveDate>,
    pub date_dumped: Option<NaiveDate>,
    pub weight: Option<Decimal>,
    pub last_updated: DateTime<Utc>,
    pub updated_by: String,
}

impl Container {
    pub fn is_archived(&self) -> bool {
        self.status == STATUS_DUMPED
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContainerRequest {
    #[validate(length(min = 1, max = 50))]
    pub id: String,
    #[validate(length(min = 1, max = 50))]
    pub status: String,
    #[validate(length(min = 1))]
    pub location: String,
    pub contents: Option<String>,
    pub assigned_to: Option<String>,
    pub date_dropped: Option<NaiveDate>,
    pub date_dumped: Option<NaiveDate>,
    pub weight: Option<Decimal>,
}

impl CreateContainerRequest {
    /// Builds the stored record, stamping the system-owned fields.
    pub fn into_container(self, now: DateTime<Utc>) -> Container {
        Container {
            id: self.id,
            status: self.status,
            location: self.location,
            contents: self.contents,
            assigned_to: self.assigned_to,
            date_dropped: self.date_dropped,
            date_dumped: self.date_dumped,
            weight: self.weight,
            last_updated: now,
            updated_by: SYSTEM_USER.to_string(),
        }
    }
}

/// Partial update. Absent fields keep their stored values.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContainerRequest {
    #[validate(length(min = 1, max = 50))]
    pub status: Option<String>,
    #[validate(length(min = 1))]
    pub location: Option<String>,
    pub contents: Option<String>,
    pub assigned_to: Option<String>,
    pub date_dropped: Option<NaiveDate>,
    pub date_dumped: Option<NaiveDate>,
    pub weight: Option<Decimal>,
}

impl UpdateContainerRequest {
    pub fn apply_to(self, container: &mut Container) {
        if let Some(status) = self.status {
            container.status = status;
        }
        if let Some(location) = self.location {
            container.location = location;
        }
        if let Some(contents) = self.contents {
            container.contents = Some(contents);
        }
        if let Some(assigned_to) = self.assigned_to {
            container.assigned_to = Some(assigned_to);
        }
        if let Some(date_dropped) = self.date_dropped {
            container.date_dropped = Some(date_dropped);
        }
        if let Some(date_dumped) = self.date_dumped {
            container.date_dumped = Some(date_dumped);
        }
        if let Some(weight) = self.weight {
            container.weight = Some(weight);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteContainerResponse {
    pub message: String,
    pub container: Container,
}

/// Search filters shared by list, archive and search queries.
///
/// Empty strings count as absent, and a status of `"All"` disables the
/// status filter.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContainerFilter {
    pub q: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
}

impl ContainerFilter {
    pub fn archived() -> Self {
        Self {
            status: Some(STATUS_DUMPED.to_string()),
            ..Self::default()
        }
    }

    pub fn query(&self) -> Option<&str> {
        non_empty(self.q.as_deref())
    }

    pub fn status(&self) -> Option<&str> {
        non_empty(self.status.as_deref()).filter(|status| *status != STATUS_ALL)
    }

    pub fn location(&self) -> Option<&str> {
        non_empty(self.location.as_deref())
    }

    pub fn matches(&self, container: &Container) -> bool {
        if let Some(q) = self.query() {
            let q = q.to_lowercase();
            let hit = contains_ignore_case(&container.id, &q)
                || container
                    .contents
                    .as_deref()
                    .is_some_and(|contents| contains_ignore_case(contents, &q))
                || contains_ignore_case(&container.location, &q);
            if !hit {
                return false;
            }
        }

        if let Some(status) = self.status() {
            if container.status != status {
                return false;
            }
        }

        if let Some(location) = self.location() {
            if !contains_ignore_case(&container.location, &location.to_lowercase()) {
                return false;
            }
        }

        true
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `needle` must already be lowercase.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
