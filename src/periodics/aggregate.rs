use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::classifier::JobIdentity;

pub const DEFAULT_SUCCESS_MARKER: &str = "success";
const FAILURE_STATE: &str = "failure";

/// Shown in place of a result link when the run reported none.
pub const UNAVAILABLE_URL: &str = "N/A";

/// Final state of a run. Successes keep the raw state they matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success(String),
    Failure,
    Other(String),
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl RunStatus {
    /// Maps a raw state string. Anything starting with `success_marker`
    /// counts as a success.
    pub fn from_state(state: &str, success_marker: &str) -> Self {
        if state.starts_with(success_marker) {
            Self::Success(state.to_owned())
        } else if state == FAILURE_STATE {
            Self::Failure
        } else {
            Self::Other(state.to_owned())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Success(raw) | Self::Other(raw) => raw,
            Self::Failure => FAILURE_STATE,
        }
    }

    /// Chat emoji name shown next to the label, if any.
    pub fn icon(&self) -> Option<&'static str> {
        match self {
            Self::Success(_) => Some("solid-success"),
            Self::Failure => Some("failed"),
            Self::Other(_) => None,
        }
    }
}

/// Status of a run as published by the artifact store (`prowjob.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// Absent while the run is still in progress
    #[serde(default)]
    pub completion_time: Option<String>,
    pub state: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// One finished run of a periodic job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub id: String,
    pub completed_at: DateTime<Utc>,
    pub url: Option<String>,
    pub status: RunStatus,
}

impl Execution {
    pub fn new(
        run_id: &str,
        completed_at: DateTime<Utc>,
        url: Option<String>,
        status: RunStatus,
    ) -> Self {
        Self {
            id: run_id.replace('/', ""),
            completed_at,
            url,
            status,
        }
    }

    pub fn url_or_placeholder(&self) -> &str {
        self.url.as_deref().unwrap_or(UNAVAILABLE_URL)
    }
}

/// A classified job plus its in-window executions, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct JobAggregate {
    pub identity: JobIdentity,
    pub executions: Vec<Execution>,
}

impl JobAggregate {
    pub fn new(identity: JobIdentity) -> Self {
        Self {
            identity,
            executions: Vec::new(),
        }
    }

    pub fn append(&mut self, execution: Execution) {
        self.executions.push(execution);
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> JobIdentity {
        JobIdentity {
            full_name: "periodic-4.19-kubevirt-aws-periodics-ovn".to_string(),
            platform: Some("aws".to_string()),
            variant: "ovn".to_string(),
            version: "4.19".to_string(),
        }
    }

    #[test]
    fn status_from_state() {
        assert_eq!(
            RunStatus::from_state("success", "success"),
            RunStatus::Success("success".to_string())
        );
        assert_eq!(RunStatus::from_state("failure", "success"), RunStatus::Failure);
        assert_eq!(
            RunStatus::from_state("aborted", "success"),
            RunStatus::Other("aborted".to_string())
        );
    }

    #[test]
    fn success_is_prefix_match() {
        assert!(RunStatus::from_state("success :solid-success:", "success").is_success());
        assert!(!RunStatus::from_state("unsuccessful", "success").is_success());
    }

    #[test]
    fn success_keeps_matched_state() {
        let status = RunStatus::from_state("succeeded", "succ");

        assert!(status.is_success());
        assert_eq!(status.label(), "succeeded");
        assert_eq!(status.icon(), Some("solid-success"));
        assert_eq!(serde_json::to_value(&status).unwrap(), "succeeded");
    }

    #[test]
    fn icons_only_for_known_states() {
        assert_eq!(RunStatus::Success("success".to_string()).icon(), Some("solid-success"));
        assert_eq!(RunStatus::Failure.icon(), Some("failed"));
        assert_eq!(RunStatus::Other("pending".to_string()).icon(), None);
        assert_eq!(RunStatus::Other("pending".to_string()).label(), "pending");
    }

    #[test]
    fn execution_strips_path_separators() {
        let execution = Execution::new("1790001/", Utc::now(), None, RunStatus::Success("success".to_string()));

        assert_eq!(execution.id, "1790001");
    }

    #[test]
    fn missing_url_uses_placeholder() {
        let execution = Execution::new("1", Utc::now(), None, RunStatus::Failure);

        assert_eq!(execution.url_or_placeholder(), "N/A");
    }

    #[test]
    fn aggregate_keeps_append_order_without_dedup() {
        let now = Utc::now();
        let mut aggregate = JobAggregate::new(identity());
        assert!(aggregate.is_empty());

        aggregate.append(Execution::new("2", now, None, RunStatus::Success("success".to_string())));
        aggregate.append(Execution::new("1", now, None, RunStatus::Failure));
        aggregate.append(Execution::new("1", now, None, RunStatus::Failure));

        assert!(!aggregate.is_empty());
        assert_eq!(aggregate.len(), 3);
        let ids: Vec<_> = aggregate.executions.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "1"]);
    }
}
