use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    #[serde(alias = "tag_name")]
    pub version: String,
    #[serde(alias = "commit")]
    pub tag: String,
    #[serde(default = "unknown_author")]
    pub author: String,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub download_links: Option<Vec<String>>,
}

fn unknown_author() -> String {
    "unknown".to_string()
}

impl ReleaseInfo {
    /// A payload is usable only when it names both a version and a tag.
    pub fn is_complete(&self) -> bool {
        !self.version.trim().is_empty() && !self.tag.trim().is_empty()
    }
}

/// The output file on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReport {
    pub repository: String,
    pub latest_release: ReleaseInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    StepBudgetExhausted,
    MaxRetriesExceeded,
    ExtractionDecodeError,
    Cancelled,
    ProviderQuota,
    ProviderError,
    BrowserError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::StepBudgetExhausted => "step-budget-exhausted",
            FailureReason::MaxRetriesExceeded => "max-retries-exceeded",
            FailureReason::ExtractionDecodeError => "extraction-decode-error",
            FailureReason::Cancelled => "cancelled",
            FailureReason::ProviderQuota => "provider-quota",
            FailureReason::ProviderError => "provider-error",
            FailureReason::BrowserError => "browser-error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub reason: FailureReason,
    pub detail: Option<String>,
    pub steps: u32,
}

/// Terminal value of one run. Untagged so success is exactly the report schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NavigationResult {
    Succeeded(ReleaseReport),
    Failed(FailureReport),
}

impl NavigationResult {
    pub fn failed(reason: FailureReason, detail: Option<String>, steps: u32) -> Self {
        Self::Failed(FailureReport {
            reason,
            detail,
            steps,
        })
    }

    /// Report for a run that never reached its first step.
    pub fn setup_failure(reason: FailureReason, detail: impl std::fmt::Display) -> Self {
        Self::failed(reason, Some(format!("{detail:#}")), 0)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Succeeded(_))
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            NavigationResult::Failed(report) => Some(report.reason),
            NavigationResult::Succeeded(_) => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize navigation result")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReleaseReport {
        ReleaseReport {
            repository: "openclaw/openclaw".into(),
            latest_release: ReleaseInfo {
                version: "v2026.1.29".into(),
                tag: "77e703c".into(),
                author: "steipete".into(),
                release_notes: None,
                publish_date: Some("2026-01-29".into()),
                download_links: None,
            },
        }
    }

    #[test]
    fn succeeded_round_trips_through_json() {
        let result = NavigationResult::Succeeded(sample());
        let json = result.to_json().unwrap();
        let parsed: NavigationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["latest_release"]["tag"], "77e703c");
        assert!(value["latest_release"]["release_notes"].is_null());
    }

    #[test]
    fn failure_serializes_reason_string() {
        let result = NavigationResult::failed(FailureReason::StepBudgetExhausted, None, 3);
        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(value["reason"], "step-budget-exhausted");
        assert_eq!(value["steps"], 3);

        let parsed: NavigationResult = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.failure_reason(), Some(FailureReason::StepBudgetExhausted));
    }

    #[test]
    fn release_info_accepts_alternate_field_names() {
        let info: ReleaseInfo =
            serde_json::from_str(r#"{"tag_name": "v1.2.0", "commit": "abc1234"}"#).unwrap();
        assert_eq!(info.version, "v1.2.0");
        assert_eq!(info.tag, "abc1234");
        assert_eq!(info.author, "unknown");
        assert!(info.is_complete());
    }

    #[test]
    fn setup_failure_is_written_with_zero_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        let missing = anyhow::anyhow!("GEMINI_API_KEY is not set");
        NavigationResult::setup_failure(FailureReason::ProviderError, &missing)
            .write_to(&path)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["reason"], "provider-error");
        assert_eq!(value["detail"], "GEMINI_API_KEY is not set");
        assert_eq!(value["steps"], 0);
    }

    #[test]
    fn write_to_creates_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        NavigationResult::Succeeded(sample()).write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"repository\": \"openclaw/openclaw\""));
    }
}
