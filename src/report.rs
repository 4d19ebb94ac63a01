use crate::config::ClientConfig;
use serde::{Deserialize, Serialize};

/// Answer of the report-status endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatus {
    #[serde(default)]
    pub report_generated: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Download path, relative to the API root. Absent when the report file is missing.
    #[serde(default)]
    pub file_url: Option<String>,
}

impl ReportStatus {
    /// Whether the report can be downloaded right now.
    pub fn is_ready(&self) -> bool {
        self.report_generated && self.file_url.is_some()
    }

    /// Absolute download URL, resolved against the API root.
    pub fn download_url(&self, config: &ClientConfig) -> Option<String> {
        let url = self.file_url.as_deref()?;
        if url.starts_with("http://") || url.starts_with("https://") {
            Some(url.to_string())
        } else {
            Some(config.endpoint(url))
        }
    }
}

pub fn report_download_url(config: &ClientConfig, session_id: &str) -> String {
    config.endpoint(&format!("/get-report/{}", session_id))
}

pub fn report_preview_url(config: &ClientConfig, session_id: &str) -> String {
    config.endpoint(&format!("/preview-report/{}", session_id))
}
