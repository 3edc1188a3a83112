//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Organization name used in outreach copy and follow-up templates.
    pub org_name: String,
    /// Path to the prospect list JSON (required input).
    pub prospects_path: PathBuf,
    /// Path to the call transcript JSON (optional input).
    pub transcripts_path: PathBuf,
    /// Path the analytics report is written to.
    pub report_path: PathBuf,
    /// How many ranked leads advance to outreach.
    pub shortlist_size: usize,
    /// How long to wait for a reply per lead before giving up.
    pub reply_timeout: Duration,
    /// Delay between mailbox polls while waiting for a reply.
    pub poll_interval: Duration,
    /// Maximum characters of a reply body kept for downstream stages.
    pub reply_preview_chars: usize,
    /// Duration of booked meetings.
    pub meeting_duration: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            org_name: "LeadFlow".to_string(),
            prospects_path: PathBuf::from("companies.json"),
            transcripts_path: PathBuf::from("call_transcripts.json"),
            report_path: PathBuf::from("summary.txt"),
            shortlist_size: 2,
            reply_timeout: Duration::from_secs(180), // 3 minutes
            poll_interval: Duration::from_secs(10),
            reply_preview_chars: 250,
            meeting_duration: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl PipelineConfig {
    /// Build config from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let org_name =
            std::env::var("LEADFLOW_ORG_NAME").unwrap_or(defaults.org_name);

        let prospects_path = std::env::var("LEADFLOW_PROSPECTS")
            .map(PathBuf::from)
            .unwrap_or(defaults.prospects_path);

        let transcripts_path = std::env::var("LEADFLOW_TRANSCRIPTS")
            .map(PathBuf::from)
            .unwrap_or(defaults.transcripts_path);

        let report_path = std::env::var("LEADFLOW_REPORT")
            .map(PathBuf::from)
            .unwrap_or(defaults.report_path);

        let shortlist_size: usize = std::env::var("LEADFLOW_SHORTLIST_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.shortlist_size);

        let reply_timeout = std::env::var("LEADFLOW_REPLY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.reply_timeout);

        let poll_interval = std::env::var("LEADFLOW_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let meeting_duration = std::env::var("LEADFLOW_MEETING_DURATION_MIN")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or(defaults.meeting_duration);

        Self {
            org_name,
            prospects_path,
            transcripts_path,
            report_path,
            shortlist_size,
            reply_timeout,
            poll_interval,
            reply_preview_chars: defaults.reply_preview_chars,
            meeting_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.shortlist_size, 2);
        assert_eq!(config.reply_timeout, Duration::from_secs(180));
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.reply_preview_chars, 250);
        assert_eq!(config.meeting_duration, Duration::from_secs(3600));
    }

    #[test]
    fn default_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.prospects_path, PathBuf::from("companies.json"));
        assert_eq!(
            config.transcripts_path,
            PathBuf::from("call_transcripts.json")
        );
        assert_eq!(config.report_path, PathBuf::from("summary.txt"));
    }
}
