use hubtable::github::{GitHubRateLimitResponse, RateLimitResource};

use crate::commands::shared::build_client;
use crate::config::Config;
use crate::output::{OutputFormat, print_records};

/// Handle the `limits` command.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    // The request does not count against any bucket, so skip pacing.
    let client = build_client(config, true)?;
    let response: GitHubRateLimitResponse = client.get_json(&["rate_limit"]).await?;

    let now = chrono::Utc::now();
    let items = response
        .resources
        .iter()
        .map(|(name, resource)| RateLimitDisplay::from_resource(name, resource, now))
        .collect();
    print_records::<RateLimitDisplay>(items, output)?;
    Ok(())
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Limit")]
    pub limit: usize,
    #[tabled(rename = "Used")]
    pub used: usize,
    #[tabled(rename = "Remaining")]
    pub remaining: usize,
    #[tabled(rename = "Usage %")]
    pub usage_percent: String,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    fn from_resource(
        name: &str,
        resource: &RateLimitResource,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let usage_percent = if resource.limit > 0 {
            (resource.used as f64 / resource.limit as f64) * 100.0
        } else {
            0.0
        };
        let reset_at = resource.reset_at();
        let until_reset = reset_at.signed_duration_since(now);
        let reset_in = if until_reset.num_seconds() > 0 {
            format_duration(until_reset)
        } else {
            "now".to_string()
        };

        Self {
            resource: name.to_string(),
            limit: resource.limit,
            used: resource.used,
            remaining: resource.remaining,
            usage_percent: format!("{:.1}%", usage_percent),
            reset_at: reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds();
    if total_secs < 60 {
        return format!("{}s", total_secs);
    }
    if total_secs < 3600 {
        return match (total_secs / 60, total_secs % 60) {
            (mins, 0) => format!("{}m", mins),
            (mins, secs) => format!("{}m {}s", mins, secs),
        };
    }
    match (total_secs / 3600, (total_secs % 3600) / 60) {
        (hours, 0) => format!("{}h", hours),
        (hours, mins) => format!("{}h {}m", hours, mins),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};

    use super::*;

    fn resource(limit: usize, used: usize, reset: u64) -> RateLimitResource {
        RateLimitResource {
            limit,
            used,
            remaining: limit - used,
            reset,
        }
    }

    #[test]
    fn format_duration_handles_seconds_minutes_and_hours() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(120)), "2m");
        assert_eq!(format_duration(Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(Duration::seconds(3600)), "1h");
        assert_eq!(format_duration(Duration::seconds(3900)), "1h 5m");
    }

    #[test]
    fn display_formats_percent_and_reset() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let display = RateLimitDisplay::from_resource("graphql", &resource(5000, 1250, 1_700_000_600), now);

        assert_eq!(display.resource, "graphql");
        assert_eq!(display.remaining, 3750);
        assert_eq!(display.usage_percent, "25.0%");
        assert_eq!(display.reset_at, "2023-11-14 22:23:20 UTC");
        assert_eq!(display.reset_in, "10m");
    }

    #[test]
    fn display_handles_zero_limit_and_past_reset() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let display = RateLimitDisplay::from_resource("scim", &resource(0, 0, 1_600_000_000), now);

        assert_eq!(display.usage_percent, "0.0%");
        assert_eq!(display.reset_in, "now");
    }
}
