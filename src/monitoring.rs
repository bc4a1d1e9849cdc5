//! Daily usage summary posted to a Slack incoming webhook

use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::constants::{BACKGROUND_RETRY_SECS, SUMMARY_COOLDOWN_SECS, SUMMARY_LEAD_SECS};
use crate::schedule;
use crate::store::{DailyStats, LogStore};
use crate::DynError;

pub const SUMMARY_TITLE: &str = "Audio Enhancer Daily Report";

/// Result of one summary attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    Sent,
    SkippedNoWebhook,
    SkippedNoRequests,
    /// Webhook answered with a non-200 status
    Rejected(u16),
}

/// Where and how the summary is delivered
#[derive(Debug, Clone)]
pub struct SummaryReporter {
    http: reqwest::Client,
    store: LogStore,
    webhook_url: Option<String>,
    channel: String,
}

impl SummaryReporter {
    pub fn new(store: LogStore, webhook_url: Option<String>, channel: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
            webhook_url: webhook_url.filter(|url| !url.is_empty()),
            channel,
        }
    }

    pub async fn send_daily_summary(&self) -> Result<SummaryOutcome, DynError> {
        self.send_summary_for_date(Local::now().date_naive()).await
    }

    /// Build the report for `date` and post it
    pub async fn send_summary_for_date(&self, date: NaiveDate) -> Result<SummaryOutcome, DynError> {
        let Some(webhook_url) = self.webhook_url.as_deref() else {
            info!("Slack webhook not configured, skipping daily summary");
            return Ok(SummaryOutcome::SkippedNoWebhook);
        };

        let stats = self.store.stats_for_date(date).await;
        if stats.total == 0 {
            info!("No requests on {}, skipping daily summary", date);
            return Ok(SummaryOutcome::SkippedNoRequests);
        }

        let hours = self.store.hourly_counts(date).await?;
        let payload = build_summary_payload(&stats, peak_hour(&hours), &self.channel);

        let response = self.http.post(webhook_url).json(&payload).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::OK {
            info!("Daily summary sent: {} enhancements", stats.total);
            Ok(SummaryOutcome::Sent)
        } else {
            warn!("Daily summary failed: {}", status.as_u16());
            Ok(SummaryOutcome::Rejected(status.as_u16()))
        }
    }
}

/// Busiest hour and its request count; the earliest hour wins ties, (0, 0) when empty
pub fn peak_hour(hours: &[u32; 24]) -> (u32, u32) {
    let mut peak = (0, 0);
    for (hour, count) in hours.iter().enumerate() {
        if *count > peak.1 {
            peak = (hour as u32, *count);
        }
    }
    peak
}

/// Markdown body of the report
pub fn format_summary_text(stats: &DailyStats, peak: (u32, u32)) -> String {
    let presets_text = if stats.presets.is_empty() {
        "  No preset data".to_string()
    } else {
        stats
            .presets
            .iter()
            .map(|(preset, count)| format!("  • {}: {}", preset, count))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "*{title}*\n\n\
         *Summary:*\n\
         • Total requests: *{total}*\n\
         • Successful: {successful} ({rate}%)\n\
         • Failed: {failed}\n\n\
         *Statistics:*\n\
         • Audio minutes processed: *{minutes} min*\n\
         • Avg. processing time: {avg}s\n\
         • Total size: {size} MB\n\
         • Peak hour: {hour:02}:00 ({peak_count} requests)\n\n\
         *Presets used:*\n\
         {presets_text}",
        title = SUMMARY_TITLE,
        total = stats.total,
        successful = stats.successful,
        rate = stats.success_rate(),
        failed = stats.failed,
        minutes = stats.total_audio_minutes,
        avg = stats.avg_processing_seconds,
        size = stats.total_size_mb,
        hour = peak.0,
        peak_count = peak.1,
        presets_text = presets_text,
    )
}

pub fn build_summary_payload(stats: &DailyStats, peak: (u32, u32), channel: &str) -> Value {
    json!({
        "text": SUMMARY_TITLE,
        "channel": channel,
        "blocks": [
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format_summary_text(stats, peak),
                }
            }
        ]
    })
}

/// Post the summary at 23:50 local time every day until cancelled
pub async fn run_summary_loop(reporter: SummaryReporter, cancel: CancellationToken) {
    info!("Daily summary reporter started");

    loop {
        let mut until_midnight = schedule::seconds_until_midnight(Local::now().naive_local());
        if until_midnight <= SUMMARY_LEAD_SECS {
            // Too close to midnight for today's slot; wait for the next day
            let wait = Duration::from_secs(until_midnight + 10);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            until_midnight = schedule::seconds_until_midnight(Local::now().naive_local());
        }

        let wait = Duration::from_secs(until_midnight.saturating_sub(SUMMARY_LEAD_SECS));
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let pause = match reporter.send_daily_summary().await {
            Ok(_) => Duration::from_secs(SUMMARY_COOLDOWN_SECS),
            Err(e) => {
                error!("Daily summary error: {}", e);
                Duration::from_secs(BACKGROUND_RETRY_SECS)
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    info!("Daily summary reporter stopped");
}
