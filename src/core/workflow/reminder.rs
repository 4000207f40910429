use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tracing::info;

use super::render::{self, mention};
use super::{Engine, IncomingMessage, Reply, WorkflowError, WorkflowResult};
use crate::core::scheduler::action;

/// Minutes before the event at which an alert goes out.
pub const ALERT_OFFSETS: [i64; 5] = [60, 45, 30, 15, 0];

/// Alerts still ahead of `now`, as `(minutes_before, fire_at)`.
pub fn alert_times(event: DateTime<Utc>, now: DateTime<Utc>) -> Vec<(i64, DateTime<Utc>)> {
    ALERT_OFFSETS
        .iter()
        .map(|m| (*m, event - Duration::minutes(*m)))
        .filter(|(_, at)| *at > now)
        .collect()
}

impl Engine {
    /// `!remind` (author only) and `!ping` (everyone).
    pub async fn set_reminder(
        self: &Arc<Self>,
        msg: &IncomingMessage,
        request: &str,
        everyone: bool,
    ) -> WorkflowResult<Reply> {
        let request = request.trim();
        if request.is_empty() {
            let usage = if everyone {
                "Usage: `!ping <what and when>`"
            } else {
                "Usage: `!remind <what and when>`"
            };
            return Err(WorkflowError::Invalid(usage.into()));
        }
        let tz = self.config.home_tz;
        let now = self.now();
        let naive = self
            .text
            .event_time(request, now.with_timezone(&tz).naive_local())
            .await
            .ok_or(WorkflowError::TimeParse)?;
        let event = tz
            .from_local_datetime(&naive)
            .earliest()
            .ok_or(WorkflowError::TimeParse)?;
        if event.with_timezone(&Utc) <= now {
            return Err(WorkflowError::PastTime);
        }

        let who = if everyone {
            "@everyone".to_string()
        } else {
            mention(msg.author_id)
        };
        let channel_id = msg.handle.channel_id;
        let alerts = alert_times(event.with_timezone(&Utc), now);
        for (minutes, at) in &alerts {
            let engine = Arc::clone(self);
            let who = who.clone();
            let task = request.to_string();
            let minutes = *minutes;
            self.scheduler
                .schedule_once(
                    &format!("reminder-{}m", minutes),
                    at.with_timezone(&tz),
                    action(move || {
                        let engine = Arc::clone(&engine);
                        let message = render::reminder_alert(&who, &task, minutes);
                        async move {
                            engine.notifier.post(channel_id, message).await?;
                            Ok(())
                        }
                    }),
                )
                .await?;
        }
        info!(
            "[reminder] {} alerts for '{}' at {}",
            alerts.len(),
            request,
            event
        );
        Ok(Reply::Say(render::reminder_set(request, event, alerts.len())))
    }
}
