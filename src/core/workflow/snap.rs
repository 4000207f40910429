use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::render;
use super::{Engine, IncomingMessage, Reply, WorkflowError, WorkflowResult};
use crate::core::config::Target;
use crate::core::notify::AttachmentRef;
use crate::core::scheduler::action;
use crate::core::store::types::MomentSource;

/// Open snap challenges, one deadline per user. Lives only as long as the
/// process.
#[derive(Default)]
pub struct SnapBoard {
    deadlines: Mutex<HashMap<u64, DateTime<Utc>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapCheck {
    NoChallenge,
    /// The window closed; the entry has been dropped.
    Expired,
    Open(DateTime<Utc>),
}

impl SnapBoard {
    pub fn open(&self, user_id: u64, deadline: DateTime<Utc>) {
        if let Ok(mut map) = self.deadlines.lock() {
            map.insert(user_id, deadline);
        }
    }

    pub fn check(&self, user_id: u64, now: DateTime<Utc>) -> SnapCheck {
        let Ok(mut map) = self.deadlines.lock() else {
            return SnapCheck::NoChallenge;
        };
        match map.get(&user_id).copied() {
            None => SnapCheck::NoChallenge,
            Some(deadline) if now > deadline => {
                map.remove(&user_id);
                SnapCheck::Expired
            }
            Some(deadline) => SnapCheck::Open(deadline),
        }
    }

    /// Remove the entry if it is still there. Only one caller wins.
    pub fn consume(&self, user_id: u64) -> bool {
        self.deadlines
            .lock()
            .map(|mut map| map.remove(&user_id).is_some())
            .unwrap_or(false)
    }
}

/// Pick `count` distinct random seconds inside `start_hour..end_hour` of the
/// local day containing `now`, keeping only instants still in the future.
pub fn plan_snaps<R: Rng>(
    now: DateTime<Utc>,
    tz: Tz,
    start_hour: u32,
    end_hour: u32,
    count: usize,
    rng: &mut R,
) -> Vec<DateTime<Utc>> {
    let date = now.with_timezone(&tz).date_naive();
    let local_instant = |hour: u32| {
        let naive = if hour >= 24 {
            date.succ_opt()?.and_time(NaiveTime::MIN)
        } else {
            date.and_hms_opt(hour, 0, 0)?
        };
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    };
    let (Some(start), Some(end)) = (local_instant(start_hour), local_instant(end_hour)) else {
        return Vec::new();
    };
    if now >= end {
        return Vec::new();
    }
    let span = (end - start).num_seconds();
    if span <= 0 {
        return Vec::new();
    }
    let count = count.min(span as usize);
    let mut offsets: Vec<usize> = rand::seq::index::sample(rng, span as usize, count).into_vec();
    offsets.sort_unstable();
    offsets
        .into_iter()
        .map(|s| start + Duration::seconds(s as i64))
        .filter(|t| *t > now)
        .collect()
}

impl Engine {
    /// Schedule today's snap pings for every configured player.
    pub async fn plan_today(self: &Arc<Self>) -> anyhow::Result<usize> {
        let now = self.now();
        let s = &self.config.schedule;
        let mut scheduled = 0;
        for player in self.config.players.iter().filter(|p| p.id != 0) {
            let times = plan_snaps(
                now,
                player.tz,
                s.snap_window_start,
                s.snap_window_end,
                s.snaps_per_day,
                &mut rand::thread_rng(),
            );
            for at in times {
                let engine = Arc::clone(self);
                let user_id = player.id;
                self.scheduler
                    .schedule_once(
                        &format!("snap-{}", user_id),
                        at.with_timezone(&player.tz),
                        action(move || {
                            let engine = Arc::clone(&engine);
                            async move { engine.trigger_snap(user_id).await }
                        }),
                    )
                    .await?;
                scheduled += 1;
            }
        }
        info!("[snap] Planned {} challenges for today", scheduled);
        Ok(scheduled)
    }

    /// Open a challenge window and ping the user.
    pub async fn trigger_snap(&self, user_id: u64) -> anyhow::Result<()> {
        let minutes = self.config.schedule.snap_window_minutes;
        let channel = self.channel(Target::Moments)?;
        self.snaps
            .open(user_id, self.now() + Duration::minutes(minutes));
        self.notifier
            .post(channel, render::snap_ping(user_id, minutes))
            .await?;
        info!("[snap] Challenge open for {}", user_id);
        Ok(())
    }

    /// `!snap <caption>` with a photo, inside an open window.
    pub async fn snap_submit(&self, msg: &IncomingMessage, caption: &str) -> WorkflowResult<Reply> {
        let now = self.now();
        let deadline = match self.snaps.check(msg.author_id, now) {
            SnapCheck::NoChallenge => {
                return Ok(Reply::say(
                    "❌ You haven't been challenged right now! Use `!log` to save a memory anytime.",
                ));
            }
            SnapCheck::Expired => {
                return Ok(Reply::say(
                    "⏰ **Too late!** The window closed. Use `!log` to save it anyway.",
                ));
            }
            SnapCheck::Open(deadline) => deadline,
        };
        if msg.attachments.is_empty() {
            return Ok(Reply::say("❌ You forgot the photo! Try again with an image attached."));
        }
        if !self.snaps.consume(msg.author_id) {
            return Err(WorkflowError::Conflict);
        }
        let reward = self.config.rewards.snap;
        let stamp = self.home_now().format("%Y-%m-%d %H:%M:%S").to_string();
        let saved = self
            .store
            .add_moment(
                msg.author_id,
                caption,
                AttachmentRef(msg.handle),
                &stamp,
                MomentSource::Snap,
                reward,
            )
            .await;
        if let Err(e) = saved {
            // Keep the window open so the user can retry.
            self.snaps.open(msg.author_id, deadline);
            return Err(e.into());
        }
        info!("[snap] {} completed a challenge", msg.author_id);
        Ok(Reply::Say(render::moment_saved(MomentSource::Snap, caption, reward)))
    }

    /// `!log <caption>` with a photo, any time.
    pub async fn log_moment(&self, msg: &IncomingMessage, caption: &str) -> WorkflowResult<Reply> {
        if msg.attachments.is_empty() {
            return Err(WorkflowError::Invalid("❌ Attach a photo to log a moment.".into()));
        }
        let reward = self.config.rewards.log;
        let stamp = self.home_now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.store
            .add_moment(
                msg.author_id,
                caption,
                AttachmentRef(msg.handle),
                &stamp,
                MomentSource::Log,
                reward,
            )
            .await?;
        Ok(Reply::Say(render::moment_saved(MomentSource::Log, caption, reward)))
    }

    pub async fn flashback(&self) -> WorkflowResult<Reply> {
        let Some(moment) = self.store.random_moment().await? else {
            return Ok(Reply::say("📭 No moments yet. Use `!log` to save one!"));
        };
        let url = match moment.attachment {
            Some(a) => self.notifier.attachment_url(a).await.ok(),
            None => None,
        };
        Ok(Reply::Say(render::flashback(&moment, url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn plans_three_distinct_in_window_instants() {
        let tz = chrono_tz::Asia::Kuala_Lumpur;
        // 00:00 UTC is 08:00 in Kuala Lumpur, before the window opens.
        let now = at("2026-03-02T00:00:00Z");
        let mut rng = StdRng::seed_from_u64(42);
        let times = plan_snaps(now, tz, 10, 22, 3, &mut rng);
        assert_eq!(times.len(), 3);
        for t in &times {
            let local = t.with_timezone(&tz);
            assert!(local.format("%H").to_string().parse::<u32>().unwrap() >= 10);
            assert!(local.format("%H").to_string().parse::<u32>().unwrap() < 22);
            assert_eq!(local.date_naive(), now.with_timezone(&tz).date_naive());
        }
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn skips_player_whose_window_ended() {
        let tz = chrono_tz::Asia::Kuala_Lumpur;
        // 15:00 UTC is 23:00 local.
        let now = at("2026-03-02T15:00:00Z");
        let mut rng = StdRng::seed_from_u64(1);
        assert!(plan_snaps(now, tz, 10, 22, 3, &mut rng).is_empty());
    }

    #[test]
    fn only_future_instants_are_kept() {
        let tz = chrono_tz::UTC;
        let now = at("2026-03-02T21:59:00Z");
        let mut rng = StdRng::seed_from_u64(3);
        for t in plan_snaps(now, tz, 10, 22, 3, &mut rng) {
            assert!(t > now);
        }
    }

    #[test]
    fn board_expires_lazily_and_consumes_once() {
        let board = SnapBoard::default();
        let now = at("2026-03-02T12:00:00Z");
        board.open(5, now + Duration::minutes(15));
        assert_eq!(board.check(5, now), SnapCheck::Open(now + Duration::minutes(15)));
        assert_eq!(board.check(5, now + Duration::minutes(15)), SnapCheck::Open(now + Duration::minutes(15)));
        assert_eq!(board.check(5, now + Duration::minutes(16)), SnapCheck::Expired);
        assert_eq!(board.check(5, now), SnapCheck::NoChallenge);

        board.open(6, now + Duration::minutes(15));
        assert!(board.consume(6));
        assert!(!board.consume(6));
    }
}
