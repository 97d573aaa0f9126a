//! Background deadline timer for a mission instance.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::service::MissionService;

/// Tokio task ticking one instance until it is terminal.
///
/// Dropping the timer aborts the task.
pub struct MissionTimer {
    mission_id: String,
    handle: JoinHandle<()>,
}

impl MissionTimer {
    /// Start ticking `mission_id` every `period`.
    pub fn spawn(service: Arc<MissionService>, mission_id: String, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let id = mission_id.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match service.tick(&id) {
                    Ok(outcome) if outcome.status.is_terminal() => {
                        debug!(mission_id = %id, status = %outcome.status, "mission timer stopped");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(mission_id = %id, "mission timer error: {err}");
                        break;
                    }
                }
            }
        });
        Self { mission_id, handle }
    }

    /// Instance this timer drives.
    pub fn mission_id(&self) -> &str {
        &self.mission_id
    }

    /// Stop the timer.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has ended, by itself or through [`cancel`](Self::cancel).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end.
    pub async fn finished(&mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for MissionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        content::ContentRegistry,
        mission::{EngineSettings, FailureReason, MissionEngine, MissionStatus},
    };
    use chrono::Utc;

    fn service() -> (Arc<MissionService>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = MissionEngine::new(
            ContentRegistry::builtin(),
            clock.clone(),
            EngineSettings::default(),
        );
        let service = MissionService::new(Arc::new(engine), chrono::Duration::minutes(120));
        (Arc::new(service), clock)
    }

    fn start(service: &MissionService) -> String {
        let team = service.register_team("Clockwork").unwrap();
        let session = service.open_session(&team.id).unwrap();
        service
            .start_mission(&session.id, "BIOMETRIC_BLUFF", "infiltrator")
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn timer_fails_overdue_mission_and_stops() {
        let (service, clock) = service();
        let mission_id = start(&service);
        clock.advance_secs(1680);

        let mut timer = MissionTimer::spawn(service.clone(), mission_id.clone(), Duration::from_millis(5));
        time::timeout(Duration::from_secs(2), timer.finished())
            .await
            .expect("timer should stop once the mission fails");

        let mission = service.mission(&mission_id).unwrap();
        assert_eq!(mission.status, MissionStatus::Failed);
        assert_eq!(
            mission.outcome.unwrap().reason,
            Some(FailureReason::TimeExpired)
        );
        assert!(mission.settled);
    }

    #[tokio::test]
    async fn cancel_stops_ticking() {
        let (service, _) = service();
        let mission_id = start(&service);

        let mut timer = MissionTimer::spawn(service.clone(), mission_id.clone(), Duration::from_millis(5));
        timer.cancel();
        time::timeout(Duration::from_secs(2), timer.finished())
            .await
            .expect("cancelled timer should end");
        assert!(timer.is_finished());
        assert!(service.mission(&mission_id).unwrap().is_active());
    }
}
