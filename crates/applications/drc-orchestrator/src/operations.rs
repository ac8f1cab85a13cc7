//! Live operations loop
//!
//! Runs the simulator against wall-clock timers until a deadline or Ctrl-C:
//!
//! ```text
//! TokioScheduler ──events──▶ Simulator::handle_event ──notices──▶ react
//!                                                                   │
//!            AlertRaised ──(auto-accept)──▶ accept_alert ──▶ send_bulk(emergency message)
//!            ReliefMessagingNeeded ──▶ flag crowded hotspots
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use drc_core::SmsGateway;
use drc_simulation_engine::{SimEvent, SimNotice, SimulationConfig, SimulationSummary, Simulator};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
use crate::messaging::{BulkSendResult, emergency_message, send_bulk};
use crate::runtime::TokioScheduler;

type LiveSimulator = Simulator<TokioScheduler<SimEvent>>;

/// Knobs for a live run
#[derive(Debug, Clone, Default)]
pub struct LiveOptions {
    /// Stop after this long (run until Ctrl-C when unset)
    pub duration: Option<Duration>,
    /// Accept disaster alerts without an operator
    pub auto_accept: bool,
    /// Emergency contacts alerted when a response starts
    pub recipients: Vec<String>,
    /// Log a status line at this period
    pub status_every: Option<Duration>,
    /// Write the final dashboard snapshot here
    pub snapshot_path: Option<PathBuf>,
}

/// Outcome of a live run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveReport {
    pub summary: SimulationSummary,
    /// One entry per emergency broadcast, in send order
    pub deliveries: Vec<BulkSendResult>,
}

/// Run the simulation on tokio timers
pub async fn run_live<G>(
    config: SimulationConfig,
    options: LiveOptions,
    gateway: &G,
) -> Result<LiveReport>
where
    G: SmsGateway + ?Sized,
{
    let (scheduler, mut events) = TokioScheduler::new();
    let mut sim = Simulator::new(config, scheduler)?;
    let mut deliveries = Vec::new();
    let mut pending: VecDeque<SimNotice> = sim.start().into();

    info!(
        duration_secs = options.duration.map(|d| d.as_secs()),
        auto_accept = options.auto_accept,
        recipients = options.recipients.len(),
        "Live operations started"
    );

    let deadline = async {
        match options.duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ctrl_c_armed = true;

    let mut status = options
        .status_every
        .map(|period| tokio::time::interval_at(Instant::now() + period, period));

    loop {
        while let Some(notice) = pending.pop_front() {
            if let Some(delivery) = react(&mut sim, notice, &options, gateway).await {
                deliveries.push(delivery);
            }
        }

        tokio::select! {
            Some((token, event)) = events.recv() => {
                pending.extend(sim.handle_event(token, event));
            }
            _ = &mut deadline => {
                info!("Run duration reached");
                break;
            }
            _ = async {
                match status.as_mut() {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            } => {
                log_status(&sim);
            }
            res = &mut ctrl_c, if ctrl_c_armed => {
                ctrl_c_armed = false;
                match res {
                    Ok(()) => {
                        info!("Ctrl-C received, shutting down");
                        break;
                    }
                    Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
                }
            }
        }
    }

    sim.stop();

    if let Some(path) = &options.snapshot_path {
        let json = serde_json::to_string_pretty(&sim.snapshot())?;
        tokio::fs::write(path, json).await?;
        info!(path = %path.display(), "Snapshot written");
    }

    Ok(LiveReport {
        summary: sim.summary(),
        deliveries,
    })
}

/// Apply one notice. Returns the delivery result when an emergency
/// broadcast went out.
async fn react<G>(
    sim: &mut LiveSimulator,
    notice: SimNotice,
    options: &LiveOptions,
    gateway: &G,
) -> Option<BulkSendResult>
where
    G: SmsGateway + ?Sized,
{
    match notice {
        SimNotice::AlertRaised(prediction) => {
            if !options.auto_accept {
                info!(prediction_id = %prediction.id, "Alert held for operator confirmation");
                return None;
            }
            if !sim.accept_alert() {
                return None;
            }
            broadcast(sim, options, gateway).await
        }
        SimNotice::ExtenderOffline(id) => {
            info!(extender_id = %id, "Connectivity degraded");
            None
        }
        SimNotice::PhaseEntered(phase) => {
            info!(phase = %phase, "Mission phase entered");
            None
        }
        SimNotice::ReliefMessagingNeeded(crowded) => {
            warn!(crowded, "Relief phase: crowded hotspots need messaging");
            None
        }
        SimNotice::ResponseComplete => {
            info!("Disaster response complete");
            None
        }
    }
}

async fn broadcast<G>(
    sim: &LiveSimulator,
    options: &LiveOptions,
    gateway: &G,
) -> Option<BulkSendResult>
where
    G: SmsGateway + ?Sized,
{
    let incident = sim.incident()?;
    if options.recipients.is_empty() {
        info!(prediction_id = %incident.id, "No recipients configured, skipping emergency SMS");
        return None;
    }

    let message = emergency_message(incident);
    match send_bulk(gateway, &options.recipients, &message).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(error = %e, "Emergency broadcast not sent");
            None
        }
    }
}

fn log_status(sim: &LiveSimulator) {
    let summary = sim.summary();
    info!(
        phase = %summary.phase,
        progress = summary.progress,
        active_drones = summary.active_drones,
        abnormal_readings = summary.abnormal_readings,
        predictions = summary.predictions,
        "Status"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drc_core::SmsResponse;
    use std::sync::Mutex;
    use tokio::time::timeout;

    #[derive(Default)]
    struct RecordingGateway {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SmsGateway for RecordingGateway {
        async fn send_sms(&self, to: &str, body: &str) -> drc_core::Result<SmsResponse> {
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(SmsResponse {
                success: true,
                message: "sent".to_string(),
                sid: None,
                error: None,
            })
        }
    }

    fn fast_config(seed: u64) -> SimulationConfig {
        SimulationConfig::default()
            .with_seed(seed)
            .with_fleet_tick_secs(1)
            .with_sensor_tick_secs(1)
    }

    #[tokio::test]
    async fn test_auto_accept_broadcasts_emergency() {
        let gateway = RecordingGateway::default();
        let options = LiveOptions {
            duration: Some(Duration::from_millis(1500)),
            auto_accept: true,
            recipients: vec!["+1001".to_string(), "+1002".to_string()],
            ..Default::default()
        };

        let report = run_live(fast_config(1), options, &gateway).await.unwrap();

        // The opening sensor snapshot always holds a high-confidence alert
        assert_eq!(report.summary.stats.alerts_accepted, 1);
        assert!(report.summary.incident.is_some());
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(report.deliveries[0].success.len(), 2);

        let sent = gateway.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.starts_with("EMERGENCY ALERT: "));
        assert!(report.summary.stats.fleet_ticks >= 1);
    }

    #[tokio::test]
    async fn test_queued_event_from_cancelled_timer_is_dropped() {
        let (scheduler, mut events) = TokioScheduler::new();
        let config = fast_config(3).with_sensor_tick_secs(60);
        let mut sim = Simulator::new(config, scheduler).unwrap();
        sim.start();

        let (stale, event) = timeout(Duration::from_secs(3), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SimEvent::FleetTick);

        // Stopped and re-armed while the old tick is still queued
        sim.set_fleet_running(false);
        sim.set_fleet_running(true);
        assert!(sim.handle_event(stale, event).is_empty());
        assert_eq!(sim.stats().fleet_ticks, 0);

        let (fresh, event) = timeout(Duration::from_secs(3), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(fresh, stale);
        sim.handle_event(fresh, event);
        assert_eq!(sim.stats().fleet_ticks, 1);
    }

    #[tokio::test]
    async fn test_snapshot_written_on_shutdown() {
        let gateway = RecordingGateway::default();
        let path = std::env::temp_dir().join(format!("drc-snapshot-{}.json", std::process::id()));
        let options = LiveOptions {
            duration: Some(Duration::from_millis(200)),
            snapshot_path: Some(path.clone()),
            ..Default::default()
        };

        run_live(fast_config(4), options, &gateway).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["phase"], "monitoring");
        assert!(json["heldAlert"].is_object());
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_without_auto_accept_nothing_is_sent() {
        let gateway = RecordingGateway::default();
        let options = LiveOptions {
            duration: Some(Duration::from_millis(300)),
            recipients: vec!["+1001".to_string()],
            ..Default::default()
        };

        let report = run_live(fast_config(2), options, &gateway).await.unwrap();
        assert_eq!(report.summary.stats.alerts_raised, 1);
        assert_eq!(report.summary.stats.alerts_accepted, 0);
        assert!(report.deliveries.is_empty());
        assert!(gateway.sent.lock().unwrap().is_empty());
    }
}
