// src/pipeline/monitor.rs

//! The polling loop around [`Monitor::run_check`].

use std::time::Duration;

use super::check::Monitor;

/// Loop timing.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub interval: Duration,
    /// Longer pause after a cycle in which every backend failed
    pub backoff: Duration,
}

impl Schedule {
    pub fn new(interval: Duration, backoff: Duration) -> Self {
        Self { interval, backoff }
    }
}

/// Run cycles until Ctrl-C. Returns the number of completed cycles.
pub async fn run_monitor(monitor: &Monitor, schedule: Schedule) -> u64 {
    run_until(monitor, schedule, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Run cycles until `stop` resolves. The signal is only observed between
/// cycles; a cycle in progress always finishes.
pub async fn run_until<F>(monitor: &Monitor, schedule: Schedule, stop: F) -> u64
where
    F: Future<Output = ()>,
{
    tokio::pin!(stop);
    let mut cycles = 0u64;

    log::info!(
        "Monitoring {} backends every {}s",
        monitor.adapter_names().len(),
        schedule.interval.as_secs()
    );

    loop {
        let report = monitor.run_check().await;
        cycles += 1;

        let wait = if report.all_backends_failed() {
            log::error!(
                "Every backend failed this cycle; retrying in {}s",
                schedule.backoff.as_secs()
            );
            schedule.backoff
        } else {
            schedule.interval
        };

        tokio::select! {
            _ = &mut stop => {
                log::info!("Stopping monitor after {} cycles", cycles);
                return cycles;
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
