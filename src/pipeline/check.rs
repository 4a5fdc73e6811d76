// src/pipeline/check.rs

//! One check cycle: poll, normalize, diff, notify, persist.

use std::time::Duration;

use chrono::{Local, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{
    AvailabilityTuple, Config, NotifyConfig, RoomRecord, RoomStatus, available_tuples,
    normalize_records, qualify_room,
};
use crate::notify::{DispatchReport, Dispatcher, MessageContext, format_message, subject};
use crate::services::{BackendAdapter, BackendOutcome, build_adapter, fetch_and_parse};
use crate::storage::{LocalSnapshotStore, SnapshotStore, load_or_empty};
use crate::utils::http;

use super::diff::{DiffResult, diff};

/// What happened during one cycle.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub outcomes: Vec<BackendOutcome>,
    /// Normalized records from every backend, in polling order
    pub records: Vec<RoomRecord>,
    pub diff: DiffResult,
    /// `None` when nothing changed and no notification was attempted
    pub dispatch: Option<DispatchReport>,
    /// Counter stored with this cycle's snapshot
    pub check_count: u64,
    /// Previous tuples kept because their backend failed this cycle
    pub carried_forward: usize,
    pub snapshot_saved: bool,
}

impl CheckReport {
    pub fn failed_backends(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.name.as_str())
            .collect()
    }

    /// Every backend failed, so the cycle saw nothing at all.
    pub fn all_backends_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(BackendOutcome::is_failure)
    }

    pub fn summary(&self) -> CheckSummary {
        CheckSummary {
            available: count_status(&self.records, RoomStatus::Available),
            sold_out: count_status(&self.records, RoomStatus::SoldOut),
            changes: self.diff.change_count(),
            failed_backends: self.failed_backends().len(),
        }
    }
}

/// Counts printed at the end of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub available: usize,
    pub sold_out: usize,
    pub changes: usize,
    pub failed_backends: usize,
}

fn count_status(records: &[RoomRecord], status: RoomStatus) -> usize {
    records.iter().filter(|r| r.status == status).count()
}

/// Owns everything a cycle needs.
pub struct Monitor {
    adapters: Vec<Box<dyn BackendAdapter>>,
    store: Box<dyn SnapshotStore>,
    dispatcher: Dispatcher,
    context: MessageContext,
    backend_delay: Duration,
}

impl Monitor {
    pub fn new(
        adapters: Vec<Box<dyn BackendAdapter>>,
        store: Box<dyn SnapshotStore>,
        dispatcher: Dispatcher,
        context: MessageContext,
    ) -> Self {
        Self {
            adapters,
            store,
            dispatcher,
            context,
            backend_delay: Duration::ZERO,
        }
    }

    pub fn with_backend_delay(mut self, delay: Duration) -> Self {
        self.backend_delay = delay;
        self
    }

    /// Wire up adapters, the local snapshot file and the notification
    /// channels from configuration.
    pub fn from_config(config: &Config, notify: &NotifyConfig) -> Result<Self> {
        let client = http::create_client(&config.http)?;
        let notify_client = http::create_notify_client(&config.http)?;

        let adapters = config
            .backends
            .iter()
            .map(|backend| build_adapter(backend, &client))
            .collect();

        let store = Box::new(LocalSnapshotStore::new(&config.monitor.state_file));
        let dispatcher = Dispatcher::from_config(
            notify,
            notify_client,
            Duration::from_secs(config.http.notify_timeout_secs),
        );

        let context = MessageContext {
            target_dates: config.all_target_dates(),
            booking_urls: config
                .backends
                .iter()
                .filter_map(|b| b.booking_url().map(|u| (b.name().to_string(), u.to_string())))
                .collect(),
        };

        Ok(Self::new(adapters, store, dispatcher, context)
            .with_backend_delay(Duration::from_millis(config.monitor.backend_delay_ms)))
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.dispatcher.channel_names()
    }

    /// Run one full cycle. Backend, channel and storage failures are
    /// absorbed and surface only in the report.
    pub async fn run_check(&self) -> CheckReport {
        log::info!("Starting availability check");

        let previous = load_or_empty(self.store.as_ref()).await;

        let mut outcomes = Vec::with_capacity(self.adapters.len());
        for (i, adapter) in self.adapters.iter().enumerate() {
            if i > 0 && !self.backend_delay.is_zero() {
                tokio::time::sleep(self.backend_delay).await;
            }
            outcomes.push(fetch_and_parse(adapter.as_ref()).await);
        }

        let records = normalize_records(
            outcomes
                .iter()
                .flat_map(|o| o.records.iter().cloned())
                .collect(),
        );
        let mut current = available_tuples(&records);
        let carried = carry_forward(&previous.last_available, &outcomes);
        if !carried.is_empty() {
            log::info!(
                "Keeping {} previously available tuples from failed backends",
                carried.len()
            );
        }
        let carried_forward = carried.len();
        current.extend(carried);
        let result = diff(&current, &previous.last_available);

        let dispatch = if result.has_changes() {
            match subject(&result) {
                Some(subject) => {
                    let message = format_message(&result, &self.context, Local::now());
                    Some(self.dispatcher.notify(&message, &subject).await)
                }
                None => None,
            }
        } else {
            None
        };

        let next = previous.next(current, Utc::now());
        let snapshot_saved = match self.store.save(&next).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save snapshot: {}", e);
                false
            }
        };

        let report = CheckReport {
            outcomes,
            records,
            diff: result,
            dispatch,
            check_count: next.check_count,
            carried_forward,
            snapshot_saved,
        };

        let summary = report.summary();
        log::info!(
            "Check #{} complete: {} available, {} sold out, {} changes",
            report.check_count,
            summary.available,
            summary.sold_out,
            summary.changes
        );
        for name in report.failed_backends() {
            log::warn!("Backend {} returned no data this cycle", name);
        }

        report
    }
}

/// Tuples from the previous snapshot that belong to a backend which failed
/// this cycle. A room belongs to the backend with the longest name prefix.
fn carry_forward(
    previous: &[AvailabilityTuple],
    outcomes: &[BackendOutcome],
) -> Vec<AvailabilityTuple> {
    if !outcomes.iter().any(BackendOutcome::is_failure) {
        return Vec::new();
    }
    let prefixes: Vec<(String, bool)> = outcomes
        .iter()
        .map(|o| (qualify_room(&o.name, ""), o.is_failure()))
        .collect();

    previous
        .iter()
        .filter(|tuple| {
            prefixes
                .iter()
                .filter(|(prefix, _)| tuple.room.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .is_some_and(|(_, failed)| *failed)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::notify::NotificationChannel;
    use crate::storage::Snapshot;

    struct Fixed {
        name: &'static str,
        records: Option<Vec<RoomRecord>>,
    }

    #[async_trait]
    impl BackendAdapter for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> &'static str {
            "test"
        }

        async fn fetch(&self) -> Result<Vec<RoomRecord>> {
            self.records
                .clone()
                .ok_or_else(|| AppError::parse(self.name, "unreachable"))
        }
    }

    #[derive(Default, Clone)]
    struct MemoryStore {
        inner: Arc<Mutex<Option<Snapshot>>>,
    }

    #[async_trait]
    impl SnapshotStore for MemoryStore {
        async fn load(&self) -> Result<Option<Snapshot>> {
            Ok(self.inner.lock().unwrap().clone())
        }

        async fn save(&self, snapshot: &Snapshot) -> Result<()> {
            *self.inner.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NotificationChannel for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn send(&self, _message: &str, subject: &str) -> Result<()> {
            self.sent.lock().unwrap().push(subject.to_string());
            Ok(())
        }
    }

    fn available(room: &str) -> RoomRecord {
        RoomRecord::with_count(room, "2025-10-24", 2, "¥8000", RoomStatus::SoldOut)
    }

    fn monitor(
        adapters: Vec<Box<dyn BackendAdapter>>,
        store: MemoryStore,
        recorder: Recorder,
    ) -> Monitor {
        Monitor::new(
            adapters,
            Box::new(store),
            Dispatcher::new(vec![Box::new(recorder)]),
            MessageContext::default(),
        )
    }

    #[tokio::test]
    async fn test_first_cycle_reports_new_rooms() {
        let store = MemoryStore::default();
        let recorder = Recorder::default();
        let m = monitor(
            vec![Box::new(Fixed {
                name: "a",
                records: Some(vec![available("A - Twin")]),
            })],
            store.clone(),
            recorder.clone(),
        );

        let report = m.run_check().await;
        assert_eq!(report.diff.new_available.len(), 1);
        assert_eq!(report.check_count, 1);
        assert!(report.snapshot_saved);
        assert_eq!(report.dispatch.unwrap().sent, vec!["recorder"]);
        assert_eq!(
            recorder.sent.lock().unwrap().as_slice(),
            ["ROOMS AVAILABLE! 1 new options"]
        );

        let saved = store.inner.lock().unwrap().clone().unwrap();
        assert_eq!(
            saved.last_available,
            vec![AvailabilityTuple::new("A - Twin", "2025-10-24", 2, "¥8000")]
        );
    }

    #[tokio::test]
    async fn test_unchanged_cycle_does_not_notify_but_saves() {
        let store = MemoryStore::default();
        let recorder = Recorder::default();
        let m = monitor(
            vec![Box::new(Fixed {
                name: "a",
                records: Some(vec![available("A - Twin")]),
            })],
            store.clone(),
            recorder.clone(),
        );

        m.run_check().await;
        let second = m.run_check().await;
        assert!(!second.diff.has_changes());
        assert!(second.dispatch.is_none());
        assert_eq!(second.check_count, 2);
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_backend_does_not_block_others() {
        let recorder = Recorder::default();
        let m = monitor(
            vec![
                Box::new(Fixed {
                    name: "down",
                    records: None,
                }),
                Box::new(Fixed {
                    name: "up",
                    records: Some(vec![available("Up - Twin")]),
                }),
            ],
            MemoryStore::default(),
            recorder,
        );

        let report = m.run_check().await;
        assert_eq!(report.failed_backends(), vec!["down"]);
        assert!(!report.all_backends_failed());
        assert_eq!(report.diff.current_available.len(), 1);
        assert_eq!(report.summary().failed_backends, 1);
    }

    fn twin_snapshot(rooms: &[&str]) -> MemoryStore {
        let store = MemoryStore::default();
        *store.inner.lock().unwrap() = Some(Snapshot {
            last_available: rooms
                .iter()
                .map(|room| AvailabilityTuple::new(*room, "2025-10-24", 2, "¥8000"))
                .collect(),
            last_check: None,
            check_count: 7,
        });
        store
    }

    #[tokio::test]
    async fn test_failed_backend_keeps_previous_rooms() {
        let store = twin_snapshot(&["A - Twin"]);
        let recorder = Recorder::default();
        let m = monitor(
            vec![Box::new(Fixed {
                name: "A",
                records: None,
            })],
            store.clone(),
            recorder.clone(),
        );

        let report = m.run_check().await;
        assert!(report.all_backends_failed());
        assert!(report.diff.lost_available.is_empty());
        assert!(report.dispatch.is_none());
        assert_eq!(report.carried_forward, 1);
        assert_eq!(report.check_count, 8);
        assert!(recorder.sent.lock().unwrap().is_empty());

        let saved = store.inner.lock().unwrap().clone().unwrap();
        assert_eq!(
            saved.last_available,
            vec![AvailabilityTuple::new("A - Twin", "2025-10-24", 2, "¥8000")]
        );
    }

    #[tokio::test]
    async fn test_healthy_backend_still_reports_lost_rooms() {
        let store = twin_snapshot(&["A - Twin", "B - Suite"]);
        let recorder = Recorder::default();
        let m = monitor(
            vec![
                Box::new(Fixed {
                    name: "A",
                    records: None,
                }),
                Box::new(Fixed {
                    name: "B",
                    records: Some(Vec::new()),
                }),
            ],
            store,
            recorder.clone(),
        );

        let report = m.run_check().await;
        assert_eq!(report.carried_forward, 1);
        assert_eq!(report.diff.lost_available.len(), 1);
        assert_eq!(report.diff.lost_available[0].room, "B - Suite");
        assert_eq!(
            recorder.sent.lock().unwrap().as_slice(),
            ["Rooms no longer available: 1 options"]
        );
    }

    #[test]
    fn test_carry_forward_uses_longest_backend_prefix() {
        let previous = vec![
            AvailabilityTuple::new("Lake - Twin", "2025-10-24", 1, "¥8000"),
            AvailabilityTuple::new("Lake - East - Twin", "2025-10-24", 1, "¥8000"),
        ];
        let outcomes = vec![
            BackendOutcome {
                name: "Lake".into(),
                kind: "test",
                records: Vec::new(),
                error: None,
            },
            BackendOutcome {
                name: "Lake - East".into(),
                kind: "test",
                records: Vec::new(),
                error: Some("timeout".into()),
            },
        ];

        let carried = carry_forward(&previous, &outcomes);
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].room, "Lake - East - Twin");
    }

    #[tokio::test]
    async fn test_not_released_never_diffed() {
        let hidden = RoomRecord::with_status(
            "W - Twin",
            "2025-10-24",
            RoomStatus::NotReleased,
            "Check website",
        );
        let m = monitor(
            vec![Box::new(Fixed {
                name: "w",
                records: Some(vec![hidden]),
            })],
            MemoryStore::default(),
            Recorder::default(),
        );

        let report = m.run_check().await;
        assert_eq!(report.records.len(), 1);
        assert!(report.diff.current_available.is_empty());
        assert!(report.dispatch.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_records_last_wins() {
        let sold =
            RoomRecord::with_count("A - Twin", "2025-10-24", 0, "¥8000", RoomStatus::SoldOut);
        let m = monitor(
            vec![Box::new(Fixed {
                name: "a",
                records: Some(vec![available("A - Twin"), sold]),
            })],
            MemoryStore::default(),
            Recorder::default(),
        );

        let report = m.run_check().await;
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.summary().sold_out, 1);
        assert!(report.diff.current_available.is_empty());
    }

    #[test]
    fn test_from_config_wires_backends() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.monitor.state_file = dir.path().join("state.json").display().to_string();

        let m = Monitor::from_config(&config, &NotifyConfig::default()).unwrap();
        assert_eq!(m.adapter_names().len(), config.backends.len());
        assert!(m.channel_names().is_empty());
        assert_eq!(m.context.booking_urls.len(), 2);
        assert_eq!(m.context.target_dates.len(), 2);
    }
}
