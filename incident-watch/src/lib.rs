//! Bounded-interval polling over the incident journal.
//!
//! Clients cannot receive pushes; a screen that needs fresh state polls the
//! journal instead. Ticks run strictly one after another (a poll finishes
//! before the next fires) and the whole watcher is cancelled when the
//! observing screen loses focus.

use incident_core::event_log::{EventLog, EventType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub trait UpdateSink: Send + Sync + 'static {
    fn emit_json(&self, event: &str, payload: serde_json::Value);
}

/// Handle to a running watcher. Dropping it without calling [`stop`]
/// leaves the loop running for the life of the process.
///
/// [`stop`]: WatchHandle::stop
pub struct WatchHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Cooperative cancellation: flags the loop and waits for the current
    /// tick to finish.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn watch(log: EventLog, sink: impl UpdateSink, interval: Duration) -> WatchHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    // Cursor is fixed before the thread starts; anything appended after
    // watch() returns is seen by some tick.
    let mut cursor = log.latest_event_id().ok().flatten().unwrap_or(0);

    let handle = std::thread::spawn(move || {
        while !stop_flag.load(Ordering::Relaxed) {
            emit_updates(&log, &sink, &mut cursor);
            std::thread::sleep(interval);
        }
    });

    WatchHandle {
        stop,
        handle: Some(handle),
    }
}

/// One poll tick: drain everything past the cursor and fan it out.
pub fn emit_updates(log: &EventLog, sink: &impl UpdateSink, cursor: &mut i64) {
    let Ok(events) = log.events_after(*cursor) else {
        return;
    };

    for event in events {
        if let Some(id) = event.id {
            if id > *cursor {
                *cursor = id;
            }
        }

        let name = match event.event_type {
            EventType::Reported => "incident-reported",
            EventType::StatusChanged => "status-changed",
            EventType::ResponderAssigned => "responder-assigned",
            EventType::LogReportSubmitted => "log-report-submitted",
            EventType::CommentPosted => "comment-posted",
            EventType::TransitionDenied
            | EventType::LogReportUpdated
            | EventType::MediaAttached => continue,
        };

        let mut payload = serde_json::json!({
            "incident_id": event.incident_id,
            "description": event.description,
        });
        if let Some(details) = event.details {
            payload["details"] = details;
        }
        sink.emit_json(name, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::event_log::Event;
    use std::sync::Mutex;

    fn db_path(name: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        format!("/tmp/incident-watch-tests/{name}-{nanos}.db")
    }

    #[derive(Default)]
    struct CaptureSink {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl UpdateSink for CaptureSink {
        fn emit_json(&self, event: &str, _payload: serde_json::Value) {
            if let Ok(mut guard) = self.seen.lock() {
                guard.push(event.to_string());
            }
        }
    }

    fn seed(log: &EventLog, event_type: EventType, description: &str) {
        log.append(&Event {
            id: None,
            incident_id: "inc-w1".into(),
            event_type,
            description: description.into(),
            details: None,
            timestamp: "1".into(),
        })
        .expect("append");
    }

    #[test]
    fn emits_required_event_names() {
        let log = EventLog::open(&db_path("names")).expect("open");
        seed(&log, EventType::Reported, "reported");
        seed(&log, EventType::StatusChanged, "status changed");
        seed(&log, EventType::ResponderAssigned, "responders assigned");
        seed(&log, EventType::LogReportSubmitted, "log report submitted");
        seed(&log, EventType::CommentPosted, "comment posted");
        seed(&log, EventType::TransitionDenied, "refused");

        let sink = CaptureSink::default();
        let mut cursor = 0;
        emit_updates(&log, &sink, &mut cursor);

        let seen = sink.seen.lock().expect("lock").clone();
        assert_eq!(
            seen,
            vec![
                "incident-reported",
                "status-changed",
                "responder-assigned",
                "log-report-submitted",
                "comment-posted",
            ]
        );
    }

    #[test]
    fn cursor_advances_so_ticks_never_replay() {
        let log = EventLog::open(&db_path("cursor")).expect("open");
        seed(&log, EventType::Reported, "reported");

        let sink = CaptureSink::default();
        let mut cursor = 0;
        emit_updates(&log, &sink, &mut cursor);
        emit_updates(&log, &sink, &mut cursor);
        assert_eq!(sink.seen.lock().expect("lock").len(), 1);

        seed(&log, EventType::StatusChanged, "status changed");
        emit_updates(&log, &sink, &mut cursor);
        assert_eq!(sink.seen.lock().expect("lock").len(), 2);
    }

    #[test]
    fn stop_cancels_the_loop() {
        let log = EventLog::open(&db_path("stop")).expect("open");
        let sink = CaptureSink::default();
        let seen = sink.seen.clone();

        let handle = watch(log.clone(), sink, Duration::from_millis(10));
        seed(&log, EventType::StatusChanged, "status changed");
        std::thread::sleep(Duration::from_millis(80));
        handle.stop();

        let count_after_stop = seen.lock().expect("lock").len();
        seed(&log, EventType::StatusChanged, "after stop");
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(seen.lock().expect("lock").len(), count_after_stop);
        assert!(count_after_stop >= 1);
    }

    #[test]
    fn watcher_starts_from_the_current_tail() {
        let log = EventLog::open(&db_path("tail")).expect("open");
        seed(&log, EventType::Reported, "historic");

        let sink = CaptureSink::default();
        let seen = sink.seen.clone();
        let handle = watch(log.clone(), sink, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(60));
        handle.stop();

        assert!(seen.lock().expect("lock").is_empty());
    }
}
