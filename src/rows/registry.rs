use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::clock::{OffsetClock, SharedNow, UtcOffset};
use crate::geo::IpGeolocator;
use crate::metrics;

use super::controller::{RowController, RowSnapshot};

pub type RowId = Uuid;

/// Everything a list renderer needs for one row. Indices are 1-based display
/// positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: RowId,
    pub index: usize,
    pub snapshot: RowSnapshot,
    pub time: Option<String>,
}

/// One user-added input row: its controller plus the clock wiring that
/// follows the controller's resolved offset.
struct Row {
    id: RowId,
    controller: Arc<RowController>,
    time_rx: watch::Receiver<Option<String>>,
    clock_link: JoinHandle<()>,
}

impl Row {
    fn new(geolocator: Arc<dyn IpGeolocator>, now: &SharedNow) -> Self {
        let controller = Arc::new(RowController::new(geolocator));
        let clock = OffsetClock::new(now.subscribe());
        let time_rx = clock.subscribe();
        let clock_link = spawn_clock_link(clock, controller.subscribe());
        Self {
            id: Uuid::new_v4(),
            controller,
            time_rx,
            clock_link,
        }
    }

    fn view(&self, index: usize) -> RowView {
        RowView {
            id: self.id,
            index,
            snapshot: self.controller.snapshot(),
            time: self.time_rx.borrow().clone(),
        }
    }
}

impl Drop for Row {
    fn drop(&mut self) {
        // ends the link task, which drops the clock and halts its ticking
        self.clock_link.abort();
    }
}

/// Drive a row's clock from its controller: whenever the resolved offset
/// changes, the clock is switched to it (or to idle when it goes away).
fn spawn_clock_link(
    mut clock: OffsetClock,
    mut snapshots: watch::Receiver<RowSnapshot>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current: Option<String> = None;
        loop {
            let offset = snapshots.borrow_and_update().utc_offset.clone();
            if offset != current {
                clock.set_offset(offset.as_deref().and_then(UtcOffset::parse));
                current = offset;
            }
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    })
}

/// Ordered set of rows, each with independent lookup and clock state.
pub struct RowRegistry {
    geolocator: Arc<dyn IpGeolocator>,
    now: Arc<SharedNow>,
    rows: RwLock<Vec<Row>>,
}

impl RowRegistry {
    pub fn new(geolocator: Arc<dyn IpGeolocator>, now: Arc<SharedNow>) -> Self {
        Self {
            geolocator,
            now,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Append an empty row and return its id.
    pub async fn add_row(&self) -> RowId {
        let row = Row::new(Arc::clone(&self.geolocator), &self.now);
        let id = row.id;
        let mut rows = self.rows.write().await;
        rows.push(row);
        metrics::update_active_rows(rows.len());
        debug!(row_id = %id, count = rows.len(), "Row added");
        id
    }

    /// Drop a row. Its clock is torn down with it; later rows shift up.
    pub async fn remove_row(&self, id: RowId) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        let removed = rows.len() != before;
        if removed {
            metrics::update_active_rows(rows.len());
            debug!(row_id = %id, count = rows.len(), "Row removed");
        }
        removed
    }

    /// Submit a raw value to a row's controller (the blur event).
    pub async fn submit(&self, id: RowId, raw: &str) -> bool {
        let rows = self.rows.read().await;
        match rows.iter().find(|row| row.id == id) {
            Some(row) => {
                row.controller.submit(raw);
                true
            }
            None => false,
        }
    }

    /// Clear a row's validation error (the edit event).
    pub async fn clear_validation_error(&self, id: RowId) -> bool {
        let rows = self.rows.read().await;
        match rows.iter().find(|row| row.id == id) {
            Some(row) => {
                row.controller.clear_validation_error();
                true
            }
            None => false,
        }
    }

    pub async fn view(&self, id: RowId) -> Option<RowView> {
        let rows = self.rows.read().await;
        rows.iter()
            .position(|row| row.id == id)
            .map(|pos| rows[pos].view(pos + 1))
    }

    pub async fn views(&self) -> Vec<RowView> {
        let rows = self.rows.read().await;
        rows.iter()
            .enumerate()
            .map(|(pos, row)| row.view(pos + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveTime;

    use crate::geo::{GeoInfo, LookupError};

    #[derive(Default)]
    struct StubGeolocator {
        outcomes: HashMap<IpAddr, GeoInfo>,
    }

    impl StubGeolocator {
        fn with_success(ip: &str, country_code: &str, utc_offset: &str) -> Self {
            let mut outcomes = HashMap::new();
            outcomes.insert(
                ip.parse().unwrap(),
                GeoInfo {
                    country_code: country_code.to_string(),
                    utc_offset: utc_offset.to_string(),
                },
            );
            Self { outcomes }
        }
    }

    #[async_trait]
    impl IpGeolocator for StubGeolocator {
        async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, LookupError> {
            Ok(self.outcomes.get(&ip).expect("unexpected lookup").clone())
        }
    }

    fn registry_with(stub: StubGeolocator, tick: Duration) -> (RowRegistry, Arc<SharedNow>) {
        let now = Arc::new(SharedNow::new(tick));
        let registry = RowRegistry::new(Arc::new(stub), Arc::clone(&now));
        (registry, now)
    }

    #[tokio::test]
    async fn test_rows_are_indexed_in_insertion_order() {
        let (registry, _now) =
            registry_with(StubGeolocator::default(), Duration::from_secs(1));

        let first = registry.add_row().await;
        let second = registry.add_row().await;
        let third = registry.add_row().await;

        let views = registry.views().await;
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].index, 1);
        assert_eq!(views[1].index, 2);
        assert_eq!(views[2].index, 3);
        assert_eq!(views[0].id, first);
        assert_eq!(views[1].id, second);
        assert_eq!(views[2].id, third);
    }

    #[tokio::test]
    async fn test_removing_a_row_reindexes_the_rest() {
        let (registry, _now) =
            registry_with(StubGeolocator::default(), Duration::from_secs(1));

        let first = registry.add_row().await;
        let second = registry.add_row().await;
        let third = registry.add_row().await;

        assert!(registry.remove_row(second).await);
        assert!(!registry.remove_row(second).await);

        let views = registry.views().await;
        assert_eq!(views.len(), 2);
        assert_eq!((views[0].id, views[0].index), (first, 1));
        assert_eq!((views[1].id, views[1].index), (third, 2));
    }

    #[tokio::test]
    async fn test_operations_on_unknown_rows_report_absence() {
        let (registry, _now) =
            registry_with(StubGeolocator::default(), Duration::from_secs(1));

        let id = Uuid::new_v4();
        assert!(!registry.submit(id, "8.8.8.8").await);
        assert!(!registry.clear_validation_error(id).await);
        assert_eq!(registry.view(id).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_lookup_starts_the_row_clock() {
        let (registry, now) = registry_with(
            StubGeolocator::with_success("8.8.8.8", "us", "-05:00"),
            Duration::from_millis(250),
        );
        now.start();

        let id = registry.add_row().await;
        assert!(registry.submit(id, "8.8.8.8").await);

        let mut time = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let view = registry.view(id).await.unwrap();
            if view.time.is_some() {
                time = view.time;
                break;
            }
        }

        let time = time.expect("clock never started ticking");
        assert!(
            NaiveTime::parse_from_str(&time, "%H:%M:%S").is_ok(),
            "unexpected time format: {}",
            time
        );

        let view = registry.view(id).await.unwrap();
        assert_eq!(view.snapshot.country_code.as_deref(), Some("us"));
        assert_eq!(view.snapshot.utc_offset.as_deref(), Some("-05:00"));
    }

    #[tokio::test]
    async fn test_removed_row_tears_down_its_clock() {
        let (registry, _now) = registry_with(
            StubGeolocator::with_success("8.8.8.8", "us", "-05:00"),
            Duration::from_secs(1),
        );

        let id = registry.add_row().await;
        let mut time_rx = {
            let rows = registry.rows.read().await;
            rows[0].time_rx.clone()
        };

        assert!(registry.remove_row(id).await);

        let closed = tokio::time::timeout(Duration::from_millis(200), async {
            loop {
                if time_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "clock channel still open after removal");
    }
}
