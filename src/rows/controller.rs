use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::geo::{GeoInfo, IpGeolocator};
use crate::metrics;
use crate::validation::{parse_ip, ValidationError};

/// Observable state of one row.
///
/// `error` carries the validation message when one is present, otherwise the
/// lookup failure message; the two kinds are never visible together.
/// `country_code` and `utc_offset` are set only when the most recent lookup
/// for the current value succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSnapshot {
    pub is_loading: bool,
    pub error: Option<String>,
    pub country_code: Option<String>,
    pub utc_offset: Option<String>,
}

#[derive(Debug, Default)]
struct RowState {
    /// Request token: resolutions apply only while their token is current.
    generation: u64,
    query_value: Option<String>,
    validation_error: Option<ValidationError>,
    /// The value `lookup_result` belongs to. One held value per row.
    resolved_for: Option<String>,
    lookup_result: Option<GeoInfo>,
    lookup_error: Option<String>,
    is_loading: bool,
}

impl RowState {
    fn snapshot(&self) -> RowSnapshot {
        let resolved = match (&self.query_value, &self.resolved_for) {
            (Some(query), Some(resolved)) if query == resolved => self.lookup_result.as_ref(),
            _ => None,
        };
        let error = if let Some(validation) = &self.validation_error {
            Some(validation.to_string())
        } else if self.query_value.is_some() {
            self.lookup_error.clone()
        } else {
            None
        };
        RowSnapshot {
            is_loading: self.is_loading,
            error,
            country_code: resolved.map(|info| info.country_code.clone()),
            utc_offset: resolved.map(|info| info.utc_offset.clone()),
        }
    }
}

struct Inner {
    state: Mutex<RowState>,
    snapshot_tx: watch::Sender<RowSnapshot>,
}

impl Inner {
    fn publish(&self, state: &RowState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}

/// Per-row lookup state machine: validation, request submission, and
/// result/error state for one IP value.
///
/// Submissions are last-submitted-wins: every accepted submission bumps the
/// generation token, and a resolution whose token has been superseded is
/// discarded silently. There is no network cancellation.
pub struct RowController {
    geolocator: Arc<dyn IpGeolocator>,
    inner: Arc<Inner>,
}

impl RowController {
    pub fn new(geolocator: Arc<dyn IpGeolocator>) -> Self {
        let (snapshot_tx, _rx) = watch::channel(RowSnapshot::default());
        Self {
            geolocator,
            inner: Arc::new(Inner {
                state: Mutex::new(RowState::default()),
                snapshot_tx,
            }),
        }
    }

    /// Validate `raw` and, when it is a well-formed IP literal, start a
    /// lookup for it. Emptiness is checked first, format second; a value
    /// that fails validation never reaches the collaborator.
    pub fn submit(&self, raw: &str) {
        let (ip, token) = {
            let mut state = self.inner.state.lock().unwrap();
            state.validation_error = None;

            let ip = match parse_ip(raw) {
                Ok(ip) => ip,
                Err(e) => {
                    metrics::record_validation_failure(e.label());
                    debug!(value = raw, error = %e, "Rejected address input");
                    // a failed validation supersedes any in-flight lookup
                    state.generation += 1;
                    state.query_value = None;
                    state.validation_error = Some(e);
                    state.is_loading = false;
                    self.inner.publish(&state);
                    return;
                }
            };

            if state.query_value.as_deref() == Some(raw) && state.is_loading {
                // same value already in flight
                self.inner.publish(&state);
                return;
            }

            if state.resolved_for.as_deref() == Some(raw) {
                debug!(value = raw, "Serving held lookup result");
                state.generation += 1;
                state.query_value = Some(raw.to_string());
                state.lookup_error = None;
                state.is_loading = false;
                self.inner.publish(&state);
                return;
            }

            state.generation += 1;
            state.query_value = Some(raw.to_string());
            state.lookup_error = None;
            state.is_loading = true;
            self.inner.publish(&state);
            (ip, state.generation)
        };

        let geolocator = Arc::clone(&self.geolocator);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = geolocator.lookup(ip).await;
            let mut state = inner.state.lock().unwrap();
            if state.generation != token {
                metrics::record_stale_discard();
                debug!(ip = %ip, "Discarding superseded lookup result");
                return;
            }
            match result {
                Ok(info) => {
                    state.resolved_for = state.query_value.clone();
                    state.lookup_result = Some(info);
                    state.lookup_error = None;
                }
                Err(e) => {
                    warn!(ip = %ip, error = %e, "Lookup failed");
                    state.resolved_for = None;
                    state.lookup_result = None;
                    state.lookup_error = Some(e.to_string());
                }
            }
            state.is_loading = false;
            inner.publish(&state);
        });
    }

    /// Clear the validation error only. An in-flight or completed lookup is
    /// untouched. Invoked on every edit of the raw input.
    pub fn clear_validation_error(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if state.validation_error.take().is_some() {
            self.inner.publish(&state);
        }
    }

    pub fn snapshot(&self) -> RowSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RowSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::geo::LookupError;

    enum StubOutcome {
        Success(GeoInfo),
        RateLimited,
    }

    #[derive(Default)]
    struct StubGeolocator {
        outcomes: HashMap<IpAddr, StubOutcome>,
        gates: HashMap<IpAddr, Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl StubGeolocator {
        fn success(ip: &str, country_code: &str, utc_offset: &str) -> Self {
            let mut stub = Self::default();
            stub.add_success(ip, country_code, utc_offset);
            stub
        }

        fn add_success(&mut self, ip: &str, country_code: &str, utc_offset: &str) {
            self.outcomes.insert(
                ip.parse().unwrap(),
                StubOutcome::Success(GeoInfo {
                    country_code: country_code.to_string(),
                    utc_offset: utc_offset.to_string(),
                }),
            );
        }

        fn rate_limited(ip: &str) -> Self {
            let mut stub = Self::default();
            stub.outcomes
                .insert(ip.parse().unwrap(), StubOutcome::RateLimited);
            stub
        }

        fn gate(&mut self, ip: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates.insert(ip.parse().unwrap(), Arc::clone(&gate));
            gate
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IpGeolocator for StubGeolocator {
        async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.gates.get(&ip) {
                gate.notified().await;
            }
            match self.outcomes.get(&ip).expect("unexpected lookup") {
                StubOutcome::Success(info) => Ok(info.clone()),
                StubOutcome::RateLimited => Err(LookupError::RateLimited),
            }
        }
    }

    fn controller_with(stub: StubGeolocator) -> (RowController, Arc<StubGeolocator>) {
        let stub = Arc::new(stub);
        let controller = RowController::new(Arc::clone(&stub) as Arc<dyn IpGeolocator>);
        (controller, stub)
    }

    async fn settled(controller: &RowController) -> RowSnapshot {
        let mut rx = controller.subscribe();
        let snapshot = rx.wait_for(|s| !s.is_loading).await.unwrap().clone();
        snapshot
    }

    #[tokio::test]
    async fn test_empty_input_is_required_and_never_looked_up() {
        let (controller, stub) = controller_with(StubGeolocator::default());

        controller.submit("");

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("IP address is required"));
        assert!(!snapshot.is_loading);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_input_is_required() {
        let (controller, stub) = controller_with(StubGeolocator::default());

        controller.submit("   ");

        assert_eq!(
            controller.snapshot().error.as_deref(),
            Some("IP address is required")
        );
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_input_is_invalid_and_never_looked_up() {
        let (controller, stub) = controller_with(StubGeolocator::default());

        controller.submit("not-an-ip");

        assert_eq!(
            controller.snapshot().error.as_deref(),
            Some("Invalid IP address format")
        );
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_editing_clears_validation_error_without_lookup() {
        let (controller, stub) = controller_with(StubGeolocator::default());

        controller.submit("not-an-ip");
        controller.clear_validation_error();

        assert_eq!(controller.snapshot().error, None);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_ipv4_lookup() {
        let (controller, stub) =
            controller_with(StubGeolocator::success("8.8.8.8", "us", "-05:00"));

        controller.submit("8.8.8.8");

        let snapshot = settled(&controller).await;
        assert_eq!(snapshot.country_code.as_deref(), Some("us"));
        assert_eq!(snapshot.utc_offset.as_deref(), Some("-05:00"));
        assert_eq!(snapshot.error, None);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_successful_ipv6_lookup() {
        let (controller, _stub) = controller_with(StubGeolocator::success(
            "2001:4860:4860::8888",
            "de",
            "+01:00",
        ));

        controller.submit("2001:4860:4860::8888");

        let snapshot = settled(&controller).await;
        assert_eq!(snapshot.country_code.as_deref(), Some("de"));
        assert_eq!(snapshot.utc_offset.as_deref(), Some("+01:00"));
    }

    #[tokio::test]
    async fn test_failed_lookup_surfaces_message_and_no_country() {
        let (controller, _stub) = controller_with(StubGeolocator::rate_limited("8.8.8.8"));

        controller.submit("8.8.8.8");

        let snapshot = settled(&controller).await;
        assert_eq!(snapshot.error.as_deref(), Some("Rate limit exceeded"));
        assert_eq!(snapshot.country_code, None);
        assert_eq!(snapshot.utc_offset, None);
    }

    #[tokio::test]
    async fn test_is_loading_while_lookup_outstanding() {
        let mut stub = StubGeolocator::success("8.8.8.8", "us", "-05:00");
        let gate = stub.gate("8.8.8.8");
        let (controller, _stub) = controller_with(stub);

        controller.submit("8.8.8.8");
        assert!(controller.snapshot().is_loading);

        gate.notify_one();
        let snapshot = settled(&controller).await;
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.country_code.as_deref(), Some("us"));
    }

    #[tokio::test]
    async fn test_superseded_lookup_is_discarded() {
        let mut stub = StubGeolocator::default();
        stub.add_success("1.1.1.1", "au", "+10:00");
        stub.add_success("8.8.8.8", "us", "-05:00");
        let gate = stub.gate("1.1.1.1");
        let (controller, stub) = controller_with(stub);

        controller.submit("1.1.1.1");
        controller.submit("8.8.8.8");

        let snapshot = settled(&controller).await;
        assert_eq!(snapshot.country_code.as_deref(), Some("us"));

        // the first lookup resolves late; its result must not overwrite state
        gate.notify_one();
        let mut rx = controller.subscribe();
        let waited = tokio::time::timeout(
            Duration::from_millis(50),
            rx.wait_for(|s| s.country_code.as_deref() == Some("au")),
        )
        .await;
        assert!(waited.is_err(), "stale result applied");
        assert_eq!(
            controller.snapshot().country_code.as_deref(),
            Some("us")
        );
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_validation_failure_supersedes_in_flight_lookup() {
        let mut stub = StubGeolocator::success("8.8.8.8", "us", "-05:00");
        let gate = stub.gate("8.8.8.8");
        let (controller, _stub) = controller_with(stub);

        controller.submit("8.8.8.8");
        controller.submit("not-an-ip");

        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Invalid IP address format")
        );
        assert_eq!(snapshot.country_code, None);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_editing_does_not_cancel_in_flight_lookup() {
        let mut stub = StubGeolocator::success("8.8.8.8", "us", "-05:00");
        let gate = stub.gate("8.8.8.8");
        let (controller, _stub) = controller_with(stub);

        controller.submit("8.8.8.8");
        controller.clear_validation_error();

        gate.notify_one();
        let snapshot = settled(&controller).await;
        assert_eq!(snapshot.country_code.as_deref(), Some("us"));
    }

    #[tokio::test]
    async fn test_resubmitting_resolved_value_serves_held_result() {
        let (controller, stub) =
            controller_with(StubGeolocator::success("8.8.8.8", "us", "-05:00"));

        controller.submit("8.8.8.8");
        settled(&controller).await;

        controller.submit("8.8.8.8");

        let snapshot = controller.snapshot();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.country_code.as_deref(), Some("us"));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_value_is_requested_again_on_resubmit() {
        let (controller, stub) = controller_with(StubGeolocator::rate_limited("8.8.8.8"));

        controller.submit("8.8.8.8");
        settled(&controller).await;

        controller.submit("8.8.8.8");
        settled(&controller).await;

        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_validation_error_hides_previous_result() {
        let (controller, _stub) =
            controller_with(StubGeolocator::success("8.8.8.8", "us", "-05:00"));

        controller.submit("8.8.8.8");
        settled(&controller).await;

        controller.submit("not-an-ip");

        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Invalid IP address format")
        );
        assert_eq!(snapshot.country_code, None);
        assert_eq!(snapshot.utc_offset, None);
    }
}
