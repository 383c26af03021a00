//! Memoizing wrapper around a [`RouteProvider`].
//!
//! Keys are the ordered (origin, destination) pair quantized to a fixed number
//! of decimal degrees. Only successful lookups are stored. Each key has its own
//! slot lock, so concurrent requests for the same pair collapse into a single
//! upstream call while different pairs proceed in parallel. A [`Pacer`] passed
//! to [`RouteCache::route_paced`] only ever sees misses.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::coordinate::{Coordinate, DEFAULT_PRECISION, MAX_PRECISION};
use crate::error::RoutingError;
use crate::pacing::Pacer;
use crate::traits::{RouteProvider, RouteSummary};

/// Ordered, quantized (origin, destination) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    origin: (i64, i64),
    destination: (i64, i64),
    precision: u32,
}

impl RouteKey {
    pub fn new(origin: Coordinate, destination: Coordinate, precision: u32) -> Self {
        Self {
            origin: origin.quantize(precision),
            destination: destination.quantize(precision),
            precision,
        }
    }

    pub fn origin(&self) -> Coordinate {
        Coordinate::from_quantized(self.origin, self.precision)
    }

    pub fn destination(&self) -> Coordinate {
        Coordinate::from_quantized(self.destination, self.precision)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (origin, destination) = (self.origin(), self.destination());
        let p = self.precision as usize;
        write!(
            f,
            "{:.p$},{:.p$}->{:.p$},{:.p$}",
            origin.lat, origin.lon, destination.lat, destination.lon
        )
    }
}

type Slot = Arc<Mutex<Option<RouteSummary>>>;

/// Process-scoped route cache. Never invalidated; drop it to clear.
pub struct RouteCache<P> {
    provider: P,
    precision: u32,
    slots: Mutex<HashMap<RouteKey, Slot>>,
    calls: AtomicUsize,
    hits: AtomicUsize,
}

impl<P: RouteProvider> RouteCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            precision: DEFAULT_PRECISION,
            slots: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    /// Decimal degrees kept in keys, capped at [`MAX_PRECISION`].
    pub fn with_precision(mut self, precision: u32) -> Self {
        if precision > MAX_PRECISION {
            warn!(precision, max = MAX_PRECISION, "route cache precision capped");
        }
        self.precision = precision.min(MAX_PRECISION);
        self
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Routed distance/time for the pair, calling upstream at most once per
    /// distinct key unless earlier calls failed.
    pub fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        self.lookup(origin, destination, None)
    }

    /// Like [`RouteCache::route`], but upstream calls go through `pacer`.
    pub fn route_paced(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        pacer: &Pacer,
    ) -> Result<RouteSummary, RoutingError> {
        self.lookup(origin, destination, Some(pacer))
    }

    fn lookup(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        pacer: Option<&Pacer>,
    ) -> Result<RouteSummary, RoutingError> {
        let key = RouteKey::new(origin, destination, self.precision);
        let slot = self.slot(key);

        // Held across the upstream call: identical concurrent requests wait here.
        let mut entry = lock(&slot);
        if let Some(summary) = *entry {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "route cache hit");
            return Ok(summary);
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%key, call, "route cache miss");
        let upstream = || self.provider.route(key.origin(), key.destination());
        let summary = match pacer {
            Some(pacer) => pacer.run(upstream),
            None => upstream(),
        }?;
        *entry = Some(summary);
        Ok(summary)
    }

    /// Cached result for the pair, without calling upstream.
    pub fn get(&self, origin: Coordinate, destination: Coordinate) -> Option<RouteSummary> {
        let key = RouteKey::new(origin, destination, self.precision);
        let slot = lock(&self.slots).get(&key).cloned()?;
        let entry = *lock(&slot);
        entry
    }

    fn slot(&self, key: RouteKey) -> Slot {
        lock(&self.slots).entry(key).or_default().clone()
    }

    /// Upstream calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of pairs with a stored result.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use crate::haversine::HaversineRouter;

    /// Counts upstream calls and fails the first `fail_first` of them.
    struct CountingRouter {
        calls: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl CountingRouter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
                delay: Duration::ZERO,
            }
        }
    }

    impl RouteProvider for CountingRouter {
        fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            if n < self.fail_first {
                return Err(RoutingError::Status(503));
            }
            HaversineRouter::default().route(origin, destination)
        }
    }

    const WARSAW: Coordinate = Coordinate::new(52.2297, 21.0122);
    const LODZ: Coordinate = Coordinate::new(51.7592, 19.4560);

    #[test]
    fn test_repeat_request_hits_cache() {
        let cache = RouteCache::new(CountingRouter::new());
        let first = cache.route(WARSAW, LODZ).unwrap();
        let second = cache.route(WARSAW, LODZ).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.calls(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_float_noise_shares_slot() {
        let cache = RouteCache::new(CountingRouter::new());
        cache.route(WARSAW, LODZ).unwrap();
        let drifted = Coordinate::new(WARSAW.lat + 1e-9, WARSAW.lon - 1e-9);
        cache.route(drifted, LODZ).unwrap();
        assert_eq!(cache.calls(), 1);
    }

    #[test]
    fn test_direction_matters() {
        let cache = RouteCache::new(CountingRouter::new());
        cache.route(WARSAW, LODZ).unwrap();
        cache.route(LODZ, WARSAW).unwrap();
        assert_eq!(cache.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let mut router = CountingRouter::new();
        router.fail_first = 1;
        let cache = RouteCache::new(router);

        assert!(matches!(cache.route(WARSAW, LODZ), Err(RoutingError::Status(503))));
        assert!(cache.get(WARSAW, LODZ).is_none());
        assert!(cache.is_empty());

        assert!(cache.route(WARSAW, LODZ).is_ok());
        assert_eq!(cache.calls(), 2);
        assert!(cache.get(WARSAW, LODZ).is_some());
    }

    #[test]
    fn test_concurrent_identical_requests_collapse() {
        let mut router = CountingRouter::new();
        router.delay = Duration::from_millis(50);
        let cache = Arc::new(RouteCache::new(router));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.route(WARSAW, LODZ).unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 7);
    }

    #[test]
    fn test_paced_lookup_only_paces_misses() {
        use crate::pacing::PacingPolicy;

        let cache = RouteCache::new(CountingRouter::new());
        let pacer = Pacer::new(PacingPolicy {
            every: 1,
            pause: Duration::ZERO,
        });
        cache.route_paced(WARSAW, LODZ, &pacer).unwrap();
        for _ in 0..5 {
            cache.route_paced(WARSAW, LODZ, &pacer).unwrap();
        }
        assert_eq!(pacer.pauses(), 0);

        cache.route_paced(LODZ, WARSAW, &pacer).unwrap();
        assert_eq!(pacer.pauses(), 1);
        assert_eq!(cache.calls(), 2);
    }

    #[test]
    fn test_coarser_precision_merges_nearby_points() {
        let cache = RouteCache::new(CountingRouter::new()).with_precision(3);
        cache.route(Coordinate::new(52.22971, 21.01224), LODZ).unwrap();
        cache.route(Coordinate::new(52.22968, 21.01219), LODZ).unwrap();
        assert_eq!(cache.calls(), 1);
    }

    #[test]
    fn test_precision_is_capped() {
        let cache = RouteCache::new(CountingRouter::new()).with_precision(18);
        assert_eq!(cache.precision(), MAX_PRECISION);

        let munich = Coordinate::new(48.0, 11.0);
        let first = cache.route(Coordinate::new(52.0, 21.0), LODZ).unwrap();
        let second = cache.route(munich, LODZ).unwrap();
        assert_eq!(cache.calls(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_key_display() {
        let key = RouteKey::new(WARSAW, LODZ, 6);
        assert_eq!(key.to_string(), "52.229700,21.012200->51.759200,19.456000");
    }
}
