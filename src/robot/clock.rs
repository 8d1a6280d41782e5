use std::sync::OnceLock;
use std::time::Instant;

static MONOTONIC_EPOCH: OnceLock<Instant> = OnceLock::new();

fn monotonic_epoch() -> Instant {
    *MONOTONIC_EPOCH.get_or_init(Instant::now)
}

/// Two clock domains: the controller's monotonic clock, in which deadlines
/// are computed, and the performance counter actuators schedule against.
pub trait Clock: Send + Sync {
    fn monotonic(&self) -> f64;
    fn perf_counter(&self) -> f64;

    /// Moves a monotonic deadline into the performance-counter domain.
    fn translate_to_perf(&self, target: f64) -> f64 {
        target - self.monotonic() + self.perf_counter()
    }
}

/// Both domains backed by [`Instant`], with different epochs: monotonic time
/// counts from the first use in the process, the performance counter from
/// construction of the clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    perf_epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        // Touch the monotonic epoch first so it never postdates perf_epoch.
        let _ = monotonic_epoch();
        Self {
            perf_epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> f64 {
        monotonic_epoch().elapsed().as_secs_f64()
    }

    fn perf_counter(&self) -> f64 {
        self.perf_epoch.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock {
        monotonic: f64,
        perf: f64,
    }

    impl Clock for FixedClock {
        fn monotonic(&self) -> f64 {
            self.monotonic
        }

        fn perf_counter(&self) -> f64 {
            self.perf
        }
    }

    #[test]
    fn test_translation_keeps_lead_time() {
        let clock = FixedClock {
            monotonic: 1000.0,
            perf: 3.5,
        };
        // 50 ms ahead in one domain is 50 ms ahead in the other.
        assert!((clock.translate_to_perf(1000.05) - 3.55).abs() < 1e-12);
        assert!((clock.translate_to_perf(999.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_system_clock_translation_preserves_lead() {
        let clock = SystemClock::new();
        let target = clock.monotonic() + 0.25;
        let translated = clock.translate_to_perf(target);
        let lead = translated - clock.perf_counter();
        assert!(lead > 0.2 && lead <= 0.25);
    }
}
