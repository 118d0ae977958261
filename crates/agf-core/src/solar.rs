//! Local solar time lookup.

use agf_common::AccurateTime;

/// Venue and mission knowledge needed to compute local solar time.
///
/// Consulted only when LST output is enabled and the sample has a real SCET.
pub trait SolarTimeProvider: Send + Sync {
    /// Whether the session's venue reports time in sols.
    fn venue_uses_sol(&self, host_id: i32, session_id: i64) -> bool;

    /// Formatted local solar time for `scet`, or `None` when it cannot be
    /// computed for this spacecraft.
    fn local_solar_time(&self, scet: &AccurateTime, spacecraft_id: i32) -> Option<String>;
}

/// Provider for venues that never use sols.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSolarTime;

impl SolarTimeProvider for NoSolarTime {
    fn venue_uses_sol(&self, _host_id: i32, _session_id: i64) -> bool {
        false
    }

    fn local_solar_time(&self, _scet: &AccurateTime, _spacecraft_id: i32) -> Option<String> {
        None
    }
}
