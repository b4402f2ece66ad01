//! Tunable constants for a session, wrapped in a config struct so hosts can
//! override them at construction time — most commonly tests that want a
//! sub-second `prov_search_delay` instead of waiting out the real
//! 10-second default. `SessionConfig::default()` reproduces the fixed
//! constants below exactly.

use std::time::Duration;

/// Max number of identifiers this session keeps live on the wire at once.
pub const ACTIVE_WANTS_LIMIT: usize = 16;

/// Capacity of the LRU remembering identifiers this session ever asked for.
pub const INTEREST_CACHE_CAPACITY: usize = 2048;

/// Base component of the tick interval once latency evidence exists.
pub const BASE_TICK_DELAY: Duration = Duration::from_millis(500);

/// Tick interval used before any block has ever been received.
pub const PROV_SEARCH_DELAY: Duration = Duration::from_secs(10);

/// Max peers requested per provider search.
pub const PROVIDER_SEARCH_MAX: usize = 10;

/// Capacity of the internal channel carrying discovered peers back to the
/// session loop.
pub const NEW_PEERS_CHANNEL_CAPACITY: usize = 16;

/// Per-subscriber buffer on the block notifier.
pub const OUTPUT_BUFFER: usize = 128;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub active_wants_limit: usize,
    pub interest_cache_capacity: usize,
    pub base_tick_delay: Duration,
    pub prov_search_delay: Duration,
    pub provider_search_max: usize,
    pub new_peers_channel_capacity: usize,
    pub output_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            active_wants_limit: ACTIVE_WANTS_LIMIT,
            interest_cache_capacity: INTEREST_CACHE_CAPACITY,
            base_tick_delay: BASE_TICK_DELAY,
            prov_search_delay: PROV_SEARCH_DELAY,
            provider_search_max: PROVIDER_SEARCH_MAX,
            new_peers_channel_capacity: NEW_PEERS_CHANNEL_CAPACITY,
            output_buffer: OUTPUT_BUFFER,
        }
    }
}
