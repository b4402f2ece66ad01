//! Per-request session coordination for a content-addressed block exchange
//! protocol ("bitswap").
//!
//! A [`SessionHandle`] groups a related batch of wants — typically the
//! blocks making up one object graph a caller asked for — so the exchange
//! layer can make locality-aware decisions about which peers have been
//! useful for *this* transfer and how aggressively to search the wider
//! network for providers. The wire protocol, the cross-session
//! want-manager, the provider-discovery network, and the block store are
//! all external collaborators; see [`WantManager`] and [`ProviderOracle`]
//! for the boundary this crate expects.

mod block;
mod cid_queue;
mod config;
mod error;
mod external;
mod get_blocks;
mod interest_cache;
mod notifier;
mod peer_set;
mod registry;
mod scope;
mod session;

pub use block::Block;
pub use config::{
    SessionConfig, ACTIVE_WANTS_LIMIT, BASE_TICK_DELAY, INTEREST_CACHE_CAPACITY,
    NEW_PEERS_CHANNEL_CAPACITY, OUTPUT_BUFFER, PROVIDER_SEARCH_MAX, PROV_SEARCH_DELAY,
};
pub use error::SessionError;
pub use external::{ProviderOracle, WantManager};
pub use get_blocks::GetBlocks;
pub use registry::SessionRegistry;
pub use scope::{Scope, ScopeHandle};
pub use session::{new_session, SessionHandle};
