#![cfg_attr(not(feature = "std"), no_std)]

// 'alloc' is used for dynamic allocation (e.g., Vec<u8> in built responses)
extern crate alloc;

// --- Foundation Modules ---
pub mod error;
pub mod hal;
pub mod types;

// --- Wire Framing ---
pub mod meshcop;
pub mod tlv;

// --- Network Data Store and Leader ---
pub mod leader;
pub mod netdata;

// Export core types and the host abstraction
pub use error::NetDataError;
pub use hal::LeaderHost;
pub use leader::{Leader, LeaderAction, LeaderConfig, LeaderStartMode, LowpanContext, Uri};
pub use netdata::{NetworkData, ServerIterator};
pub use types::{MatchMode, NETWORK_DATA_MAX_SIZE};
