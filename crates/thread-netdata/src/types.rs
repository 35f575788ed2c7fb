//! Thread addressing helpers and Network Data protocol constants.

/// Maximum serialised size of the full Network Data TLV store, in bytes.
pub const NETWORK_DATA_MAX_SIZE: usize = 254;

/// Lowest assignable Service ID.
pub const MIN_SERVICE_ID: u8 = 0;

/// Highest assignable Service ID (4-bit field).
pub const MAX_SERVICE_ID: u8 = 15;

/// Lowest assignable 6LoWPAN context id. Id 0 is reserved for the
/// mesh-local prefix and never handed out by the Leader.
pub const MIN_CONTEXT_ID: u8 = 1;

/// Highest assignable 6LoWPAN context id (4-bit field).
pub const MAX_CONTEXT_ID: u8 = 15;

/// Bit offset of the router id within an RLOC16. The upper bits name the
/// router; the remaining bits name a child of that router.
pub const ROUTER_ID_OFFSET: u32 = 10;

/// Extracts the router id from an RLOC16.
pub fn router_id_from_rloc16(rloc16: u16) -> u8 {
    (rloc16 >> ROUTER_ID_OFFSET) as u8
}

/// Builds the router-own RLOC16 (child bits zero) for a router id.
pub fn rloc16_from_router_id(router_id: u8) -> u16 {
    u16::from(router_id) << ROUTER_ID_OFFSET
}

/// True when both RLOC16 values belong to the same router.
pub fn router_id_match(first: u16, second: u16) -> bool {
    router_id_from_rloc16(first) == router_id_from_rloc16(second)
}

/// How RLOC16 values are compared when matching Network Data entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Entries must carry exactly the given RLOC16.
    Rloc16,
    /// Entries from any address sharing the router id match. Used when a
    /// whole router (and its children) is removed from the partition.
    RouterId,
}

/// Compares two RLOC16 values under the given match mode.
pub fn rloc_match(first: u16, second: u16, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Rloc16 => first == second,
        MatchMode::RouterId => router_id_match(first, second),
    }
}
