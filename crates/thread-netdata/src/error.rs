use core::fmt;

/// Defines a portable, descriptive Error type for the Network Data Leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetDataError {
    /// A TLV run is structurally invalid or violates registration rules
    /// (e.g., duplicate Prefix TLV, entry for a foreign RLOC16).
    Parse,
    /// The registering RLOC16 belongs to a router id that is not allocated
    /// in the Router Table.
    NoRoute,
    /// The Network Data byte store or an identifier table is exhausted.
    NoBufs,
    /// The requested identifier or record does not exist.
    NotFound,
    /// There is nothing to respond with (e.g., no Commissioning Data stored).
    Drop,
}

impl fmt::Display for NetDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "Invalid TLV structure or registration content"),
            Self::NoRoute => write!(f, "Router id not allocated for RLOC16"),
            Self::NoBufs => write!(f, "Network Data store or id table exhausted"),
            Self::NotFound => write!(f, "Requested id or record not found"),
            Self::Drop => write!(f, "Nothing to respond with"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NetDataError {}
