//! Host abstraction for the Network Data Leader.
//!
//! The Leader core is platform-agnostic: MLE role state, the Router Table
//! and change notification are owned by the surrounding Thread stack and
//! reached through this trait. Tests supply a mock implementation.

/// Services the surrounding stack provides to the Leader.
pub trait LeaderHost {
    /// True while this device holds the Leader role in its partition.
    fn is_leader(&self) -> bool;

    /// Returns the RLOC16 assigned to this device.
    fn rloc16(&self) -> u16;

    /// Drops the Leader role and detaches from the partition. Invoked when
    /// the bounded wait for net-data sync after a leader-role restore
    /// elapses without the data arriving.
    fn become_detached(&mut self);

    /// True if `router_id` is currently allocated in the Router Table.
    fn is_router_id_allocated(&self, router_id: u8) -> bool;

    /// Notifies downstream peers that the Network Data content changed.
    /// Emitted at most once per admitted mutation, strictly after the
    /// mutation it reflects.
    fn signal_net_data_changed(&mut self);

    /// Signals that a (possibly hypothetical) update no longer fits in the
    /// Network Data store.
    fn signal_net_data_full(&mut self);
}
