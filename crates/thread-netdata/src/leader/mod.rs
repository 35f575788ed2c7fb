//! The Network Data Leader.
//!
//! The Leader owns the canonical Network Data store of its partition:
//! on-mesh prefixes, external routes, services, commissioning data and
//! 6LoWPAN compression contexts. Border Routers register their server data
//! over TMF; the Leader validates, merges and republishes it under
//! monotonically increasing version counters.

mod commissioning;
mod context_ids;
mod reconcile;
mod registrar;

use crate::error::NetDataError;
use crate::hal::LeaderHost;
use crate::meshcop;
use crate::netdata::NetworkData;
use crate::tlv::{self, TlvType};
use crate::types::{MatchMode, MAX_SERVICE_ID, MIN_SERVICE_ID};
use alloc::vec::Vec;
use context_ids::ContextIds;
use log::{debug, info};

/// Static Leader configuration.
#[derive(Debug, Clone, Copy)]
pub struct LeaderConfig {
    /// How long a released 6LoWPAN context id stays parked before reuse.
    /// Long enough for the partition to stop compressing against it.
    pub context_reuse_delay_ms: u64,
    /// Bounded wait for the restored Network Data to be synced after a
    /// leader-role restore; on expiry the device drops the Leader role.
    pub max_net_data_sync_wait_ms: u64,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        LeaderConfig {
            context_reuse_delay_ms: 300_000,
            max_net_data_sync_wait_ms: 60_000,
        }
    }
}

/// How the Leader role was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderStartMode {
    /// Freshly elected Leader with an empty store.
    FreshLeaderStart,
    /// Leader role restored from persisted state after a reset; admissions
    /// stay blocked until the net-data sync signal arrives.
    RestoringLeaderRoleAfterReset,
}

/// TMF request targets served by the Leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uri {
    /// Server data registration from a Border Router or Service provider.
    ServerData,
    /// MGMT_COMM_SET.req from a Commissioner.
    CommissionerSet,
    /// MGMT_COMM_GET.req from a Commissioner.
    CommissionerGet,
}

/// Outbound action requested from the transport after handling a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderAction {
    /// No response is sent.
    NoAction,
    /// Acknowledge the request with an empty ACK.
    SendEmptyAck,
    /// Send the given payload as the response body.
    SendResponse(Vec<u8>),
}

/// A 6LoWPAN compression context published in the Network Data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowpanContext {
    pub context_id: u8,
    pub prefix: [u8; 16],
    /// Significant prefix bits.
    pub prefix_length: u8,
    pub compress: bool,
    pub stable: bool,
}

/// Accumulates which portions of the store a handler touched, so version
/// counters are bumped once per admitted mutation.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ChangedFlags {
    changed: bool,
    stable_changed: bool,
}

impl ChangedFlags {
    pub fn note(&mut self, stable: bool) {
        self.changed = true;
        if stable {
            self.stable_changed = true;
        }
    }

    pub fn did_change(&self) -> bool {
        self.changed
    }

    pub fn did_stable_change(&self) -> bool {
        self.stable_changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateStatus {
    TlvUpdated,
    TlvRemoved,
}

/// The authoritative Network Data subsystem of an elected Leader.
pub struct Leader {
    pub(crate) net_data: NetworkData,
    version: u8,
    stable_version: u8,
    pub(crate) context_ids: ContextIds,
    pub(crate) waiting_for_net_data_sync: bool,
    timer_fire_at: Option<u64>,
    pub(crate) is_clone: bool,
    config: LeaderConfig,
}

impl Leader {
    pub fn new(config: LeaderConfig) -> Self {
        Leader {
            net_data: NetworkData::new(),
            version: 0,
            stable_version: 0,
            context_ids: ContextIds::new(config.context_reuse_delay_ms),
            waiting_for_net_data_sync: false,
            timer_fire_at: None,
            is_clone: false,
            config,
        }
    }

    /// Clears the store and the context id table.
    pub fn reset(&mut self) {
        self.net_data.clear();
        self.context_ids.clear();
    }

    /// Begins serving as Leader. In the restoring mode, admissions stay
    /// blocked and a bounded wait for the net-data sync signal is armed.
    pub fn start(&mut self, mode: LeaderStartMode, now_ms: u64) {
        debug_assert!(!self.is_clone);
        self.waiting_for_net_data_sync = mode == LeaderStartMode::RestoringLeaderRoleAfterReset;
        if self.waiting_for_net_data_sync {
            self.fire_at(now_ms + self.config.max_net_data_sync_wait_ms);
        }
    }

    pub fn network_data(&self) -> &NetworkData {
        &self.net_data
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn stable_version(&self) -> u8 {
        self.stable_version
    }

    pub fn is_waiting_for_net_data_sync(&self) -> bool {
        self.waiting_for_net_data_sync
    }

    /// Loads persisted store bytes and version counters. Must run before
    /// `start(RestoringLeaderRoleAfterReset)`.
    pub fn restore_from_persisted(
        &mut self,
        data: &[u8],
        version: u8,
        stable_version: u8,
    ) -> Result<(), NetDataError> {
        self.net_data.restore(data)?;
        self.version = version;
        self.stable_version = stable_version;
        Ok(())
    }

    /// Dispatches an inbound TMF request. `src_rloc16` is the routing
    /// locator of the sender as seen by the transport.
    pub fn process_request<H: LeaderHost>(
        &mut self,
        uri: Uri,
        payload: &[u8],
        src_rloc16: u16,
        now_ms: u64,
        host: &mut H,
    ) -> LeaderAction {
        match uri {
            Uri::ServerData => self.handle_server_data(payload, src_rloc16, now_ms, host),
            Uri::CommissionerSet => self.handle_commissioner_set(payload, host),
            Uri::CommissionerGet => self.handle_commissioner_get(payload, host),
        }
    }

    /// Absolute time (ms) of the next scheduled event, for the host's event
    /// loop to sleep until.
    pub fn next_action_time(&self) -> Option<u64> {
        self.timer_fire_at
    }

    /// Drives time-based work: the post-restore sync timeout and deferred
    /// context id reclamation.
    pub fn tick<H: LeaderHost>(&mut self, now_ms: u64, host: &mut H) {
        let Some(deadline) = self.timer_fire_at else {
            return;
        };
        if now_ms < deadline {
            return;
        }
        self.timer_fire_at = None;

        if self.waiting_for_net_data_sync {
            info!("Timed out waiting for net data sync after restoring leader role");
            host.become_detached();
            return;
        }

        let (released, next) = self.context_ids.handle_timer(now_ms);
        for id in released {
            debug!("Reclaiming context id {}", id);
            self.remove_context(id, host);
        }
        if let Some(t) = next {
            self.fire_at(t);
        }
    }

    /// Bumps the version counter (Leader role permitting).
    pub fn increment_version<H: LeaderHost>(&mut self, host: &mut H) {
        if host.is_leader() {
            self.bump_versions(false, host);
        }
    }

    /// Bumps both the version and stable version counters.
    pub fn increment_version_and_stable_version<H: LeaderHost>(&mut self, host: &mut H) {
        if host.is_leader() {
            self.bump_versions(true, host);
        }
    }

    pub(crate) fn increment_versions<H: LeaderHost>(&mut self, flags: ChangedFlags, host: &mut H) {
        if flags.did_change() {
            self.bump_versions(flags.did_stable_change(), host);
        }
    }

    pub(crate) fn bump_versions<H: LeaderHost>(&mut self, include_stable: bool, host: &mut H) {
        if self.is_clone {
            return;
        }
        if include_stable {
            self.stable_version = self.stable_version.wrapping_add(1);
        }
        self.version = self.version.wrapping_add(1);
        host.signal_net_data_changed();
    }

    /// Removes every entry owned by `rloc16` under the given match mode and
    /// publishes the change.
    pub fn remove_border_router<H: LeaderHost>(
        &mut self,
        rloc16: u16,
        mode: MatchMode,
        now_ms: u64,
        host: &mut H,
    ) {
        let mut flags = ChangedFlags::default();
        self.remove_rloc(rloc16, mode, &[], now_ms, &mut flags);
        self.increment_versions(flags, host);
    }

    /// Strips the Context sub-TLV carrying `context_id` from every Prefix
    /// TLV once its reuse delay has elapsed. Both versions are bumped even
    /// when no Context sub-TLV was present.
    pub(crate) fn remove_context<H: LeaderHost>(&mut self, context_id: u8, host: &mut H) {
        let mut cur = 0;
        while cur < self.net_data.len() {
            if tlv::tlv_type(self.net_data.bytes(), cur) == Some(TlvType::Prefix) {
                self.remove_context_in_prefix(cur, context_id);
                if self.update_prefix(cur) == UpdateStatus::TlvRemoved {
                    // The next TLV shifted into `cur`.
                    continue;
                }
            }
            cur = tlv::next(self.net_data.bytes(), cur);
        }
        self.bump_versions(true, host);
    }

    fn remove_context_in_prefix(&mut self, prefix_off: usize, context_id: u8) {
        let mut cur = tlv::prefix::sub_tlvs_start(self.net_data.bytes(), prefix_off);
        while cur < tlv::next(self.net_data.bytes(), prefix_off) {
            let data = self.net_data.bytes();
            if tlv::tlv_type(data, cur) == Some(TlvType::Context)
                && tlv::context::context_id(data, cur) == context_id
            {
                let size = tlv::size(data, cur);
                self.net_data.remove_in(&[prefix_off], cur, size);
                continue;
            }
            cur = tlv::next(self.net_data.bytes(), cur);
        }
    }

    /// Post-edit fix-up of a Prefix TLV: removes it when no sub-TLVs remain,
    /// otherwise recomputes its stable flag from the sub-TLVs.
    pub(crate) fn update_prefix(&mut self, offset: usize) -> UpdateStatus {
        let sub_start = tlv::prefix::sub_tlvs_start(self.net_data.bytes(), offset);
        self.update_tlv(offset, sub_start)
    }

    /// Post-edit fix-up of a Service TLV, same contract as `update_prefix`.
    pub(crate) fn update_service(&mut self, offset: usize) -> UpdateStatus {
        let sub_start = tlv::service::sub_tlvs_start(self.net_data.bytes(), offset);
        self.update_tlv(offset, sub_start)
    }

    fn update_tlv(&mut self, offset: usize, sub_start: usize) -> UpdateStatus {
        let end = tlv::next(self.net_data.bytes(), offset);
        if sub_start == end {
            self.net_data.remove_tlv(offset);
            return UpdateStatus::TlvRemoved;
        }
        let data = self.net_data.bytes();
        let stable = tlv::TlvIter::new(data, sub_start, end).any(|sub| tlv::is_stable(data, sub));
        tlv::set_stable(self.net_data.bytes_mut(), offset, stable);
        UpdateStatus::TlvUpdated
    }

    pub(crate) fn allocate_service_id(&self) -> Result<u8, NetDataError> {
        if self.is_clone {
            return Ok(MIN_SERVICE_ID);
        }
        for id in MIN_SERVICE_ID..=MAX_SERVICE_ID {
            if self.net_data.find_service_by_id(id).is_none() {
                info!("Allocated service id {}", id);
                return Ok(id);
            }
        }
        Err(NetDataError::NotFound)
    }

    /// Looks up the published compression context carrying `context_id`.
    pub fn context_by_id(&self, context_id: u8) -> Option<LowpanContext> {
        let data = self.net_data.bytes();
        for off in self.net_data.tlvs() {
            if tlv::tlv_type(data, off) != Some(TlvType::Prefix) {
                continue;
            }
            let Some(ctx) = tlv::prefix::find_sub_tlv(data, off, TlvType::Context, None) else {
                continue;
            };
            if tlv::context::context_id(data, ctx) != context_id {
                continue;
            }
            let mut prefix = [0u8; 16];
            let bytes = tlv::prefix::prefix_bytes(data, off);
            prefix[..bytes.len()].copy_from_slice(bytes);
            return Some(LowpanContext {
                context_id,
                prefix,
                prefix_length: tlv::prefix::prefix_length(data, off),
                compress: tlv::context::is_compress(data, ctx),
                stable: tlv::is_stable(data, ctx),
            });
        }
        None
    }

    /// Reads the commissioner session id out of the stored Commissioning
    /// Data TLV.
    pub fn commissioning_session_id(&self) -> Result<u16, NetDataError> {
        let data = self.net_data.commissioning_data().ok_or(NetDataError::NotFound)?;
        meshcop::find(data, meshcop::COMMISSIONER_SESSION_ID)
            .and_then(|t| meshcop::read_u16(t.value))
            .ok_or(NetDataError::NotFound)
    }

    /// Dry-runs registering `network_data` (replacing any entries owned by
    /// `old_rloc16` first) against an inert copy of the store, to learn
    /// whether the update would still fit. Only meaningful on a device that
    /// is not itself the Leader; `signal_net_data_full` fires on overflow.
    pub fn check_for_net_data_getting_full<H: LeaderHost>(
        &self,
        network_data: &[u8],
        old_rloc16: Option<u16>,
        now_ms: u64,
        host: &mut H,
    ) {
        if host.is_leader() {
            return;
        }
        let mut probe = self.clone_inert();
        if let Some(old) = old_rloc16 {
            probe.remove_border_router(old, MatchMode::Rloc16, now_ms, host);
        }
        let _ = probe.register_network_data(host.rloc16(), network_data, now_ms, host);
    }

    /// An inert copy: same store and counters, but it never publishes
    /// versions, starts timers, or consumes real service/context ids.
    fn clone_inert(&self) -> Leader {
        let mut probe = Leader::new(self.config);
        probe.is_clone = true;
        probe.context_ids.mark_as_clone();
        probe.net_data = self.net_data.clone();
        probe.version = self.version;
        probe.stable_version = self.stable_version;
        probe
    }

    pub(crate) fn fire_at(&mut self, deadline_ms: u64) {
        self.timer_fire_at = Some(deadline_ms);
    }

    pub(crate) fn clear_timer(&mut self) {
        self.timer_fire_at = None;
    }

    pub(crate) fn fire_at_if_earlier(&mut self, deadline_ms: u64) {
        match self.timer_fire_at {
            Some(current) if current <= deadline_ms => {}
            _ => self.timer_fire_at = Some(deadline_ms),
        }
    }
}
