//! Reconciliation after the Leader role is restored from persisted state.
//!
//! The persisted Network Data may reference routers that were deallocated
//! around the reset, and the in-memory context id table starts empty. One
//! sweep drops the stale entries and rebuilds the id table from whatever
//! survived in the store.

use super::{ChangedFlags, Leader};
use crate::hal::LeaderHost;
use crate::netdata::ServerIterator;
use crate::tlv::{self, TlvType};
use crate::types::{router_id_from_rloc16, MatchMode};
use log::info;

impl Leader {
    /// Invoked when the net-data sync signal arrives after
    /// `start(RestoringLeaderRoleAfterReset)`. Unblocks admissions, removes
    /// entries of routers no longer allocated and resynchronises the
    /// context id table with the surviving Context sub-TLVs.
    pub fn handle_network_data_restored<H: LeaderHost>(&mut self, now_ms: u64, host: &mut H) {
        self.waiting_for_net_data_sync = false;
        // Drop the armed sync timeout; context reclamation below re-arms.
        self.clear_timer();

        let mut flags = ChangedFlags::default();
        let mut iter = ServerIterator::default();

        // Covers the edge case of a reset right after a router id was
        // released but before the updated Network Data reached the other
        // routers.
        while let Some(rloc16) = self.net_data.next_server(&mut iter) {
            if host.is_router_id_allocated(router_id_from_rloc16(rloc16)) {
                continue;
            }
            info!("Removing entries of unallocated router {:#06x} after restore", rloc16);
            self.remove_rloc(rloc16, MatchMode::RouterId, &[], now_ms, &mut flags);
            // The store shifted under the cursor; restart the walk.
            iter = ServerIterator::default();
        }

        self.increment_versions(flags, host);

        let mut cur = 0;
        while cur < self.net_data.len() {
            let data = self.net_data.bytes();
            if tlv::tlv_type(data, cur) == Some(TlvType::Prefix) {
                if let Some(ctx) = tlv::prefix::find_sub_tlv(data, cur, TlvType::Context, None) {
                    let id = tlv::context::context_id(data, ctx);
                    let compress = tlv::context::is_compress(data, ctx);
                    self.context_ids.mark_in_use(id);
                    if !compress {
                        if let Some(deadline) = self.context_ids.schedule_to_remove(id, now_ms) {
                            self.fire_at_if_earlier(deadline);
                        }
                    }
                }
            }
            cur = tlv::next(self.net_data.bytes(), cur);
        }
    }
}
