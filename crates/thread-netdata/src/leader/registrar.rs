//! Server data admission: validation of incoming registrations, the merge
//! into the store, and RLOC-keyed removal.
//!
//! The merge works directly on the serialised store through the editor in
//! `netdata`. Removal loops deliberately do not advance their cursor after
//! deleting a record: the tail shifts left into the cursor position.

use super::{ChangedFlags, Leader, LeaderAction, UpdateStatus};
use crate::error::NetDataError;
use crate::hal::LeaderHost;
use crate::netdata::{find_prefix_in, find_service_in};
use crate::tlv::{self, border_router, has_route, tmf, TlvIter, TlvType, TLV_HEADER_LEN};
use crate::types::{rloc_match, router_id_from_rloc16, MatchMode, MIN_CONTEXT_ID};
use log::{debug, info, warn};

impl Leader {
    /// Serves a server data registration request: an optional RLOC16 TLV
    /// triggers pre-removal of that locator's entries, an optional Network
    /// Data TLV is validated and merged.
    pub(crate) fn handle_server_data<H: LeaderHost>(
        &mut self,
        payload: &[u8],
        src_rloc16: u16,
        now_ms: u64,
        host: &mut H,
    ) -> LeaderAction {
        if !host.is_leader() || self.waiting_for_net_data_sync {
            return LeaderAction::NoAction;
        }
        info!("Received server data registration from {:#06x}", src_rloc16);

        match tmf::find(payload, tmf::TYPE_RLOC16) {
            Ok(Some(value)) if value.len() >= 2 => {
                let rloc16 = u16::from_be_bytes([value[0], value[1]]);
                self.remove_border_router(rloc16, MatchMode::Rloc16, now_ms, host);
            }
            Ok(Some(_)) | Err(_) => return LeaderAction::NoAction,
            Ok(None) => {}
        }

        match tmf::find(payload, tmf::TYPE_NETWORK_DATA) {
            Ok(Some(network_data)) => {
                let _ = self.register_network_data(src_rloc16, network_data, now_ms, host);
            }
            Ok(None) => {}
            Err(_) => return LeaderAction::NoAction,
        }

        LeaderAction::SendEmptyAck
    }

    /// Admits a registration from `rloc16`: validates `network_data`,
    /// replaces the locator's current entries with it and publishes the
    /// resulting versions. On `NoBufs` the current addition is rolled back,
    /// earlier additions from the same request stay, and the host is told
    /// the Network Data is full.
    pub fn register_network_data<H: LeaderHost>(
        &mut self,
        rloc16: u16,
        network_data: &[u8],
        now_ms: u64,
        host: &mut H,
    ) -> Result<(), NetDataError> {
        let mut flags = ChangedFlags::default();
        let result = self.register_inner(rloc16, network_data, now_ms, &mut flags, host);

        self.increment_versions(flags, host);

        if result == Err(NetDataError::NoBufs) {
            host.signal_net_data_full();
        }
        if !self.is_clone {
            match result {
                Ok(()) => debug!(
                    "Registered network data for {:#06x} ({} bytes stored)",
                    rloc16,
                    self.net_data.len()
                ),
                Err(e) => warn!("Failed to register network data from {:#06x}: {}", rloc16, e),
            }
        }
        result
    }

    fn register_inner<H: LeaderHost>(
        &mut self,
        rloc16: u16,
        network_data: &[u8],
        now_ms: u64,
        flags: &mut ChangedFlags,
        host: &mut H,
    ) -> Result<(), NetDataError> {
        if !host.is_router_id_allocated(router_id_from_rloc16(rloc16)) {
            return Err(NetDataError::NoRoute);
        }

        validate(network_data, rloc16)?;

        // Drop the locator's current entries, keeping those re-asserted
        // verbatim in the incoming data (idempotent refresh).
        self.remove_rloc(rloc16, MatchMode::Rloc16, network_data, now_ms, flags);

        for off in TlvIter::new(network_data, 0, network_data.len()) {
            match tlv::tlv_type(network_data, off) {
                Some(TlvType::Prefix) => self.add_prefix(network_data, off, flags)?,
                Some(TlvType::Service) => self.add_service(network_data, off, flags)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Merges one incoming Prefix TLV, creating the destination Prefix TLV
    /// on demand. Always runs the empty-parent fix-up on exit so an aborted
    /// addition cannot leave an empty shell behind.
    fn add_prefix(
        &mut self,
        data: &[u8],
        src_off: usize,
        flags: &mut ChangedFlags,
    ) -> Result<(), NetDataError> {
        let bits = tlv::prefix::prefix_length(data, src_off);
        let prefix = tlv::prefix::prefix_bytes(data, src_off);

        let dst = match self.net_data.find_prefix(prefix, bits) {
            Some(off) => off,
            None => {
                let size = TLV_HEADER_LEN + tlv::prefix::value_len_for(bits);
                let off = self.net_data.append_tlv(size)?;
                tlv::prefix::init(
                    self.net_data.bytes_mut(),
                    off,
                    tlv::prefix::domain_id(data, src_off),
                    bits,
                    prefix,
                );
                off
            }
        };

        let mut result = Ok(());
        let sub_start = tlv::prefix::sub_tlvs_start(data, src_off);
        for sub in TlvIter::new(data, sub_start, tlv::next(data, src_off)) {
            result = match tlv::tlv_type(data, sub) {
                Some(TlvType::HasRoute) => self.add_has_route(data, sub, dst, flags),
                Some(TlvType::BorderRouter) => self.add_border_router(data, sub, dst, flags),
                _ => Ok(()),
            };
            if result.is_err() {
                break;
            }
        }

        self.update_prefix(dst);
        result
    }

    fn add_has_route(
        &mut self,
        data: &[u8],
        src_off: usize,
        dst_prefix: usize,
        flags: &mut ChangedFlags,
    ) -> Result<(), NetDataError> {
        let stable = tlv::is_stable(data, src_off);
        let entry = tlv::value(data, src_off);

        let dst_hr = tlv::prefix::find_sub_tlv(
            self.net_data.bytes(),
            dst_prefix,
            TlvType::HasRoute,
            Some(stable),
        );
        let dst_hr = match dst_hr {
            Some(off) => off,
            None => {
                // Room for the sub-TLV and its first entry, so the header
                // cannot be left dangling by a failed entry insert.
                if !self.net_data.can_insert(TLV_HEADER_LEN + has_route::ENTRY_LEN) {
                    return Err(NetDataError::NoBufs);
                }
                let at = tlv::next(self.net_data.bytes(), dst_prefix);
                self.net_data.insert_in(&[dst_prefix], at, TLV_HEADER_LEN)?;
                tlv::write_header(self.net_data.bytes_mut(), at, TlvType::HasRoute, stable, 0);
                at
            }
        };

        if tlv_contains_entry(self.net_data.bytes(), dst_hr, entry) {
            return Ok(());
        }
        if !self.net_data.can_insert(has_route::ENTRY_LEN) {
            return Err(NetDataError::NoBufs);
        }
        let at = tlv::next(self.net_data.bytes(), dst_hr);
        self.net_data.insert_in(&[dst_prefix, dst_hr], at, has_route::ENTRY_LEN)?;
        self.net_data.bytes_mut()[at..at + has_route::ENTRY_LEN].copy_from_slice(entry);
        flags.note(stable);
        Ok(())
    }

    fn add_border_router(
        &mut self,
        data: &[u8],
        src_off: usize,
        dst_prefix: usize,
        flags: &mut ChangedFlags,
    ) -> Result<(), NetDataError> {
        let stable = tlv::is_stable(data, src_off);
        let entry = tlv::value(data, src_off);

        let dst_br = tlv::prefix::find_sub_tlv(
            self.net_data.bytes(),
            dst_prefix,
            TlvType::BorderRouter,
            Some(stable),
        );
        let dst_ctx =
            tlv::prefix::find_sub_tlv(self.net_data.bytes(), dst_prefix, TlvType::Context, None);

        // Allocate the context id before any byte insertion so an exhausted
        // id table leaves the store untouched.
        let new_context_id = match dst_ctx {
            Some(_) => None,
            None => Some(
                self.context_ids
                    .get_unallocated_id()
                    .map_err(|_| NetDataError::NoBufs)?,
            ),
        };

        let dst_br = match dst_br {
            Some(off) => off,
            None => {
                let mut need = TLV_HEADER_LEN + border_router::ENTRY_LEN;
                if dst_ctx.is_none() {
                    need += TLV_HEADER_LEN + tlv::context::VALUE_LEN;
                }
                if !self.net_data.can_insert(need) {
                    return Err(NetDataError::NoBufs);
                }
                let at = tlv::next(self.net_data.bytes(), dst_prefix);
                self.net_data.insert_in(&[dst_prefix], at, TLV_HEADER_LEN)?;
                tlv::write_header(self.net_data.bytes_mut(), at, TlvType::BorderRouter, stable, 0);
                at
            }
        };

        let dst_ctx = match dst_ctx {
            Some(off) => off,
            None => {
                if !self
                    .net_data
                    .can_insert(border_router::ENTRY_LEN + TLV_HEADER_LEN + tlv::context::VALUE_LEN)
                {
                    return Err(NetDataError::NoBufs);
                }
                let at = tlv::next(self.net_data.bytes(), dst_prefix);
                let bits = tlv::prefix::prefix_length(self.net_data.bytes(), dst_prefix);
                self.net_data
                    .insert_in(&[dst_prefix], at, TLV_HEADER_LEN + tlv::context::VALUE_LEN)?;
                tlv::context::init(
                    self.net_data.bytes_mut(),
                    at,
                    new_context_id.unwrap_or(MIN_CONTEXT_ID),
                    bits,
                );
                at
            }
        };

        // Context fields must be final before the entry insert below shifts
        // any bytes past `dst_ctx`.
        if stable {
            tlv::set_stable(self.net_data.bytes_mut(), dst_ctx, true);
        }
        tlv::context::set_compress(self.net_data.bytes_mut(), dst_ctx);
        let id = tlv::context::context_id(self.net_data.bytes(), dst_ctx);
        self.context_ids.mark_in_use(id);

        if tlv_contains_entry(self.net_data.bytes(), dst_br, entry) {
            return Ok(());
        }
        if !self.net_data.can_insert(border_router::ENTRY_LEN) {
            return Err(NetDataError::NoBufs);
        }
        let at = tlv::next(self.net_data.bytes(), dst_br);
        self.net_data.insert_in(&[dst_prefix, dst_br], at, border_router::ENTRY_LEN)?;
        self.net_data.bytes_mut()[at..at + border_router::ENTRY_LEN].copy_from_slice(entry);
        flags.note(stable);
        Ok(())
    }

    /// Merges one incoming Service TLV, allocating a fresh service id when
    /// the `(enterprise, service_data)` key is new to the store.
    fn add_service(
        &mut self,
        data: &[u8],
        src_off: usize,
        flags: &mut ChangedFlags,
    ) -> Result<(), NetDataError> {
        let enterprise = tlv::service::enterprise_number(data, src_off);
        let service_data = tlv::service::service_data(data, src_off);

        let dst = match self.net_data.find_service(enterprise, service_data) {
            Some(off) => off,
            None => {
                let service_id = self.allocate_service_id().map_err(|_| NetDataError::NoBufs)?;
                let size = TLV_HEADER_LEN + tlv::service::value_len_for(service_data.len());
                let off = self.net_data.append_tlv(size)?;
                tlv::service::init(
                    self.net_data.bytes_mut(),
                    off,
                    service_id,
                    enterprise,
                    service_data,
                );
                off
            }
        };

        // Validation guarantees exactly one Server sub-TLV.
        let result = match tlv::find_in_range(
            data,
            tlv::service::sub_tlvs_start(data, src_off),
            tlv::next(data, src_off),
            TlvType::Server,
        ) {
            Some(server) => self.add_server(data, server, dst, flags),
            None => Err(NetDataError::Parse),
        };

        self.update_service(dst);
        result
    }

    fn add_server(
        &mut self,
        data: &[u8],
        src_off: usize,
        dst_service: usize,
        flags: &mut ChangedFlags,
    ) -> Result<(), NetDataError> {
        if contains_matching_server(self.net_data.bytes(), dst_service, data, src_off) {
            return Ok(());
        }
        let size = tlv::size(data, src_off);
        if !self.net_data.can_insert(size) {
            return Err(NetDataError::NoBufs);
        }
        let at = tlv::next(self.net_data.bytes(), dst_service);
        self.net_data.insert_in(&[dst_service], at, size)?;
        self.net_data.bytes_mut()[at..at + size].copy_from_slice(&data[src_off..src_off + size]);
        flags.note(tlv::is_stable(data, src_off));
        Ok(())
    }

    /// Removes entries matching `rloc16` under `mode`, except entries also
    /// present verbatim in `exclude` (a validated registration payload).
    pub(crate) fn remove_rloc(
        &mut self,
        rloc16: u16,
        mode: MatchMode,
        exclude: &[u8],
        now_ms: u64,
        flags: &mut ChangedFlags,
    ) {
        let mut cur = 0;
        while cur < self.net_data.len() {
            match tlv::tlv_type(self.net_data.bytes(), cur) {
                Some(TlvType::Prefix) => {
                    let data = self.net_data.bytes();
                    let bits = tlv::prefix::prefix_length(data, cur);
                    let mut prefix = [0u8; 16];
                    let n = tlv::prefix::prefix_size_bytes(bits);
                    prefix[..n].copy_from_slice(tlv::prefix::prefix_bytes(data, cur));

                    let excl_prefix = find_prefix_in(exclude, &prefix[..n], bits);
                    self.remove_rloc_in_prefix(cur, rloc16, mode, exclude, excl_prefix, now_ms, flags);

                    if self.update_prefix(cur) == UpdateStatus::TlvRemoved {
                        // The next TLV shifted into `cur`.
                        continue;
                    }
                }
                Some(TlvType::Service) => {
                    let data = self.net_data.bytes();
                    let enterprise = tlv::service::enterprise_number(data, cur);
                    let mut service_data = [0u8; 255];
                    let n = tlv::service::service_data_len(data, cur);
                    service_data[..n].copy_from_slice(tlv::service::service_data(data, cur));

                    let excl_service = find_service_in(exclude, enterprise, &service_data[..n]);
                    self.remove_rloc_in_service(cur, rloc16, mode, exclude, excl_service, flags);

                    if self.update_service(cur) == UpdateStatus::TlvRemoved {
                        continue;
                    }
                }
                _ => {}
            }
            cur = tlv::next(self.net_data.bytes(), cur);
        }
    }

    fn remove_rloc_in_prefix(
        &mut self,
        prefix_off: usize,
        rloc16: u16,
        mode: MatchMode,
        exclude: &[u8],
        excl_prefix: Option<usize>,
        now_ms: u64,
        flags: &mut ChangedFlags,
    ) {
        let mut cur = tlv::prefix::sub_tlvs_start(self.net_data.bytes(), prefix_off);
        while cur < tlv::next(self.net_data.bytes(), prefix_off) {
            let ty = tlv::tlv_type(self.net_data.bytes(), cur);
            if matches!(ty, Some(TlvType::HasRoute) | Some(TlvType::BorderRouter)) {
                let ty = ty.unwrap_or(TlvType::HasRoute);
                self.remove_rloc_entries(prefix_off, cur, ty, rloc16, mode, exclude, excl_prefix, flags);
                if tlv::value_len(self.net_data.bytes(), cur) == 0 {
                    self.net_data.remove_in(&[prefix_off], cur, TLV_HEADER_LEN);
                    continue;
                }
            }
            cur = tlv::next(self.net_data.bytes(), cur);
        }

        // A prefix keeps its compression context only while some Border
        // Router still advertises it; otherwise the context id is parked
        // for deferred reuse rather than dropped immediately.
        let data = self.net_data.bytes();
        if let Some(ctx) = tlv::prefix::find_sub_tlv(data, prefix_off, TlvType::Context, None) {
            let id = tlv::context::context_id(data, ctx);
            if tlv::prefix::find_sub_tlv(data, prefix_off, TlvType::BorderRouter, None).is_none() {
                tlv::context::clear_compress(self.net_data.bytes_mut(), ctx);
                if let Some(deadline) = self.context_ids.schedule_to_remove(id, now_ms) {
                    self.fire_at_if_earlier(deadline);
                }
            } else {
                tlv::context::set_compress(self.net_data.bytes_mut(), ctx);
                self.context_ids.mark_in_use(id);
            }
        }
    }

    /// Removes matching fixed-size entries from one HasRoute or BorderRouter
    /// sub-TLV of the prefix at `prefix_off`.
    #[allow(clippy::too_many_arguments)]
    fn remove_rloc_entries(
        &mut self,
        prefix_off: usize,
        sub_off: usize,
        ty: TlvType,
        rloc16: u16,
        mode: MatchMode,
        exclude: &[u8],
        excl_prefix: Option<usize>,
        flags: &mut ChangedFlags,
    ) {
        let entry_len = match ty {
            TlvType::HasRoute => has_route::ENTRY_LEN,
            _ => border_router::ENTRY_LEN,
        };
        let stable = tlv::is_stable(self.net_data.bytes(), sub_off);

        let mut entry = tlv::value_start(sub_off);
        while entry < tlv::next(self.net_data.bytes(), sub_off) {
            let mut bytes = [0u8; border_router::ENTRY_LEN];
            bytes[..entry_len].copy_from_slice(&self.net_data.bytes()[entry..entry + entry_len]);
            let entry_rloc = u16::from_be_bytes([bytes[0], bytes[1]]);

            let excluded = excl_prefix.is_some_and(|xp| {
                tlv::prefix::find_sub_tlv(exclude, xp, ty, Some(stable))
                    .is_some_and(|xs| tlv_contains_entry(exclude, xs, &bytes[..entry_len]))
            });

            if rloc_match(entry_rloc, rloc16, mode) && !excluded {
                flags.note(stable);
                self.net_data.remove_in(&[prefix_off, sub_off], entry, entry_len);
                continue;
            }
            entry += entry_len;
        }
    }

    fn remove_rloc_in_service(
        &mut self,
        service_off: usize,
        rloc16: u16,
        mode: MatchMode,
        exclude: &[u8],
        excl_service: Option<usize>,
        flags: &mut ChangedFlags,
    ) {
        let mut cur = tlv::service::sub_tlvs_start(self.net_data.bytes(), service_off);
        while cur < tlv::next(self.net_data.bytes(), service_off) {
            let data = self.net_data.bytes();
            if tlv::tlv_type(data, cur) == Some(TlvType::Server) {
                let matched = rloc_match(tlv::server::server16(data, cur), rloc16, mode);
                let excluded = excl_service
                    .is_some_and(|xs| contains_matching_server(exclude, xs, data, cur));
                if matched && !excluded {
                    flags.note(tlv::is_stable(data, cur));
                    let size = tlv::size(data, cur);
                    self.net_data.remove_in(&[service_off], cur, size);
                    continue;
                }
            }
            cur = tlv::next(self.net_data.bytes(), cur);
        }
    }
}

/// True when the entry-list TLV at `tlv_off` already carries `entry`.
fn tlv_contains_entry(data: &[u8], tlv_off: usize, entry: &[u8]) -> bool {
    tlv::value(data, tlv_off)
        .chunks_exact(entry.len())
        .any(|chunk| chunk == entry)
}

/// True when the Service TLV at `service_off` in `store` carries a Server
/// sub-TLV byte-identical to the one at `server_off` in `data`.
fn contains_matching_server(store: &[u8], service_off: usize, data: &[u8], server_off: usize) -> bool {
    let needle = &data[server_off..server_off + tlv::size(data, server_off)];
    TlvIter::new(
        store,
        tlv::service::sub_tlvs_start(store, service_off),
        tlv::next(store, service_off),
    )
    .any(|sub| {
        tlv::tlv_type(store, sub) == Some(TlvType::Server)
            && &store[sub..sub + tlv::size(store, sub)] == needle
    })
}

/// Structural validation of a registration: well-formed TLV runs, no
/// duplicate Prefix or Service keys, and every entry owned by `rloc16`.
fn validate(data: &[u8], rloc16: u16) -> Result<(), NetDataError> {
    let end = data.len();
    let mut cur = 0;

    while cur < end {
        if cur + TLV_HEADER_LEN > end {
            return Err(NetDataError::Parse);
        }
        let nxt = tlv::next(data, cur);
        if nxt > end {
            return Err(NetDataError::Parse);
        }

        match tlv::tlv_type(data, cur) {
            Some(TlvType::Prefix) => {
                if !tlv::prefix::is_valid(data, cur) {
                    return Err(NetDataError::Parse);
                }
                // Duplicates are checked against the already-validated
                // leading segment only.
                let bits = tlv::prefix::prefix_length(data, cur);
                if find_prefix_in(&data[..cur], tlv::prefix::prefix_bytes(data, cur), bits).is_some()
                {
                    return Err(NetDataError::Parse);
                }
                validate_prefix(data, cur, rloc16)?;
            }
            Some(TlvType::Service) => {
                if !tlv::service::is_valid(data, cur) {
                    return Err(NetDataError::Parse);
                }
                let enterprise = tlv::service::enterprise_number(data, cur);
                if find_service_in(&data[..cur], enterprise, tlv::service::service_data(data, cur))
                    .is_some()
                {
                    return Err(NetDataError::Parse);
                }
                validate_service(data, cur, rloc16)?;
            }
            _ => {}
        }
        cur = nxt;
    }
    Ok(())
}

/// A registered Prefix TLV may carry at most one stable and one temporary
/// instance each of HasRoute and BorderRouter, every instance holding a
/// single entry owned by `rloc16`, and at least one such sub-TLV overall.
fn validate_prefix(data: &[u8], offset: usize, rloc16: u16) -> Result<(), NetDataError> {
    let sub_end = tlv::next(data, offset);
    let mut cur = tlv::prefix::sub_tlvs_start(data, offset);
    let mut found = [false; 4]; // stable/temp HasRoute, stable/temp BorderRouter

    while cur < sub_end {
        if cur + TLV_HEADER_LEN > sub_end || tlv::next(data, cur) > sub_end {
            return Err(NetDataError::Parse);
        }
        let stable = tlv::is_stable(data, cur);
        match tlv::tlv_type(data, cur) {
            Some(TlvType::HasRoute) => {
                let slot = usize::from(stable);
                if found[slot] || tlv::value_len(data, cur) != has_route::ENTRY_LEN {
                    return Err(NetDataError::Parse);
                }
                found[slot] = true;
                if has_route::entry_rloc16(data, tlv::value_start(cur)) != rloc16 {
                    return Err(NetDataError::Parse);
                }
            }
            Some(TlvType::BorderRouter) => {
                let slot = 2 + usize::from(stable);
                if found[slot] || tlv::value_len(data, cur) != border_router::ENTRY_LEN {
                    return Err(NetDataError::Parse);
                }
                found[slot] = true;
                if border_router::entry_rloc16(data, tlv::value_start(cur)) != rloc16 {
                    return Err(NetDataError::Parse);
                }
            }
            _ => {}
        }
        cur = tlv::next(data, cur);
    }

    if found.iter().any(|&f| f) {
        Ok(())
    } else {
        Err(NetDataError::Parse)
    }
}

/// A registered Service TLV must carry exactly one well-formed Server
/// sub-TLV owned by `rloc16`.
fn validate_service(data: &[u8], offset: usize, rloc16: u16) -> Result<(), NetDataError> {
    let sub_end = tlv::next(data, offset);
    let mut cur = tlv::service::sub_tlvs_start(data, offset);
    let mut found_server = false;

    while cur < sub_end {
        if cur + TLV_HEADER_LEN > sub_end || tlv::next(data, cur) > sub_end {
            return Err(NetDataError::Parse);
        }
        if tlv::tlv_type(data, cur) == Some(TlvType::Server) {
            if found_server {
                return Err(NetDataError::Parse);
            }
            found_server = true;
            if !tlv::server::is_valid(data, cur) || tlv::server::server16(data, cur) != rloc16 {
                return Err(NetDataError::Parse);
            }
        }
        cur = tlv::next(data, cur);
    }

    if found_server {
        Ok(())
    } else {
        Err(NetDataError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn prefix_tlv(bits: u8, prefix: &[u8], subs: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        let n = tlv::prefix::prefix_size_bytes(bits);
        let sub_len: usize = subs.iter().map(|s| s.len()).sum();
        out.push(TlvType::Prefix.raw() << 1);
        out.push((2 + n + sub_len) as u8);
        out.push(0); // domain id
        out.push(bits);
        out.extend_from_slice(&prefix[..n]);
        for sub in subs {
            out.extend_from_slice(sub);
        }
        out
    }

    fn border_router_sub(stable: bool, rloc16: u16, flags: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.push((TlvType::BorderRouter.raw() << 1) | u8::from(stable));
        out.push(border_router::ENTRY_LEN as u8);
        out.extend_from_slice(&rloc16.to_be_bytes());
        out.extend_from_slice(&flags.to_be_bytes());
        out
    }

    fn has_route_sub(stable: bool, rloc16: u16, flags: u8) -> Vec<u8> {
        let mut out = Vec::new();
        out.push((TlvType::HasRoute.raw() << 1) | u8::from(stable));
        out.push(has_route::ENTRY_LEN as u8);
        out.extend_from_slice(&rloc16.to_be_bytes());
        out.push(flags);
        out
    }

    const PREFIX: [u8; 8] = [0xfd, 0x00, 0xab, 0xcd, 0, 0, 0, 0];

    #[test]
    fn test_validate_accepts_single_border_router() {
        let data = prefix_tlv(64, &PREFIX, &[&border_router_sub(true, 0x0400, 0x0042)]);
        assert_eq!(validate(&data, 0x0400), Ok(()));
    }

    #[test]
    fn test_validate_rejects_foreign_rloc() {
        let data = prefix_tlv(64, &PREFIX, &[&border_router_sub(true, 0x0800, 0)]);
        assert_eq!(validate(&data, 0x0400), Err(NetDataError::Parse));
    }

    #[test]
    fn test_validate_rejects_duplicate_prefix() {
        let mut data = prefix_tlv(64, &PREFIX, &[&border_router_sub(true, 0x0400, 0)]);
        data.extend(prefix_tlv(64, &PREFIX, &[&has_route_sub(false, 0x0400, 0)]));
        assert_eq!(validate(&data, 0x0400), Err(NetDataError::Parse));
    }

    #[test]
    fn test_validate_rejects_two_stable_instances() {
        let data = prefix_tlv(
            64,
            &PREFIX,
            &[
                &has_route_sub(true, 0x0400, 0),
                &has_route_sub(true, 0x0400, 1),
            ],
        );
        assert_eq!(validate(&data, 0x0400), Err(NetDataError::Parse));
    }

    #[test]
    fn test_validate_rejects_multi_entry_sub_tlv() {
        let mut sub = has_route_sub(true, 0x0400, 0);
        sub[1] = 2 * has_route::ENTRY_LEN as u8;
        sub.extend_from_slice(&0x0400u16.to_be_bytes());
        sub.push(0);
        let data = prefix_tlv(64, &PREFIX, &[&sub]);
        assert_eq!(validate(&data, 0x0400), Err(NetDataError::Parse));
    }

    #[test]
    fn test_validate_rejects_prefix_without_route_subs() {
        let data = prefix_tlv(64, &PREFIX, &[]);
        assert_eq!(validate(&data, 0x0400), Err(NetDataError::Parse));
    }

    #[test]
    fn test_validate_rejects_truncated_sub_tlv() {
        let mut data = prefix_tlv(64, &PREFIX, &[&border_router_sub(true, 0x0400, 0)]);
        // Claim more sub-TLV bytes than the prefix value carries. The sub
        // header sits right after the 8-byte prefix.
        data[13] = 10;
        assert_eq!(validate(&data, 0x0400), Err(NetDataError::Parse));
    }

    #[test]
    fn test_validate_service_requires_single_server() {
        let mut data = Vec::new();
        data.push(TlvType::Service.raw() << 1);
        data.push((tlv::service::FIXED_VALUE_LEN + 1) as u8);
        data.push(0x01);
        data.extend_from_slice(&44970u32.to_be_bytes());
        data.push(1);
        data.push(0x5c);
        assert_eq!(validate(&data, 0x0400), Err(NetDataError::Parse));

        // Append a Server sub-TLV owned by the registrant.
        data[1] += 2 + 2;
        data.push(TlvType::Server.raw() << 1 | 1);
        data.push(2);
        data.extend_from_slice(&0x0400u16.to_be_bytes());
        assert_eq!(validate(&data, 0x0400), Ok(()));
    }
}
