//! MGMT_COMM_SET / MGMT_COMM_GET handling.
//!
//! The Leader owns the Commissioning Data TLV. A Commissioner may replace
//! the set only under its current session id, may never write the Border
//! Agent Locator (the Leader splices the stored one back in), and gets the
//! stored sub-TLVs back on request, optionally filtered.

use super::{Leader, LeaderAction};
use crate::hal::LeaderHost;
use crate::meshcop::{self, MeshcopIter, State};
use crate::types::NETWORK_DATA_MAX_SIZE;
use alloc::vec::Vec;
use log::info;

impl Leader {
    pub(crate) fn handle_commissioner_set<H: LeaderHost>(
        &mut self,
        payload: &[u8],
        host: &mut H,
    ) -> LeaderAction {
        let state = self.evaluate_commissioner_set(payload, host);
        if !host.is_leader() {
            // Leadership was lost mid-handling; nobody to speak for.
            return LeaderAction::NoAction;
        }
        info!("Sent commissioner set response: {:?}", state);
        LeaderAction::SendResponse(meshcop::state_tlv(state).to_vec())
    }

    fn evaluate_commissioner_set<H: LeaderHost>(&mut self, payload: &[u8], host: &mut H) -> State {
        if !host.is_leader() || self.waiting_for_net_data_sync {
            return State::Reject;
        }
        if payload.len() > NETWORK_DATA_MAX_SIZE {
            return State::Reject;
        }

        let mut tlvs = [0u8; NETWORK_DATA_MAX_SIZE];
        let mut length = payload.len();
        tlvs[..length].copy_from_slice(payload);

        let mut session_id = None;
        let mut has_valid_tlv = false;

        // Unknown sub-TLVs ride along, but the set must carry at least one
        // recognised payload TLV, must name the session, and must not try
        // to write the Border Agent Locator.
        for item in MeshcopIter::new(payload) {
            let Ok(t) = item else {
                return State::Reject;
            };
            match t.ty {
                meshcop::JOINER_UDP_PORT | meshcop::STEERING_DATA => has_valid_tlv = true,
                meshcop::BORDER_AGENT_LOCATOR => return State::Reject,
                meshcop::COMMISSIONER_SESSION_ID => {
                    session_id = meshcop::read_u16(t.value);
                    if session_id.is_none() {
                        return State::Reject;
                    }
                }
                _ => {}
            }
        }

        if session_id.is_none() || !has_valid_tlv {
            return State::Reject;
        }

        if let Some(stored) = self.net_data.commissioning_data() {
            for item in MeshcopIter::new(stored) {
                let Ok(t) = item else {
                    break;
                };
                if t.ty == meshcop::COMMISSIONER_SESSION_ID {
                    if meshcop::read_u16(t.value) != session_id {
                        return State::Reject;
                    }
                } else if t.ty == meshcop::BORDER_AGENT_LOCATOR {
                    // The Leader owns this field; carry it over.
                    let size = t.size();
                    if length + size > tlvs.len() {
                        return State::Reject;
                    }
                    tlvs[length..length + size].copy_from_slice(&stored[t.offset..t.offset + size]);
                    length += size;
                }
            }
        }

        if self.net_data.set_commissioning_data(&tlvs[..length]).is_ok() {
            self.bump_versions(false, host);
        }
        State::Accept
    }

    pub(crate) fn handle_commissioner_get<H: LeaderHost>(
        &mut self,
        payload: &[u8],
        host: &mut H,
    ) -> LeaderAction {
        let mut filter: &[u8] = &[];
        if host.is_leader() && !self.waiting_for_net_data_sync {
            if let Some(get) = meshcop::find(payload, meshcop::GET) {
                filter = get.value;
            }
        }
        if !host.is_leader() {
            return LeaderAction::NoAction;
        }
        self.send_commissioning_get_response(filter)
    }

    /// Builds the MGMT_COMM_GET response: the requested sub-TLVs in request
    /// order (unknown types skipped silently), or the full Commissioning
    /// Data value without a filter. With nothing stored, no response is
    /// sent at all.
    fn send_commissioning_get_response(&self, filter: &[u8]) -> LeaderAction {
        let Some(data) = self.net_data.commissioning_data() else {
            return LeaderAction::NoAction;
        };
        if data.is_empty() {
            return LeaderAction::NoAction;
        }

        let mut out = Vec::new();
        if filter.is_empty() {
            out.extend_from_slice(data);
        } else {
            for &ty in filter {
                for item in MeshcopIter::new(data) {
                    let Ok(t) = item else {
                        break;
                    };
                    if t.ty == ty {
                        out.extend_from_slice(&data[t.offset..t.offset + t.size()]);
                        break;
                    }
                }
            }
        }
        info!("Sent commissioner get response ({} bytes)", out.len());
        LeaderAction::SendResponse(out)
    }
}
