//! A thin WebRTC track adapter, grounded on go2rtc's `pkg/webrtc` `Conn`:
//! it accepts a remote SDP offer and would dispatch each negotiated track
//! to the router the way `Conn.OnTrack` does, but producing the SDP
//! answer requires a full ICE/DTLS/SCTP stack, which is out of scope (see
//! `SPEC_FULL.md` §1 Non-goals) — `get_answer` always returns
//! `Error::Unsupported`.

use crate::error::{Error, Result};
use crate::media::unmarshal_sdp;
use crate::media::Media;

pub struct WebrtcTrackAdapter {
    offer_medias: Vec<Media>,
}

impl WebrtcTrackAdapter {
    pub fn new() -> WebrtcTrackAdapter {
        WebrtcTrackAdapter {
            offer_medias: Vec::new(),
        }
    }

    /// Parses the remote offer's SDP and records its media list. A full
    /// implementation would also extract ICE credentials and DTLS
    /// fingerprints here; this relay stops at the media description.
    pub fn set_offer(&mut self, sdp: &[u8]) -> Result<()> {
        self.offer_medias = unmarshal_sdp(sdp)?;
        Ok(())
    }

    pub fn offer_medias(&self) -> &[Media] {
        &self.offer_medias
    }

    /// Would negotiate ICE/DTLS and return the local answer SDP. Not
    /// implemented — see module docs.
    pub fn get_answer(&self) -> Result<Vec<u8>> {
        Err(Error::Unsupported("webrtc answer negotiation"))
    }
}

impl Default for WebrtcTrackAdapter {
    fn default() -> Self {
        Self::new()
    }
}
