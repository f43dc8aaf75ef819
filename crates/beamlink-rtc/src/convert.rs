//! Conversions between wire payloads and webrtc-rs types.

use beamlink_signal::{IceCandidate, PeerError, SdpType, SessionDescription};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

pub(crate) fn peer_error(e: webrtc::Error) -> PeerError {
    PeerError::new(e.to_string())
}

pub(crate) fn to_rtc_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, PeerError> {
    let SessionDescription { kind, sdp } = description;
    match kind {
        SdpType::Offer => RTCSessionDescription::offer(sdp),
        SdpType::Answer => RTCSessionDescription::answer(sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(sdp),
        SdpType::Rollback => return Err(PeerError::new("rollback descriptions are not supported")),
    }
    .map_err(peer_error)
}

pub(crate) fn from_rtc_description(
    description: RTCSessionDescription,
) -> Result<SessionDescription, PeerError> {
    let kind = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(PeerError::new("session description has no type"));
        }
    };
    Ok(SessionDescription {
        kind,
        sdp: description.sdp,
    })
}

pub(crate) fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

pub(crate) fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}
