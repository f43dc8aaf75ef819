//! Signaling wire protocol.
//!
//! Every message is a JSON object with a `channel` discriminator and the
//! variant's fields. Call messages carry the `shareCode` of the session they
//! belong to. Session descriptions and ICE candidates use the same JSON
//! shape browsers produce for `RTCSessionDescription` and
//! `RTCIceCandidate.toJSON()`, and are otherwise opaque to this crate.

use beamlink_common::{DecodeError, EncodeError, RoutingError, ShareCode};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Channel names
// ---------------------------------------------------------------------------

/// Values of the `channel` discriminator.
pub mod channels {
    pub const LOGIN: &str = "login";
    pub const START_CALL: &str = "start_call";
    pub const WEBRTC_OFFER: &str = "webrtc_offer";
    pub const WEBRTC_ANSWER: &str = "webrtc_answer";
    pub const WEBRTC_ICE_CANDIDATE: &str = "webrtc_ice_candidate";
    pub const WEBRTC_CLOSE: &str = "webrtc_close";

    pub const ALL: [&str; 6] = [
        LOGIN,
        START_CALL,
        WEBRTC_OFFER,
        WEBRTC_ANSWER,
        WEBRTC_ICE_CANDIDATE,
        WEBRTC_CLOSE,
    ];
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// An SDP offer or answer produced by the peer-connection capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A trickled ICE candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Every message exchanged with the relay.
///
/// `share_code` is optional on the wire so that a message missing it still
/// decodes; such messages are rejected by [`SignalingMessage::route`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum SignalingMessage {
    Login {
        name: String,
    },
    StartCall {
        #[serde(rename = "shareCode", default, skip_serializing_if = "Option::is_none")]
        share_code: Option<ShareCode>,
    },
    WebrtcOffer {
        offer: SessionDescription,
        #[serde(rename = "shareCode", default, skip_serializing_if = "Option::is_none")]
        share_code: Option<ShareCode>,
    },
    WebrtcAnswer {
        answer: SessionDescription,
        #[serde(rename = "shareCode", default, skip_serializing_if = "Option::is_none")]
        share_code: Option<ShareCode>,
    },
    WebrtcIceCandidate {
        candidate: IceCandidate,
        #[serde(rename = "shareCode", default, skip_serializing_if = "Option::is_none")]
        share_code: Option<ShareCode>,
    },
    WebrtcClose {
        #[serde(rename = "shareCode", default, skip_serializing_if = "Option::is_none")]
        share_code: Option<ShareCode>,
    },
}

impl SignalingMessage {
    pub fn login(name: impl Into<String>) -> Self {
        Self::Login { name: name.into() }
    }

    pub fn start_call(share_code: ShareCode) -> Self {
        Self::StartCall {
            share_code: Some(share_code),
        }
    }

    pub fn offer(offer: SessionDescription, share_code: ShareCode) -> Self {
        Self::WebrtcOffer {
            offer,
            share_code: Some(share_code),
        }
    }

    pub fn answer(answer: SessionDescription, share_code: ShareCode) -> Self {
        Self::WebrtcAnswer {
            answer,
            share_code: Some(share_code),
        }
    }

    pub fn ice_candidate(candidate: IceCandidate, share_code: ShareCode) -> Self {
        Self::WebrtcIceCandidate {
            candidate,
            share_code: Some(share_code),
        }
    }

    pub fn close(share_code: ShareCode) -> Self {
        Self::WebrtcClose {
            share_code: Some(share_code),
        }
    }

    /// The wire discriminator of this message.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Login { .. } => channels::LOGIN,
            Self::StartCall { .. } => channels::START_CALL,
            Self::WebrtcOffer { .. } => channels::WEBRTC_OFFER,
            Self::WebrtcAnswer { .. } => channels::WEBRTC_ANSWER,
            Self::WebrtcIceCandidate { .. } => channels::WEBRTC_ICE_CANDIDATE,
            Self::WebrtcClose { .. } => channels::WEBRTC_CLOSE,
        }
    }

    pub fn share_code(&self) -> Option<&ShareCode> {
        match self {
            Self::Login { .. } => None,
            Self::StartCall { share_code }
            | Self::WebrtcOffer { share_code, .. }
            | Self::WebrtcAnswer { share_code, .. }
            | Self::WebrtcIceCandidate { share_code, .. }
            | Self::WebrtcClose { share_code } => share_code.as_ref(),
        }
    }

    /// Resolve the share code this message must be delivered to.
    pub fn route(&self) -> Result<&ShareCode, RoutingError> {
        if matches!(self, Self::Login { .. }) {
            return Err(RoutingError::NotCallMessage(channels::LOGIN));
        }
        match self.share_code() {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(RoutingError::MissingShareCode {
                channel: self.channel(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Serialize a message to its JSON wire text.
pub fn encode(message: &SignalingMessage) -> Result<String, EncodeError> {
    serde_json::to_string(message).map_err(|source| EncodeError {
        channel: message.channel(),
        source,
    })
}

/// Parse wire text into a message.
///
/// Text that is not a JSON object with a string `channel` is
/// [`DecodeError::MalformedPayload`]; a channel outside the six known ones
/// is [`DecodeError::UnknownChannel`].
pub fn decode(input: &[u8]) -> Result<SignalingMessage, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(input)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let channel = value
        .get("channel")
        .and_then(|c| c.as_str())
        .ok_or_else(|| DecodeError::MalformedPayload("missing channel discriminator".into()))?;
    if !channels::ALL.contains(&channel) {
        return Err(DecodeError::UnknownChannel(channel.to_string()));
    }

    serde_json::from_value(value).map_err(|e| DecodeError::MalformedPayload(e.to_string()))
}
