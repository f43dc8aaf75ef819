//! UI boundary driven by the call controller.

use beamlink_common::ShareCode;
use tracing::info;

use crate::peer::RemoteTrack;

/// Visibility hooks for whatever renders a call.
pub trait CallSurface: Send + Sync {
    fn show_call_surface(&self, share_code: &ShareCode);

    fn hide_call_surface(&self, share_code: &ShareCode);

    fn display_remote_stream(&self, share_code: &ShareCode, track: &RemoteTrack);

    fn clear_local_media(&self, share_code: &ShareCode);
}

/// Headless surface that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSurface;

impl CallSurface for LoggingSurface {
    fn show_call_surface(&self, share_code: &ShareCode) {
        info!(share_code = %share_code, "Call surface shown");
    }

    fn hide_call_surface(&self, share_code: &ShareCode) {
        info!(share_code = %share_code, "Call surface hidden");
    }

    fn display_remote_stream(&self, share_code: &ShareCode, track: &RemoteTrack) {
        info!(
            share_code = %share_code,
            stream_id = %track.stream_id,
            track_id = %track.track_id,
            "Displaying remote stream"
        );
    }

    fn clear_local_media(&self, share_code: &ShareCode) {
        info!(share_code = %share_code, "Local media cleared");
    }
}
