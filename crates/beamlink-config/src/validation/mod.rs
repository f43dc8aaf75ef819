//! Full configuration validation.
//!
//! Each check pushes a message; all violations are reported together in a
//! single `ConfigError`.

mod helpers;


use crate::schema::BeamlinkConfig;
use beamlink_common::ConfigError;

use helpers::validate_range;

const ICE_SCHEMES: [&str; 4] = ["stun:", "stuns:", "turn:", "turns:"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &BeamlinkConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_relay(&mut errors, config);
    validate_call(&mut errors, config);
    validate_ice(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_relay(errors: &mut Vec<String>, config: &BeamlinkConfig) {
    let relay = &config.relay;
    if !(relay.url.starts_with("ws://") || relay.url.starts_with("wss://")) {
        errors.push(format!(
            "relay.url = {:?} must start with ws:// or wss://",
            relay.url
        ));
    }
    validate_range(
        errors,
        "relay.connect_timeout_secs",
        relay.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "relay.reconnect_delay_secs",
        relay.reconnect_delay_secs,
        1,
        60,
    );
    validate_range(
        errors,
        "relay.max_reconnect_delay_secs",
        relay.max_reconnect_delay_secs,
        relay.reconnect_delay_secs,
        600,
    );
}

fn validate_call(errors: &mut Vec<String>, config: &BeamlinkConfig) {
    if config.call.negotiation_timeout_secs != 0 {
        validate_range(
            errors,
            "call.negotiation_timeout_secs",
            config.call.negotiation_timeout_secs,
            5,
            600,
        );
    }
    validate_range(
        errors,
        "call.event_buffer",
        config.call.event_buffer,
        16,
        4096,
    );
}

fn validate_ice(errors: &mut Vec<String>, config: &BeamlinkConfig) {
    for server in &config.ice.servers {
        if !ICE_SCHEMES.iter().any(|scheme| server.starts_with(scheme)) {
            errors.push(format!(
                "ice.servers entry {server:?} must use stun:, stuns:, turn: or turns:"
            ));
        }
    }
}
