//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# Beamlink Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[relay]
# url = "wss://localhost:8443/ws"
# connect_timeout_secs = 15        # 1-120
# reconnect_delay_secs = 1         # 1-60
# max_reconnect_delay_secs = 30    # reconnect_delay_secs-600

[identity]
# name = ""                        # empty = generated per mode

[call]
# mode = "both"                    # both | sharer | viewer
# negotiation_timeout_secs = 30    # 0 disables, otherwise 5-600
# event_buffer = 256               # 16-4096

[ice]
# servers = ["stun:stun.stunprotocol.org"]

[logging]
# level = "info"                   # trace | debug | info | warn | error
"##
}
