//! Configuration schema types for Beamlink.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod call;
mod ice;
mod identity;
mod relay;
mod system;

pub use call::*;
pub use ice::*;
pub use identity::*;
pub use relay::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Beamlink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamlinkConfig {
    pub relay: RelayConfig,
    pub identity: IdentityConfig,
    pub call: CallConfig,
    pub ice: IceConfig,
    pub logging: LoggingConfig,
}
