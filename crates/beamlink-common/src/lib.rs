pub mod errors;
pub mod id;
pub mod identity;

pub use errors::{
    BeamlinkError, ConfigError, DecodeError, EncodeError, NegotiationError, RoutingError,
    TransportError,
};
pub use id::ShareCode;
pub use identity::ParticipantIdentity;

pub type Result<T> = std::result::Result<T, BeamlinkError>;
