pub mod capability;
pub mod classify;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod session;

pub use capability::{registry, Capability, CapabilityProfile, PhrasePattern};
pub use classify::{classify, classify_with_default, ClassificationResult};
pub use config::{
    AppConfig, CompletionConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
    LoggingConfig, PlatformConfig, RoutingConfig, ServerConfig, SessionConfig,
};
pub use errors::{validate_session_id, TierError, ValidationError};
pub use session::{Session, SessionLimits, SessionStore, Turn};
