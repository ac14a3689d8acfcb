use thiserror::Error;

/// Errors raised while assembling the runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// A `CoreConfig` setting is missing or inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The host did not supply a bridge the store needs
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
