pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("ConfigError: {0}")]
    ConfigError(String),

    #[error(transparent)]
    DerivationError(#[from] DerivationError),
}

/// Credential derivation failed for a pool key. Cloneable so that every caller
/// waiting on the same in-flight load observes the same failure; the factory's
/// original error is preserved as the source and never cached.
#[derive(thiserror::Error, Debug, Clone)]
#[error("failed to derive credentials for role_arn={role_arn:?} session_name={session_name:?}")]
pub struct DerivationError {
    pub role_arn: String,
    pub session_name: String,
    #[source]
    source: std::sync::Arc<dyn std::error::Error + Send + Sync + 'static>,
}

impl DerivationError {
    pub(crate) fn new(role_arn: &str, session_name: &str, source: BoxError) -> Self {
        Self {
            role_arn: role_arn.to_owned(),
            session_name: session_name.to_owned(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
