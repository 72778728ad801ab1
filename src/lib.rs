mod error;
pub use error::{BoxError, DerivationError, Error, Result};

pub mod singleflight;

pub mod config;
pub mod credential;
pub mod factory;

pub mod provider_pool;
