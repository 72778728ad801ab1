/// External capability that derives a [`crate::credential::Credential`] from a
/// merged property snapshot. Implementations are expected to be stateless and
/// safely callable from many tasks at once; a call may be slow (role
/// assumption involves the network).
#[async_trait::async_trait]
pub trait CredentialFactory: Send + Sync {
    async fn derive(
        &self,
        snapshot: &crate::config::ConfigurationSnapshot,
    ) -> Result<crate::credential::Credential, crate::BoxError>;
}

/// Binding of the base property snapshot to the factory, captured once per
/// configuration generation. Performs the miss-path load step: merge the
/// per-key overrides into base, then derive.
#[derive(Clone)]
pub struct PoolConfiguration {
    base: crate::config::BaseConfiguration,
    factory: std::sync::Arc<dyn CredentialFactory>,
}

impl std::fmt::Debug for PoolConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // base may hold sensitive property values, keep them out of logs
        f.debug_struct("PoolConfiguration")
            .field("properties", &self.base.len())
            .finish()
    }
}

impl PoolConfiguration {
    pub fn new(
        factory: std::sync::Arc<dyn CredentialFactory>,
        base: crate::config::BaseConfiguration,
    ) -> Self {
        Self { base, factory }
    }

    pub fn base(&self) -> &crate::config::BaseConfiguration {
        &self.base
    }

    pub(crate) async fn load(
        &self,
        key: &crate::provider_pool::CacheKey,
    ) -> Result<crate::credential::Credential, crate::BoxError> {
        let snapshot = self.base.merge(key.role_arn(), key.session_name());
        tracing::debug!(key = %key, "deriving new credentials provider");
        self.factory.derive(&snapshot).await
    }
}
