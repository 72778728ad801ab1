//! Credential derivation properties, mirroring the property set of an AWS
//! credentials controller service. `BaseConfiguration` captures everything
//! except the two per-request overrides; `merge` produces the snapshot handed
//! to a [`crate::factory::CredentialFactory`].

pub const USE_DEFAULT_CREDENTIALS: &str = "Use Default Credentials";
pub const ACCESS_KEY: &str = "Access Key";
pub const SECRET_KEY: &str = "Secret Key";
pub const CREDENTIALS_FILE: &str = "Credentials File";
pub const PROFILE_NAME: &str = "Profile Name";
pub const USE_ANONYMOUS_CREDENTIALS: &str = "Use Anonymous Credentials";
pub const MAX_SESSION_TIME: &str = "Session Time";
pub const ASSUME_ROLE_EXTERNAL_ID: &str = "Assume Role External ID";
pub const ASSUME_ROLE_PROXY_HOST: &str = "Assume Role Proxy Host";
pub const ASSUME_ROLE_PROXY_PORT: &str = "Assume Role Proxy Port";

/// The two properties that vary per request and form the pool key.
pub const ASSUME_ROLE_ARN: &str = "Assume Role ARN";
pub const ASSUME_ROLE_SESSION_NAME: &str = "Assume Role Session Name";

/// Property snapshot captured once at pool construction. Never mutated
/// afterwards; `merge` copies, it does not modify in place.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseConfiguration(std::collections::HashMap<String, String>);

impl BaseConfiguration {
    pub fn new() -> Self {
        Self(std::collections::HashMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge the per-request overrides into a fresh snapshot. Deterministic;
    /// the overrides win over any same-named entries already present in base.
    pub fn merge(&self, role_arn: &str, session_name: &str) -> ConfigurationSnapshot {
        let mut properties = self.0.clone();
        properties.insert(ASSUME_ROLE_ARN.to_owned(), role_arn.to_owned());
        properties.insert(ASSUME_ROLE_SESSION_NAME.to_owned(), session_name.to_owned());
        ConfigurationSnapshot(properties)
    }
}

impl From<std::collections::HashMap<String, String>> for BaseConfiguration {
    fn from(properties: std::collections::HashMap<String, String>) -> Self {
        Self(properties)
    }
}

impl FromIterator<(String, String)> for BaseConfiguration {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The merged property mapping a factory derives from.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationSnapshot(std::collections::HashMap<String, String>);

impl ConfigurationSnapshot {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseConfiguration {
        [
            (USE_DEFAULT_CREDENTIALS.to_owned(), "false".to_owned()),
            (ACCESS_KEY.to_owned(), "AK".to_owned()),
            (SECRET_KEY.to_owned(), "SK".to_owned()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn merge_is_deterministic() {
        let base = base();
        let a = base.merge("arn:aws:iam::123456789012:role/a", "s1");
        let b = base.merge("arn:aws:iam::123456789012:role/a", "s1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a.get(ACCESS_KEY), Some("AK"));
        assert_eq!(a.get(ASSUME_ROLE_ARN), Some("arn:aws:iam::123456789012:role/a"));
        assert_eq!(a.get(ASSUME_ROLE_SESSION_NAME), Some("s1"));
    }

    #[test]
    fn merge_overrides_win_and_base_stays_intact() {
        let base: BaseConfiguration = [
            (ACCESS_KEY.to_owned(), "AK".to_owned()),
            (ASSUME_ROLE_ARN.to_owned(), "stale".to_owned()),
        ]
        .into_iter()
        .collect();
        let snapshot = base.merge("arn:aws:iam::123456789012:role/b", "s2");
        assert_eq!(snapshot.get(ASSUME_ROLE_ARN), Some("arn:aws:iam::123456789012:role/b"));
        assert_eq!(base.get(ASSUME_ROLE_ARN), Some("stale"));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn merge_accepts_empty_overrides() {
        let snapshot = base().merge("", "");
        assert_eq!(snapshot.get(ASSUME_ROLE_ARN), Some(""));
        assert_eq!(snapshot.get(ASSUME_ROLE_SESSION_NAME), Some(""));
    }

    #[test]
    fn base_configuration_from_json() {
        let base: BaseConfiguration =
            serde_json::from_str(r#"{"Access Key": "AK", "Profile Name": "dev"}"#).unwrap();
        assert_eq!(base.get(ACCESS_KEY), Some("AK"));
        assert_eq!(base.get(PROFILE_NAME), Some("dev"));
    }
}
