// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, fs, path::Path};

use crate::error::{Error, Result};

/// App registration credentials for one tenant.
#[derive(Clone, Default, serde::Deserialize)]
pub struct ConnectionInfo {
    #[serde(default)]
    pub tenant_name_or_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Object id of the app registration, for the secret expiry check
    pub object_id: Option<String>,
    /// Key id of the client secret, for the secret expiry check
    pub client_secret_id: Option<String>,
}

// Keep the secret out of logs
impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("tenant_name_or_id", &self.tenant_name_or_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("object_id", &self.object_id)
            .field("client_secret_id", &self.client_secret_id)
            .finish()
    }
}

impl ConnectionInfo {
    pub fn new(tenant_name_or_id: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            tenant_name_or_id: tenant_name_or_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            ..Self::default()
        }
    }

    /// Fails with every missing required field listed.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("tenant_name_or_id", &self.tenant_name_or_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing fields in JSON: {}",
                missing.join(", ")
            )));
        }

        // Spliced into the token endpoint path
        let tenant = self.tenant_name_or_id.trim();
        if !tenant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(Error::Validation(format!(
                "Invalid tenant_name_or_id '{}'",
                tenant
            )));
        }

        Ok(())
    }

    pub fn parse(s: &str) -> Result<Self> {
        let info: Self = serde_json::from_str(s)?;
        info.validate()?;
        Ok(info)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete() {
        let info = ConnectionInfo::parse(
            r#"{
                "tenant_name_or_id": "contoso.onmicrosoft.com",
                "client_id": "11111111-2222-3333-4444-555555555555",
                "client_secret": "s3cr3t",
                "object_id": "66666666-7777-8888-9999-000000000000"
            }"#,
        )
        .unwrap();
        assert_eq!(info.tenant_name_or_id, "contoso.onmicrosoft.com");
        assert_eq!(info.client_secret_id, None);
        assert!(!format!("{:?}", info).contains("s3cr3t"));
    }

    #[test]
    fn lists_missing_fields() {
        let err = ConnectionInfo::parse(r#"{"client_id": "abc", "client_secret": ""}"#)
            .unwrap_err();
        match err {
            Error::Validation(message) => assert_eq!(
                message,
                "Missing fields in JSON: tenant_name_or_id, client_secret"
            ),
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn tenant_cannot_leave_the_token_path() {
        for tenant in ["contoso/../common", "contoso?x=1", "contoso#frag", "con toso"] {
            let err = ConnectionInfo::new(tenant, "abc", "s3cr3t")
                .validate()
                .unwrap_err();
            assert!(
                matches!(err, Error::Validation(ref m) if m.starts_with("Invalid tenant_name_or_id")),
                "{}: {}",
                tenant,
                err
            );
        }
        ConnectionInfo::new("11111111-2222-3333-4444-555555555555", "abc", "s3cr3t")
            .validate()
            .unwrap();
    }

    #[test]
    fn not_json() {
        assert!(matches!(
            ConnectionInfo::parse("tenant=abc"),
            Err(Error::SerdeJson(_))
        ));
    }
}
