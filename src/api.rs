// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use reqwest::blocking::{Client, Response};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    conf::Conf,
    connection::ConnectionInfo,
    error::{ApiError, Error, Result},
    odata,
    record::Registry,
};

/// Exchanges client credentials for a bearer token.
pub trait TokenProvider: Sync {
    fn token(&self, connection: &ConnectionInfo) -> Result<String>;
}

/// Filtered-list and delete-by-id operations on the two device registries.
pub trait DeviceApi: Sync {
    /// Devices whose serial number contains `serial`.
    fn find_devices(&self, token: &str, registry: Registry, serial: &str)
        -> Result<Vec<Device>>;

    fn delete_device(&self, token: &str, registry: Registry, id: &str) -> Result<()>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(rename = "operatingSystem", default)]
    pub operating_system: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct DevicePage {
    #[serde(default)]
    value: Vec<Device>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, serde::Deserialize)]
struct PasswordCredential {
    #[serde(rename = "keyId")]
    key_id: Option<String>,
    #[serde(rename = "endDateTime")]
    end_date_time: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct Application {
    #[serde(rename = "passwordCredentials", default)]
    password_credentials: Vec<PasswordCredential>,
}

// Graph returns `{"error": {"code", "message"}}`, the token endpoint returns
// `{"error", "error_description"}`.
#[derive(Debug, Default, serde::Deserialize)]
struct ErrorBody {
    error: Option<serde_json::Value>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        if let Some(description) = self.error_description {
            return Some(description);
        }
        match self.error? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(obj) => obj
                .get("message")
                .and_then(|x| x.as_str())
                .map(str::to_string),
            _ => None,
        }
    }
}

fn api_error(endpoint: &str, res: Response) -> ApiError {
    let status = res.status();
    let message = res
        .text()
        .ok()
        .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
        .and_then(ErrorBody::message);
    ApiError {
        endpoint: endpoint.to_string(),
        code: status.as_u16(),
        canonical_reason: status.canonical_reason().map(str::to_string),
        message,
    }
}

fn check(endpoint: &str, res: Response) -> Result<Response> {
    if res.status().is_success() {
        Ok(res)
    } else {
        Err(api_error(endpoint, res).into())
    }
}

/// Client for Microsoft Graph and the Microsoft identity platform.
pub struct GraphApi {
    client: Client,
    authority_url: String,
    graph_url: String,
    scope: String,
}

impl GraphApi {
    pub fn new(conf: &Conf) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self {
            client,
            authority_url: conf.authority_url().trim_end_matches('/').to_string(),
            graph_url: conf.graph_url().trim_end_matches('/').to_string(),
            scope: conf.scope().to_string(),
        })
    }

    fn collection_url(&self, registry: Registry) -> String {
        format!("{}/{}", self.graph_url, registry.path())
    }

    /// Whole days (rounded up) until the client secret named by
    /// `client_secret_id` expires. Negative once expired.
    pub fn secret_days_left(&self, token: &str, connection: &ConnectionInfo) -> Result<i64> {
        let object_id = connection.object_id.as_deref().ok_or_else(|| {
            Error::Validation("Missing fields in JSON: object_id".to_string())
        })?;
        let key_id = connection.client_secret_id.as_deref().ok_or_else(|| {
            Error::Validation("Missing fields in JSON: client_secret_id".to_string())
        })?;

        let endpoint = format!("{}/applications/{}", self.graph_url, object_id);
        let res = self.client.get(&endpoint).bearer_auth(token).send()?;
        let app: Application = check(&endpoint, res)?.json()?;

        let end = app
            .password_credentials
            .into_iter()
            .find(|cred| cred.key_id.as_deref() == Some(key_id))
            .and_then(|cred| cred.end_date_time)
            .ok_or_else(|| Error::Validation("No matching App Secret found".to_string()))?;
        let end = OffsetDateTime::parse(&end, &Rfc3339)
            .map_err(|err| Error::Validation(format!("Invalid endDateTime '{}': {}", end, err)))?;

        Ok(days_until(end, OffsetDateTime::now_utc()))
    }
}

pub(crate) fn days_until(end: OffsetDateTime, now: OffsetDateTime) -> i64 {
    const DAY: i64 = 24 * 60 * 60;
    let secs = (end - now).whole_seconds();
    // ceiling division, also for negative spans
    -((-secs).div_euclid(DAY))
}

impl TokenProvider for GraphApi {
    fn token(&self, connection: &ConnectionInfo) -> Result<String> {
        connection.validate()?;
        let endpoint = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url,
            connection.tenant_name_or_id.trim()
        );
        let res = self
            .client
            .post(&endpoint)
            .form(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &connection.client_id,
                client_secret: &connection.client_secret,
                scope: &self.scope,
            })
            .send()
            .map_err(|err| Error::Auth(err.to_string()))?;
        if !res.status().is_success() {
            return Err(Error::Auth(api_error(&endpoint, res).to_string()));
        }
        let res: TokenResponse = res.json().map_err(|err| Error::Auth(err.to_string()))?;
        Ok(res.access_token)
    }
}

impl DeviceApi for GraphApi {
    fn find_devices(
        &self,
        token: &str,
        registry: Registry,
        serial: &str,
    ) -> Result<Vec<Device>> {
        let endpoint = self.collection_url(registry);

        let mut query = vec![("$filter", odata::contains("serialNumber", serial))];
        if let Some(select) = registry.select() {
            query.push(("$select", select.to_string()));
        }

        let res = self
            .client
            .get(&endpoint)
            .query(&query)
            .bearer_auth(token)
            .send()?;
        let mut page: DevicePage = check(&endpoint, res)?.json()?;
        let mut devices = std::mem::take(&mut page.value);

        // `nextLink` already carries the filter
        while let Some(next) = page.next_link.take() {
            let res = self.client.get(&next).bearer_auth(token).send()?;
            page = check(&endpoint, res)?.json()?;
            devices.append(&mut page.value);
        }

        Ok(devices)
    }

    fn delete_device(&self, token: &str, registry: Registry, id: &str) -> Result<()> {
        let endpoint = format!("{}/{}", self.collection_url(registry), id);
        let res = self.client.delete(&endpoint).bearer_auth(token).send()?;
        check(&endpoint, res)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn days_until_rounds_up() {
        let now = OffsetDateTime::parse("2024-05-01T12:00:00Z", &Rfc3339).unwrap();
        assert_eq!(days_until(now + Duration::days(10), now), 10);
        assert_eq!(days_until(now + Duration::hours(1), now), 1);
        assert_eq!(days_until(now + Duration::hours(49), now), 3);
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now - Duration::hours(1), now), 0);
        assert_eq!(days_until(now - Duration::hours(25), now), -1);
    }

    #[test]
    fn token_rejects_tenant_outside_path() {
        let api = GraphApi::new(&Conf::default()).unwrap();
        let connection = ConnectionInfo::new("common/../contoso?", "client", "secret");
        assert!(matches!(api.token(&connection), Err(Error::Validation(_))));
    }

    #[test]
    fn graph_error_message() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error": {"code": "ResourceNotFound", "message": "Resource not found"}}"#,
        )
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("Resource not found"));
    }

    #[test]
    fn token_error_description() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error": "invalid_client", "error_description": "AADSTS7000215: Invalid client secret provided."}"#,
        )
        .unwrap();
        assert_eq!(
            body.message().as_deref(),
            Some("AADSTS7000215: Invalid client secret provided.")
        );
    }

    #[test]
    fn device_page() {
        let page: DevicePage = serde_json::from_str(
            r#"{
                "@odata.context": "https://graph.microsoft.com/beta/$metadata#deviceManagement/managedDevices(id,operatingSystem)",
                "@odata.nextLink": "https://graph.microsoft.com/beta/deviceManagement/managedDevices?$skiptoken=abc",
                "value": [
                    {"id": "d1", "operatingSystem": "Windows"},
                    {"id": "d2", "operatingSystem": null},
                    {"id": "d3"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(page.value.len(), 3);
        assert_eq!(page.value[0].operating_system.as_deref(), Some("Windows"));
        assert_eq!(page.value[1].operating_system, None);
        assert_eq!(page.value[2].operating_system, None);
        assert!(page.next_link.is_some());
    }
}
