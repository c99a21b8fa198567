//! [`CoordinationClient`] backed by the Consul agent HTTP API.

mod config;
mod types;

pub use config::{ConsulConfig, DEFAULT_CONSUL_ADDR, ENV_PREFIX};

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::client::{
    CoordinationClient, KeyRecord, ServiceRegistration, SessionId, SessionInfo, SessionRequest,
};
use crate::error::{ClientError, ClientResult, ElectionError, Result};
use types::{AgentSelf, AgentService, KvEntry, SessionCreate, SessionCreated, SessionEntry};

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Percent-encode each segment of a KV path, keeping the separators.
///
/// Leading slashes are dropped so the key never yields an empty path segment.
fn encode_key(key: &str) -> String {
    key.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// HTTP client for a single Consul agent
#[derive(Debug, Clone)]
pub struct ConsulClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ConsulClient {
    pub fn new(config: &ConsulConfig) -> Result<Self> {
        let base_url = config.base_url()?.as_str().trim_end_matches('/').to_string();

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            ElectionError::configuration(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Connect using `CONSUL_HTTP_*` environment settings
    pub fn from_env() -> Result<Self> {
        Self::new(&ConsulConfig::load()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "consul request");
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    /// Turn a non-success status into [`ClientError::Api`]
    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> ClientResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CoordinationClient for ConsulClient {
    async fn get_key(&self, key: &str) -> ClientResult<Option<KeyRecord>> {
        let response = self
            .request(Method::GET, &format!("/v1/kv/{}", encode_key(key)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let entries: Vec<KvEntry> = Self::json(Self::check(response).await?).await?;
        entries.into_iter().next().map(KvEntry::into_record).transpose()
    }

    async fn create_session(&self, request: &SessionRequest) -> ClientResult<SessionId> {
        let response = self
            .request(Method::PUT, "/v1/session/create")
            .json(&SessionCreate::from(request))
            .send()
            .await?;

        let created: SessionCreated = Self::json(Self::check(response).await?).await?;
        Ok(created.id)
    }

    async fn destroy_session(&self, id: &str) -> ClientResult<()> {
        let response = self
            .request(
                Method::PUT,
                &format!("/v1/session/destroy/{}", urlencoding::encode(id)),
            )
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn session_info(&self, id: &str) -> ClientResult<Option<SessionInfo>> {
        let response = self
            .request(
                Method::GET,
                &format!("/v1/session/info/{}", urlencoding::encode(id)),
            )
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let entries: Option<Vec<SessionEntry>> = Self::json(Self::check(response).await?).await?;
        Ok(entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(SessionInfo::from))
    }

    async fn acquire_key(&self, key: &str, value: &[u8], session: &str) -> ClientResult<bool> {
        let response = self
            .request(
                Method::PUT,
                &format!(
                    "/v1/kv/{}?acquire={}",
                    encode_key(key),
                    urlencoding::encode(session)
                ),
            )
            .body(value.to_vec())
            .send()
            .await?;

        Self::json(Self::check(response).await?).await
    }

    async fn local_node_name(&self) -> ClientResult<String> {
        let response = self.request(Method::GET, "/v1/agent/self").send().await?;
        let agent: AgentSelf = Self::json(Self::check(response).await?).await?;
        Ok(agent.config.node_name)
    }

    async fn services(&self) -> ClientResult<HashMap<String, ServiceRegistration>> {
        let response = self
            .request(Method::GET, "/v1/agent/services")
            .send()
            .await?;
        let services: HashMap<String, AgentService> =
            Self::json(Self::check(response).await?).await?;

        Ok(services
            .into_iter()
            .map(|(id, service)| (id, ServiceRegistration::from(service)))
            .collect())
    }

    async fn register_service(&self, registration: &ServiceRegistration) -> ClientResult<()> {
        let response = self
            .request(Method::PUT, "/v1/agent/service/register")
            .json(registration)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
