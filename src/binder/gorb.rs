//! Gorb (IPVS load balancer) implementation of [`ServiceBinder`].
//!
//! One virtual service per distinct published container port of the group,
//! named `<group>-<port>-<proto>`; one backend per shard publishing that port.

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use super::binder::ServiceBinder;
use super::client::{create_client, HyperClient};
use crate::error::BindingError;
use crate::group::Shard;
use crate::runtime::Protocol;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Service and backend parameters sent to Gorb.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GorbOptions {
    /// Virtual IP of the services; Gorb picks its default when absent.
    pub vip_host: Option<String>,
    /// Backend address used when a port is published on a wildcard address.
    pub backend_host: String,
    pub lb_method: String,
    pub fwd_method: String,
    pub weight: u32,
    pub persistent: bool,
}

impl Default for GorbOptions {
    fn default() -> Self {
        Self {
            vip_host: None,
            backend_host: "127.0.0.1".to_string(),
            lb_method: "wrr".to_string(),
            fwd_method: "nat".to_string(),
            weight: 100,
            persistent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Backend {
    id: String,
    host: String,
    port: u16,
}

pub struct GorbBinder {
    base: Url,
    opts: GorbOptions,
    client: HyperClient,
}

impl GorbBinder {
    pub fn new(uri: &str, opts: GorbOptions) -> Result<Self, BindingError> {
        let invalid = |reason: String| BindingError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };

        let mut base = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(invalid(format!("unsupported scheme {:?}", base.scheme())));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            opts,
            client: create_client(),
        })
    }

    /// Backends of each (container port, protocol) the shards publish.
    fn services(&self, shards: &[Shard]) -> BTreeMap<(u16, Protocol), Vec<Backend>> {
        let mut services: BTreeMap<(u16, Protocol), Vec<Backend>> = BTreeMap::new();

        for shard in shards {
            for port in &shard.ports {
                let Some(public_port) = port.public_port else {
                    continue;
                };
                let host = match port.ip.as_deref() {
                    None | Some("") | Some("0.0.0.0") | Some("::") => self.opts.backend_host.clone(),
                    Some(ip) => ip.to_string(),
                };
                let backends = services.entry((port.private_port, port.protocol)).or_default();
                let id = shard.short_id().to_string();
                // Docker lists a port once per address family.
                if backends.iter().any(|b| b.id == id) {
                    continue;
                }
                backends.push(Backend {
                    id,
                    host,
                    port: public_port,
                });
            }
        }

        services
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(StatusCode, Bytes), BindingError> {
        let method_name = method.as_str().to_string();
        let transport = |e: Box<dyn std::error::Error + Send + Sync>| BindingError::Transport {
            method: method_name.clone(),
            path: path.to_string(),
            source: e,
        };

        let url = self.base.join(path).map_err(|e| transport(Box::new(e)))?;

        let req_body: BoxBody<Bytes, hyper::Error> = match body {
            Some(value) => Full::new(Bytes::from(value.to_string()))
                .map_err(|never: std::convert::Infallible| match never {})
                .boxed(),
            None => Empty::<Bytes>::new()
                .map_err(|never: std::convert::Infallible| match never {})
                .boxed(),
        };

        let req = Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .body(req_body)
            .map_err(|e| transport(Box::new(e)))?;

        let response = match timeout(REQUEST_TIMEOUT, self.client.request(req)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(transport(Box::new(e))),
            Err(_) => {
                return Err(BindingError::Timeout {
                    method: method_name.clone(),
                    path: path.to_string(),
                    timeout: REQUEST_TIMEOUT,
                })
            }
        };

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| transport(Box::new(e)))?
            .to_bytes();

        debug!(
            component = "gorb",
            event = "request",
            method = %method_name,
            path = path,
            status = status.as_u16(),
            "gorb request completed"
        );

        Ok((status, body))
    }

    async fn expect_success(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Bytes, BindingError> {
        let method_name = method.as_str().to_string();
        let (status, bytes) = self.send(method, path, body).await?;
        if !status.is_success() {
            return Err(BindingError::Status {
                method: method_name,
                path: path.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }
        Ok(bytes)
    }
}

/// Encodes the group into the `[A-Za-z0-9_-]` charset of a service id.
/// `_` is the escape byte: `_` becomes `__`, any other byte outside the set
/// becomes `_xx` (lowercase hex). The mapping is injective, so distinct groups
/// never share a service.
pub(super) fn service_prefix(group: &str) -> String {
    let mut out = String::with_capacity(group.len());
    for b in group.bytes() {
        match b {
            b'_' => out.push_str("__"),
            b if b.is_ascii_alphanumeric() || b == b'-' => out.push(b as char),
            b => out.push_str(&format!("_{:02x}", b)),
        }
    }
    out
}

pub(super) fn service_id(group: &str, port: u16, protocol: Protocol) -> String {
    format!("{}-{}-{}", service_prefix(group), port, protocol)
}

/// Whether `id` is exactly `<prefix>-<port>-<proto>` for this group.
pub(super) fn is_group_service(prefix: &str, id: &str) -> bool {
    let Some(rest) = id.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
        return false;
    };
    match rest.split_once('-') {
        Some((port, proto)) => port.parse::<u16>().is_ok() && proto.parse::<Protocol>().is_ok(),
        None => false,
    }
}

#[async_trait::async_trait]
impl ServiceBinder for GorbBinder {
    async fn create_service(&self, group: &str, shards: &[Shard]) -> Result<(), BindingError> {
        let services = self.services(shards);
        if services.is_empty() {
            warn!(
                component = "gorb",
                event = "no_published_ports",
                group = group,
                "group publishes no ports, nothing to register"
            );
            return Ok(());
        }

        for ((port, protocol), backends) in services {
            let vs = service_id(group, port, protocol);

            let mut service = json!({
                "port": port,
                "protocol": protocol.to_string(),
                "lb_method": self.opts.lb_method,
                "persistent": self.opts.persistent,
            });
            if let Some(vip) = &self.opts.vip_host {
                service["host"] = json!(vip);
            }
            self.expect_success(Method::PUT, &format!("service/{}", vs), Some(service))
                .await?;

            for backend in &backends {
                let body = json!({
                    "host": backend.host,
                    "port": backend.port,
                    "weight": self.opts.weight,
                    "method": self.opts.fwd_method,
                });
                self.expect_success(
                    Method::PUT,
                    &format!("service/{}/{}", vs, backend.id),
                    Some(body),
                )
                .await?;
            }

            info!(
                component = "gorb",
                event = "service_created",
                service = %vs,
                backends = backends.len(),
                "service registered"
            );
        }

        Ok(())
    }

    async fn remove_service(&self, group: &str, shards: &[Shard]) -> Result<(), BindingError> {
        // Stopped shards no longer report ports, so the service list comes from Gorb itself.
        let listed = self.expect_success(Method::GET, "service", None).await?;
        let listed: Vec<String> =
            serde_json::from_slice(&listed).map_err(|e| BindingError::Transport {
                method: "GET".to_string(),
                path: "service".to_string(),
                source: Box::new(e),
            })?;

        let prefix = service_prefix(group);
        let mut targets: Vec<String> = listed
            .into_iter()
            .filter(|id| is_group_service(&prefix, id))
            .collect();
        for (port, protocol) in self.services(shards).into_keys() {
            let vs = service_id(group, port, protocol);
            if !targets.contains(&vs) {
                targets.push(vs);
            }
        }

        for vs in targets {
            let path = format!("service/{}", vs);
            let (status, bytes) = self.send(Method::DELETE, &path, None).await?;
            if status == StatusCode::NOT_FOUND {
                debug!(
                    component = "gorb",
                    event = "service_absent",
                    service = %vs,
                    "service already removed"
                );
                continue;
            }
            if !status.is_success() {
                return Err(BindingError::Status {
                    method: "DELETE".to_string(),
                    path,
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).trim().to_string(),
                });
            }
            info!(
                component = "gorb",
                event = "service_removed",
                service = %vs,
                "service deregistered"
            );
        }

        Ok(())
    }
}
