//! The fixed upstream every inbound request is remapped onto.

use axum::http::header::HeaderValue;
use axum::http::uri::{Authority, Scheme};
use axum::http::Uri;

use crate::config::ConfigError;

/// Parsed upstream base URL. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
}

impl UpstreamTarget {
    /// Parse and validate the upstream base URL.
    ///
    /// Only `http`/`https` schemes with a host are accepted, and the URL must
    /// not carry a base path or query: inbound paths map onto the upstream
    /// verbatim, so there is nothing to join them to.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let url = url::Url::parse(raw)
            .map_err(|err| ConfigError::Invalid(format!("upstream.url: {err}")))?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "upstream.url: unsupported scheme {other:?}"
                )));
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::invalid("upstream.url must include a host"))?;
        if !(url.path().is_empty() || url.path() == "/") || url.query().is_some() {
            return Err(ConfigError::invalid(
                "upstream.url must be a base URL without path or query",
            ));
        }

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority: Authority = authority
            .parse()
            .map_err(|err| ConfigError::Invalid(format!("upstream.url host: {err}")))?;
        let host_header = HeaderValue::from_str(authority.as_str())
            .map_err(|err| ConfigError::Invalid(format!("upstream.url host: {err}")))?;

        Ok(Self {
            scheme,
            authority,
            host_header,
        })
    }

    /// Map an inbound request URI onto the upstream, preserving path and
    /// query verbatim.
    pub fn rewrite_uri(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = inbound
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }

    /// The `Host` header value forwarded requests must carry.
    pub fn host_header(&self) -> HeaderValue {
        self.host_header.clone()
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }
}
