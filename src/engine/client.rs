//! HTTP resource client: PUT / GET / DELETE of single resources.
//!
//! One client is built per command invocation, with its pool sized to the worker count.
//! The client never retries; retry policy belongs to the caller.

use log::debug;
use reqwest::blocking::{Body, Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Proxy, StatusCode, Url};
use std::io::{self, Read};

use crate::RestError;
use crate::types::Credentials;
use crate::utils::config::{Defaults, TransportConsts, USER_AGENT};

/// Transport parameters, fixed at construction.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Idle connections kept per host; at least the worker count.
    pub pool_size: usize,
    /// `host:port` of a SOCKS5 proxy for all requests.
    pub socks_proxy: Option<String>,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY`.
    pub env_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_size: Defaults::PUT_CONCURRENCY,
            socks_proxy: None,
            env_proxy: true,
        }
    }
}

impl ClientConfig {
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct RestClient {
    http: Client,
    credentials: Option<Credentials>,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, RestError> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(config.pool_size.max(1))
            .connect_timeout(TransportConsts::DIAL_TIMEOUT)
            .tcp_keepalive(TransportConsts::KEEP_ALIVE)
            .timeout(None::<std::time::Duration>);
        if !config.env_proxy {
            builder = builder.no_proxy();
        }
        if let Some(addr) = &config.socks_proxy {
            let proxy = Proxy::all(format!("socks5://{addr}"))
                .map_err(|e| RestError::Config(format!("invalid socks proxy {addr}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| RestError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            credentials: None,
        })
    }

    /// Credentials sent with PUT requests (only when both user and pass are non-empty).
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// PUT `body`; any status below 300 is success. The response body is drained either way
    /// and quoted in the error.
    pub fn put<B: Into<Body>>(
        &self,
        url: &Url,
        body: B,
        content_type: Option<&str>,
    ) -> Result<StatusCode, RestError> {
        self.put_accepting(url, body, content_type, |s| s.as_u16() < 300)
    }

    /// PUT that only accepts `200 OK`.
    pub fn put_ok<B: Into<Body>>(
        &self,
        url: &Url,
        body: B,
        content_type: Option<&str>,
    ) -> Result<StatusCode, RestError> {
        self.put_accepting(url, body, content_type, |s| s == StatusCode::OK)
    }

    fn put_accepting<B, F>(
        &self,
        url: &Url,
        body: B,
        content_type: Option<&str>,
        accept: F,
    ) -> Result<StatusCode, RestError>
    where
        B: Into<Body>,
        F: Fn(StatusCode) -> bool,
    {
        let mut req = self.http.put(url.clone()).body(body);
        if let Some(ct) = content_type {
            req = req.header(CONTENT_TYPE, ct);
        }
        if let Some(creds) = &self.credentials
            && creds.is_complete()
        {
            req = req.basic_auth(&creds.user, Some(&creds.pass));
        }
        let resp = req
            .send()
            .map_err(|e| RestError::transport("PUT", url, e))?;
        let status = resp.status();
        let contents = read_text(resp);
        if !accept(status) {
            return Err(RestError::http("PUT", url, status, &contents));
        }
        debug!("PUT {url}: {status}");
        Ok(status)
    }

    /// GET a resource; only `200 OK` is success. The caller owns the returned body.
    pub fn get(&self, url: &Url) -> Result<ResponseBody, RestError> {
        let resp = self
            .http
            .get(url.clone())
            .send()
            .map_err(|e| RestError::transport("GET", url, e))?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(RestError::http("GET", url, status, &read_text(resp)));
        }
        Ok(ResponseBody::new(resp))
    }

    /// GET and read the whole body.
    pub fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, RestError> {
        let mut body = self.get(url)?;
        let mut data = Vec::new();
        body.read_to_end(&mut data)
            .map_err(|e| RestError::io(format!("reading body of {url}"), e))?;
        Ok(data)
    }

    /// DELETE a resource; only `200 OK` is success.
    pub fn delete(&self, url: &Url) -> Result<(), RestError> {
        let resp = self
            .http
            .delete(url.clone())
            .send()
            .map_err(|e| RestError::transport("DELETE", url, e))?;
        let status = resp.status();
        let contents = read_text(resp);
        if status != StatusCode::OK {
            return Err(RestError::http("DELETE", url, status, &contents));
        }
        Ok(())
    }
}

/// Drain and close a response, keeping its text for diagnostics.
fn read_text(resp: Response) -> String {
    resp.text().unwrap_or_default()
}

/// An open response body handed from one stage to another.
///
/// Reads stream straight from the connection. Dropping it drains whatever is left, so the
/// connection goes back to the idle pool on every exit path.
pub struct ResponseBody {
    response: Response,
}

impl ResponseBody {
    fn new(response: Response) -> Self {
        Self { response }
    }

    pub fn content_type(&self) -> Option<String> {
        self.response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Turn into a request body that streams these bytes without buffering them.
    pub fn into_body(self) -> Body {
        match self.content_length() {
            Some(len) => Body::sized(self, len),
            None => Body::new(self),
        }
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.response.read(buf)
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        let _ = io::copy(&mut self.response, &mut io::sink());
    }
}
