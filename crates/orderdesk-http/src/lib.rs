// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use orderdesk_app::{
    LookupReply, LookupRequest, Transport, TransportError, UpdateReply, UpdateRequest,
};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_UPDATE_PATH: &str = "ajax/update-status/";
pub const DEFAULT_LOOKUP_PATH: &str = "ajax/get-product-price/";
pub const DEFAULT_LOOKUP_PARAM: &str = "product_id";
pub const TOKEN_HEADER: &str = "X-CSRFToken";

/// Blocking client for the admin's AJAX endpoints.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    update_url: Url,
    lookup_url: Url,
    lookup_param: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::with_paths(
            base_url,
            timeout,
            DEFAULT_UPDATE_PATH,
            DEFAULT_LOOKUP_PATH,
            DEFAULT_LOOKUP_PARAM,
        )
    }

    pub fn with_paths(
        base_url: &str,
        timeout: Duration,
        update_path: &str,
        lookup_path: &str,
        lookup_param: &str,
    ) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        if lookup_param.trim().is_empty() {
            bail!("server.lookup_param must not be empty");
        }

        // Url::join drops the last segment unless the base ends in '/'.
        let base_url = Url::parse(&format!("{}/", trimmed.trim_end_matches('/')))
            .with_context(|| format!("server.base_url {trimmed:?} is not a valid URL"))?;
        let update_url = join(&base_url, update_path, "server.update_path")?;
        let lookup_url = join(&base_url, lookup_path, "server.lookup_path")?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            update_url,
            lookup_url,
            lookup_param: lookup_param.to_owned(),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn update_url(&self) -> &str {
        self.update_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves a page-relative link against the change-list URL.
    pub fn visit_url(&self, link: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(link.trim())
            .map_err(|error| TransportError::Unreachable {
                url: link.to_owned(),
                detail: format!("not a valid link: {error}"),
            })
    }

    pub fn lookup_url_for(&self, request: &LookupRequest) -> Url {
        let mut url = self.lookup_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.lookup_param, &request.product.to_string());
        url
    }
}

impl Transport for Client {
    fn send_update(&self, request: &UpdateRequest) -> Result<UpdateReply, TransportError> {
        let url = self.update_url.as_str();
        debug!(url, row = %request.row, field = %request.field, "sending inline update");
        let response = self
            .http
            .post(self.update_url.clone())
            .header(TOKEN_HEADER, &request.token)
            .json(&request.body())
            .send()
            .map_err(|error| connection_error(url, &error))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|error| connection_error(url, &error))?;
        decode_reply(url, status, &body)
    }

    fn lookup_price(&self, request: &LookupRequest) -> Result<LookupReply, TransportError> {
        let url = self.lookup_url_for(request);
        debug!(url = %url, "looking up product price");
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|error| connection_error(url.as_str(), &error))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|error| connection_error(url.as_str(), &error))?;
        if !status.is_success() {
            return Err(clean_error_response(status, &body));
        }
        decode_reply(url.as_str(), status, &body)
    }

    fn visit(&self, link: &str) -> Result<(), TransportError> {
        let url = self.visit_url(link)?;
        debug!(url = %url, "starting server job");
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|error| connection_error(url.as_str(), &error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(clean_error_response(status, &body))
    }
}

fn join(base: &Url, path: &str, setting: &str) -> Result<Url> {
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() {
        bail!("{setting} must not be empty");
    }
    base.join(path)
        .with_context(|| format!("{setting} {path:?} does not form a valid URL"))
}

/// Non-2xx bodies that still carry the reply shape are the server's answer.
fn decode_reply<T: DeserializeOwned>(
    url: &str,
    status: StatusCode,
    body: &str,
) -> Result<T, TransportError> {
    match serde_json::from_str::<T>(body) {
        Ok(reply) => Ok(reply),
        Err(_) if !status.is_success() => Err(clean_error_response(status, body)),
        Err(error) => Err(TransportError::Decode {
            url: url.to_owned(),
            detail: error.to_string(),
        }),
    }
}

fn connection_error(url: &str, error: &reqwest::Error) -> TransportError {
    let detail = if error.is_timeout() {
        "request timed out; raise [server].timeout or check the server".to_owned()
    } else {
        format!("{error}; is the admin server running?")
    };
    TransportError::Unreachable {
        url: url.to_owned(),
        detail,
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> TransportError {
    let trimmed = body.trim();
    let body = if trimmed.len() < 100 && !trimmed.contains('<') && !trimmed.contains('{') {
        trimmed.to_owned()
    } else {
        String::new()
    };
    TransportError::Status {
        status: status.as_u16(),
        body,
    }
}
