use std::collections::BTreeMap;

use log::{debug, error, info};
use once_cell::sync::Lazy;
use reqwest::{Client, Response, StatusCode, Url};

use crate::context::Context;
use crate::error::{Result, TransportError, ValidationError};
use crate::nonce::generate_nonce;

pub const YUBICO_API_URL: &str = "https://api.yubico.com/wsapi/2.0/verify?id=1";

/// Process-wide connection pool.
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("yubikiller/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to initialise the TLS backend for the HTTP client")
});

/// Builds the verification URL for `otp` with a freshly generated nonce.
pub fn build_url(endpoint: &str, otp: &str) -> Result<Url> {
    let nonce = generate_nonce()?;
    build_url_with_nonce(endpoint, otp, &nonce)
}

/// Sets `otp` and `nonce` on top of the endpoint's own query parameters and
/// re-encodes the query sorted by key.
pub fn build_url_with_nonce(endpoint: &str, otp: &str, nonce: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint).map_err(|e| ValidationError::UrlBuild(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ValidationError::UrlBuild(format!(
            "{} is not a usable endpoint",
            endpoint
        )));
    }

    let mut params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
    params.insert("otp".to_string(), otp.to_string());
    params.insert("nonce".to_string(), nonce.to_string());

    // form encoding keeps `*` and escapes `~`; the service decodes either way
    url.query_pairs_mut().clear().extend_pairs(&params);
    Ok(url)
}

/// Issues the GET request, giving up as soon as `ctx` is done.
///
/// Only a 200 response is handed back; its body is left unread.
pub async fn send_request(
    client: &Client,
    ctx: &Context,
    url: Url,
) -> std::result::Result<Response, TransportError> {
    if let Some(err) = ctx.err() {
        debug!("Context already done, not sending request: {}", err);
        return Err(err);
    }

    let resp = tokio::select! {
        biased;
        err = ctx.done() => return Err(err),
        resp = client.get(url).send() => resp?,
    };

    if resp.status() == StatusCode::OK {
        info!("Verification service answered");
        Ok(resp)
    } else {
        error!("Verification service returned non-200 response: {:?}", resp);
        Err(TransportError::Status {
            status: resp.status(),
            headers: resp.headers().clone(),
        })
    }
}

/// Downloads the whole body. Cancellation discards whatever was received.
pub async fn read_body(ctx: &Context, mut resp: Response) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let chunk = tokio::select! {
            biased;
            err = ctx.done() => return Err(err.into()),
            chunk = resp.chunk() => chunk.map_err(std::io::Error::other)?,
        };
        match chunk {
            Some(chunk) => body.extend_from_slice(&chunk),
            None => break,
        }
    }
    Ok(body)
}
