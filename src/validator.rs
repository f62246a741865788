use std::io::Cursor;

use log::{debug, info, warn};
use reqwest::Client;

use crate::api::verify::{build_url, read_body, send_request, HTTP_CLIENT, YUBICO_API_URL};
use crate::context::Context;
use crate::error::Result;
use crate::models::verify::VerifyResponse;

/// Client for one verification endpoint.
#[derive(Clone, Debug)]
pub struct Validator {
    endpoint: String,
    client: Client,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Targets the public Yubico validation service.
    pub fn new() -> Self {
        Self::with_endpoint(YUBICO_API_URL)
    }

    /// Targets another validation endpoint; its query parameters (such as
    /// `id`) are sent with every request.
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: HTTP_CLIENT.clone(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submits `otp` once, which consumes it on the service side.
    ///
    /// Returns the parsed response when the service answers `status=OK`.
    pub async fn invalidate(&self, ctx: &Context, otp: &str) -> Result<VerifyResponse> {
        let url = build_url(&self.endpoint, otp)?;
        debug!("Request URL: {}", url);

        let resp = send_request(&self.client, ctx, url).await?;
        let body = read_body(ctx, resp).await?;
        let response = VerifyResponse::parse(Cursor::new(body))?;

        match response.into_outcome() {
            Ok(response) => {
                info!("Token invalidated");
                Ok(response)
            }
            Err(e) => {
                warn!("Token was not invalidated: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, ValidationError};
    use crate::models::status::Status;
    use mockito::{Matcher, Server};

    // A fresh client per test: pooled connections must not outlive the
    // runtime of the test that opened them.
    fn validator(server: &Server) -> Validator {
        Validator::with_endpoint(&format!("{}/wsapi/2.0/verify?id=1", server.url()))
            .with_client(Client::new())
    }

    #[tokio::test]
    async fn ok_status_invalidates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/wsapi/2.0/verify")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "1".into()),
                Matcher::UrlEncoded("otp".into(), "cccccccccccc".into()),
                Matcher::Regex("nonce=[a-zA-Z]{16}".into()),
            ]))
            .with_status(200)
            .with_body("h=abc=\r\nt=2019-06-06T05:14:08Z0369\r\notp=cccccccccccc\r\nsl=100\r\nstatus=OK\r\n\r\n")
            .create_async()
            .await;

        let validator = validator(&server);
        let response = validator
            .invalidate(&Context::background(), "cccccccccccc")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.otp(), Some("cccccccccccc"));
        assert_eq!(response.sync_level(), Some("100"));
    }

    #[tokio::test]
    async fn replayed_otp_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/wsapi/2.0/verify")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("status=REPLAYED_OTP\r\n")
            .create_async()
            .await;

        let validator = validator(&server);
        let err = validator
            .invalidate(&Context::background(), "anyotp")
            .await
            .unwrap_err();

        match err {
            ValidationError::Failure { status, response } => {
                assert_eq!(status, Status::ReplayedOtp);
                assert_eq!(response.get("status"), Some("REPLAYED_OTP"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_skips_parsing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/wsapi/2.0/verify")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("status=OK\r\n")
            .create_async()
            .await;

        let validator = validator(&server);
        let err = validator
            .invalidate(&Context::background(), "anyotp")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::Transport(TransportError::Status { .. })
        ));
        assert!(err.response().is_none());
    }

    #[tokio::test]
    async fn cancelled_context_fails_before_parsing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/wsapi/2.0/verify")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("status=OK\r\n")
            .expect(0)
            .create_async()
            .await;

        let (ctx, handle) = Context::with_cancel();
        handle.cancel();

        let validator = validator(&server);
        let err = validator.invalidate(&ctx, "anyotp").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(
            err,
            ValidationError::Transport(TransportError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn malformed_endpoint_fails_without_request() {
        let validator = Validator::with_endpoint("::not-a-url::");
        let err = validator
            .invalidate(&Context::background(), "anyotp")
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::UrlBuild(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn concurrent_invalidations_are_independent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/wsapi/2.0/verify")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("status=OK\r\n")
            .expect(4)
            .create_async()
            .await;

        let validator = validator(&server);
        let ctx = Context::background();
        let results = tokio::join!(
            validator.invalidate(&ctx, "otp1"),
            validator.invalidate(&ctx, "otp2"),
            validator.invalidate(&ctx, "otp3"),
            validator.invalidate(&ctx, "otp4"),
        );

        mock.assert_async().await;
        assert!(results.0.is_ok() && results.1.is_ok() && results.2.is_ok() && results.3.is_ok());
    }
}
