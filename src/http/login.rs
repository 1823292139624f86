//! Login interception.
//!
//! Translates the credentials of a login request into the trusted identity
//! header the backend honours in proxy-auth mode. The body is a
//! single-consumption stream, so it is buffered once and handed back as a
//! fresh body carrying the same bytes.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue},
};

use bytes::Bytes;

use crate::error::{GatewayError, GatewayResult};
use crate::identity::{Credentials, IdentityLookup, Verdict};
use crate::observability::metrics;

#[derive(Clone)]
pub struct LoginInterceptor {
    identities: Arc<dyn IdentityLookup>,
    identity_header: HeaderName,
    max_payload_bytes: usize,
}

impl LoginInterceptor {
    pub fn new(identities: Arc<dyn IdentityLookup>, identity_header: HeaderName, max_payload_bytes: usize) -> Self {
        Self {
            identities,
            identity_header,
            max_payload_bytes,
        }
    }

    pub fn identity_header(&self) -> &HeaderName {
        &self.identity_header
    }

    /// Decode the credentials in `body` and assert the identity on `headers`
    /// if the lookup affirms it. Returns the body to forward.
    pub async fn intercept(&self, body: Body, headers: &mut HeaderMap) -> GatewayResult<Body> {
        let bytes: Bytes = axum::body::to_bytes(body, self.max_payload_bytes)
            .await
            .map_err(|e| GatewayError::MalformedPayload(format!("unreadable login body: {}", e)))?;

        let credentials: Credentials = serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::MalformedPayload(format!("invalid login JSON: {}", e)))?;

        let outcome = match self.identities.verify(&credentials).await {
            Ok(Verdict::Affirmed) => match HeaderValue::from_str(&credentials.username) {
                Ok(value) => {
                    headers.insert(self.identity_header.clone(), value);
                    tracing::info!(username = %credentials.username, "Login affirmed, identity asserted");
                    "affirmed"
                }
                Err(_) => {
                    tracing::warn!(username = ?credentials.username, "Username not representable as header value");
                    "denied"
                }
            },
            Ok(Verdict::Denied) => {
                tracing::info!(username = %credentials.username, "Login denied, forwarding unauthenticated");
                "denied"
            }
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Identity lookup failed, forwarding unauthenticated");
                "error"
            }
        };
        metrics::record_login(outcome);

        Ok(Body::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityError;
    use async_trait::async_trait;

    struct Fixed(Result<Verdict, ()>);

    #[async_trait]
    impl IdentityLookup for Fixed {
        async fn verify(&self, _credentials: &Credentials) -> Result<Verdict, IdentityError> {
            self.0.map_err(|_| IdentityError::Unavailable("database down".into()))
        }
    }

    const HEADER: HeaderName = HeaderName::from_static("x-generic-appname");
    const PAYLOAD: &str = r#"{"username":"alice","password":"wonderland","recaptcha":""}"#;

    fn interceptor(answer: Result<Verdict, ()>) -> LoginInterceptor {
        LoginInterceptor::new(Arc::new(Fixed(answer)), HEADER, 1024)
    }

    async fn body_bytes(body: Body) -> Vec<u8> {
        axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn affirmed_login_sets_identity_and_keeps_body() {
        let mut headers = HeaderMap::new();
        let body = interceptor(Ok(Verdict::Affirmed))
            .intercept(Body::from(PAYLOAD), &mut headers)
            .await
            .unwrap();

        assert_eq!(headers[HEADER], "alice");
        assert_eq!(body_bytes(body).await, PAYLOAD.as_bytes());
    }

    #[tokio::test]
    async fn denied_login_leaves_identity_unset() {
        let mut headers = HeaderMap::new();

        let body = interceptor(Ok(Verdict::Denied))
            .intercept(Body::from(PAYLOAD), &mut headers)
            .await
            .unwrap();

        assert!(headers.get(HEADER).is_none());
        assert_eq!(body_bytes(body).await, PAYLOAD.as_bytes());
    }

    #[tokio::test]
    async fn lookup_failure_forwards_unauthenticated() {
        let mut headers = HeaderMap::new();
        let body = interceptor(Err(()))
            .intercept(Body::from(PAYLOAD), &mut headers)
            .await
            .unwrap();

        assert!(headers.get(HEADER).is_none());
        assert_eq!(body_bytes(body).await, PAYLOAD.as_bytes());
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let mut headers = HeaderMap::new();
        let err = interceptor(Ok(Verdict::Affirmed))
            .intercept(Body::from("{\"username\": 42"), &mut headers)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::MalformedPayload(_)));
        assert!(headers.get(HEADER).is_none());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut headers = HeaderMap::new();
        let huge = format!(r#"{{"username":"alice","password":"{}"}}"#, "x".repeat(4096));
        let err = interceptor(Ok(Verdict::Affirmed))
            .intercept(Body::from(huge), &mut headers)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::MalformedPayload(_)));
    }
}
