//! `ApiClient`: one method per Odyssey endpoint.
//!
//! # Security
//!
//! - The session token is held as a `SecretString` and never logged
//! - Request bodies are not logged; only method, path and status are

use std::time::Duration;

use common::secret::{ExposeSecret, SecretString};
use common::types::{
    DataResponse, IdentityResponse, LoginRequest, MessageDataResponse, MessageResponse,
    RegisterRequest, TokenResponse, UploadResponse, ValidationErrorResponse,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Connection timeout for the underlying HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Multipart field the API reads uploads from.
const UPLOAD_FIELD: &str = "file";

/// HTTP client for the Odyssey API.
///
/// Resource methods take the collection segment (`"stars"`, `"moons"`, ...)
/// and return records as JSON values.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url,
            token: None,
        })
    }

    /// Use an existing session token for subsequent requests.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Whether a session token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /`
    pub async fn identity(&self) -> Result<IdentityResponse, ClientError> {
        self.send(self.request(Method::GET, "/")).await
    }

    /// `POST /auth/register`
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<MessageResponse, ClientError> {
        self.send(self.request(Method::POST, "/auth/register").json(request))
            .await
    }

    /// `POST /auth/login`. Keeps the returned token for later calls.
    #[instrument(skip_all, name = "odyssey_client.login")]
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: TokenResponse = self
            .send(self.request(Method::POST, "/auth/login").json(&body))
            .await?;

        self.token = Some(SecretString::from(response.token));
        debug!(target: "odyssey_client", "Session token acquired");
        Ok(())
    }

    /// `POST /auth/logout`. Drops the held token even if the call fails.
    pub async fn logout(&mut self) -> Result<MessageResponse, ClientError> {
        let result = self.send(self.request(Method::POST, "/auth/logout")).await;
        self.token = None;
        result
    }

    /// `GET /auth/me`
    pub async fn me(&self) -> Result<Value, ClientError> {
        let response: DataResponse<Value> =
            self.send(self.request(Method::GET, "/auth/me")).await?;
        Ok(response.data)
    }

    /// `GET /api/<collection>`
    pub async fn list(&self, collection: &str) -> Result<Vec<Value>, ClientError> {
        let response: DataResponse<Vec<Value>> = self
            .send(self.request(Method::GET, &format!("/api/{collection}")))
            .await?;
        Ok(response.data)
    }

    /// `GET /api/<collection>/<id>`
    pub async fn get(&self, collection: &str, id: i64) -> Result<Value, ClientError> {
        let response: DataResponse<Value> = self
            .send(self.request(Method::GET, &format!("/api/{collection}/{id}")))
            .await?;
        Ok(response.data)
    }

    /// `POST /api/<collection>`
    pub async fn create<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        body: &T,
    ) -> Result<MessageDataResponse<Value>, ClientError> {
        self.send(
            self.request(Method::POST, &format!("/api/{collection}"))
                .json(body),
        )
        .await
    }

    /// `PUT /api/<collection>/<id>`
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: i64,
        body: &T,
    ) -> Result<MessageDataResponse<Value>, ClientError> {
        self.send(
            self.request(Method::PUT, &format!("/api/{collection}/{id}"))
                .json(body),
        )
        .await
    }

    /// `DELETE /api/<collection>/<id>`
    pub async fn delete(&self, collection: &str, id: i64) -> Result<MessageResponse, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/api/{collection}/{id}")))
            .await
    }

    /// `POST /upload` with one file.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let form = Form::new().part(
            UPLOAD_FIELD,
            Part::bytes(bytes).file_name(file_name.to_string()),
        );
        self.send(self.request(Method::POST, "/upload").multipart(form))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await.map_err(|e| {
            warn!(target: "odyssey_client", error = %e, "API request failed");
            ClientError::Offline(e.to_string())
        })?;
        handle_response(response).await
    }
}

/// Decode a success body, or turn an error status into `ClientError::Api`.
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    debug!(
        target: "odyssey_client",
        status = status.as_u16(),
        url = %response.url().path(),
        "API response"
    );

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()));
    }

    let body = response.bytes().await.unwrap_or_default();
    if let Ok(validation) = serde_json::from_slice::<ValidationErrorResponse>(&body) {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: validation.message,
            errors: validation.errors,
        });
    }

    let message = serde_json::from_slice::<MessageResponse>(&body)
        .map(|body| body.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
        errors: Vec::new(),
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::error::OFFLINE_MESSAGE;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_login_stores_token_for_later_calls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"username": "vera", "password": "dark-matter"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "a.b.c"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer a.b.c"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"id": 1, "username": "vera"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert!(!client.is_authenticated());

        client.login("vera", "dark-matter").await.unwrap();
        assert!(client.is_authenticated());

        let me = client.me().await.unwrap();
        assert_eq!(me["username"], "vera");
    }

    #[tokio::test]
    async fn test_list_and_create() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/stars"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"id": 1, "name": "Vega"}]})),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/stars"))
            .and(body_json(json!({"name": "Deneb"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "Star successfully created",
                "data": {"id": 2, "name": "Deneb"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let stars = client.list("stars").await.unwrap();
        assert_eq!(stars.len(), 1);

        let created = client
            .create("stars", &json!({"name": "Deneb"}))
            .await
            .unwrap();
        assert_eq!(created.message, "Star successfully created");
        assert_eq!(created.data["id"], 2);
    }

    #[tokio::test]
    async fn test_error_status_carries_api_message() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/asteroids/9"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"message": "Asteroid with the id: 9 not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .delete("asteroids", 9)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.user_message(), "Asteroid with the id: 9 not found");
    }

    #[tokio::test]
    async fn test_validation_errors_are_kept() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/planets/3"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "Validation failed",
                "errors": [{"field": "mass", "message": "mass must be a non-negative number"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .update("planets", 3, &json!({"mass": -1}))
            .await
            .unwrap_err();

        match err {
            ClientError::Api { status, errors, .. } => {
                assert_eq!(status, 400);
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "mass");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_falls_back_to_reason() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/comets/1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get("comets", 1).await.unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert_eq!(err.user_message(), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_offline() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let err = ApiClient::new(ClientConfig::new(uri).with_http_timeout(Duration::from_secs(2)))
            .unwrap()
            .list("galaxies")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Offline(_)));
        assert_eq!(err.user_message(), OFFLINE_MESSAGE);
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_file() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("authorization", "Bearer a.b.c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": "1718000000000.png",
                "path": "http://localhost:3000/uploads/1718000000000.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_token(SecretString::from("a.b.c"));
        let uploaded = client.upload("m42.png", b"png".to_vec()).await.unwrap();

        assert_eq!(uploaded.file, "1718000000000.png");
        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
    }

    #[tokio::test]
    async fn test_logout_drops_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "Successfully logged out"})),
            )
            .mount(&server)
            .await;

        let mut client = client_for(&server).with_token(SecretString::from("a.b.c"));
        let response = client.logout().await.unwrap();

        assert_eq!(response.message, "Successfully logged out");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:3000"))
            .unwrap()
            .with_token(SecretString::from("secret-session-token"));

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("secret-session-token"));
    }
}
