/// CRUD client for the site's event and member endpoints
use crate::errors::ApiError;
use crate::records::{Event, EventDraft, Member, MemberDraft};
use crate::upload::TokenSource;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait SiteApi {
    async fn list_events(&self) -> Result<Vec<Event>, ApiError>;
    async fn create_event(&self, draft: &EventDraft) -> Result<Event, ApiError>;
    async fn update_event(&self, id: i64, draft: &EventDraft) -> Result<Event, ApiError>;
    async fn delete_event(&self, id: i64) -> Result<(), ApiError>;

    async fn list_members(&self) -> Result<Vec<Member>, ApiError>;
    async fn create_member(&self, draft: &MemberDraft) -> Result<Member, ApiError>;
    async fn update_member(&self, id: i64, draft: &MemberDraft) -> Result<Member, ApiError>;
    async fn delete_member(&self, id: i64) -> Result<(), ApiError>;
}

/// Site api over HTTP. Reads are public; mutations carry the bearer token.
pub struct HttpSiteApi {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

impl HttpSiteApi {
    pub fn new(base_url: String, timeout: Option<u32>, tokens: Arc<dyn TokenSource>) -> Self {
        let timeout = Duration::from_secs(timeout.unwrap_or(30) as u64);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout / 3)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create site api client");

        HttpSiteApi {
            base_url: base_url.trim_end_matches("/").into(),
            client,
            tokens,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn expect_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = self.check(request).await?;
        resp.json()
            .await
            .map_err(|err| ApiError::new(format!("unexpected response body: {err}"), None))
    }

    async fn check(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                debug!("site api request failed: {}", err);
                return Err(ApiError::new("Failed to reach the site api", None));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            debug!(
                "site api returned status={},resp={}",
                status,
                resp.text()
                    .await
                    .unwrap_or("unable to get response".into())
                    .chars()
                    .take(100)
                    .collect::<String>()
            );
            return Err(ApiError::new(
                "Site api rejected the request",
                Some(status.as_u16()),
            ));
        }
        Ok(resp)
    }
}

#[async_trait]
impl SiteApi for HttpSiteApi {
    async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
        self.expect_json(self.client.get(self.endpoint("/api/events")))
            .await
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event, ApiError> {
        let request = self.client.post(self.endpoint("/api/events")).json(draft);
        self.expect_json(self.authed(request)).await
    }

    async fn update_event(&self, id: i64, draft: &EventDraft) -> Result<Event, ApiError> {
        let request = self
            .client
            .put(self.endpoint(&format!("/api/events/{id}")))
            .json(draft);
        self.expect_json(self.authed(request)).await
    }

    async fn delete_event(&self, id: i64) -> Result<(), ApiError> {
        let request = self.client.delete(self.endpoint(&format!("/api/events/{id}")));
        self.check(self.authed(request)).await?;
        Ok(())
    }

    async fn list_members(&self) -> Result<Vec<Member>, ApiError> {
        self.expect_json(self.client.get(self.endpoint("/api/members")))
            .await
    }

    async fn create_member(&self, draft: &MemberDraft) -> Result<Member, ApiError> {
        let request = self.client.post(self.endpoint("/api/members")).json(draft);
        self.expect_json(self.authed(request)).await
    }

    async fn update_member(&self, id: i64, draft: &MemberDraft) -> Result<Member, ApiError> {
        let request = self
            .client
            .put(self.endpoint(&format!("/api/members/{id}")))
            .json(draft);
        self.expect_json(self.authed(request)).await
    }

    async fn delete_member(&self, id: i64) -> Result<(), ApiError> {
        let request = self.client.delete(self.endpoint(&format!("/api/members/{id}")));
        self.check(self.authed(request)).await?;
        Ok(())
    }
}
