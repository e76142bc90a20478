//! Request builder implementation

use crate::auth::TokenAuthenticator;
use crate::error::Result;
use crate::http::HttpRequest;
use crate::pagination::PageCursor;
use crate::stream::{Partition, StreamDefinition};
use crate::types::format_query_timestamp;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

const PAGE_SIZE_PARAM: &str = "pageSize";
const PAGE_NUMBER_PARAM: &str = "pageNumber";
const LAST_MODIFIED_PARAM: &str = "lastModifiedDateTime";

/// Merge query parameter layers.
///
/// Later layers override earlier ones key by key; a key keeps the position
/// where it first appeared. The builder merges, lowest precedence first:
/// page size, stream params, partition values, page number, replication
/// filter.
pub fn merge_params(layers: &[&[(String, String)]]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::new();
    for layer in layers {
        for (key, value) in *layer {
            match merged.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1.clone_from(value),
                None => merged.push((key.clone(), value.clone())),
            }
        }
    }
    merged
}

/// Builds authenticated API requests
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    authenticator: Arc<TokenAuthenticator>,
    start_date: DateTime<Utc>,
    user_agent: Option<String>,
    page_size: u32,
}

impl RequestBuilder {
    /// Create a builder for an API root
    pub fn new(
        base_url: impl Into<String>,
        authenticator: Arc<TokenAuthenticator>,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            authenticator,
            start_date,
            user_agent: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Send a User-Agent header
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Override the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The shared authenticator
    pub fn authenticator(&self) -> &Arc<TokenAuthenticator> {
        &self.authenticator
    }

    /// Lower bound for the replication filter: the later of bookmark and start date
    pub fn starting_timestamp(&self, bookmark: Option<&DateTime<Utc>>) -> DateTime<Utc> {
        match bookmark {
            Some(bookmark) if *bookmark > self.start_date => *bookmark,
            _ => self.start_date,
        }
    }

    /// Query parameters for a page, without touching the authenticator
    pub fn query_params(
        &self,
        stream: &StreamDefinition,
        partition: &Partition,
        cursor: PageCursor,
        bookmark: Option<&DateTime<Utc>>,
    ) -> Vec<(String, String)> {
        let defaults = [(PAGE_SIZE_PARAM.to_string(), self.page_size.to_string())];
        let partition_params = partition.query_pairs();

        let mut engine_params = Vec::new();
        if !cursor.is_first() {
            engine_params.push((PAGE_NUMBER_PARAM.to_string(), cursor.page().to_string()));
        }
        if stream.replication_key().is_some() {
            let since = self.starting_timestamp(bookmark);
            engine_params.push((LAST_MODIFIED_PARAM.to_string(), format_query_timestamp(&since)));
        }

        merge_params(&[
            &defaults,
            stream.params(),
            &partition_params,
            &engine_params,
        ])
    }

    /// Build the request for one page
    pub async fn build(
        &self,
        stream: &StreamDefinition,
        partition: &Partition,
        cursor: PageCursor,
        bookmark: Option<&DateTime<Utc>>,
    ) -> Result<HttpRequest> {
        let token = self.authenticator.get_token().await?;

        let mut headers = Vec::new();
        if let Some(agent) = &self.user_agent {
            headers.push(("User-Agent".to_string(), agent.clone()));
        }

        Ok(HttpRequest {
            url: self.url_for(stream),
            query: self.query_params(stream, partition, cursor, bookmark),
            headers,
            bearer_token: Some(token),
        })
    }

    fn url_for(&self, stream: &StreamDefinition) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            stream.path().trim_start_matches('/')
        )
    }
}
