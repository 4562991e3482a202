use std::sync::Arc;

use filerouter::{ConfigurationValue, FormDocument, ProviderError, ProviderRecord, ValidationResult};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::criteria::{Criteria, PagingParams};
use crate::handle::RemoteRepositoryProvider;

/// Path of the provider collection below the catalog base URL.
pub const RESOURCE_PATH: &str = "/providers/repositories";

/// Connection settings for a remote provider catalog.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Base URL of the catalog API, e.g. `https://files.example.com/api`.
    pub base_url: String,
    pub token: Option<String>,
}

/// Client-side gateway onto the remote provider catalog.
///
/// The catalog is managed out-of-band, so this gateway only reads:
/// `create_or_update` and `delete` always fail with `ReadOnly`. Cloning is
/// cheap and clones share one HTTP client.
#[derive(Debug, Clone)]
pub struct RepositoryProviderResource {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ResourceConfig,
    client: reqwest::Client,
}

impl RepositoryProviderResource {
    pub fn new(config: ResourceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                client: reqwest::Client::new(),
            }),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.inner.config.base_url)
            .map_err(|e| ProviderError::Parse(format!("invalid catalog URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| ProviderError::Parse("catalog URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(RESOURCE_PATH.split('/').filter(|s| !s.is_empty()))
            .extend(segments);

        Ok(url)
    }

    fn build_request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut req = self
            .inner
            .client
            .request(method, url)
            .header("User-Agent", "filerouter");

        if let Some(token) = &self.inner.config.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        req
    }

    /// Send `req` and decode the JSON body. A 404 is reported as
    /// `RecordNotFound(id)` when `id` is given.
    async fn execute<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        id: Option<&str>,
    ) -> Result<T, ProviderError> {
        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND
            && let Some(id) = id
        {
            return Err(ProviderError::RecordNotFound(id.to_owned()));
        }

        if !status.is_success() {
            return Err(ProviderError::RemoteUnavailable(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_else(|_| "unknown".into())
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }

    async fn fetch_page(
        &self,
        criteria: &Criteria,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ProviderRecord>, ProviderError> {
        let url = self.endpoint(&[])?;
        tracing::debug!(%url, page, per_page, "fetching provider page");

        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if !criteria.is_empty() {
            let encoded = criteria
                .to_query()
                .map_err(|e| ProviderError::Parse(format!("invalid criteria: {e}")))?;
            query.push(("criteria", encoded));
        }

        let req = self.build_request(Method::GET, url).query(&query);
        self.execute(req, None).await
    }

    /// List provider records matching `criteria`, one page at a time.
    ///
    /// Each record arrives already attached to its handle. The next page is
    /// requested only once the stream is polled past the current one. Every
    /// call starts its own independent iteration.
    ///
    /// The listing ends after the first page shorter than `per_page`, so the
    /// catalog must fill every page but the last. A server that caps page
    /// size below `per_page` truncates the listing; pick a `per_page` within
    /// that cap.
    pub fn find(
        &self,
        criteria: &Criteria,
        paging: PagingParams,
    ) -> BoxStream<'static, Result<RemoteRepositoryProvider, ProviderError>> {
        let resource = self.clone();
        let criteria = criteria.clone();
        let per_page = paging.per_page;

        stream::try_unfold(Some(paging.page), move |next| {
            next_page(resource.clone(), criteria.clone(), next, per_page)
        })
        .map_ok(|handles| stream::iter(handles.into_iter().map(Ok::<_, ProviderError>)))
        .try_flatten()
        .boxed()
    }

    /// Handle for `id` without fetching anything; the record is loaded on
    /// first use.
    pub fn get(&self, id: impl Into<String>) -> RemoteRepositoryProvider {
        RemoteRepositoryProvider::unhydrated(self.clone(), id.into())
    }

    /// Fetch exactly one record.
    pub async fn get_record(&self, id: &str) -> Result<ProviderRecord, ProviderError> {
        let url = self.endpoint(&[id])?;
        tracing::debug!(%url, "fetching provider record");
        self.execute(self.build_request(Method::GET, url), Some(id))
            .await
    }

    /// Hand `configuration` to the remote implementation for validation.
    pub async fn validate_configuration(
        &self,
        id: &str,
        configuration: &ConfigurationValue,
    ) -> Result<ValidationResult, ProviderError> {
        let url = self.endpoint(&[id, "validate"])?;
        tracing::debug!(%url, "validating configuration");
        let req = self.build_request(Method::POST, url).json(configuration);
        self.execute(req, Some(id)).await
    }

    /// Fetch the form document for the provider with `id`.
    pub async fn get_form(&self, id: &str) -> Result<FormDocument, ProviderError> {
        let url = self.endpoint(&[id, "form"])?;
        tracing::debug!(%url, "fetching provider form");
        self.execute(self.build_request(Method::GET, url), Some(id))
            .await
    }

    pub async fn create_or_update(&self, _record: &ProviderRecord) -> Result<(), ProviderError> {
        Err(ProviderError::ReadOnly("create_or_update"))
    }

    pub async fn delete(&self, _id: &str) -> Result<(), ProviderError> {
        Err(ProviderError::ReadOnly("delete"))
    }
}

type Page = (Vec<RemoteRepositoryProvider>, Option<u32>);

/// One step of a `find` iteration: fetch `next` (if any) and decide
/// whether another page follows.
async fn next_page(
    resource: RepositoryProviderResource,
    criteria: Criteria,
    next: Option<u32>,
    per_page: u32,
) -> Result<Option<Page>, ProviderError> {
    let Some(page) = next else {
        return Ok(None);
    };

    let records = resource.fetch_page(&criteria, page, per_page).await?;
    let next = if (records.len() as u32) < per_page {
        None
    } else {
        Some(page + 1)
    };

    let handles = records
        .into_iter()
        .map(|record| RemoteRepositoryProvider::hydrated(resource.clone(), record))
        .collect();

    Ok(Some((handles, next)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(base_url: &str) -> RepositoryProviderResource {
        RepositoryProviderResource::new(ResourceConfig {
            base_url: base_url.into(),
            token: None,
        })
    }

    #[test]
    fn endpoint_appends_resource_path() {
        let url = resource("http://localhost:8080").endpoint(&["p1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/providers/repositories/p1");
    }

    #[test]
    fn endpoint_keeps_base_path_and_escapes_ids() {
        let url = resource("http://localhost/api/")
            .endpoint(&["a b", "validate"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost/api/providers/repositories/a%20b/validate"
        );
    }

    #[test]
    fn endpoint_rejects_bad_base_url() {
        let result = resource("not a url").endpoint(&[]);
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn mutations_are_read_only() {
        let resource = resource("http://localhost");
        let record: ProviderRecord =
            serde_json::from_str(r#"{"id": "x", "name": "X", "version": [0, 1]}"#).unwrap();

        assert!(matches!(
            resource.create_or_update(&record).await,
            Err(ProviderError::ReadOnly(_))
        ));
        assert!(matches!(
            resource.delete("x").await,
            Err(ProviderError::ReadOnly(_))
        ));
    }
}
