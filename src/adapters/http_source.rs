use crate::core::RecordSource;
use crate::domain::model::{Item, Unit};
use crate::utils::error::{FlowError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Reads units and items as JSON from an HTTP API.
pub struct HttpSource {
    client: Client,
    units_url: Url,
    items_url: Url,
    headers: HashMap<String, String>,
}

/// Plain arrays and tastypie-style `{"meta": {...}, "objects": [...]}` pages
/// are both accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged {
        objects: Vec<T>,
        #[serde(default)]
        meta: Option<PageMeta>,
    },
}

#[derive(Deserialize)]
struct PageMeta {
    /// Link to the following page, absolute or relative to the current one.
    #[serde(default)]
    next: Option<String>,
}

impl HttpSource {
    pub fn new(endpoint: &str, units_path: &str, items_path: &str) -> Result<Self> {
        Self::with_options(endpoint, units_path, items_path, None, HashMap::new())
    }

    pub fn with_options(
        endpoint: &str,
        units_path: &str,
        items_path: &str,
        timeout: Option<Duration>,
        headers: HashMap<String, String>,
    ) -> Result<Self> {
        let base = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{}/", endpoint)
        };
        let parse_err = |e: url::ParseError| FlowError::InvalidConfigValueError {
            field: "source.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: e.to_string(),
        };
        let base = Url::parse(&base).map_err(parse_err)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            units_url: base.join(units_path).map_err(parse_err)?,
            items_url: base.join(items_path).map_err(parse_err)?,
            headers,
        })
    }

    /// Fetches every page of a listing, following `meta.next` links.
    async fn fetch<T: DeserializeOwned>(&self, url: &Url) -> Result<Vec<T>> {
        let mut records = Vec::new();
        let mut next = Some(url.clone());
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            pages += 1;
            match self.fetch_page::<T>(&page_url).await? {
                Listing::Plain(page) => records.extend(page),
                Listing::Paged { objects, meta } => {
                    records.extend(objects);
                    if let Some(link) = meta.and_then(|meta| meta.next) {
                        let following =
                            page_url.join(&link).map_err(|e| FlowError::SourceError {
                                message: format!("{} links to invalid page '{}': {}", page_url, link, e),
                            })?;
                        if following == page_url {
                            return Err(FlowError::SourceError {
                                message: format!("{} links to itself as the next page", page_url),
                            });
                        }
                        next = Some(following);
                    }
                }
            }
        }

        tracing::debug!("Read {} records from {} in {} pages", records.len(), url, pages);
        Ok(records)
    }

    async fn fetch_page<T: DeserializeOwned>(&self, url: &Url) -> Result<Listing<T>> {
        tracing::debug!("Making API request to: {}", url);
        let mut request = self.client.get(url.clone());
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());
        if !response.status().is_success() {
            return Err(FlowError::SourceError {
                message: format!("{} returned {}", url, response.status()),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn units(&self) -> Result<Vec<Unit>> {
        self.fetch(&self.units_url).await
    }

    async fn items(&self) -> Result<Vec<Item>> {
        self.fetch(&self.items_url).await
    }
}
