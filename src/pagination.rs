//! Page-by-page retrieval of list endpoints.
//!
//! List endpoints answer with a `content` array and a flag telling whether
//! this was the final page. Depending on the endpoint the flag is called
//! `lastPage` or `last`; a response carrying neither is treated as final.

use crate::{Client, RequestMetadata, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub last_page: Option<bool>,
    #[serde(default)]
    pub last: Option<bool>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub number: Option<u64>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.last_page.or(self.last).unwrap_or(true)
    }
}

/// Fetches every page of a list endpoint, starting at page 0.
///
/// The `page` query parameter of `metadata` is advanced until the service
/// reports the final page. An empty page that does not claim to be final
/// also ends the walk, so a misbehaving endpoint cannot loop forever.
pub async fn collect_pages<T>(client: &Client, mut metadata: RequestMetadata) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let mut items = Vec::new();
    let mut page_number: u64 = 0;

    loop {
        metadata.set_query_param("page", page_number);
        let page = client.call::<(), Page<T>>(metadata.clone(), None).await?.data;
        let last = page.is_last();
        let received = page.content.len();
        items.extend(page.content);

        tracing::debug!(
            path = %metadata.path,
            page = page_number,
            received = received,
            total = items.len(),
            last = last,
            "Fetched page"
        );

        if last {
            break;
        }
        if received == 0 {
            tracing::warn!(
                path = %metadata.path,
                page = page_number,
                "Empty page not flagged as last, stopping"
            );
            break;
        }
        page_number += 1;
    }

    Ok(items)
}
