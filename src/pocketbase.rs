use anyhow::{Context, Result, bail};
use log::warn;
use reqwest::{StatusCode, blocking};
use serde::Deserialize;
use serde_json::json;
use std::{thread, time::Duration};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Deserialize)]
pub struct Record {
    pub id: String,
    pub image: String,
    #[serde(default)]
    pub views: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPage {
    #[serde(default)]
    total_items: u64,
    #[serde(default)]
    items: Vec<Record>,
}

/// Client for a PocketBase-style record store. Cloning shares the underlying
/// connection pool.
#[derive(Clone)]
pub struct PocketBase {
    client: blocking::Client,
    base_url: String,
}

impl PocketBase {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("could not build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches one record from the collection in random order.
    pub fn random_record(&self, collection: &str) -> Result<Record> {
        let url = format!(
            "{}/api/collections/{collection}/records?perPage=1&sort=@random",
            self.base_url,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .context("could not fetch random record")?;
        let page: RecordPage = Self::check(response)?
            .json()
            .context("could not decode record list")?;

        let Some(record) = page.items.into_iter().next() else {
            bail!("no records found in collection {collection}");
        };

        if record.image.is_empty() {
            bail!("record {} has no image", record.id);
        }

        Ok(record)
    }

    /// Downloads the image file referenced by the record.
    pub fn download(&self, collection: &str, record: &Record) -> Result<Vec<u8>> {
        let url = format!(
            "{}/api/files/{collection}/{}/{}",
            self.base_url, record.id, record.image,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .context("could not download image")?;
        let bytes = Self::check(response)?
            .bytes()
            .context("could not read image data")?;

        Ok(bytes.to_vec())
    }

    /// Reads the collection's total item count from the pagination metadata.
    pub fn count(&self, collection: &str) -> Result<u64> {
        let url = format!(
            "{}/api/collections/{collection}/records?perPage=1",
            self.base_url,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .context("could not fetch collection stats")?;
        let page: RecordPage = Self::check(response)?
            .json()
            .context("could not decode record list")?;

        Ok(page.total_items)
    }

    /// Writes back `views + 1`, where `views` is the value observed at fetch
    /// time. Concurrent bumps of the same record are last-write-wins.
    pub fn bump_views(&self, collection: &str, id: &str, views: i64) -> Result<()> {
        let url = format!("{}/api/collections/{collection}/records/{id}", self.base_url);

        let response = self
            .client
            .patch(&url)
            .timeout(UPDATE_TIMEOUT)
            .json(&json!({ "views": views + 1 }))
            .send()
            .context("could not update views")?;
        Self::check(response)?;

        Ok(())
    }

    /// Runs `bump_views` on its own thread. The caller never waits on it and
    /// a failure is logged, not surfaced.
    pub fn bump_views_detached(&self, collection: &str, record: &Record) {
        let pocketbase = self.clone();
        let collection = collection.to_string();
        let id = record.id.clone();
        let views = record.views;

        thread::spawn(move || {
            if let Err(error) = pocketbase.bump_views(&collection, &id, views) {
                warn!("Failed to update views for record {id}: {error:#}");
            }
        });
    }

    fn check(response: blocking::Response) -> Result<blocking::Response> {
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            bail!("API error {}: {body}", status.as_u16());
        }

        Ok(response)
    }
}
