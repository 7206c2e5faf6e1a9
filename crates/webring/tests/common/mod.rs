//! Shared fixtures for ring integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use webring::verifier::{FetchError, FetchedPage, PageFetcher};
use webring::{Member, MemoryStore, NewMember, RingEndpoint};

/// Serves canned pages per URL; unknown URLs fail to connect
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, Result<FetchedPage, FetchError>>>,
    pub requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(FetchedPage { status, body: body.to_string() }));
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.pages.lock().unwrap().insert(url.to_string(), Err(error));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Connect(format!("no route to {url}"))))
    }
}

pub fn ring_endpoint() -> RingEndpoint {
    RingEndpoint { host: "ring.example".into(), ..RingEndpoint::default() }
}

/// Page body linking back to the ring for `domain` over plain HTTP
pub fn linked_page(domain: &str) -> String {
    format!(
        r#"<footer>
            <a href="http://ring.example/prev?source={domain}">&larr;</a>
            <a href="http://ring.example/next?source={domain}">&rarr;</a>
        </footer>"#
    )
}

/// Member created at `created` seconds past the epoch
pub fn member(id: i64, created: i64, domain: &str) -> Member {
    NewMember::new(domain, domain, "Test Author")
        .into_member(id, Utc.timestamp_opt(created, 0).unwrap())
}

pub async fn store_with(members: Vec<Member>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for member in members {
        store.insert(member).await.unwrap();
    }
    store
}
