//! In-memory storage backend shared by the integration tests.
//!
//! Buckets live in regions, objects are listed in key order (like S3), and
//! every call is counted so tests can assert on what the pipeline asked for.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ccat::backend::{ObjectPart, Page, RegionClient, StorageProvider};
use ccat::{CcatError, ObjectRef, Result};
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    regions: HashMap<String, String>,
    objects: BTreeMap<(String, String), Vec<u8>>,
    page_size: usize,
    chunk_size: usize,
    credentials_ok: bool,
    fail_list_page: Option<usize>,
    fail_get: Option<(String, usize)>,
    fail_region: Option<(String, String)>,

    region_lookups: AtomicUsize,
    binds: AtomicUsize,
    list_calls: AtomicUsize,
    gets: Mutex<Vec<(String, Range<u64>)>>,
}

/// Builder and handle for the fake backend.
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(State {
                page_size: 1000,
                chunk_size: 3,
                credentials_ok: true,
                ..Default::default()
            }),
        }
    }

    fn state_mut(&mut self) -> &mut State {
        Arc::get_mut(&mut self.state).expect("configure the backend before sharing it")
    }

    pub fn bucket(mut self, bucket: &str, region: &str) -> Self {
        self.state_mut()
            .regions
            .insert(bucket.to_string(), region.to_string());
        self
    }

    pub fn object(mut self, bucket: &str, key: &str, data: &[u8]) -> Self {
        self.state_mut()
            .objects
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
        self
    }

    /// Maximum objects per listing page
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.state_mut().page_size = page_size;
        self
    }

    /// Size of the body chunks a ranged fetch is split into
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.state_mut().chunk_size = chunk_size;
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.state_mut().credentials_ok = false;
        self
    }

    /// Fail the listing request for the given 1-based page number
    pub fn fail_list_page(mut self, page: usize) -> Self {
        self.state_mut().fail_list_page = Some(page);
        self
    }

    /// Break the body of `key` after `after_bytes` bytes
    pub fn fail_get(mut self, key: &str, after_bytes: usize) -> Self {
        self.state_mut().fail_get = Some((key.to_string(), after_bytes));
        self
    }

    /// Fail region lookups for `bucket` with a permission error
    pub fn fail_region(mut self, bucket: &str, message: &str) -> Self {
        self.state_mut().fail_region = Some((bucket.to_string(), message.to_string()));
        self
    }

    pub fn provider(&self) -> Arc<dyn StorageProvider> {
        Arc::new(self.clone())
    }

    pub fn region_lookups(&self) -> usize {
        self.state.region_lookups.load(Ordering::SeqCst)
    }

    pub fn binds(&self) -> usize {
        self.state.binds.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    /// Every ranged fetch, in request order
    pub fn gets(&self) -> Vec<(String, Range<u64>)> {
        self.state.gets.lock().unwrap().clone()
    }

    /// Keys fetched, in request order, without repeats for multi-part objects
    pub fn fetched_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for (key, _) in self.gets() {
            if keys.last() != Some(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

#[async_trait]
impl StorageProvider for MemoryBackend {
    async fn check_credentials(&self) -> Result<()> {
        if self.state.credentials_ok {
            Ok(())
        } else {
            Err(CcatError::Credentials("no credentials in test backend".into()))
        }
    }

    async fn bucket_region(&self, bucket: &str, _fallback_region: &str) -> Result<String> {
        self.state.region_lookups.fetch_add(1, Ordering::SeqCst);
        if let Some((failing, message)) = &self.state.fail_region {
            if failing == bucket {
                let err = io::Error::new(io::ErrorKind::PermissionDenied, message.clone());
                return Err(err.into());
            }
        }
        self.state
            .regions
            .get(bucket)
            .cloned()
            .ok_or_else(|| CcatError::BucketNotFound(bucket.to_string()))
    }

    async fn bind(&self, region: &str) -> Result<Arc<dyn RegionClient>> {
        self.state.binds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryClient {
            state: self.state.clone(),
            region: region.to_string(),
        }))
    }
}

struct MemoryClient {
    state: Arc<State>,
    region: String,
}

impl MemoryClient {
    fn check_region(&self, bucket: &str) -> std::result::Result<(), String> {
        match self.state.regions.get(bucket) {
            Some(region) if *region == self.region => Ok(()),
            Some(region) => Err(format!(
                "bucket {} is in {}, client bound to {}",
                bucket, region, self.region
            )),
            None => Err(format!("NoSuchBucket: {}", bucket)),
        }
    }
}

#[async_trait]
impl RegionClient for MemoryClient {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<Page> {
        let page_number = self.state.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.fail_list_page == Some(page_number) {
            return Err(CcatError::enumeration(bucket, prefix, "listing unavailable"));
        }
        self.check_region(bucket)
            .map_err(|e| CcatError::enumeration(bucket, prefix, e))?;

        let keys: Vec<String> = self
            .state
            .objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect();

        let start: usize = continuation.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + self.state.page_size).min(keys.len());
        let objects = keys[start..end]
            .iter()
            .map(|k| ObjectRef::new(bucket, k.as_str()))
            .collect();
        let next_continuation = if end < keys.len() {
            Some(end.to_string())
        } else {
            None
        };

        Ok(Page {
            objects,
            next_continuation,
        })
    }

    async fn get_part(&self, object: &ObjectRef, range: Range<u64>) -> Result<ObjectPart> {
        self.state
            .gets
            .lock()
            .unwrap()
            .push((object.key.clone(), range.clone()));
        self.check_region(&object.bucket)
            .map_err(|e| CcatError::transfer(&object.bucket, &object.key, e))?;

        let data = self
            .state
            .objects
            .get(&(object.bucket.clone(), object.key.clone()))
            .ok_or_else(|| CcatError::transfer(&object.bucket, &object.key, "NoSuchKey"))?;

        let total = data.len();
        let start = (range.start as usize).min(total);
        let end = (range.end as usize).min(total);

        let mut items: Vec<io::Result<Bytes>> = data[start..end]
            .chunks(self.state.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        if let Some((key, after)) = &self.state.fail_get {
            if *key == object.key && *after < end {
                let keep = after.saturating_sub(start);
                items = data[start..start + keep]
                    .chunks(self.state.chunk_size)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                items.push(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )));
            }
        }

        Ok(ObjectPart {
            total_size: total as u64,
            body: stream::iter(items).boxed(),
        })
    }
}
