//! In-memory [`ObjectStore`] for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use url::Url;

use super::{ObjectStore, PutObjectRequest, StorageError, object_url, validate_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Keeps objects in a map keyed by object key. Clones share the same objects.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    bucket: String,
    base_url: Url,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    puts: Arc<Mutex<usize>>,
    failure: Arc<Mutex<Option<StorageError>>>,
}

impl InMemoryStore {
    pub fn new(bucket: &str) -> Self {
        let base_url = Url::parse(&format!("https://{bucket}.s3.amazonaws.com/")).expect("bucket names are valid hosts");
        Self {
            bucket: bucket.to_string(),
            base_url,
            objects: Arc::default(),
            puts: Arc::default(),
            failure: Arc::default(),
        }
    }

    /// Make every following `put_object` fail with `error`.
    pub fn fail_with(&self, error: StorageError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().unwrap().get(key).cloned()
    }

    /// Look an object up by the location `put_object` returned for it, decoding the key from the
    /// location's path the way a client following the link would.
    pub fn resolve(&self, location: &str) -> Option<StoredObject> {
        let url = Url::parse(location).ok()?;
        if url.origin() != self.base_url.origin() {
            return None;
        }
        let encoded_key = url.path().strip_prefix(self.base_url.path())?;
        let key = percent_decode_str(encoded_key).decode_utf8().ok()?;
        self.get(&key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put_object` calls that reached the store, failed ones included.
    pub fn put_count(&self) -> usize {
        *self.puts.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<String, StorageError> {
        *self.puts.lock().unwrap() += 1;

        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        validate_key(&request.key)?;

        let location = object_url(&self.base_url, &request.key).to_string();
        self.objects.write().unwrap().insert(
            request.key,
            StoredObject {
                body: request.body,
                content_type: request.content_type,
            },
        );
        Ok(location)
    }
}
