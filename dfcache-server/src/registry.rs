//! In-memory bucket registry backing the reference service

use dfcache_core::*;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Result, ServerError};

#[derive(Debug, Clone)]
struct BucketEntry {
    local: bool,
    props: BucketProperties,
    objects: BTreeMap<String, ObjectEntry>,
}

impl BucketEntry {
    fn new(local: bool, provider: CloudProvider) -> Self {
        BucketEntry {
            local,
            props: BucketProperties {
                cloud_provider: Some(provider),
                ..Default::default()
            },
            objects: BTreeMap::new(),
        }
    }
}

/// Shared set of buckets and their objects, keyed by bucket name
#[derive(Debug, Clone, Default)]
pub struct BucketRegistry {
    buckets: Arc<RwLock<BTreeMap<String, BucketEntry>>>,
}

impl BucketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cloud bucket; an existing bucket of that name is kept
    pub fn add_cloud_bucket(&self, bucket: &BucketName, provider: CloudProvider) {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_insert_with(|| BucketEntry::new(false, provider));
    }

    pub fn create_local(&self, bucket: &BucketName) -> Result<()> {
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket.as_str()) {
            return Err(ServerError::BucketExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BucketEntry::new(true, CloudProvider::Dfc));
        Ok(())
    }

    pub fn destroy_local(&self, bucket: &BucketName) -> Result<()> {
        let mut buckets = self.buckets.write();
        let entry = buckets
            .get(bucket.as_str())
            .ok_or_else(|| ServerError::BucketNotFound(bucket.to_string()))?;
        if !entry.local {
            return Err(ServerError::NotLocal(bucket.to_string()));
        }
        buckets.remove(bucket.as_str());
        Ok(())
    }

    pub fn rename_local(&self, bucket: &BucketName, new_name: &BucketName) -> Result<()> {
        let mut buckets = self.buckets.write();
        let entry = buckets
            .get(bucket.as_str())
            .ok_or_else(|| ServerError::BucketNotFound(bucket.to_string()))?;
        if !entry.local {
            return Err(ServerError::NotLocal(bucket.to_string()));
        }
        if buckets.contains_key(new_name.as_str()) {
            return Err(ServerError::BucketExists(new_name.to_string()));
        }
        if let Some(entry) = buckets.remove(bucket.as_str()) {
            buckets.insert(new_name.to_string(), entry);
        }
        Ok(())
    }

    /// Insert or replace an object listing entry
    pub fn put_object(&self, bucket: &BucketName, entry: ObjectEntry) -> Result<()> {
        self.with_bucket_mut(bucket, |b| {
            b.objects.insert(entry.name.clone(), entry);
            Ok(())
        })
    }

    pub fn properties(&self, bucket: &BucketName) -> Result<BucketProperties> {
        let buckets = self.buckets.read();
        buckets
            .get(bucket.as_str())
            .map(|b| b.props.clone())
            .ok_or_else(|| ServerError::BucketNotFound(bucket.to_string()))
    }

    pub fn set_properties(&self, bucket: &BucketName, update: &BucketProperties) -> Result<()> {
        self.with_bucket_mut(bucket, |b| {
            b.props.merge(update);
            Ok(())
        })
    }

    /// Clear tiering properties; the cloud provider is intrinsic and stays
    pub fn reset_properties(&self, bucket: &BucketName) -> Result<()> {
        self.with_bucket_mut(bucket, |b| {
            b.props = BucketProperties {
                cloud_provider: b.props.cloud_provider,
                ..Default::default()
            };
            Ok(())
        })
    }

    pub fn list(&self, bucket: &BucketName, opts: &BucketListOptions) -> Result<ObjectProperties> {
        let buckets = self.buckets.read();
        let entry = buckets
            .get(bucket.as_str())
            .ok_or_else(|| ServerError::BucketNotFound(bucket.to_string()))?;
        Ok(paginate(entry.objects.values(), opts))
    }

    pub fn names(&self, local_only: bool) -> BucketNames {
        let buckets = self.buckets.read();
        let mut names = BucketNames::default();
        for (name, entry) in buckets.iter() {
            if entry.local {
                names.local.push(name.clone());
            } else if !local_only {
                names.cloud.push(name.clone());
            }
        }
        names
    }

    /// Set the cached flag on selected objects; returns how many changed
    pub fn set_cached(
        &self,
        bucket: &BucketName,
        selection: &ObjectSelection,
        cached: bool,
    ) -> Result<usize> {
        self.with_bucket_mut(bucket, |b| {
            let mut changed = 0;
            for entry in b.objects.values_mut().filter(|e| selection.matches(&e.name)) {
                if entry.iscached != Some(cached) {
                    entry.iscached = Some(cached);
                    changed += 1;
                }
            }
            Ok(changed)
        })
    }

    /// Drop the cached flag of every object in a cloud bucket
    pub fn evict_bucket(&self, bucket: &BucketName) -> Result<usize> {
        self.with_bucket_mut(bucket, |b| {
            if b.local {
                return Err(ServerError::NotCloud(bucket.to_string()));
            }
            let mut evicted = 0;
            for entry in b.objects.values_mut() {
                if entry.iscached == Some(true) {
                    entry.iscached = Some(false);
                    evicted += 1;
                }
            }
            Ok(evicted)
        })
    }

    /// Remove selected objects; returns how many were removed
    pub fn delete_objects(
        &self,
        bucket: &BucketName,
        selection: &ObjectSelection,
    ) -> Result<usize> {
        self.with_bucket_mut(bucket, |b| {
            let before = b.objects.len();
            b.objects.retain(|name, _| !selection.matches(name));
            Ok(before - b.objects.len())
        })
    }

    fn with_bucket_mut<T>(
        &self,
        bucket: &BucketName,
        f: impl FnOnce(&mut BucketEntry) -> Result<T>,
    ) -> Result<T> {
        let mut buckets = self.buckets.write();
        let entry = buckets
            .get_mut(bucket.as_str())
            .ok_or_else(|| ServerError::BucketNotFound(bucket.to_string()))?;
        f(entry)
    }
}
