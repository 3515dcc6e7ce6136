use crate::models::{
    ContactMessage, ContentKind, IntakeSubmission, MediaFile, Service, SiteContentEntry,
    Testimonial, User,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use uuid::Uuid;

pub mod local;
pub mod remote;
pub mod seed;

use local::{CacheError, LocalCache};
use remote::{RemoteBackend, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Remote,
    Local,
}

impl StoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMode::Remote => "remote",
            StoreMode::Local => "local",
        }
    }
}

impl Serialize for StoreMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Shared connectivity flag. Selected once at startup from configuration;
/// the only runtime transition is Remote -> Local on the first remote
/// failure. Reconnecting requires a fresh process.
pub struct ModeFlag {
    inner: RwLock<StoreMode>,
}

impl ModeFlag {
    pub fn new(mode: StoreMode) -> Self {
        ModeFlag {
            inner: RwLock::new(mode),
        }
    }

    pub fn current(&self) -> StoreMode {
        *self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_remote(&self) -> bool {
        self.current() == StoreMode::Remote
    }

    pub fn degrade(&self) {
        let mut mode = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *mode == StoreMode::Remote {
            log::warn!("Remote backend unavailable; continuing in local mode for this session.");
            *mode = StoreMode::Local;
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// An entity collection the persistence layer manages: a remote table, a
/// local cache key, and an id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const CACHE_KEY: &'static str;
    fn id(&self) -> &str;
}

impl Record for Service {
    const TABLE: &'static str = "services";
    const CACHE_KEY: &'static str = "cms_services";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Testimonial {
    const TABLE: &'static str = "testimonials";
    const CACHE_KEY: &'static str = "cms_testimonials";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for MediaFile {
    const TABLE: &'static str = "media_files";
    const CACHE_KEY: &'static str = "cms_media";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for SiteContentEntry {
    const TABLE: &'static str = "site_content";
    const CACHE_KEY: &'static str = "cms_content";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for IntakeSubmission {
    const TABLE: &'static str = "intake_submissions";
    const CACHE_KEY: &'static str = "cms_intake";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for ContactMessage {
    const TABLE: &'static str = "contact_messages";
    const CACHE_KEY: &'static str = "cms_messages";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const CACHE_KEY: &'static str = local::USERS_KEY;
    fn id(&self) -> &str {
        &self.id
    }
}

enum RemoteWrite<'a, T> {
    Insert(&'a T),
    Update(&'a T),
    Delete(&'a str),
}

/// One managed collection. Every mutation runs the same three steps:
/// construct the record, attempt the remote write when in remote mode
/// (downgrading on failure), then unconditionally mirror the resulting
/// state into the cache and the in-memory view. A user therefore never
/// loses a write, and reads after a completed write always observe it.
pub struct Collection<T: Record> {
    items: RwLock<Vec<T>>,
    local: Arc<LocalCache>,
    remote: Option<Arc<RemoteBackend>>,
    mode: Arc<ModeFlag>,
}

impl<T: Record> Collection<T> {
    fn new(local: Arc<LocalCache>, remote: Option<Arc<RemoteBackend>>, mode: Arc<ModeFlag>) -> Self {
        Collection {
            items: RwLock::new(Vec::new()),
            local,
            remote,
            mode,
        }
    }

    pub fn all(&self) -> Vec<T> {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn find(&self, id: &str) -> Option<T> {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub async fn insert(&self, record: T) -> Result<T, StoreError> {
        self.remote_write(RemoteWrite::Insert(&record)).await;
        let mut items = self.all();
        items.push(record.clone());
        self.mirror(items)?;
        Ok(record)
    }

    /// Applies `mutate` to the record with the given id, then runs the
    /// write path. Returns the updated record, or `None` when no record
    /// carries that id.
    pub async fn update_with<F>(&self, id: &str, mutate: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut T),
    {
        let Some(mut updated) = self.find(id) else {
            return Ok(None);
        };
        mutate(&mut updated);

        self.remote_write(RemoteWrite::Update(&updated)).await;
        let mut items = self.all();
        if let Some(slot) = items.iter_mut().find(|record| record.id() == id) {
            *slot = updated.clone();
        }
        self.mirror(items)?;
        Ok(Some(updated))
    }

    /// Removes exactly the record with the given id; all others are left
    /// untouched in memory and in the cache.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        if self.find(id).is_none() {
            return Ok(false);
        }
        self.remote_write(RemoteWrite::Delete(id)).await;
        let items: Vec<T> = self
            .all()
            .into_iter()
            .filter(|record| record.id() != id)
            .collect();
        self.mirror(items)?;
        Ok(true)
    }

    /// Swaps a single record in place and mirrors, with no remote call.
    /// Used where the remote write was already issued through a
    /// collection-specific query (site-content upsert by natural key).
    fn replace(&self, updated: T) -> Result<(), StoreError> {
        let mut items = self.all();
        if let Some(slot) = items.iter_mut().find(|record| record.id() == updated.id()) {
            *slot = updated;
        }
        self.mirror(items)
    }

    async fn remote_write(&self, op: RemoteWrite<'_, T>) {
        if !self.mode.is_remote() {
            return;
        }
        let Some(remote) = &self.remote else {
            return;
        };
        let result = match op {
            RemoteWrite::Insert(record) => remote.insert(T::TABLE, record).await,
            RemoteWrite::Update(record) => remote.update(T::TABLE, record.id(), record).await,
            RemoteWrite::Delete(id) => remote.delete(T::TABLE, id).await,
        };
        if let Err(err) = result {
            log::warn!(
                "Remote write to '{}' failed, mirroring to local cache only: {}",
                T::TABLE,
                err
            );
            self.mode.degrade();
        }
    }

    fn mirror(&self, items: Vec<T>) -> Result<(), StoreError> {
        self.local.write_collection(T::CACHE_KEY, &items)?;
        *self
            .items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = items;
        Ok(())
    }

    fn set_items(&self, items: Vec<T>) {
        *self
            .items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = items;
    }

    /// Loads from the cache; a never-written collection is seeded with the
    /// given defaults so a fresh install is not empty.
    fn load_local(&self, defaults: Vec<T>) -> Result<(), StoreError> {
        match self.local.read_collection::<T>(T::CACHE_KEY)? {
            Some(items) => self.set_items(items),
            None => {
                if !defaults.is_empty() {
                    self.local.write_collection(T::CACHE_KEY, &defaults)?;
                }
                self.set_items(defaults);
            }
        }
        Ok(())
    }
}

/// The content half of the persistence layer: six collections behind one
/// facade, plus the site-content upsert keyed by (section, key).
pub struct CmsStore {
    pub services: Collection<Service>,
    pub testimonials: Collection<Testimonial>,
    pub media_files: Collection<MediaFile>,
    pub site_content: Collection<SiteContentEntry>,
    pub intake_submissions: Collection<IntakeSubmission>,
    pub contact_messages: Collection<ContactMessage>,
    mode: Arc<ModeFlag>,
    remote: Option<Arc<RemoteBackend>>,
}

impl CmsStore {
    pub fn new(
        local: Arc<LocalCache>,
        remote: Option<Arc<RemoteBackend>>,
        mode: Arc<ModeFlag>,
    ) -> Self {
        CmsStore {
            services: Collection::new(local.clone(), remote.clone(), mode.clone()),
            testimonials: Collection::new(local.clone(), remote.clone(), mode.clone()),
            media_files: Collection::new(local.clone(), remote.clone(), mode.clone()),
            site_content: Collection::new(local.clone(), remote.clone(), mode.clone()),
            intake_submissions: Collection::new(local.clone(), remote.clone(), mode.clone()),
            contact_messages: Collection::new(local, remote.clone(), mode.clone()),
            mode,
            remote,
        }
    }

    /// Constructs the store and runs the startup read path: bulk-fetch from
    /// the remote backend in remote mode (any failure downgrades and falls
    /// back to the cache), or load-and-seed from the cache in local mode.
    pub async fn open(
        local: Arc<LocalCache>,
        remote: Option<Arc<RemoteBackend>>,
        mode: Arc<ModeFlag>,
    ) -> Result<Self, StoreError> {
        let store = CmsStore::new(local, remote, mode);
        store.load().await?;
        Ok(store)
    }

    pub fn mode(&self) -> StoreMode {
        self.mode.current()
    }

    async fn load(&self) -> Result<(), StoreError> {
        if self.mode.is_remote() {
            if let Some(remote) = self.remote.clone() {
                match self.fetch_all_remote(&remote).await {
                    Ok(()) => return Ok(()),
                    Err(err) => {
                        log::warn!("Remote bulk fetch failed, loading from local cache: {}", err);
                        self.mode.degrade();
                    }
                }
            }
        }
        self.load_local()
    }

    async fn fetch_all_remote(&self, remote: &RemoteBackend) -> Result<(), RemoteError> {
        // Fetch everything before assigning anything, so a mid-way failure
        // leaves the store to be populated from the cache as one unit.
        let services = remote.fetch_all::<Service>(Service::TABLE).await?;
        let testimonials = remote.fetch_all::<Testimonial>(Testimonial::TABLE).await?;
        let media_files = remote.fetch_all::<MediaFile>(MediaFile::TABLE).await?;
        let site_content = remote
            .fetch_all::<SiteContentEntry>(SiteContentEntry::TABLE)
            .await?;
        let intake = remote
            .fetch_all::<IntakeSubmission>(IntakeSubmission::TABLE)
            .await?;
        let messages = remote
            .fetch_all::<ContactMessage>(ContactMessage::TABLE)
            .await?;

        self.services.set_items(services);
        self.testimonials.set_items(testimonials);
        self.media_files.set_items(media_files);
        self.site_content.set_items(site_content);
        self.intake_submissions.set_items(intake);
        self.contact_messages.set_items(messages);
        Ok(())
    }

    fn load_local(&self) -> Result<(), StoreError> {
        self.services.load_local(seed::default_services())?;
        self.testimonials.load_local(seed::default_testimonials())?;
        self.media_files.load_local(Vec::new())?;
        self.site_content.load_local(Vec::new())?;
        self.intake_submissions.load_local(Vec::new())?;
        self.contact_messages.load_local(Vec::new())?;
        Ok(())
    }

    /// Writes a content slot. An existing (section, key) pair is replaced in
    /// place; the collection never grows for a repeated pair.
    pub async fn update_site_content(
        &self,
        section: &str,
        key: &str,
        value: &str,
        kind: ContentKind,
        editor: &str,
    ) -> Result<SiteContentEntry, StoreError> {
        let now = Utc::now();
        let existing = self
            .site_content
            .all()
            .into_iter()
            .find(|entry| entry.section == section && entry.key == key);

        if let Some(mut entry) = existing {
            entry.value = value.to_string();
            entry.updated_at = now;
            entry.updated_by = editor.to_string();

            if self.mode.is_remote() {
                if let Some(remote) = &self.remote {
                    let patch = serde_json::json!({
                        "value": entry.value,
                        "updatedAt": entry.updated_at,
                        "updatedBy": entry.updated_by,
                    });
                    if let Err(err) = remote
                        .update_by_section_key(SiteContentEntry::TABLE, section, key, &patch)
                        .await
                    {
                        log::warn!(
                            "Remote site-content update for '{}.{}' failed, mirroring locally: {}",
                            section,
                            key,
                            err
                        );
                        self.mode.degrade();
                    }
                }
            }
            self.site_content.replace(entry.clone())?;
            return Ok(entry);
        }

        let entry = SiteContentEntry {
            id: Uuid::new_v4().to_string(),
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            kind,
            updated_at: now,
            updated_by: editor.to_string(),
        };
        self.site_content.insert(entry).await
    }

    /// Pushes an uploaded blob to the remote storage bucket when in remote
    /// mode. Returns the public URL on success; a failure downgrades the
    /// mode and the caller keeps serving the local copy.
    pub async fn upload_media_blob(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Option<String> {
        if !self.mode.is_remote() {
            return None;
        }
        let remote = self.remote.as_ref()?;
        match remote.upload_object(filename, bytes, content_type).await {
            Ok(url) => Some(url),
            Err(err) => {
                log::warn!("Remote media upload failed, keeping local copy: {}", err);
                self.mode.degrade();
                None
            }
        }
    }

    /// Current value of a content slot, or empty when the slot was never
    /// written.
    pub fn get_site_content(&self, section: &str, key: &str) -> String {
        self.site_content
            .all()
            .into_iter()
            .find(|entry| entry.section == section && entry.key == key)
            .map(|entry| entry.value)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteSettings;
    use crate::models::IntakeStatus;

    fn local_mode_parts() -> (tempfile::TempDir, Arc<LocalCache>, Arc<ModeFlag>) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(LocalCache::open(&dir.path().join("cache.db")).unwrap());
        let mode = Arc::new(ModeFlag::new(StoreMode::Local));
        (dir, cache, mode)
    }

    async fn local_store() -> (tempfile::TempDir, CmsStore) {
        let (dir, cache, mode) = local_mode_parts();
        let store = CmsStore::open(cache, None, mode).await.unwrap();
        (dir, store)
    }

    fn failing_remote() -> Arc<RemoteBackend> {
        Arc::new(RemoteBackend::new(RemoteSettings {
            url: "http://127.0.0.1:1".to_string(),
            anon_key: "anon".to_string(),
            storage_bucket: "media".to_string(),
        }))
    }

    fn sample_intake(first: &str, last: &str, service: &str) -> IntakeSubmission {
        IntakeSubmission {
            id: Uuid::new_v4().to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            phone: "555-0100".to_string(),
            age: 34,
            fitness_level: "beginner".to_string(),
            goals: "General fitness".to_string(),
            injuries: None,
            availability: vec!["weekday-mornings".to_string()],
            preferred_service: service.to_string(),
            budget: None,
            additional_info: None,
            status: IntakeStatus::New,
            notes: None,
            submitted_at: Utc::now(),
            last_contacted_at: None,
        }
    }

    #[actix_web::test]
    async fn first_run_local_mode_seeds_defaults() {
        let (_dir, store) = local_store().await;
        assert_eq!(store.services.len(), 4);
        assert_eq!(store.testimonials.len(), 3);
        assert_eq!(store.intake_submissions.len(), 0);
        assert_eq!(store.mode(), StoreMode::Local);
    }

    #[actix_web::test]
    async fn seeded_state_survives_reopen_without_reseeding() {
        let (dir, cache, mode) = local_mode_parts();
        {
            let store = CmsStore::open(cache.clone(), None, mode).await.unwrap();
            assert!(store.services.delete("1").await.unwrap());
            assert_eq!(store.services.len(), 3);
        }
        let mode = Arc::new(ModeFlag::new(StoreMode::Local));
        let reopened = CmsStore::open(cache, None, mode).await.unwrap();
        assert_eq!(reopened.services.len(), 3);
        drop(dir);
    }

    #[actix_web::test]
    async fn writes_are_immediately_visible() {
        let (_dir, store) = local_store().await;
        let submission = sample_intake("Alex", "Stone", "personal");
        let id = submission.id.clone();
        store.intake_submissions.insert(submission).await.unwrap();

        assert!(store.intake_submissions.find(&id).is_some());
        // The durable mirror holds the same state.
        let cached: Vec<IntakeSubmission> = store
            .intake_submissions
            .local
            .read_collection(IntakeSubmission::CACHE_KEY)
            .unwrap()
            .unwrap();
        assert!(cached.iter().any(|s| s.id == id));
    }

    #[actix_web::test]
    async fn intake_scenario_fresh_submission() {
        let (_dir, store) = local_store().await;
        let submission = sample_intake("Jane", "Doe", "personal");
        let created = store.intake_submissions.insert(submission).await.unwrap();

        assert_eq!(store.intake_submissions.len(), 1);
        assert_eq!(created.status, IntakeStatus::New);
        assert!(!created.id.is_empty());
        assert!(store.services.find(&created.id).is_none());
        assert!(store.testimonials.find(&created.id).is_none());
    }

    #[actix_web::test]
    async fn site_content_upsert_never_duplicates_a_pair() {
        let (_dir, store) = local_store().await;
        store
            .update_site_content("hero", "headline", "Get Strong", ContentKind::Text, "admin")
            .await
            .unwrap();
        let first_len = store.site_content.len();

        store
            .update_site_content("hero", "headline", "Get Stronger", ContentKind::Text, "admin")
            .await
            .unwrap();

        assert_eq!(store.site_content.len(), first_len);
        assert_eq!(store.get_site_content("hero", "headline"), "Get Stronger");

        store
            .update_site_content("hero", "subline", "Every day", ContentKind::Text, "admin")
            .await
            .unwrap();
        assert_eq!(store.site_content.len(), first_len + 1);
    }

    #[actix_web::test]
    async fn remote_write_failure_downgrades_and_stays_local() {
        let (_dir, cache, _) = local_mode_parts();
        let mode = Arc::new(ModeFlag::new(StoreMode::Remote));
        let store = CmsStore::new(cache, Some(failing_remote()), mode.clone());
        store.load_local().unwrap();
        assert_eq!(store.mode(), StoreMode::Remote);

        // The remote insert fails; the write must survive locally anyway.
        let submission = sample_intake("Jane", "Doe", "group");
        let id = submission.id.clone();
        store.intake_submissions.insert(submission).await.unwrap();

        assert_eq!(store.mode(), StoreMode::Local);
        assert!(store.intake_submissions.find(&id).is_some());

        // A later successful local write does not flip the mode back.
        store
            .intake_submissions
            .update_with(&id, |s| s.status = IntakeStatus::Contacted)
            .await
            .unwrap();
        assert_eq!(store.mode(), StoreMode::Local);
    }

    #[actix_web::test]
    async fn remote_bulk_fetch_failure_falls_back_to_cache() {
        let (_dir, cache, _) = local_mode_parts();
        let mode = Arc::new(ModeFlag::new(StoreMode::Remote));
        let store = CmsStore::open(cache, Some(failing_remote()), mode)
            .await
            .unwrap();
        assert_eq!(store.mode(), StoreMode::Local);
        // Fallback load seeded the cache as a first run.
        assert_eq!(store.services.len(), 4);
    }

    #[actix_web::test]
    async fn delete_removes_exactly_one_record() {
        let (_dir, store) = local_store().await;
        let before = store.services.all();
        assert_eq!(before.len(), 4);

        assert!(store.services.delete("2").await.unwrap());
        let after = store.services.all();
        assert_eq!(after.len(), 3);
        assert!(after.iter().all(|s| s.id != "2"));
        for survivor in ["1", "3", "4"] {
            assert!(after.iter().any(|s| s.id == survivor));
        }

        let cached: Vec<Service> = store
            .services
            .local
            .read_collection(Service::CACHE_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(cached.len(), 3);
        assert!(cached.iter().all(|s| s.id != "2"));

        // Deleting an unknown id is a no-op.
        assert!(!store.services.delete("2").await.unwrap());
    }

    #[actix_web::test]
    async fn update_with_returns_none_for_unknown_id() {
        let (_dir, store) = local_store().await;
        let updated = store
            .services
            .update_with("no-such-id", |s| s.popular = true)
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
