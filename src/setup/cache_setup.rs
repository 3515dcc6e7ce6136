use crate::models::{ContactMessage, IntakeSubmission, MediaFile, Service, SiteContentEntry, Testimonial, User};
use crate::store::local::{CacheError, LocalCache};
use crate::store::{seed, Record};

fn seed_collection<T: Record>(cache: &LocalCache, defaults: Vec<T>) -> Result<(), CacheError> {
    if cache.read_collection::<T>(T::CACHE_KEY)?.is_some() {
        println!(
            "- Collection '{}' already present. Skipping.",
            T::CACHE_KEY
        );
        return Ok(());
    }
    println!(
        "- Seeding '{}' with {} record(s)...",
        T::CACHE_KEY,
        defaults.len()
    );
    cache.write_collection(T::CACHE_KEY, &defaults)
}

/// Seeds every collection the server manages. The server also seeds lazily
/// on first run; this exists so an operator can prepare the cache up front.
pub fn initialize_cache(cache: &LocalCache) -> Result<(), CacheError> {
    seed_collection::<Service>(cache, seed::default_services())?;
    seed_collection::<Testimonial>(cache, seed::default_testimonials())?;
    seed_collection::<User>(cache, vec![seed::default_admin_user()])?;
    seed_collection::<MediaFile>(cache, Vec::new())?;
    seed_collection::<SiteContentEntry>(cache, Vec::new())?;
    seed_collection::<IntakeSubmission>(cache, Vec::new())?;
    seed_collection::<ContactMessage>(cache, Vec::new())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(&dir.path().join("cache.db")).unwrap();

        initialize_cache(&cache).unwrap();
        let services: Vec<Service> = cache
            .read_collection(Service::CACHE_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(services.len(), 4);

        // A second run must not duplicate or reset anything.
        let trimmed: Vec<Service> = services.into_iter().take(2).collect();
        cache.write_collection(Service::CACHE_KEY, &trimmed).unwrap();
        initialize_cache(&cache).unwrap();
        let after: Vec<Service> = cache
            .read_collection(Service::CACHE_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(after.len(), 2);
    }
}
