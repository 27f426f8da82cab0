mod common;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::{sync::Arc, time::Duration};

use common::{cache_ttl, InMemoryVibeRepository};
use vibetrack_api::{
    db::VibeRepository,
    error::AppError,
    models::vibe::{NewVibe, Sort, SortField, SortOrder},
    services::{
        cache::{stats_key, vibe_key, Cache, MemoryCache},
        export::ExportFormat,
        period::Period,
        VibeService,
    },
};

fn new_vibe(y: i32, m: u32, d: u32, mood: &str, energy: i32) -> NewVibe {
    NewVibe {
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        mood: mood.into(),
        energy_level: energy,
        notes: None,
        activities: vec![],
    }
}

fn cached_service() -> (VibeService, Arc<InMemoryVibeRepository>, MemoryCache) {
    let repo = Arc::new(InMemoryVibeRepository::new());
    let cache = MemoryCache::new();
    let service = VibeService::new(repo.clone()).with_cache(Arc::new(cache.clone()), cache_ttl());
    (service, repo, cache)
}

/// Cache that fails every call.
struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("cache down")
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> anyhow::Result<()> {
        anyhow::bail!("cache down")
    }

    async fn delete(&self, _key: &str) -> anyhow::Result<()> {
        anyhow::bail!("cache down")
    }
}

#[tokio::test]
async fn get_reads_through_the_cache() {
    let (service, _repo, cache) = cached_service();
    let created = service.create(new_vibe(2024, 1, 1, "happy", 7)).await.unwrap();

    assert_eq!(cache.get(&vibe_key(created.id)).await.unwrap(), None);
    let fetched = service.get(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert!(cache.get(&vibe_key(created.id)).await.unwrap().is_some());
}

#[tokio::test]
async fn writes_invalidate_entry_and_stats() {
    let (service, _repo, cache) = cached_service();
    let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
    let created = service.create(new_vibe(2024, 6, 10, "happy", 7)).await.unwrap();

    let stats = service.statistics_on(Period::Month, today).await.unwrap();
    assert_eq!(stats.total_entries, 1);
    service.get(created.id).await.unwrap();
    assert!(cache.get(&stats_key("month")).await.unwrap().is_some());

    let updated = service
        .update(created.id, new_vibe(2024, 6, 10, "calm", 4))
        .await
        .unwrap();
    assert_eq!(updated.mood, "calm");
    assert_eq!(cache.get(&vibe_key(created.id)).await.unwrap(), None);
    assert_eq!(cache.get(&stats_key("month")).await.unwrap(), None);

    // next read sees the new value, not a stale entry
    assert_eq!(service.get(created.id).await.unwrap().mood, "calm");
    let stats = service.statistics_on(Period::Month, today).await.unwrap();
    assert_eq!(stats.average_energy_level, 4.0);

    service.delete(created.id).await.unwrap();
    assert_eq!(cache.get(&vibe_key(created.id)).await.unwrap(), None);
    assert!(matches!(service.get(created.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn cache_failures_never_fail_requests() {
    let repo = Arc::new(InMemoryVibeRepository::new());
    let service = VibeService::new(repo).with_cache(Arc::new(BrokenCache), cache_ttl());

    let created = service.create(new_vibe(2024, 1, 1, "happy", 7)).await.unwrap();
    assert_eq!(service.get(created.id).await.unwrap(), created);
    service
        .update(created.id, new_vibe(2024, 1, 1, "sad", 2))
        .await
        .unwrap();
    service.statistics(Period::Year).await.unwrap();
    service.delete(created.id).await.unwrap();
}

#[tokio::test]
async fn statistics_only_count_the_requested_range() {
    let repo = Arc::new(InMemoryVibeRepository::new());
    let service = VibeService::new(repo.clone()).with_top_activities(1);
    for vibe in [
        new_vibe(2024, 5, 12, "sad", 2),
        new_vibe(2024, 5, 13, "happy", 8),
        new_vibe(2024, 5, 15, "happy", 6),
        new_vibe(2024, 5, 20, "calm", 5),
    ] {
        repo.create(&vibe).await.unwrap();
    }

    // Wednesday 2024-05-15: week is Mon 13th .. Sun 19th
    let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    let week = service.statistics_on(Period::Week, today).await.unwrap();
    assert_eq!(week.total_entries, 2);
    assert_eq!(week.average_energy_level, 7.0);
    assert_eq!(week.mood_patterns.data().unwrap().get("happy -> happy"), Some(&1));

    let month = service.statistics_on(Period::Month, today).await.unwrap();
    assert_eq!(month.total_entries, 4);
}

#[tokio::test]
async fn cached_statistics_follow_the_calendar_into_the_next_month() {
    let (service, repo, cache) = cached_service();
    repo.create(&new_vibe(2024, 1, 20, "sad", 2)).await.unwrap();
    repo.create(&new_vibe(2024, 2, 1, "happy", 8)).await.unwrap();

    let jan_31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let january = service.statistics_on(Period::Month, jan_31).await.unwrap();
    assert_eq!(january.end_date, jan_31);
    assert_eq!(january.average_energy_level, 2.0);
    assert!(cache.get(&stats_key("month")).await.unwrap().is_some());

    let feb_1 = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let february = service.statistics_on(Period::Month, feb_1).await.unwrap();
    assert_eq!(february.start_date, feb_1);
    assert_eq!(february.end_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    assert_eq!(february.total_entries, 1);
    assert_eq!(february.average_energy_level, 8.0);

    // the refreshed entry replaces January's
    let again = service.statistics_on(Period::Month, feb_1).await.unwrap();
    assert_eq!((again.start_date, again.total_entries), (feb_1, 1));
}

#[tokio::test]
async fn streak_requires_a_mood() {
    let service = VibeService::new(Arc::new(InMemoryVibeRepository::new()));
    assert!(matches!(service.streak("  ").await, Err(AppError::BadRequest(_))));
    let streaks = service.streak("happy").await.unwrap();
    assert_eq!((streaks.current, streaks.longest), (0, 0));
}

#[tokio::test]
async fn bulk_import_rejects_empty_batches() {
    let service = VibeService::new(Arc::new(InMemoryVibeRepository::new()));
    assert!(matches!(
        service.bulk_import(vec![]).await,
        Err(AppError::BadRequest(_))
    ));
    let imported = service
        .bulk_import(vec![new_vibe(2024, 1, 1, "a", 1), new_vibe(2024, 1, 2, "b", 2)])
        .await
        .unwrap();
    assert_eq!(imported, 2);
}

#[tokio::test]
async fn export_of_nothing_is_a_header_only_csv() {
    let service = VibeService::new(Arc::new(InMemoryVibeRepository::new()));
    let file = service
        .export(
            &Default::default(),
            ExportFormat::Csv,
            Sort::new(SortField::Date, SortOrder::Asc),
        )
        .await
        .unwrap();
    assert_eq!(file.body, b"ID,Date,Mood,EnergyLevel,Notes,Activities\n");
}
