use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::VibeRepository;
use crate::error::{AppError, AppResult};
use crate::models::vibe::{NewVibe, Page, Sort, Vibe, VibeFilter};
use crate::services::analytics::{self, VibeStatistics};
use crate::services::cache::{stats_key, vibe_key, Cache};
use crate::services::export::{self, ExportFormat, ExportedFile};
use crate::services::period::{DateRange, Period};
use crate::services::recommendation::{self, Recommendation, LOOKBACK_DAYS};
use crate::services::streak;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Business operations over the vibe store. Cheap to clone.
#[derive(Clone)]
pub struct VibeService {
    repo: Arc<dyn VibeRepository>,
    cache: Option<Arc<dyn Cache>>,
    cache_ttl: Duration,
    top_activities: usize,
}

impl VibeService {
    pub fn new(repo: Arc<dyn VibeRepository>) -> Self {
        Self {
            repo,
            cache: None,
            cache_ttl: Duration::from_secs(300),
            top_activities: analytics::DEFAULT_TOP_ACTIVITIES,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    pub fn with_top_activities(mut self, top_activities: usize) -> Self {
        self.top_activities = top_activities;
        self
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repo.ping().await
    }

    pub async fn create(&self, vibe: NewVibe) -> AppResult<Vibe> {
        let created = self.repo.create(&vibe).await?;
        tracing::info!(
            vibe_id = created.id,
            date = %created.date,
            mood = %created.mood,
            "Vibe created"
        );
        self.invalidate_stats().await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> AppResult<Vibe> {
        let key = vibe_key(id);
        if let Some(cached) = self.cache_get::<Vibe>(&key).await {
            return Ok(cached);
        }

        let vibe = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        self.cache_set(&key, &vibe).await;
        Ok(vibe)
    }

    pub async fn list(
        &self,
        filter: &VibeFilter,
        page: Page,
        sort: Sort,
    ) -> AppResult<(Vec<Vibe>, i64)> {
        self.repo.list(filter, page, sort).await
    }

    pub async fn update(&self, id: i64, vibe: NewVibe) -> AppResult<Vibe> {
        let updated = self
            .repo
            .update(id, &vibe)
            .await?
            .ok_or_else(|| not_found(id))?;
        tracing::info!(vibe_id = id, "Vibe updated");
        self.cache_delete(&vibe_key(id)).await;
        self.invalidate_stats().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repo.soft_delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(vibe_id = id, "Vibe deleted");
        self.cache_delete(&vibe_key(id)).await;
        self.invalidate_stats().await;
        Ok(())
    }

    pub async fn bulk_import(&self, vibes: Vec<NewVibe>) -> AppResult<u64> {
        if vibes.is_empty() {
            return Err(AppError::BadRequest("No vibes provided for bulk import".into()));
        }

        let imported = self.repo.bulk_create(&vibes).await?;
        tracing::info!(imported, "Bulk import finished");
        self.invalidate_stats().await;
        Ok(imported)
    }

    pub async fn statistics(&self, period: Period) -> AppResult<VibeStatistics> {
        self.statistics_on(period, today()).await
    }

    /// Cached statistics are only reused while they cover the range `today`
    /// resolves to, so an entry never outlives its week, month or year.
    pub async fn statistics_on(
        &self,
        period: Period,
        today: NaiveDate,
    ) -> AppResult<VibeStatistics> {
        let key = stats_key(period.as_str());
        let range = DateRange::resolve(today, period);
        if let Some(cached) = self.cache_get::<VibeStatistics>(&key).await {
            if cached.start_date == range.start && cached.end_date == range.end {
                return Ok(cached);
            }
        }

        let vibes = self.repo.list_in_range(range.start, range.end).await?;
        let stats = analytics::compute_statistics(period, range, &vibes, self.top_activities);

        self.cache_set(&key, &stats).await;
        Ok(stats)
    }

    pub async fn streak(&self, mood: &str) -> AppResult<Streaks> {
        let mood = mood.trim().to_lowercase();
        if mood.is_empty() {
            return Err(AppError::BadRequest("Mood parameter is required".into()));
        }

        let vibes = self.repo.list_by_mood(&mood).await?;
        Ok(Streaks {
            current: streak::current_streak(&vibes),
            longest: streak::longest_streak(&vibes),
        })
    }

    pub async fn recommendation(&self) -> AppResult<Recommendation> {
        let range = DateRange::trailing_days(today(), LOOKBACK_DAYS);
        let vibes = self.repo.list_in_range(range.start, range.end).await?;
        Ok(recommendation::recommend(&vibes, &mut rand::thread_rng()))
    }

    pub async fn export(
        &self,
        filter: &VibeFilter,
        format: ExportFormat,
        sort: Sort,
    ) -> AppResult<ExportedFile> {
        let vibes = self.repo.list_all(filter, sort).await?;
        tracing::debug!(rows = vibes.len(), ?format, "Exporting vibes");
        export::export(&vibes, format)
    }

    async fn invalidate_stats(&self) {
        for period in Period::ALL {
            self.cache_delete(&stats_key(period.as_str())).await;
        }
    }

    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn cache_set<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = &self.cache else { return };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = cache.set(key, raw, self.cache_ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    async fn cache_delete(&self, key: &str) {
        let Some(cache) = &self.cache else { return };
        if let Err(e) = cache.delete(key).await {
            tracing::warn!(key, error = %e, "Cache invalidation failed");
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Vibe with ID {id} not found"))
}
