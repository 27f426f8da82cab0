#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::{
    cmp::Ordering,
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc, Mutex,
    },
    time::Duration,
};
use tower::ServiceExt;

use vibetrack_api::{
    build_router,
    config::Config,
    db::VibeRepository,
    error::{AppError, AppResult},
    models::vibe::{NewVibe, Page, Sort, SortField, SortOrder, Vibe, VibeFilter},
    services::VibeService,
    AppState,
};

#[derive(Default)]
struct Store {
    next_id: i64,
    rows: Vec<Row>,
}

struct Row {
    vibe: Vibe,
    deleted: bool,
}

impl Store {
    fn live(&self) -> impl Iterator<Item = &Vibe> {
        self.rows.iter().filter(|r| !r.deleted).map(|r| &r.vibe)
    }

    fn date_taken(&self, date: NaiveDate, except: Option<i64>) -> bool {
        self.live().any(|v| v.date == date && Some(v.id) != except)
    }

    fn insert(&mut self, new: &NewVibe) -> Vibe {
        self.next_id += 1;
        let now = Utc::now();
        let vibe = Vibe {
            id: self.next_id,
            date: new.date,
            mood: new.mood.clone(),
            energy_level: new.energy_level,
            notes: new.notes.clone(),
            activities: new.activities.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows.push(Row {
            vibe: vibe.clone(),
            deleted: false,
        });
        vibe
    }
}

fn duplicate() -> AppError {
    AppError::Conflict("A vibe already exists for this date".into())
}

fn matches(vibe: &Vibe, filter: &VibeFilter) -> bool {
    filter.date.map_or(true, |d| vibe.date == d)
        && filter.mood.as_deref().map_or(true, |m| vibe.mood == m)
}

fn compare(a: &Vibe, b: &Vibe, sort: Sort) -> Ordering {
    let by_field = match sort.field {
        SortField::Date => a.date.cmp(&b.date),
        SortField::Mood => a.mood.cmp(&b.mood),
        SortField::EnergyLevel => a.energy_level.cmp(&b.energy_level),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Id => a.id.cmp(&b.id),
    }
    .then_with(|| a.id.cmp(&b.id));

    match sort.order {
        SortOrder::Asc => by_field,
        SortOrder::Desc => by_field.reverse(),
    }
}

/// `VibeRepository` over a `Vec`, mirroring the Postgres constraints the
/// service relies on (one live entry per date, soft delete).
#[derive(Default)]
pub struct InMemoryVibeRepository {
    store: Mutex<Store>,
    pub fail_ping: AtomicBool,
}

impl InMemoryVibeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered(&self, filter: &VibeFilter, sort: Sort) -> Vec<Vibe> {
        let store = self.store.lock().unwrap();
        let mut vibes: Vec<Vibe> = store.live().filter(|v| matches(v, filter)).cloned().collect();
        vibes.sort_by(|a, b| compare(a, b, sort));
        vibes
    }
}

#[async_trait]
impl VibeRepository for InMemoryVibeRepository {
    async fn create(&self, vibe: &NewVibe) -> AppResult<Vibe> {
        let mut store = self.store.lock().unwrap();
        if store.date_taken(vibe.date, None) {
            return Err(duplicate());
        }
        Ok(store.insert(vibe))
    }

    async fn bulk_create(&self, vibes: &[NewVibe]) -> AppResult<u64> {
        let mut store = self.store.lock().unwrap();
        for (i, vibe) in vibes.iter().enumerate() {
            let repeated = vibes[..i].iter().any(|other| other.date == vibe.date);
            if repeated || store.date_taken(vibe.date, None) {
                return Err(duplicate());
            }
        }
        for vibe in vibes {
            store.insert(vibe);
        }
        Ok(vibes.len() as u64)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Vibe>> {
        let store = self.store.lock().unwrap();
        let found = store.live().find(|v| v.id == id).cloned();
        Ok(found)
    }

    async fn list(
        &self,
        filter: &VibeFilter,
        page: Page,
        sort: Sort,
    ) -> AppResult<(Vec<Vibe>, i64)> {
        let all = self.filtered(filter, sort);
        let total = all.len() as i64;
        let data = all
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok((data, total))
    }

    async fn list_all(&self, filter: &VibeFilter, sort: Sort) -> AppResult<Vec<Vibe>> {
        Ok(self.filtered(filter, sort))
    }

    async fn update(&self, id: i64, vibe: &NewVibe) -> AppResult<Option<Vibe>> {
        let mut store = self.store.lock().unwrap();
        if store.date_taken(vibe.date, Some(id)) {
            return Err(duplicate());
        }
        let Some(row) = store.rows.iter_mut().find(|r| !r.deleted && r.vibe.id == id) else {
            return Ok(None);
        };
        row.vibe.date = vibe.date;
        row.vibe.mood = vibe.mood.clone();
        row.vibe.energy_level = vibe.energy_level;
        row.vibe.notes = vibe.notes.clone();
        row.vibe.activities = vibe.activities.clone();
        row.vibe.updated_at = Utc::now();
        Ok(Some(row.vibe.clone()))
    }

    async fn soft_delete(&self, id: i64) -> AppResult<bool> {
        let mut store = self.store.lock().unwrap();
        let deleted = match store.rows.iter_mut().find(|r| !r.deleted && r.vibe.id == id) {
            Some(row) => {
                row.deleted = true;
                true
            }
            None => false,
        };
        Ok(deleted)
    }

    async fn list_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Vibe>> {
        let sort = Sort::new(SortField::Date, SortOrder::Asc);
        Ok(self
            .filtered(&VibeFilter::default(), sort)
            .into_iter()
            .filter(|v| start <= v.date && v.date <= end)
            .collect())
    }

    async fn list_by_mood(&self, mood: &str) -> AppResult<Vec<Vibe>> {
        let filter = VibeFilter {
            date: None,
            mood: Some(mood.to_string()),
        };
        Ok(self.filtered(&filter, Sort::new(SortField::Date, SortOrder::Asc)))
    }

    async fn ping(&self) -> AppResult<()> {
        if self.fail_ping.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("database unreachable")));
        }
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        rate_limit_burst: 1_000,
        rate_limit_per_second: 1_000.0,
        cache_ttl_secs: 60,
        ..Config::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryVibeRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let repo = Arc::new(InMemoryVibeRepository::new());
        let vibes = VibeService::new(repo.clone()).with_top_activities(config.stats_top_activities);
        let state = AppState::new(vibes, Arc::new(config));
        Self {
            router: build_router(state),
            repo,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, bytes) = self.request(method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }
}

pub fn cache_ttl() -> Duration {
    Duration::from_secs(60)
}
