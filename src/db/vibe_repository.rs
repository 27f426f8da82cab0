use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppResult;
use crate::models::vibe::{NewVibe, Page, Sort, Vibe, VibeFilter};

const COLUMNS: &str = "id, date, mood, energy_level, notes, activities, created_at, updated_at";

/// Rows per INSERT statement during bulk import (5 binds each).
const BULK_CHUNK: usize = 1000;

/// Storage for vibe entries. Soft-deleted rows are invisible to every read.
#[async_trait]
pub trait VibeRepository: Send + Sync {
    async fn create(&self, vibe: &NewVibe) -> AppResult<Vibe>;

    /// All-or-nothing insert; returns the number of rows written.
    async fn bulk_create(&self, vibes: &[NewVibe]) -> AppResult<u64>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Vibe>>;

    /// One page of matches plus the total match count.
    async fn list(
        &self,
        filter: &VibeFilter,
        page: Page,
        sort: Sort,
    ) -> AppResult<(Vec<Vibe>, i64)>;

    async fn list_all(&self, filter: &VibeFilter, sort: Sort) -> AppResult<Vec<Vibe>>;

    /// Full replace. `None` when the row does not exist.
    async fn update(&self, id: i64, vibe: &NewVibe) -> AppResult<Option<Vibe>>;

    /// `false` when there was nothing to delete.
    async fn soft_delete(&self, id: i64) -> AppResult<bool>;

    /// Inclusive on both ends, ordered by date ascending.
    async fn list_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Vibe>>;

    /// Ordered by date ascending.
    async fn list_by_mood(&self, mood: &str) -> AppResult<Vec<Vibe>>;

    async fn ping(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgVibeRepository {
    pool: PgPool,
}

impl PgVibeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_live() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {COLUMNS} FROM vibes WHERE deleted_at IS NULL"
    ))
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &VibeFilter) {
    if let Some(date) = filter.date {
        builder.push(" AND date = ").push_bind(date);
    }
    if let Some(mood) = &filter.mood {
        builder.push(" AND mood = ").push_bind(mood.clone());
    }
}

/// Column names come from a closed enum, never from the request.
fn push_order(builder: &mut QueryBuilder<'_, Postgres>, sort: Sort) {
    let direction = sort.order.keyword();
    builder.push(format!(
        " ORDER BY {} {direction}, id {direction}",
        sort.field.column()
    ));
}

#[async_trait]
impl VibeRepository for PgVibeRepository {
    async fn create(&self, vibe: &NewVibe) -> AppResult<Vibe> {
        let created = sqlx::query_as::<_, Vibe>(&format!(
            r#"
            INSERT INTO vibes (date, mood, energy_level, notes, activities)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(vibe.date)
        .bind(&vibe.mood)
        .bind(vibe.energy_level)
        .bind(&vibe.notes)
        .bind(&vibe.activities)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn bulk_create(&self, vibes: &[NewVibe]) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in vibes.chunks(BULK_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO vibes (date, mood, energy_level, notes, activities) ",
            );
            builder.push_values(chunk, |mut row, vibe| {
                row.push_bind(vibe.date)
                    .push_bind(vibe.mood.clone())
                    .push_bind(vibe.energy_level)
                    .push_bind(vibe.notes.clone())
                    .push_bind(vibe.activities.clone());
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Vibe>> {
        let vibe = sqlx::query_as::<_, Vibe>(&format!(
            "SELECT {COLUMNS} FROM vibes WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vibe)
    }

    async fn list(
        &self,
        filter: &VibeFilter,
        page: Page,
        sort: Sort,
    ) -> AppResult<(Vec<Vibe>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM vibes WHERE deleted_at IS NULL");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut query = select_live();
        push_filter(&mut query, filter);
        push_order(&mut query, sort);
        query
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let vibes = query.build_query_as::<Vibe>().fetch_all(&self.pool).await?;
        Ok((vibes, total))
    }

    async fn list_all(&self, filter: &VibeFilter, sort: Sort) -> AppResult<Vec<Vibe>> {
        let mut query = select_live();
        push_filter(&mut query, filter);
        push_order(&mut query, sort);

        let vibes = query.build_query_as::<Vibe>().fetch_all(&self.pool).await?;
        Ok(vibes)
    }

    async fn update(&self, id: i64, vibe: &NewVibe) -> AppResult<Option<Vibe>> {
        let updated = sqlx::query_as::<_, Vibe>(&format!(
            r#"
            UPDATE vibes
            SET date = $1, mood = $2, energy_level = $3, notes = $4, activities = $5,
                updated_at = NOW()
            WHERE id = $6 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        ))
        .bind(vibe.date)
        .bind(&vibe.mood)
        .bind(vibe.energy_level)
        .bind(&vibe.notes)
        .bind(&vibe.activities)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn soft_delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE vibes SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Vibe>> {
        let vibes = sqlx::query_as::<_, Vibe>(&format!(
            r#"
            SELECT {COLUMNS} FROM vibes
            WHERE deleted_at IS NULL AND date BETWEEN $1 AND $2
            ORDER BY date ASC, id ASC
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(vibes)
    }

    async fn list_by_mood(&self, mood: &str) -> AppResult<Vec<Vibe>> {
        let vibes = sqlx::query_as::<_, Vibe>(&format!(
            r#"
            SELECT {COLUMNS} FROM vibes
            WHERE deleted_at IS NULL AND mood = $1
            ORDER BY date ASC, id ASC
            "#
        ))
        .bind(mood)
        .fetch_all(&self.pool)
        .await?;

        Ok(vibes)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
