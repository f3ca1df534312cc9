use chrono::{DateTime, Days, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::debug;

use crate::article::{Article, StoredArticle};

/// Same layout as SQLite's `CURRENT_TIMESTAMP`, so text order is time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_COLUMNS: &str = "SELECT id, source, title, link, \
     COALESCE(published, '') AS published, CAST(created_at AS TEXT) AS created_at FROM news";

pub struct ArticleStore {
    pool: SqlitePool,
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// UTC instant of local midnight starting `date`.
fn local_day_start(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match naive.and_local_timezone(Local).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // midnight skipped by a DST change
        None => Utc.from_utc_datetime(&naive),
    }
}

/// UTC bounds of the local day `date`, or `None` when the day sits at the
/// edge of the representable calendar. Local offsets are under a day, so one
/// spare day on each side keeps the conversions in range.
fn day_bounds(date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    date.checked_sub_days(Days::new(1))?;
    let next = date.succ_opt()?;
    next.checked_add_days(Days::new(1))?;

    Some((local_day_start(date), local_day_start(next)))
}

impl ArticleStore {
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory databases live per connection, so the pool is pinned to one.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                source TEXT NOT NULL,
                published TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_news_created_at ON news(created_at DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_news_source_created_at
            ON news(source, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Appends every article with the current time as `created_at`.
    pub async fn save(&self, articles: &[Article]) -> anyhow::Result<usize> {
        self.save_at(articles, Utc::now()).await
    }

    /// Each row is its own statement; a failure part way through leaves the
    /// rows before it in place.
    pub async fn save_at(
        &self,
        articles: &[Article],
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<usize> {
        let created_at = format_timestamp(created_at);

        for article in articles {
            sqlx::query(
                r#"
                INSERT INTO news (title, link, source, published, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.title)
            .bind(&article.link)
            .bind(&article.source)
            .bind(&article.published)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;
        }

        debug!("Saved {} articles", articles.len());
        Ok(articles.len())
    }

    /// Articles stored on `date` in the server's local time zone, newest first.
    /// Nothing can be stored on a day at the edge of the calendar.
    pub async fn query_by_date(&self, date: NaiveDate) -> anyhow::Result<Vec<StoredArticle>> {
        match day_bounds(date) {
            Some((start, end)) => self.query_between(start, end).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn query_yesterday(&self) -> anyhow::Result<Vec<StoredArticle>> {
        let today = Local::now().date_naive();
        match today.pred_opt() {
            Some(yesterday) => self.query_by_date(yesterday).await,
            None => Ok(Vec::new()),
        }
    }

    async fn query_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<StoredArticle>> {
        let articles = sqlx::query_as::<_, StoredArticle>(&format!(
            "{SELECT_COLUMNS} WHERE created_at >= ? AND created_at < ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(format_timestamp(start))
        .bind(format_timestamp(end))
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    /// Articles from `source` stored within the last `days` days, newest first.
    pub async fn query_by_source(
        &self,
        source: &str,
        days: u32,
    ) -> anyhow::Result<Vec<StoredArticle>> {
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.query_by_source_since(source, cutoff).await
    }

    async fn query_by_source_since(
        &self,
        source: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<StoredArticle>> {
        let articles = sqlx::query_as::<_, StoredArticle>(&format!(
            "{SELECT_COLUMNS} WHERE source = ? AND created_at >= ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(source)
        .bind(format_timestamp(cutoff))
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
