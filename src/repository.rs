use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

/// One stored verification. `sources` is kept as a JSON array in a text
/// column.
#[derive(Debug, Clone)]
pub struct VerificationRecord {
    pub id: String,
    pub content_type: String,
    pub source_url: Option<String>,
    pub status: String,
    pub classification: String,
    pub confidence: f64,
    pub explanation: String,
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct VerificationRepository {
    pool: SqlitePool,
}

impl VerificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the pool and applies the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(pool)
    }

    pub async fn insert(&self, record: &VerificationRecord) -> Result<(), sqlx::Error> {
        let sources = serde_json::to_string(&record.sources).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "insert into verifications \
             (id, content_type, source_url, status, classification, confidence, explanation, sources, created_at, updated_at) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&record.id)
        .bind(&record.content_type)
        .bind(&record.source_url)
        .bind(&record.status)
        .bind(&record.classification)
        .bind(record.confidence)
        .bind(&record.explanation)
        .bind(sources)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<VerificationRecord>, sqlx::Error> {
        let row = sqlx::query(
            "select id, content_type, source_url, status, classification, confidence, explanation, sources, created_at, updated_at \
             from verifications where id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_row).transpose()
    }

    /// Most recent verifications first.
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VerificationRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "select id, content_type, source_url, status, classification, confidence, explanation, sources, created_at, updated_at \
             from verifications order by created_at desc, id limit ?1 offset ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::map_row).collect()
    }

    fn map_row(row: SqliteRow) -> Result<VerificationRecord, sqlx::Error> {
        let sources_raw: String = row.try_get("sources")?;
        let sources = serde_json::from_str(&sources_raw).unwrap_or_default();

        Ok(VerificationRecord {
            id: row.try_get("id")?,
            content_type: row.try_get("content_type")?,
            source_url: row.try_get("source_url")?,
            status: row.try_get("status")?,
            classification: row.try_get("classification")?,
            confidence: row.try_get("confidence")?,
            explanation: row.try_get("explanation")?,
            sources,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repository() -> (VerificationRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("test.db").display()
        );
        let pool = VerificationRepository::connect(&url)
            .await
            .expect("connect");
        (VerificationRepository::new(pool), dir)
    }

    fn record(id: &str, created_at: DateTime<Utc>) -> VerificationRecord {
        VerificationRecord {
            id: id.to_string(),
            content_type: "text".to_string(),
            source_url: Some("https://example.com/artigo".to_string()),
            status: "completed".to_string(),
            classification: "Verificado".to_string(),
            confidence: 0.91,
            explanation: "ok".to_string(),
            sources: vec!["https://www.gov.br".to_string()],
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let (repo, _dir) = test_repository().await;
        let stored = record("v-1", Utc::now());
        repo.insert(&stored).await.unwrap();

        let fetched = repo.get("v-1").await.unwrap().expect("record exists");
        assert_eq!(fetched.classification, "Verificado");
        assert_eq!(fetched.sources, stored.sources);
        assert_eq!(fetched.source_url.as_deref(), Some("https://example.com/artigo"));
        assert!((fetched.confidence - 0.91).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let (repo, _dir) = test_repository().await;
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_newest_first_and_paginates() {
        let (repo, _dir) = test_repository().await;
        let base = Utc::now();
        for i in 0..3i64 {
            let created = base + chrono::Duration::seconds(i);
            repo.insert(&record(&format!("v-{i}"), created)).await.unwrap();
        }

        let all = repo.list(10, 0).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "v-2");

        let page = repo.list(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "v-1");
    }
}
