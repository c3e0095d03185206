// SQLite GallerySink Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use studio_core::domain::Artifact;
use studio_core::error::Result;
use studio_core::port::{GalleryEntry, GallerySink};
use tracing::debug;

pub struct SqliteGallery {
    pool: SqlitePool,
}

impl SqliteGallery {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GallerySink for SqliteGallery {
    async fn record(&self, entry: &GalleryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO gallery_items (item_id, prompt, artifact_uri, mime_type, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.item_id)
        .bind(&entry.prompt)
        .bind(&entry.artifact.uri)
        .bind(&entry.artifact.mime_type)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(item_id = %entry.item_id, "Gallery entry recorded");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<GalleryEntry>> {
        let rows: Vec<GalleryRow> = sqlx::query_as(
            r#"
            SELECT item_id, prompt, artifact_uri, mime_type, created_at
            FROM gallery_items
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GalleryRow::into_entry).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GalleryRow {
    item_id: String,
    prompt: String,
    artifact_uri: String,
    mime_type: Option<String>,
    created_at: i64,
}

impl GalleryRow {
    fn into_entry(self) -> GalleryEntry {
        GalleryEntry {
            item_id: self.item_id,
            prompt: self.prompt,
            artifact: Artifact {
                uri: self.artifact_uri,
                mime_type: self.mime_type,
            },
            created_at: self.created_at,
        }
    }
}
