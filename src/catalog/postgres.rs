use async_trait::async_trait;
use sea_query::{Expr, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::catalog::{NewVideo, UploadSession, UploadSessions, Video, VideoCatalog, Videos};
use crate::errors::Result;

const VIDEO_COLUMNS: [Videos; 8] = [
    Videos::Id,
    Videos::Title,
    Videos::OwnerId,
    Videos::RawKey,
    Videos::HlsKey,
    Videos::ThumbnailKey,
    Videos::IsProcessed,
    Videos::CreatedAt,
];

#[derive(Clone, Deserialize)]
pub struct PostgresConfig {
    connection_string: String,
}

impl PostgresConfig {
    pub async fn new_catalog(&self) -> Result<PostgresCatalog> {
        let pool = PgPoolOptions::new()
            .connect(&self.connection_string)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(PostgresCatalog { pool })
    }
}

#[derive(Clone)]
pub struct PostgresCatalog {
    pool: Pool<Postgres>,
}

#[async_trait]
impl VideoCatalog for PostgresCatalog {
    async fn insert(&self, new: NewVideo) -> Result<Video> {
        let (sql, values) = Query::insert()
            .into_table(Videos::Table)
            .columns([Videos::Id, Videos::Title, Videos::OwnerId, Videos::RawKey])
            .values([
                new.id.into(),
                new.title.into(),
                new.owner_id.into(),
                new.raw_key.into(),
            ])?
            .returning(Query::returning().columns(VIDEO_COLUMNS))
            .build_sqlx(PostgresQueryBuilder);

        Ok(sqlx::query_as_with::<_, Video, _>(&sql, values)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Video>> {
        let (sql, values) = Query::select()
            .from(Videos::Table)
            .columns(VIDEO_COLUMNS)
            .and_where(Expr::col(Videos::Id).eq(*id))
            .build_sqlx(PostgresQueryBuilder);

        Ok(sqlx::query_as_with::<_, Video, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_processed(&self) -> Result<Vec<Video>> {
        let (sql, values) = Query::select()
            .from(Videos::Table)
            .columns(VIDEO_COLUMNS)
            .and_where(Expr::col(Videos::IsProcessed).eq(true))
            .order_by(Videos::CreatedAt, Order::Asc)
            .build_sqlx(PostgresQueryBuilder);

        Ok(sqlx::query_as_with::<_, Video, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Video>> {
        let (sql, values) = Query::select()
            .from(Videos::Table)
            .columns(VIDEO_COLUMNS)
            .and_where(Expr::col(Videos::OwnerId).eq(owner_id))
            .order_by(Videos::CreatedAt, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        Ok(sqlx::query_as_with::<_, Video, _>(&sql, values)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn rename(&self, id: &Uuid, title: &str) -> Result<Option<Video>> {
        let (sql, values) = Query::update()
            .table(Videos::Table)
            .value(Videos::Title, title)
            .and_where(Expr::col(Videos::Id).eq(*id))
            .returning(Query::returning().columns(VIDEO_COLUMNS))
            .build_sqlx(PostgresQueryBuilder);

        Ok(sqlx::query_as_with::<_, Video, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: &Uuid) -> Result<Option<Video>> {
        let (sql, values) = Query::delete()
            .from_table(Videos::Table)
            .and_where(Expr::col(Videos::Id).eq(*id))
            .returning(Query::returning().columns(VIDEO_COLUMNS))
            .build_sqlx(PostgresQueryBuilder);

        Ok(sqlx::query_as_with::<_, Video, _>(&sql, values)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn record_session(&self, session: &UploadSession) -> Result<()> {
        let (sql, values) = Query::insert()
            .into_table(UploadSessions::Table)
            .columns([
                UploadSessions::UploadId,
                UploadSessions::VideoId,
                UploadSessions::OwnerId,
                UploadSessions::StorageKey,
            ])
            .values([
                session.upload_id.clone().into(),
                session.video_id.into(),
                session.owner_id.clone().into(),
                session.storage_key.clone().into(),
            ])?
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_with(&sql, values).execute(&self.pool).await?;
        Ok(())
    }

    async fn clear_session(&self, upload_id: &str) -> Result<()> {
        let (sql, values) = Query::delete()
            .from_table(UploadSessions::Table)
            .and_where(Expr::col(UploadSessions::UploadId).eq(upload_id))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_with(&sql, values).execute(&self.pool).await?;
        Ok(())
    }
}
