//! PostgreSQL store over the schema in `migrations/`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use scalelink_common::{Result, ScaleError, TextEncoding};

use super::{CatalogStore, ChangeLogStore};
use crate::config::DatabaseConfig;
use crate::delivery::keymap::SlotQuery;
use crate::models::{
    Action, ChangeLogEntry, FieldValue, FtpSettings, LineFieldDefinition, LineFieldType, Product,
    ScaleGroup, ScaleSystem,
};

const ENTRY_COLUMNS: &str = "id, log_date, action, scale_system_id, product_id, product_text, \
                             external_text, external_text_display, sent, last_send_date";

/// Catalog and change log in PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(ScaleError::database)?;
        info!(max_connections = config.max_connections, "Database connection pool created");

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(|e| ScaleError::database(format!("failed to run migrations: {}", e)))?;
        info!("Database migrations completed");

        Ok(Self::new(pool))
    }

    async fn product_lines(&self, system_id: i64) -> Result<Vec<LineFieldDefinition>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT id, name, code, field_type, field_name, delimiter, multiline_length,
                   multiline_separator, numeric_coefficient, numeric_round, constant_value,
                   related_field_name, x2many_range, suffix
            FROM scale_product_lines
            WHERE scale_system_id = $1
            ORDER BY sequence, id
            "#,
        )
        .bind(system_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ScaleError::database)?;

        rows.into_iter().map(LineRow::into_definition).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SystemRow {
    id: i64,
    name: String,
    encoding: String,
    ftp_host: String,
    ftp_port: i32,
    ftp_login: Option<String>,
    ftp_password: Option<String>,
    csv_relative_path: String,
    product_image_relative_path: String,
    product_text_file_pattern: String,
    external_text_file_pattern: String,
    send_images: bool,
}

impl SystemRow {
    fn into_system(self, product_lines: Vec<LineFieldDefinition>) -> Result<ScaleSystem> {
        let encoding: TextEncoding = self.encoding.parse()?;
        let port = u16::try_from(self.ftp_port).map_err(|_| {
            ScaleError::database(format!(
                "invalid FTP port {} on scale system {}",
                self.ftp_port, self.id
            ))
        })?;
        Ok(ScaleSystem {
            id: self.id,
            name: self.name,
            encoding,
            ftp: FtpSettings {
                host: self.ftp_host,
                port,
                login: self.ftp_login,
                password: self.ftp_password,
            },
            csv_relative_path: self.csv_relative_path,
            product_image_relative_path: self.product_image_relative_path,
            product_text_file_pattern: self.product_text_file_pattern,
            external_text_file_pattern: self.external_text_file_pattern,
            send_images: self.send_images,
            product_lines,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: i64,
    name: String,
    code: Option<String>,
    field_type: String,
    field_name: Option<String>,
    delimiter: Option<String>,
    multiline_length: Option<i32>,
    multiline_separator: Option<String>,
    numeric_coefficient: f64,
    numeric_round: i32,
    constant_value: Option<String>,
    related_field_name: Option<String>,
    x2many_range: i32,
    suffix: Option<String>,
}

impl LineRow {
    fn into_definition(self) -> Result<LineFieldDefinition> {
        let field_type: LineFieldType = self.field_type.parse().map_err(ScaleError::database)?;
        Ok(LineFieldDefinition {
            id: self.id,
            name: self.name,
            code: self.code,
            field_type,
            field_name: self.field_name,
            delimiter: self.delimiter.and_then(|d| d.chars().next()),
            multiline_length: self
                .multiline_length
                .and_then(|len| usize::try_from(len).ok())
                .filter(|len| *len > 0),
            multiline_separator: self.multiline_separator,
            numeric_coefficient: self.numeric_coefficient,
            numeric_round: u32::try_from(self.numeric_round).unwrap_or(0),
            constant_value: self.constant_value,
            related_field_name: self.related_field_name,
            // Negative ranges can never select an item
            x2many_range: usize::try_from(self.x2many_range).unwrap_or(0),
            suffix: self.suffix,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    scale_group_id: Option<i64>,
    scale_sequence: Option<i32>,
    active: bool,
    sale_ok: bool,
    fields: Json<BTreeMap<String, FieldValue>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            scale_group_id: row.scale_group_id,
            scale_sequence: row.scale_sequence.and_then(|seq| u32::try_from(seq).ok()),
            active: row.active,
            sale_ok: row.sale_ok,
            fields: row.fields.0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    external_identity: String,
    scale_system_id: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: i64,
    log_date: DateTime<Utc>,
    action: String,
    scale_system_id: i64,
    product_id: i64,
    product_text: String,
    external_text: String,
    external_text_display: String,
    sent: bool,
    last_send_date: Option<DateTime<Utc>>,
}

impl EntryRow {
    fn into_entry(self) -> Result<ChangeLogEntry> {
        let action: Action = self.action.parse().map_err(ScaleError::database)?;
        Ok(ChangeLogEntry {
            id: self.id,
            log_date: self.log_date,
            action,
            scale_system_id: self.scale_system_id,
            product_id: self.product_id,
            product_text: self.product_text,
            external_text: self.external_text,
            external_text_display: self.external_text_display,
            sent: self.sent,
            last_send_date: self.last_send_date,
        })
    }
}

fn into_entries(rows: Vec<EntryRow>) -> Result<Vec<ChangeLogEntry>> {
    rows.into_iter().map(EntryRow::into_entry).collect()
}

#[async_trait]
impl ChangeLogStore for PgStore {
    async fn record(&self, entry: ChangeLogEntry) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO product_scale_logs (
                log_date, action, scale_system_id, product_id, product_text,
                external_text, external_text_display, sent, last_send_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(entry.log_date)
        .bind(entry.action.as_str())
        .bind(entry.scale_system_id)
        .bind(entry.product_id)
        .bind(&entry.product_text)
        .bind(&entry.external_text)
        .bind(&entry.external_text_display)
        .bind(entry.sent)
        .bind(entry.last_send_date)
        .fetch_one(&self.pool)
        .await
        .map_err(ScaleError::database)?;

        debug!(entry_id = id, product_id = entry.product_id, "Recorded change log entry");
        Ok(id)
    }

    async fn update_texts(&self, entry: &ChangeLogEntry) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE product_scale_logs
            SET product_text = $2, external_text = $3, external_text_display = $4
            WHERE id = $1
            "#,
        )
        .bind(entry.id)
        .bind(&entry.product_text)
        .bind(&entry.external_text)
        .bind(&entry.external_text_display)
        .execute(&self.pool)
        .await
        .map_err(ScaleError::database)?;

        if result.rows_affected() == 0 {
            return Err(ScaleError::not_found(format!("change log entry {}", entry.id)));
        }
        Ok(())
    }

    async fn pending_entries(&self) -> Result<Vec<ChangeLogEntry>> {
        let sql = format!(
            "SELECT {} FROM product_scale_logs WHERE sent = FALSE ORDER BY log_date, id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(ScaleError::database)?;
        into_entries(rows)
    }

    async fn entries_by_ids(&self, ids: &[i64]) -> Result<Vec<ChangeLogEntry>> {
        let sql = format!(
            "SELECT {} FROM product_scale_logs WHERE id = ANY($1) ORDER BY log_date, id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(ScaleError::database)?;
        into_entries(rows)
    }

    async fn pending_count(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM product_scale_logs WHERE sent = FALSE",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(ScaleError::database)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn mark_sent(&self, ids: &[i64], sent_at: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(ScaleError::database)?;

        let result = sqlx::query(
            r#"
            UPDATE product_scale_logs
            SET sent = TRUE, last_send_date = $2
            WHERE id = ANY($1) AND sent = FALSE
            "#,
        )
        .bind(ids)
        .bind(sent_at)
        .execute(&mut *tx)
        .await
        .map_err(ScaleError::database)?;

        tx.commit().await.map_err(ScaleError::database)?;

        let marked = result.rows_affected();
        if marked < ids.len() as u64 {
            warn!(requested = ids.len(), marked, "Some entries were already flagged as sent");
        }
        Ok(marked)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn scale_system(&self, id: i64) -> Result<ScaleSystem> {
        let row = sqlx::query_as::<_, SystemRow>(
            r#"
            SELECT id, name, encoding, ftp_host, ftp_port, ftp_login, ftp_password,
                   csv_relative_path, product_image_relative_path,
                   product_text_file_pattern, external_text_file_pattern, send_images
            FROM scale_systems
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ScaleError::database)?
        .ok_or_else(|| ScaleError::not_found(format!("scale system {}", id)))?;

        let lines = self.product_lines(id).await?;
        row.into_system(lines)
    }

    async fn product(&self, id: i64) -> Result<Product> {
        sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, scale_group_id, scale_sequence, active, sale_ok, fields
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ScaleError::database)?
        .map(Product::from)
        .ok_or_else(|| ScaleError::not_found(format!("product {}", id)))
    }

    async fn scale_group(&self, id: i64) -> Result<ScaleGroup> {
        sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, external_identity, scale_system_id FROM scale_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ScaleError::database)?
        .map(|row| ScaleGroup {
            id: row.id,
            name: row.name,
            external_identity: row.external_identity,
            scale_system_id: row.scale_system_id,
        })
        .ok_or_else(|| ScaleError::not_found(format!("scale group {}", id)))
    }

    async fn occupied_slots(&self, query: &SlotQuery) -> Result<BTreeSet<u32>> {
        let slots = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT scale_sequence
            FROM products
            WHERE active AND sale_ok
              AND scale_group_id IS NOT NULL AND scale_group_id <> $1
              AND scale_sequence BETWEEN $2 AND $3
            "#,
        )
        .bind(query.excluded_group_id)
        .bind(i32::try_from(query.first_slot).unwrap_or(i32::MAX))
        .bind(i32::try_from(query.last_slot).unwrap_or(i32::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(ScaleError::database)?;

        Ok(slots.into_iter().filter_map(|slot| u32::try_from(slot).ok()).collect())
    }
}
