//! Database module for attachments, their metadata and taxonomy terms.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! The tables mirror a CMS content store:
//! - `attachments` - one row per uploaded file
//! - `attachment_meta` - key-value metadata per attachment
//! - `terms` / `term_relationships` - taxonomy terms assigned to attachments
//!
//! # Example
//!
//! ```ignore
//! use image_tagger::db::{init_db, get_attachment};
//!
//! let pool = init_db("sqlite:image_tagger.db").await?;
//! let attachment = get_attachment(&pool, 42).await?;
//! ```

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::search;

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "image_tagger.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Attachment {
    pub id: i64,
    /// Local path or `s3://bucket/key` location
    pub file: String,
    /// MIME type detected from content at upload time
    pub mime_type: Option<String>,
    pub title: String,
    /// Caption
    pub excerpt: String,
    pub description: String,
}

/// Fields for a new attachment row.
#[derive(Debug, Clone, Default)]
pub struct NewAttachment {
    pub file: String,
    pub mime_type: Option<String>,
    pub title: String,
    pub excerpt: String,
    pub description: String,
}

const ATTACHMENT_COLUMNS: &str = "id, file, mime_type, title, excerpt, description";

/// Insert an attachment and return its ID.
pub async fn insert_attachment(pool: &SqlitePool, attachment: &NewAttachment) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO attachments (file, mime_type, title, excerpt, description) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&attachment.file)
    .bind(&attachment.mime_type)
    .bind(&attachment.title)
    .bind(&attachment.excerpt)
    .bind(&attachment.description)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Get an attachment by its database ID.
pub async fn get_attachment(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Attachment>> {
    sqlx::query_as::<_, Attachment>(&format!(
        "SELECT {} FROM attachments WHERE id = ?",
        ATTACHMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// IDs of all attachments with an image MIME type, oldest first.
pub async fn image_attachment_ids(pool: &SqlitePool) -> sqlx::Result<Vec<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT id FROM attachments WHERE mime_type LIKE 'image/%' ORDER BY id")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Set the caption of an attachment.
pub async fn set_excerpt(pool: &SqlitePool, id: i64, excerpt: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE attachments SET excerpt = ? WHERE id = ?")
        .bind(excerpt)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Read one metadata value.
pub async fn get_meta(pool: &SqlitePool, id: i64, key: &str) -> sqlx::Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT meta_value FROM attachment_meta WHERE attachment_id = ? AND meta_key = ?",
    )
    .bind(id)
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(value,)| value))
}

/// Insert or overwrite one metadata value.
pub async fn set_meta(pool: &SqlitePool, id: i64, key: &str, value: &str) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attachment_meta (attachment_id, meta_key, meta_value)
        VALUES (?, ?, ?)
        ON CONFLICT(attachment_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value
        "#,
    )
    .bind(id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove one metadata value. Removing a missing key is not an error.
pub async fn delete_meta(pool: &SqlitePool, id: i64, key: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM attachment_meta WHERE attachment_id = ? AND meta_key = ?")
        .bind(id)
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

/// Assign terms to an attachment, keeping any it already has.
///
/// Terms are created on first use. Runs in a single transaction.
pub async fn add_object_terms(
    pool: &SqlitePool,
    id: i64,
    taxonomy: &str,
    names: &[String],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    for name in names {
        sqlx::query("INSERT INTO terms (taxonomy, name) VALUES (?, ?) ON CONFLICT(taxonomy, name) DO NOTHING")
            .bind(taxonomy)
            .bind(name)
            .execute(&mut *tx)
            .await?;

        let (term_id,): (i64,) = sqlx::query_as("SELECT id FROM terms WHERE taxonomy = ? AND name = ?")
            .bind(taxonomy)
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO term_relationships (attachment_id, term_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(term_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Term names assigned to an attachment within a taxonomy.
pub async fn get_object_terms(pool: &SqlitePool, id: i64, taxonomy: &str) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT t.name
        FROM term_relationships tr
        JOIN terms t ON t.id = tr.term_id
        WHERE tr.attachment_id = ? AND t.taxonomy = ?
        ORDER BY t.id
        "#,
    )
    .bind(id)
    .bind(taxonomy)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Free-text attachment search, also matching recognition keywords.
///
/// Each whitespace-separated term must match the title, caption or
/// description; terms prefixed with `-` must not. The keyword augmentation
/// from [`search::augment_with_keywords`] extends description matches to
/// the stored keyword string.
pub async fn search_attachments(pool: &SqlitePool, query: &str) -> sqlx::Result<Vec<Attachment>> {
    let Some(built) = search::build_search(query) else {
        return Ok(Vec::new());
    };
    let clauses = search::augment_with_keywords(built.clauses);

    let columns = ATTACHMENT_COLUMNS
        .split(", ")
        .map(|c| format!("attachments.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("SELECT {} FROM attachments", columns);
    if !clauses.join.is_empty() {
        sql.push(' ');
        sql.push_str(&clauses.join);
    }
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.where_clause);
    if !clauses.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&clauses.group_by);
    }
    sql.push_str(" ORDER BY attachments.id");

    let mut q = sqlx::query_as::<_, Attachment>(&sql);
    for pattern in &built.patterns {
        q = q.bind(pattern);
    }
    q.fetch_all(pool).await
}
