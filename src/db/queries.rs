use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::services::store::{Collection, Document, StoreError};

// ── Documents ──

pub fn list_documents(conn: &Connection, collection: Collection) -> Result<Vec<Document>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id ASC")?;

    let rows = stmt.query_map(params![collection.as_str()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut documents = vec![];
    for row in rows {
        let (id, body) = row?;
        documents.push(Document {
            id,
            body: serde_json::from_str(&body)?,
        });
    }
    Ok(documents)
}

pub fn get_document(
    conn: &Connection,
    collection: Collection,
    id: &str,
) -> Result<Option<serde_json::Value>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        None => Ok(None),
    }
}

/// Full replacement of the document at `collection/id`, like a realtime
/// database `set`.
pub fn put_document(
    conn: &Connection,
    collection: Collection,
    id: &str,
    body: &serde_json::Value,
) -> Result<(), StoreError> {
    let body = serde_json::to_string(body)?;
    let now = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO documents (collection, id, body, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(collection, id) DO UPDATE SET
           body = excluded.body,
           updated_at = excluded.updated_at",
        params![collection.as_str(), id, body, now],
    )?;
    Ok(())
}

/// Returns whether a document was actually removed.
pub fn delete_document(conn: &Connection, collection: Collection, id: &str) -> Result<bool, StoreError> {
    let count = conn.execute(
        "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
        params![collection.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn query_documents(
    conn: &Connection,
    collection: Collection,
    field: &str,
    value: &str,
) -> Result<Vec<Document>, StoreError> {
    let path = format!("$.\"{}\"", field.replace('"', ""));
    let mut stmt = conn.prepare(
        "SELECT id, body FROM documents
         WHERE collection = ?1 AND CAST(json_extract(body, ?2) AS TEXT) = ?3
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![collection.as_str(), path, value], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut documents = vec![];
    for row in rows {
        let (id, body) = row?;
        documents.push(Document {
            id,
            body: serde_json::from_str(&body)?,
        });
    }
    Ok(documents)
}
