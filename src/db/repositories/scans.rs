use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::pages::load_pages;
use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_status, to_u32},
};
use crate::models::{Scan, ScanListItem, ScanMetadata, ScanStatus};

const SCAN_COLUMNS: &str =
    "id, name, status, current_page, total_pages, cookbook_title, author, notes, created_at, updated_at";

fn row_to_scan(row: &Row) -> Result<Scan> {
    let status: String = row.get("status")?;
    let current_page: i64 = row.get("current_page")?;
    let total_pages: i64 = row.get("total_pages")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Scan {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        status: parse_status(&status)?,
        current_page: to_u32(current_page, "current_page")?,
        total_pages: to_u32(total_pages, "total_pages")?,
        pages: Vec::new(),
        metadata: ScanMetadata {
            cookbook_title: row.get("cookbook_title")?,
            author: row.get("author")?,
            notes: row.get("notes")?,
        },
    })
}

fn row_to_list_item(row: &Row) -> Result<ScanListItem> {
    let status: String = row.get("status")?;
    let total_pages: i64 = row.get("total_pages")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(ScanListItem {
        id: row.get("id")?,
        name: row.get("name")?,
        status: parse_status(&status)?,
        total_pages: to_u32(total_pages, "total_pages")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

/// Attach pages and make `total_pages` agree with what actually loaded.
fn hydrate(conn: &Connection, mut scan: Scan) -> Result<Scan> {
    scan.pages = load_pages(conn, &scan.id)?;
    scan.total_pages = scan.pages.len() as u32;
    Ok(scan)
}

impl Database {
    pub async fn insert_scan(&self, scan: &Scan) -> Result<()> {
        let record = scan.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO scans (id, name, status, current_page, total_pages, cookbook_title, author, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.name,
                    record.status.as_str(),
                    i64::from(record.current_page),
                    i64::from(record.total_pages),
                    record.metadata.cookbook_title,
                    record.metadata.author,
                    record.metadata.notes,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn update_scan_status(
        &self,
        scan_id: &str,
        status: ScanStatus,
        current_page: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let scan_id = scan_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE scans
                 SET status = ?1,
                     current_page = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    status.as_str(),
                    i64::from(current_page),
                    updated_at.to_rfc3339(),
                    scan_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow::anyhow!("Scan not found"));
            }
            Ok(())
        })
        .await
    }

    /// Most recently updated first.
    pub async fn list_scan_items(&self) -> Result<Vec<ScanListItem>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, status, total_pages, updated_at
                 FROM scans
                 ORDER BY updated_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                match row_to_list_item(row) {
                    Ok(item) => items.push(item),
                    Err(err) => warn!("skipping malformed scan row: {err:#}"),
                }
            }
            Ok(items)
        })
        .await
    }

    /// Every scan with its pages and recipes, most recently updated first.
    pub async fn load_scans(&self) -> Result<Vec<Scan>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCAN_COLUMNS} FROM scans ORDER BY updated_at DESC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut scans = Vec::new();
            while let Some(row) = rows.next()? {
                match row_to_scan(row) {
                    Ok(scan) => scans.push(scan),
                    Err(err) => warn!("skipping malformed scan row: {err:#}"),
                }
            }

            scans
                .into_iter()
                .map(|scan| hydrate(conn, scan))
                .collect()
        })
        .await
    }

    /// A malformed scan row reads as absent.
    pub async fn get_scan(&self, scan_id: &str) -> Result<Option<Scan>> {
        let scan_id = scan_id.to_string();
        self.execute(move |conn| {
            let parsed = conn
                .query_row(
                    &format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?1"),
                    params![scan_id],
                    |row| Ok(row_to_scan(row)),
                )
                .optional()?;

            match parsed {
                None => Ok(None),
                Some(Ok(scan)) => hydrate(conn, scan).map(Some),
                Some(Err(err)) => {
                    warn!("scan {scan_id} is malformed, treating as absent: {err:#}");
                    Ok(None)
                }
            }
        })
        .await
    }

    /// Delete a scan. Pages and recipes go with it via ON DELETE CASCADE.
    /// Returns false when the scan did not exist.
    pub async fn delete_scan(&self, scan_id: &str) -> Result<bool> {
        let scan_id = scan_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute("DELETE FROM scans WHERE id = ?1", params![scan_id])?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Scans still marked active were interrupted mid-session; park them as
    /// paused. Returns the ids that were moved.
    pub async fn recover_interrupted_scans(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let ids = {
                let mut stmt = tx.prepare("SELECT id FROM scans WHERE status = 'active'")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                ids
            };

            tx.execute(
                "UPDATE scans
                 SET status = ?1,
                     updated_at = ?2
                 WHERE status = 'active'",
                params![ScanStatus::Paused.as_str(), now.to_rfc3339()],
            )?;

            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
