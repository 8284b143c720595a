use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Connection, Row, Transaction};

use crate::db::{
    connection::Database,
    helpers::{from_json, parse_datetime, to_json, to_u32},
};
use crate::models::{Page, Recipe};

fn row_to_page(row: &Row) -> Result<Page> {
    let page_number: i64 = row.get("page_number")?;
    let ocr_results: String = row.get("ocr_results")?;
    let captured_at: String = row.get("captured_at")?;

    Ok(Page {
        id: row.get("id")?,
        scan_id: row.get("scan_id")?,
        page_number: to_u32(page_number, "page_number")?,
        image_path: row.get("image_path")?,
        raw_text: row.get("raw_text")?,
        processed_text: row.get("processed_text")?,
        ocr_results: from_json(&ocr_results, "ocr_results")?,
        recipes: Vec::new(),
        timestamp: parse_datetime(&captured_at, "captured_at")?,
        average_confidence: row.get("average_confidence")?,
    })
}

fn row_to_recipe(row: &Row) -> Result<Recipe> {
    let page_number: Option<i64> = row.get("page_number")?;
    let ingredients: String = row.get("ingredients")?;
    let instructions: String = row.get("instructions")?;
    let techniques: Option<String> = row.get("techniques")?;

    Ok(Recipe {
        id: row.get("id")?,
        page_id: row.get("page_id")?,
        title: row.get("title")?,
        title_confidence: row.get("title_confidence")?,
        page_number: page_number
            .map(|value| to_u32(value, "page_number"))
            .transpose()?,
        page_number_confidence: row.get("page_number_confidence")?,
        ingredients: from_json(&ingredients, "ingredients")?,
        instructions: from_json(&instructions, "instructions")?,
        techniques: techniques
            .map(|raw| from_json(&raw, "techniques"))
            .transpose()?,
        raw_markdown: row.get("raw_markdown")?,
    })
}

fn row_id(row: &Row) -> String {
    row.get::<_, String>("id").unwrap_or_else(|_| "<unknown>".into())
}

/// Pages of one scan in commit order. Malformed pages or recipes are
/// skipped with a warning.
pub(crate) fn load_pages(conn: &Connection, scan_id: &str) -> Result<Vec<Page>> {
    let mut stmt = conn.prepare(
        "SELECT id, scan_id, page_number, image_path, raw_text, processed_text, ocr_results, average_confidence, captured_at
         FROM pages
         WHERE scan_id = ?1
         ORDER BY position ASC",
    )?;

    let mut rows = stmt.query(params![scan_id])?;
    let mut pages = Vec::new();
    while let Some(row) = rows.next()? {
        match row_to_page(row) {
            Ok(page) => pages.push(page),
            Err(err) => warn!("skipping malformed page {} of scan {scan_id}: {err:#}", row_id(row)),
        }
    }

    for page in &mut pages {
        page.recipes = load_recipes(conn, &page.id)?;
    }

    Ok(pages)
}

fn load_recipes(conn: &Connection, page_id: &str) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(
        "SELECT id, page_id, title, title_confidence, page_number, page_number_confidence, ingredients, instructions, techniques, raw_markdown
         FROM recipes
         WHERE page_id = ?1
         ORDER BY position ASC",
    )?;

    let mut rows = stmt.query(params![page_id])?;
    let mut recipes = Vec::new();
    while let Some(row) = rows.next()? {
        match row_to_recipe(row) {
            Ok(recipe) => recipes.push(recipe),
            Err(err) => warn!("skipping malformed recipe {} of page {page_id}: {err:#}", row_id(row)),
        }
    }
    Ok(recipes)
}

fn insert_recipe(tx: &Transaction<'_>, recipe: &Recipe, position: usize) -> Result<()> {
    tx.execute(
        "INSERT INTO recipes (id, page_id, position, title, title_confidence, page_number, page_number_confidence, ingredients, instructions, techniques, raw_markdown)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            recipe.id,
            recipe.page_id,
            position as i64,
            recipe.title,
            recipe.title_confidence,
            recipe.page_number.map(i64::from),
            recipe.page_number_confidence,
            to_json(&recipe.ingredients, "ingredients")?,
            to_json(&recipe.instructions, "instructions")?,
            recipe
                .techniques
                .as_ref()
                .map(|techniques| to_json(techniques, "techniques"))
                .transpose()?,
            recipe.raw_markdown,
        ],
    )
    .with_context(|| format!("failed to insert recipe {}", recipe.id))?;
    Ok(())
}

impl Database {
    /// Append a page and its recipes to a scan in one transaction, updating
    /// the scan's counters. Returns the scan's new page total.
    pub async fn commit_page(
        &self,
        page: &Page,
        current_page: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<u32> {
        let record = page.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let position: i64 = tx.query_row(
                "SELECT COUNT(*) FROM pages WHERE scan_id = ?1",
                params![record.scan_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO pages (id, scan_id, position, page_number, image_path, raw_text, processed_text, ocr_results, average_confidence, captured_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.scan_id,
                    position,
                    i64::from(record.page_number),
                    record.image_path,
                    record.raw_text,
                    record.processed_text,
                    to_json(&record.ocr_results, "ocr_results")?,
                    record.average_confidence,
                    record.timestamp.to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert page {}", record.id))?;

            for (index, recipe) in record.recipes.iter().enumerate() {
                insert_recipe(&tx, recipe, index)?;
            }

            let total_pages = position + 1;
            let rows_affected = tx.execute(
                "UPDATE scans
                 SET total_pages = ?1,
                     current_page = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    total_pages,
                    i64::from(current_page),
                    updated_at.to_rfc3339(),
                    record.scan_id,
                ],
            )?;
            if rows_affected == 0 {
                bail!("scan {} not found", record.scan_id);
            }

            tx.commit()?;
            to_u32(total_pages, "total_pages")
        })
        .await
    }

    pub async fn list_pages(&self, scan_id: &str) -> Result<Vec<Page>> {
        let scan_id = scan_id.to_string();
        self.execute(move |conn| load_pages(conn, &scan_id)).await
    }
}
