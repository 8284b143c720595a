//! Scan-related data models.
//!
//! A scan is one pass over a cookbook: it owns the pages committed during
//! live processing, in commit order.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Page, Recipe};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Active,
    Paused,
    Completed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Active => "active",
            ScanStatus::Paused => "paused",
            ScanStatus::Completed => "completed",
        }
    }

    /// Completed is terminal; stop is accepted from either live state.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (ScanStatus::Active, ScanStatus::Paused)
                | (ScanStatus::Paused, ScanStatus::Active)
                | (ScanStatus::Active, ScanStatus::Completed)
                | (ScanStatus::Paused, ScanStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookbook_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ScanStatus,
    pub current_page: u32,
    pub total_pages: u32,
    pub pages: Vec<Page>,
    pub metadata: ScanMetadata,
}

impl Scan {
    pub fn new(name: &str, metadata: ScanMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: now,
            updated_at: now,
            status: ScanStatus::Active,
            current_page: 1,
            total_pages: 0,
            pages: Vec::new(),
            metadata,
        }
    }

    /// Append a committed page. `total_pages` always tracks `pages.len()`.
    pub fn push_page(&mut self, page: Page, now: DateTime<Utc>) {
        self.pages.push(page);
        self.total_pages = self.pages.len() as u32;
        self.updated_at = now;
    }

    pub fn transition(&mut self, next: ScanStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            bail!(
                "scan {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            );
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// All recipes across pages, in page order.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.pages.iter().flat_map(|page| page.recipes.iter())
    }

    pub fn list_item(&self) -> ScanListItem {
        ScanListItem {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            total_pages: self.total_pages,
            updated_at: self.updated_at,
        }
    }
}

/// Summary row for scan listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanListItem {
    pub id: String,
    pub name: String,
    pub status: ScanStatus,
    pub total_pages: u32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine() {
        use ScanStatus::*;
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Paused.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Completed.can_transition_to(Paused));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn push_page_keeps_total_in_sync() {
        let now = Utc::now();
        let mut scan = Scan::new("  Weeknight Dinners ", ScanMetadata::default(), now);
        assert_eq!(scan.name, "Weeknight Dinners");
        scan.push_page(Page::new(&scan.id, 1, now), now);
        scan.push_page(Page::new(&scan.id, 2, now), now);
        assert_eq!(scan.total_pages, 2);
        assert_eq!(scan.total_pages as usize, scan.pages.len());
    }

    #[test]
    fn completed_scan_rejects_resume() {
        let now = Utc::now();
        let mut scan = Scan::new("Soups", ScanMetadata::default(), now);
        scan.transition(ScanStatus::Completed, now).unwrap();
        assert!(scan.transition(ScanStatus::Active, now).is_err());
        assert_eq!(scan.status, ScanStatus::Completed);
    }
}
