use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;

use crate::detection::DEFAULT_PAGE_TURN_THRESHOLD;
use crate::export::{DirectoryShareTarget, ExportFormat};
use crate::models::{Page, ScanMetadata};
use crate::ocr::TextRecognizer;
use crate::processing::{create_text_segments, format_confidence};
use crate::session::pipeline::{analyze_frame, parse_page};
use crate::session::state::LiveTracker;
use crate::session::DirectoryFrameSource;
use crate::{AppState, ReplayArgs};

pub(crate) async fn replay(state: &AppState, args: ReplayArgs) -> Result<()> {
    let controller = &state.controller;
    let source = DirectoryFrameSource::open(&args.frames)?;
    if source.remaining() == 0 {
        bail!("no frames found in {}", args.frames.display());
    }
    let frame_count = source.remaining();

    let metadata = ScanMetadata {
        cookbook_title: args.cookbook,
        author: args.author,
        notes: args.notes,
    };
    let scan = controller.start_scan(&args.name, metadata).await?;
    println!("Scanning \"{}\" ({frame_count} frames)", scan.name);

    controller.start_capture(Box::new(source)).await?;
    tokio::select! {
        result = controller.wait_for_capture() => result?,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted; finishing scan with the pages seen so far");
        }
    }

    let scan = controller.stop_scan().await?;
    let recipes = scan.recipes().count();
    println!(
        "Saved {} page(s), {recipes} recipe(s) as scan {}",
        scan.total_pages, scan.id
    );

    if args.export {
        let path = controller
            .export_scan(&scan.id, args.format.map(Into::into))
            .await?;
        println!("Exported to {}", path.display());
    }
    Ok(())
}

pub(crate) async fn list(state: &AppState) -> Result<()> {
    let scans = state.controller.list_scans().await?;
    if scans.is_empty() {
        println!("No scans yet");
        return Ok(());
    }

    for scan in scans {
        println!(
            "{}  {:<9}  {:>3} page(s)  {}  {}",
            scan.id,
            scan.status.as_str(),
            scan.total_pages,
            scan.updated_at.format("%Y-%m-%d %H:%M"),
            scan.name
        );
    }
    Ok(())
}

pub(crate) async fn show(state: &AppState, scan_id: &str, json: bool) -> Result<()> {
    let scan = state
        .controller
        .get_scan(scan_id)
        .await?
        .ok_or_else(|| anyhow!("scan {scan_id} not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
        return Ok(());
    }

    println!("{} [{}]", scan.name, scan.status.as_str());
    println!(
        "created {}, {} page(s), next page {}",
        scan.created_at.format("%Y-%m-%d"),
        scan.total_pages,
        scan.current_page
    );
    for page in &scan.pages {
        let titles: Vec<&str> = page.recipes.iter().map(|recipe| recipe.title.as_str()).collect();
        println!(
            "  page {:>4}  {:>4}  {}",
            page.page_number,
            format_confidence(page.average_confidence),
            if titles.is_empty() {
                "(no recipe)".to_string()
            } else {
                titles.join(", ")
            }
        );
    }
    Ok(())
}

pub(crate) async fn export(
    state: &AppState,
    scan_id: &str,
    format: Option<ExportFormat>,
    share_dir: Option<PathBuf>,
) -> Result<()> {
    let path = match share_dir {
        Some(dir) => {
            let target = DirectoryShareTarget::new(dir);
            state
                .controller
                .export_and_share(scan_id, format, &target)
                .await?
        }
        None => state.controller.export_scan(scan_id, format).await?,
    };
    println!("{}", path.display());
    Ok(())
}

pub(crate) async fn delete(state: &AppState, scan_id: &str) -> Result<()> {
    if !state.controller.delete_scan(scan_id).await? {
        bail!("scan {scan_id} not found");
    }
    println!("Deleted {scan_id}");
    Ok(())
}

pub(crate) fn inspect(state: &AppState, frame: &Path) -> Result<()> {
    let recognized = state.recognizer.recognize(frame)?;
    let thresholds = state.controller.settings().thresholds();

    println!("{} fragment(s)", recognized.fragments.len());
    for segment in create_text_segments(&recognized.fragments, &thresholds) {
        println!(
            "  {:>4}  {:<6}  {}",
            format_confidence(segment.confidence),
            segment.level.as_str(),
            segment.text
        );
    }

    let mut tracker = LiveTracker::new(DEFAULT_PAGE_TURN_THRESHOLD, 1);
    let Some(analysis) = analyze_frame(&mut tracker, &recognized) else {
        println!("nothing meaningful");
        return Ok(());
    };
    println!(
        "{} meaningful, {} line(s)",
        analysis.meaningful.len(),
        analysis.lines.len()
    );

    match analysis.page_number {
        Some(guess) => println!(
            "page number {} ({})",
            guess.value,
            format_confidence(guess.confidence)
        ),
        None => println!("no page number"),
    }

    let mut page = Page::new("inspect", tracker.current_page_number(), Utc::now());
    page.set_fragments(analysis.lines);
    match parse_page(&page) {
        Some(recipe) => println!(
            "recipe \"{}\": {} ingredient(s), {} step(s), {} technique(s)",
            recipe.title,
            recipe.ingredients.len(),
            recipe.instructions.len(),
            recipe.techniques().len()
        ),
        None => println!("no recipe"),
    }
    Ok(())
}
