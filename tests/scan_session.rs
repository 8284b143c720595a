mod common;

use std::fs;
use std::path::Path;

use shelf_lib::db::Database;
use shelf_lib::export::{DirectoryShareTarget, ExportFormat, UnavailableShareTarget};
use shelf_lib::models::{ScanMetadata, ScanStatus};
use shelf_lib::session::{DirectoryFrameSource, FrameOutcome};

use common::{controller, corner_number, fragments, write_frame, SOUP, TART};

fn tart_with_page_number() -> Vec<shelf_lib::models::TextFragment> {
    let mut frame = fragments(&TART);
    frame.push(corner_number("57"));
    frame
}

#[tokio::test]
async fn replayed_frames_become_pages_and_recipes() {
    let data = tempfile::tempdir().unwrap();
    let frames = tempfile::tempdir().unwrap();
    write_frame(frames.path(), "frame_001.json", &fragments(&SOUP));
    write_frame(frames.path(), "frame_002.json", &fragments(&SOUP));
    write_frame(frames.path(), "frame_003.json", &tart_with_page_number());

    let controller = controller(data.path(), Database::in_memory().unwrap());
    let metadata = ScanMetadata {
        cookbook_title: Some("Weeknight Suppers".into()),
        ..ScanMetadata::default()
    };
    let scan = controller.start_scan("Suppers", metadata).await.unwrap();

    let source = DirectoryFrameSource::open(frames.path()).unwrap();
    controller.start_capture(Box::new(source)).await.unwrap();
    controller.wait_for_capture().await.unwrap();
    let done = controller.stop_scan().await.unwrap();

    assert_eq!(done.status, ScanStatus::Completed);
    let numbers: Vec<u32> = done.pages.iter().map(|page| page.page_number).collect();
    assert_eq!(numbers, vec![1, 57]);
    assert_eq!(done.current_page, 58);

    let titles: Vec<&str> = done.recipes().map(|recipe| recipe.title.as_str()).collect();
    assert_eq!(titles, vec!["Tomato Soup", "Lemon Tart"]);
    assert_eq!(done.pages[1].recipes[0].page_number, Some(57));

    let stored = controller.get_scan(&scan.id).await.unwrap().unwrap();
    assert_eq!(stored.total_pages, 2);
    assert_eq!(stored.pages, done.pages);

    let path = controller
        .export_scan(&scan.id, Some(ExportFormat::Markdown))
        .await
        .unwrap();
    let markdown = fs::read_to_string(&path).unwrap();
    assert!(markdown.starts_with("# Suppers\n\n**Source:** Weeknight Suppers\n"));
    assert!(markdown.contains("## Tomato Soup\n"));
    assert!(markdown.contains("## Lemon Tart\n\n*Page 57*\n"));
    assert!(markdown.contains("- onion <!-- confidence: 60% -->\n"));
    assert!(path.starts_with(data.path().join("exports")));
}

#[tokio::test]
async fn pause_and_resume_continue_the_page_count() {
    let data = tempfile::tempdir().unwrap();
    let frames = tempfile::tempdir().unwrap();
    let soup = write_frame(frames.path(), "soup.json", &fragments(&SOUP));
    let tart = write_frame(frames.path(), "tart.json", &fragments(&TART));

    let controller = controller(data.path(), Database::in_memory().unwrap());
    let scan = controller
        .start_scan("Suppers", ScanMetadata::default())
        .await
        .unwrap();

    controller.process_frame(&soup).await.unwrap();
    let paused = controller.pause_scan().await.unwrap();
    assert_eq!(paused.status, ScanStatus::Paused);
    assert_eq!(paused.total_pages, 1);
    assert_eq!(paused.current_page, 2);

    assert_eq!(
        controller.process_frame(&tart).await.unwrap(),
        FrameOutcome::Inactive
    );
    assert!(controller.pause_scan().await.is_err());

    let resumed = controller.resume_scan(&scan.id).await.unwrap();
    assert_eq!(resumed.status, ScanStatus::Active);

    // First frame after a resume has nothing to compare against.
    let outcome = controller.process_frame(&tart).await.unwrap();
    assert!(matches!(
        outcome,
        FrameOutcome::Processed { page_turn: false, page_number: 2, .. }
    ));

    let done = controller.stop_scan().await.unwrap();
    assert_eq!(done.total_pages, 2);
    assert!(controller.resume_scan(&scan.id).await.is_err());
}

#[tokio::test]
async fn stopping_a_paused_scan_completes_it() {
    let data = tempfile::tempdir().unwrap();
    let controller = controller(data.path(), Database::in_memory().unwrap());
    controller
        .start_scan("Suppers", ScanMetadata::default())
        .await
        .unwrap();
    controller.pause_scan().await.unwrap();

    let done = controller.stop_scan().await.unwrap();
    assert_eq!(done.status, ScanStatus::Completed);
    assert_eq!(done.total_pages, 0);
    assert!(controller.stop_scan().await.is_err());
}

#[tokio::test]
async fn interrupted_scans_come_back_paused() {
    let data = tempfile::tempdir().unwrap();
    let db_path = data.path().join("shelf.sqlite3");

    let scan_id = {
        let first = controller(data.path(), Database::new(db_path.clone()).unwrap());
        let scan = first
            .start_scan("Suppers", ScanMetadata::default())
            .await
            .unwrap();
        scan.id
    };

    let second = controller(data.path(), Database::new(db_path).unwrap());
    assert_eq!(second.recover().await.unwrap(), vec![scan_id.clone()]);

    let scan = second.get_scan(&scan_id).await.unwrap().unwrap();
    assert_eq!(scan.status, ScanStatus::Paused);
    second.resume_scan(&scan_id).await.unwrap();
    assert!(second.snapshot().await.scan.is_some());
}

#[tokio::test]
async fn deleting_a_scan_removes_pages_and_images() {
    let data = tempfile::tempdir().unwrap();
    let frames = tempfile::tempdir().unwrap();
    let soup = write_frame(frames.path(), "soup.json", &fragments(&SOUP));

    let controller = controller(data.path(), Database::in_memory().unwrap());
    let scan = controller
        .start_scan("Suppers", ScanMetadata::default())
        .await
        .unwrap();
    controller.process_frame(&soup).await.unwrap();
    controller.stop_scan().await.unwrap();

    let images = data.path().join("scans").join(&scan.id);
    fs::create_dir_all(&images).unwrap();

    assert!(controller.delete_scan(&scan.id).await.unwrap());
    assert!(controller.get_scan(&scan.id).await.unwrap().is_none());
    assert!(!images.exists());
    assert!(!controller.delete_scan(&scan.id).await.unwrap());
}

#[tokio::test]
async fn sharing_reports_failures_and_copies_exports() {
    let data = tempfile::tempdir().unwrap();
    let controller = controller(data.path(), Database::in_memory().unwrap());
    let scan = controller
        .start_scan("Suppers", ScanMetadata::default())
        .await
        .unwrap();
    controller.stop_scan().await.unwrap();

    let err = controller
        .export_and_share(&scan.id, None, &UnavailableShareTarget)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("not available"));

    let shared = tempfile::tempdir().unwrap();
    let path = controller
        .export_and_share(
            &scan.id,
            Some(ExportFormat::Json),
            &DirectoryShareTarget::new(shared.path()),
        )
        .await
        .unwrap();
    let name = path.file_name().unwrap();
    assert!(shared.path().join(name).exists());
    assert!(Path::new(name).extension().is_some_and(|ext| ext == "json"));
    assert_eq!(controller.list_exports().unwrap().len(), 2);
}
