//! Integration tests for the interactive menu over a real session
//!
//! Scripted input drives the MenuController the way a user at the terminal
//! would; the workspace on disk is checked afterwards.

mod common;

use blendpdf::ui::{ExitReason, FileOps, MenuController, MenuOptions};
use common::{Workspace, labels, names};
use tokio::io::BufReader;

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_merge_then_undo_session() {
    let ws = Workspace::new();
    ws.pdf("a.pdf", &["A1", "A2"]);
    ws.pdf("b.pdf", &["B1", "B2"]);
    let mut controller = MenuController::new(ws.session(&["output"], true), MenuOptions::default());

    let input = tokio_test::io::Builder::new()
        .read(b"m\n")
        .read(b"u\n")
        .read(b"u\n")
        .read(b"q\n")
        .build();
    let mut out = Vec::new();

    let reason = controller.run(BufReader::new(input), &mut out).await.unwrap();
    controller.print_summary(&mut out).unwrap();

    assert_eq!(reason, ExitReason::Quit);
    let out = text(out);
    assert!(out.contains("Files: Main(2) Archive(0) Output(0) Error(0)"));
    assert!(out.contains("Files: Main(0) Archive(2) Output(1) Error(0)"));
    assert!(out.contains("Warning: No operation to undo"));
    assert!(out.contains("Successful operations: 1"));
    assert!(out.contains("Errors: 0"));

    // Back where we started
    assert_eq!(labels(&ws.main.join("a.pdf")), vec!["A1", "A2"]);
    assert!(names(&ws.main.join("output")).is_empty());
}

#[tokio::test]
async fn test_single_files_one_by_one() {
    let ws = Workspace::new();
    ws.pdf("1.pdf", &["P"]);
    ws.pdf("2.pdf", &["Q"]);
    let mut controller = MenuController::new(
        ws.session(&["output"], false),
        MenuOptions {
            verbose: true,
            ..MenuOptions::default()
        },
    );

    let input = tokio_test::io::Builder::new()
        .read(b"S\n")
        .read(b"s\n")
        .read(b"s\n")
        .build();
    let mut out = Vec::new();

    let reason = controller.run(BufReader::new(input), &mut out).await.unwrap();

    assert_eq!(reason, ExitReason::EndOfInput);
    let out = text(out);
    assert!(out.contains("  1. 1.pdf ("));
    assert!(out.contains("Moved 1.pdf to 1 output folder(s)"));
    assert!(out.contains("Moved 2.pdf to 1 output folder(s)"));
    assert!(out.contains("Warning: No PDF files found"));

    assert_eq!(names(&ws.main.join("output")), vec!["1.pdf", "2.pdf"]);
    // Archive mode off: nothing kept
    assert!(names(&ws.main.join("archive")).is_empty());
    assert_eq!(controller.ops().stats().success_count, 2);
}

#[tokio::test]
async fn test_invalid_file_reports_error_folder() {
    let ws = Workspace::new();
    std::fs::write(ws.main.join("junk.pdf"), b"garbage").unwrap();
    let mut controller = MenuController::new(ws.session(&["output"], true), MenuOptions::default());

    let input = tokio_test::io::Builder::new().read(b"s\n").read(b"q\n").build();
    let mut out = Vec::new();

    controller.run(BufReader::new(input), &mut out).await.unwrap();

    let out = text(out);
    assert!(out.contains("Error: "));
    assert!(out.contains("Check the error folder"));
    assert!(out.contains("Files: Main(0) Archive(0) Output(0) Error(1)"));
    assert_eq!(controller.ops().stats().error_count, 1);
}
