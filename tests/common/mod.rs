//! Shared fixtures for the integration tests.
//!
//! PDFs are generated with lopdf; every page carries a `/Label` string so the
//! page order of a merged result can be read back and asserted.

#![allow(dead_code)]

use blendpdf::{LopdfEngine, Session, WatchedDirectorySet};
use camino::{Utf8Path, Utf8PathBuf};
use lopdf::{Document, Object, dictionary};
use tempfile::TempDir;

/// A prepared watch folder. The TempDir must outlive the session.
pub struct Workspace {
    pub temp: TempDir,
    pub main: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let main = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        Self { temp, main }
    }

    pub fn dirs(&self, outputs: &[&str]) -> WatchedDirectorySet {
        let outputs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        let dirs = WatchedDirectorySet::new(self.main.clone(), &outputs);
        dirs.prepare().unwrap();
        dirs
    }

    pub fn session(&self, outputs: &[&str], archive_mode: bool) -> Session<LopdfEngine> {
        Session::new(self.dirs(outputs), archive_mode, LopdfEngine::new())
    }

    /// Write a PDF named `name` into the watch folder, one page per label.
    pub fn pdf(&self, name: &str, labels: &[&str]) -> Utf8PathBuf {
        let path = self.main.join(name);
        write_labeled_pdf(&path, labels);
        path
    }
}

pub fn write_labeled_pdf(path: &Utf8Path, labels: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = labels
        .iter()
        .map(|label| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Label" => Object::string_literal(*label),
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => labels.len() as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Page labels of a PDF, in page order.
pub fn labels(path: &Utf8Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let page = doc.get_dictionary(id).unwrap();
            String::from_utf8_lossy(page.get(b"Label").unwrap().as_str().unwrap()).into_owned()
        })
        .collect()
}

/// File names in `dir`, sorted.
pub fn names(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}
