//! PDF engine seam and its `lopdf` implementation.
//!
//! The pipelines only ever talk to [`PdfEngine`]. Page order is the only thing
//! the engine changes: pages are copied object for object into a fresh page
//! tree and content streams are left untouched.

use camino::{Utf8Path, Utf8PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Errors reported by the PDF engine.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to load PDF {path}: {reason}")]
    Load { path: Utf8PathBuf, reason: String },

    #[error("PDF has no pages: {0}")]
    NoPages(Utf8PathBuf),

    #[error("Malformed page tree in {path}: {reason}")]
    Malformed { path: Utf8PathBuf, reason: String },

    #[error("Page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },

    #[error("Invalid page selection '{0}'")]
    Selection(String),

    #[error("Failed to write PDF {path}: {reason}")]
    Save { path: Utf8PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered, 1-based page selection such as `"3,2,1"`, `"1-2"` or `"4-2"`.
///
/// Selection order is output order; a descending range yields its pages in
/// descending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<(u32, u32)>,
}

impl PageSelection {
    /// Pages in selection order.
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| {
            let descending = start > end;
            (0..=start.abs_diff(end)).map(move |offset| {
                if descending { start - offset } else { start + offset }
            })
        })
    }

    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|&(start, end)| start.abs_diff(end) as usize + 1)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// One selection token: a page number or an inclusive range.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:-(\d+))?$").expect("Invalid page token regex"));

impl FromStr for PageSelection {
    type Err = PdfError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = || PdfError::Selection(spec.to_string());

        let mut ranges = Vec::new();
        for token in spec.split(',') {
            let token = token.trim();
            let caps = TOKEN_PATTERN.captures(token).ok_or_else(invalid)?;

            let start: u32 = caps[1].parse().map_err(|_| invalid())?;
            let end: u32 = match caps.get(2) {
                Some(end) => end.as_str().parse().map_err(|_| invalid())?,
                None => start,
            };

            if start == 0 || end == 0 {
                return Err(invalid());
            }
            ranges.push((start, end));
        }

        Ok(Self { ranges })
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .ranges
            .iter()
            .map(|&(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{}-{}", start, end)
                }
            })
            .collect();
        write!(f, "{}", tokens.join(","))
    }
}

/// The operations the pipelines need from a PDF library.
#[cfg_attr(test, mockall::automock)]
pub trait PdfEngine {
    /// Structural check: the document loads and has at least one page.
    fn validate(&self, path: &Utf8Path) -> Result<(), PdfError>;

    fn page_count(&self, path: &Utf8Path) -> Result<usize, PdfError>;

    /// Write the selected pages of `src` to `dest`, in selection order.
    fn extract_pages(
        &self,
        src: &Utf8Path,
        dest: &Utf8Path,
        selection: &PageSelection,
    ) -> Result<(), PdfError>;

    /// Write every page of every source, in order, to `dest`.
    fn concatenate(&self, sources: &[Utf8PathBuf], dest: &Utf8Path) -> Result<(), PdfError>;

    /// Write `A1,B1,A2,B2,...` to `dest`; leftovers of the longer input follow.
    fn zip_interleave(&self, a: &Utf8Path, b: &Utf8Path, dest: &Utf8Path)
    -> Result<(), PdfError>;
}

/// [`PdfEngine`] backed by `lopdf`.
#[derive(Debug, Clone, Default)]
pub struct LopdfEngine;

/// A loaded source document and its page objects, in page order.
struct Source {
    path: Utf8PathBuf,
    doc: Document,
    pages: Vec<ObjectId>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Utf8Path) -> Result<Document, PdfError> {
        Document::load(path).map_err(|e| PdfError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load every source, renumbering objects so ids never collide.
    fn load_sources(paths: &[&Utf8Path]) -> Result<Vec<Source>, PdfError> {
        let mut next_id = 1;
        let mut sources = Vec::with_capacity(paths.len());

        for path in paths {
            let mut doc = Self::load(path)?;
            doc.renumber_objects_with(next_id);
            next_id = doc.max_id + 1;

            let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
            if pages.is_empty() {
                return Err(PdfError::NoPages(path.to_path_buf()));
            }

            sources.push(Source {
                path: path.to_path_buf(),
                doc,
                pages,
            });
        }

        Ok(sources)
    }

    /// Page dictionary with inherited attributes made explicit.
    fn flattened_page(source: &Source, page_id: ObjectId) -> Result<Dictionary, PdfError> {
        let malformed = |reason: String| PdfError::Malformed {
            path: source.path.clone(),
            reason,
        };

        let mut page = source
            .doc
            .get_dictionary(page_id)
            .map_err(|e| malformed(e.to_string()))?
            .clone();

        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = Self::inherited(&source.doc, &page, key) {
                page.set(key.to_vec(), value);
            }
        }

        Ok(page)
    }

    fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
        let mut parent_ref = page.get(b"Parent").and_then(Object::as_reference).ok();
        // Bounded walk guards against cyclic Parent chains
        for _ in 0..64 {
            let parent = doc.get_dictionary(parent_ref?).ok()?;
            if let Ok(value) = parent.get(key) {
                return Some(value.clone());
            }
            parent_ref = parent.get(b"Parent").and_then(Object::as_reference).ok();
        }
        None
    }

    /// Build a document from `(source index, page index)` picks and save it.
    fn assemble(
        sources: Vec<Source>,
        picks: &[(usize, usize)],
        dest: &Utf8Path,
    ) -> Result<(), PdfError> {
        let mut pages = Vec::with_capacity(picks.len());
        for &(src, page) in picks {
            let source = &sources[src];
            pages.push(Self::flattened_page(source, source.pages[page])?);
        }

        let mut out = Document::with_version("1.5");
        for source in sources {
            out.objects.extend(source.doc.objects);
        }
        out.max_id = out.objects.keys().map(|&(id, _)| id).max().unwrap_or(0);

        let pages_id = out.new_object_id();
        let mut kids = Vec::with_capacity(pages.len());
        for mut page in pages {
            page.set("Parent", pages_id);
            kids.push(Object::Reference(out.add_object(page)));
        }

        let count = kids.len() as i64;
        out.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = out.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        out.trailer.set("Root", catalog_id);

        out.prune_objects();
        out.compress();
        out.save(dest).map_err(|e| PdfError::Save {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Wrote {} page(s) to {}", count, dest);
        Ok(())
    }
}

impl PdfEngine for LopdfEngine {
    fn validate(&self, path: &Utf8Path) -> Result<(), PdfError> {
        let doc = Self::load(path)?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages(path.to_path_buf()));
        }

        for (number, id) in pages {
            let page = doc.get_dictionary(id).map_err(|e| PdfError::Malformed {
                path: path.to_path_buf(),
                reason: format!("page {}: {}", number, e),
            })?;
            let is_page = page
                .get(b"Type")
                .and_then(Object::as_name)
                .is_ok_and(|name| name == b"Page");
            if !is_page {
                return Err(PdfError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("page {} is not a /Page object", number),
                });
            }
        }

        Ok(())
    }

    fn page_count(&self, path: &Utf8Path) -> Result<usize, PdfError> {
        Ok(Self::load(path)?.get_pages().len())
    }

    fn extract_pages(
        &self,
        src: &Utf8Path,
        dest: &Utf8Path,
        selection: &PageSelection,
    ) -> Result<(), PdfError> {
        let sources = Self::load_sources(&[src])?;
        let count = sources[0].pages.len();

        let mut picks = Vec::with_capacity(selection.len().min(count));
        for page in selection.pages() {
            if page as usize > count {
                return Err(PdfError::PageOutOfRange { page, count });
            }
            picks.push((0, page as usize - 1));
        }
        if picks.is_empty() {
            return Err(PdfError::Selection(selection.to_string()));
        }

        Self::assemble(sources, &picks, dest)
    }

    fn concatenate(&self, sources: &[Utf8PathBuf], dest: &Utf8Path) -> Result<(), PdfError> {
        let paths: Vec<&Utf8Path> = sources.iter().map(Utf8PathBuf::as_path).collect();
        let sources = Self::load_sources(&paths)?;

        let picks: Vec<(usize, usize)> = sources
            .iter()
            .enumerate()
            .flat_map(|(src, source)| (0..source.pages.len()).map(move |page| (src, page)))
            .collect();

        Self::assemble(sources, &picks, dest)
    }

    fn zip_interleave(
        &self,
        a: &Utf8Path,
        b: &Utf8Path,
        dest: &Utf8Path,
    ) -> Result<(), PdfError> {
        let sources = Self::load_sources(&[a, b])?;
        let (len_a, len_b) = (sources[0].pages.len(), sources[1].pages.len());

        let mut picks = Vec::with_capacity(len_a + len_b);
        for page in 0..len_a.max(len_b) {
            if page < len_a {
                picks.push((0, page));
            }
            if page < len_b {
                picks.push((1, page));
            }
        }

        Self::assemble(sources, &picks, dest)
    }
}
