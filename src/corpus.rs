use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::{
    doc_id::DocumentId,
    error::Result,
    progress::{ProgressEvent, ProgressObserver},
    walker::{self, DiscoveredFile},
};

/// One text file captured at corpus-build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name without directories (e.g. "notes.txt").
    pub name: String,
    /// Absolute path on disk, when the document came from a file.
    pub path: Option<PathBuf>,
    pub content: String,
}

impl Document {
    pub fn new(
        name: impl Into<String>,
        path: Option<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            content: content.into(),
        }
    }

    /// The path if known, otherwise the name.
    pub fn identity(&self) -> String {
        match &self.path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => self.name.clone(),
        }
    }

    pub fn id(&self) -> DocumentId {
        DocumentId::new(&self.identity())
    }
}

/// The ordered documents of one session.
///
/// Index `i` of the corpus is row `i` of the embedding matrix built from it,
/// so the order never changes once collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

/// Build the corpus for every text file below `root`.
///
/// Fails with [`crate::Error::DirectoryNotFound`] when `root` is not an
/// existing directory. Files are read in parallel but keep the walk order.
/// A file that cannot be read is skipped with a warning; bytes that are not
/// valid UTF-8 are replaced.
pub fn collect(root: &Path, progress: &dyn ProgressObserver) -> Result<Corpus> {
    let files = walker::discover_files(root)?;
    progress.report(ProgressEvent::FilesDiscovered { count: files.len() });

    let loaded: Vec<Option<Document>> = files.par_iter().map(load).collect();
    let skipped = loaded.iter().filter(|d| d.is_none()).count();
    let documents: Vec<Document> = loaded.into_iter().flatten().collect();

    progress.report(ProgressEvent::FilesRead {
        read: documents.len(),
        skipped,
    });

    if documents.is_empty() {
        tracing::warn!(root = %root.display(), "no text files found");
    }

    Ok(Corpus::new(documents))
}

fn load(file: &DiscoveredFile) -> Option<Document> {
    let bytes = match std::fs::read(&file.absolute_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %file.absolute_path.display(),
                "skipping unreadable file: {e}"
            );
            return None;
        }
    };

    let name = file
        .relative_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Some(Document {
        name,
        path: Some(file.absolute_path.clone()),
        content: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
