//! CSV tables written for inspection after a run.
//!
//! `corpus.csv` holds one row per document (`id,name,path,content`) and
//! `encoded_corpus.csv` one row per embedding (`id,path,d0,d1,...`). Both
//! are keyed by the document's [`crate::DocumentId`] and are written once
//! per run; nothing reads them back.

use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    corpus::Corpus,
    error::{Error, Result},
    matrix::EmbeddingMatrix,
};

/// Write the corpus table. Returns the number of data rows.
pub fn write_corpus(path: &Path, corpus: &Corpus) -> Result<usize> {
    write_atomically(path, |out| {
        writeln!(out, "id,name,path,content")?;
        for doc in corpus {
            let path = doc
                .path
                .as_ref()
                .map(|p| p.to_string_lossy())
                .unwrap_or_default();
            writeln!(
                out,
                "{},{},{},{}",
                doc.id().hex(),
                escape(&doc.name),
                escape(&path),
                escape(&doc.content)
            )?;
        }
        Ok(())
    })?;
    Ok(corpus.len())
}

/// Write the embedding table, one row per corpus document.
///
/// Fails with [`Error::Integrity`] when the matrix and corpus are not
/// row-aligned; in that case nothing is written.
pub fn write_embeddings(
    path: &Path,
    corpus: &Corpus,
    matrix: &EmbeddingMatrix,
) -> Result<usize> {
    if matrix.rows() != corpus.len() {
        return Err(Error::Integrity {
            rows: matrix.rows(),
            documents: corpus.len(),
        });
    }

    write_atomically(path, |out| {
        write!(out, "id,path")?;
        for d in 0..matrix.dimension() {
            write!(out, ",d{d}")?;
        }
        writeln!(out)?;

        for (doc, row) in corpus.iter().zip(matrix.iter_rows()) {
            write!(out, "{},{}", doc.id().hex(), escape(&doc.identity()))?;
            for value in row {
                write!(out, ",{value}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    })?;
    Ok(corpus.len())
}

/// Quote a field if it contains a delimiter, quote or line break.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write through a temporary sibling and rename it over `path`, so a failed
/// write never leaves a truncated table behind.
fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = (|| {
        let mut out = BufWriter::new(File::create(&tmp)?);
        write(&mut out)?;
        out.flush()?;
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
