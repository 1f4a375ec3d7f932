use std::{collections::HashMap, path::Path};

use crate::{
    corpus::Corpus,
    embedding::Embedder,
    error::{Error, Result},
    matrix::EmbeddingMatrix,
    progress::{ProgressEvent, ProgressObserver},
    table,
};

/// Default number of documents per model call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Encode every document of `corpus` into one embedding row.
///
/// Each distinct content string is embedded once, in batches of
/// `batch_size`; documents with identical content share the result. Row
/// `i` of the returned matrix belongs to document `i`. An empty corpus
/// yields an empty matrix with the embedder's dimension.
pub fn encode(
    corpus: &Corpus,
    embedder: &dyn Embedder,
    batch_size: usize,
    progress: &dyn ProgressObserver,
) -> Result<EmbeddingMatrix> {
    let dimension = embedder.dimension();
    if corpus.is_empty() {
        return Ok(EmbeddingMatrix::empty(dimension));
    }

    // Map each document to the slot of its content among the unique texts.
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<&str> = Vec::new();
    let assignment: Vec<usize> = corpus
        .iter()
        .map(|doc| {
            *slots.entry(doc.content.as_str()).or_insert_with(|| {
                unique.push(doc.content.as_str());
                unique.len() - 1
            })
        })
        .collect();

    tracing::info!(
        documents = corpus.len(),
        unique = unique.len(),
        model = embedder.model_id(),
        "encoding corpus"
    );

    let batch_size = batch_size.max(1);
    let mut embedded = EmbeddingMatrix::empty(dimension);
    for batch in unique.chunks(batch_size) {
        let rows = embedder.embed(batch)?;
        if rows.rows() != batch.len() {
            return Err(Error::Integrity {
                rows: rows.rows(),
                documents: batch.len(),
            });
        }
        for row in rows.iter_rows() {
            embedded.push_row(row)?;
        }
        progress.report(ProgressEvent::Encoding {
            done: embedded.rows(),
            total: unique.len(),
        });
    }

    let matrix = EmbeddingMatrix::from_rows(
        dimension,
        assignment.iter().map(|&slot| embedded.row(slot)),
    )?;
    ensure_aligned(corpus, &matrix)?;
    Ok(matrix)
}

/// Encode `corpus` and write the embedding table to `table_path`.
///
/// The table is only written once encoding has fully succeeded.
pub fn encode_and_store(
    corpus: &Corpus,
    embedder: &dyn Embedder,
    batch_size: usize,
    table_path: &Path,
    progress: &dyn ProgressObserver,
) -> Result<EmbeddingMatrix> {
    let matrix = encode(corpus, embedder, batch_size, progress)?;
    let rows = table::write_embeddings(table_path, corpus, &matrix)?;
    progress.report(ProgressEvent::Persisted {
        path: table_path.to_path_buf(),
        rows,
    });
    Ok(matrix)
}

/// Fail with [`Error::Integrity`] unless every document has exactly one row.
pub fn ensure_aligned(corpus: &Corpus, matrix: &EmbeddingMatrix) -> Result<()> {
    if matrix.rows() != corpus.len() {
        return Err(Error::Integrity {
            rows: matrix.rows(),
            documents: corpus.len(),
        });
    }
    Ok(())
}
