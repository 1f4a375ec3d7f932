use crate::{
    error::{Error, Result},
    matrix::EmbeddingMatrix,
};

/// Maps text to fixed-length vectors.
///
/// Implementations must be deterministic: the same model and input always
/// produce the same vector, and embedding a batch gives the same rows as
/// embedding each text on its own.
pub trait Embedder {
    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed `texts`, producing one row per input in input order.
    fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let matrix = self.embed(&[text])?;
        if matrix.rows() != 1 {
            return Err(Error::Embedding(format!(
                "expected 1 embedding, got {}",
                matrix.rows()
            )));
        }
        Ok(matrix.row(0).to_vec())
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix> {
        (**self).embed(texts)
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_one(text)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix> {
        (**self).embed(texts)
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_one(text)
    }
}

/// L2-normalize `v` in place. Zero vectors are left untouched.
pub fn normalize_l2(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{testing::KeywordEmbedder, *};

    #[test]
    fn embed_one_matches_first_batch_row() {
        let embedder = KeywordEmbedder::new(&["cat", "dog"]);
        let batch = embedder.embed(&["cat dog dog", "cat"]).unwrap();
        assert_eq!(embedder.embed_one("cat dog dog").unwrap(), batch.row(0));
    }

    #[test]
    fn embed_preserves_row_count_and_dimension() {
        let embedder = KeywordEmbedder::new(&["a", "b", "c"]);
        let m = embedder.embed(&["a", "b", "c", "abc"]).unwrap();
        assert_eq!(m.rows(), 4);
        assert_eq!(m.dimension(), 3);
    }

    #[test]
    fn references_delegate() {
        let embedder = KeywordEmbedder::new(&["x"]);
        let by_ref: &dyn Embedder = &embedder;
        assert_eq!(by_ref.dimension(), 1);
        assert_eq!((&embedder).embed_one("x x").unwrap(), vec![2.0]);
    }

    #[test]
    fn normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize_l2(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let mut v = vec![0.0; 4];
        normalize_l2(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }
}
