use crate::error::{Error, Result};

/// A dense row-major matrix of embeddings: one row per document.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    dimension: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// A matrix with zero rows but a known column count.
    pub fn empty(dimension: usize) -> Self {
        Self {
            rows: 0,
            dimension,
            data: Vec::new(),
        }
    }

    /// Build a matrix from row-major data.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            if !data.is_empty() {
                return Err(Error::DimensionMismatch {
                    expected: 0,
                    actual: data.len(),
                });
            }
            return Ok(Self::empty(0));
        }
        if data.len() % dimension != 0 {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: data.len() % dimension,
            });
        }
        Ok(Self {
            rows: data.len() / dimension,
            dimension,
            data,
        })
    }

    /// Build a matrix from individual rows, all of which must be `dimension` long.
    pub fn from_rows<R: AsRef<[f32]>>(
        dimension: usize,
        rows: impl IntoIterator<Item = R>,
    ) -> Result<Self> {
        let mut matrix = Self::empty(dimension);
        for row in rows {
            matrix.push_row(row.as_ref())?;
        }
        Ok(matrix)
    }

    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row `i`. Panics if `i >= rows()`.
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dimension;
        &self.data[start..start + self.dimension]
    }

    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keeps_dimension() {
        let m = EmbeddingMatrix::empty(768);
        assert_eq!(m.rows(), 0);
        assert_eq!(m.dimension(), 768);
        assert!(m.is_empty());
        assert_eq!(m.iter_rows().len(), 0);
    }

    #[test]
    fn rows_are_addressable() {
        let m = EmbeddingMatrix::from_rows(2, [[1.0f32, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(0), &[1.0, 2.0]);
        assert_eq!(m.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn from_flat_splits_rows() {
        let m = EmbeddingMatrix::from_flat(3, (0..6).map(|i| i as f32).collect())
            .unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn from_flat_rejects_ragged_data() {
        assert!(matches!(
            EmbeddingMatrix::from_flat(3, vec![0.0; 4]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn push_row_rejects_wrong_length() {
        let mut m = EmbeddingMatrix::empty(3);
        let err = m.push_row(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(m.rows(), 0);
    }
}
