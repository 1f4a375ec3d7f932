use rayon::prelude::*;

use crate::{
    error::{Error, Result},
    matrix::EmbeddingMatrix,
};

/// Distance assigned when cosine distance is undefined: a zero-norm or
/// non-finite document row or query. It sorts after every real distance.
pub const DEGENERATE_DISTANCE: f32 = f32::INFINITY;

/// A corpus index with its cosine distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedDocument {
    pub index: usize,
    pub distance: f32,
}

impl RankedDocument {
    /// `1 - distance`, or `None` for degenerate rows.
    pub fn similarity(&self) -> Option<f32> {
        self.distance.is_finite().then(|| 1.0 - self.distance)
    }
}

/// Cosine distance `1 - (a·b) / (|a| |b|)`, in `[0, 2]`.
///
/// Returns [`DEGENERATE_DISTANCE`] when either vector has zero norm or the
/// result is not a finite number.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return DEGENERATE_DISTANCE;
    }

    let distance = 1.0 - dot / denom;
    if distance.is_finite() {
        // Rounding can push identical vectors a hair below zero.
        distance.clamp(0.0, 2.0)
    } else {
        DEGENERATE_DISTANCE
    }
}

/// Score every row of `matrix` against `query`, most similar first.
///
/// Rows with equal distance keep their corpus order, so identical inputs
/// always produce identical output. Nothing is truncated.
pub fn score(
    matrix: &EmbeddingMatrix,
    query: &[f32],
) -> Result<Vec<RankedDocument>> {
    if query.len() != matrix.dimension() {
        return Err(Error::DimensionMismatch {
            expected: matrix.dimension(),
            actual: query.len(),
        });
    }

    let mut ranked: Vec<RankedDocument> = (0..matrix.rows())
        .into_par_iter()
        .map(|index| RankedDocument {
            index,
            distance: cosine_distance(matrix.row(index), query),
        })
        .collect();

    // Stable: ties stay in ascending index order.
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(ranked)
}

/// The permutation of `0..matrix.rows()` ordered by ascending cosine
/// distance to `query`.
pub fn rank(matrix: &EmbeddingMatrix, query: &[f32]) -> Result<Vec<usize>> {
    Ok(score(matrix, query)?.into_iter().map(|r| r.index).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f32]]) -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(rows[0].len(), rows.iter().copied()).unwrap()
    }

    fn is_permutation(ranking: &[usize], n: usize) -> bool {
        let mut sorted = ranking.to_vec();
        sorted.sort_unstable();
        sorted == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn distance_of_identical_vectors_is_zero() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((0.0..1e-6).contains(&d));
    }

    #[test]
    fn distance_of_orthogonal_and_opposite_vectors() {
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vectors_are_degenerate() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), DEGENERATE_DISTANCE);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 0.0]), DEGENERATE_DISTANCE);
    }

    #[test]
    fn non_finite_input_is_degenerate() {
        assert_eq!(
            cosine_distance(&[f32::NAN, 1.0], &[1.0, 0.0]),
            DEGENERATE_DISTANCE
        );
        assert_eq!(
            cosine_distance(&[f32::INFINITY, 1.0], &[1.0, 0.0]),
            DEGENERATE_DISTANCE
        );
    }

    #[test]
    fn ranking_is_a_permutation() {
        let m = matrix(&[
            &[0.1, 0.9, 0.0],
            &[0.8, 0.1, 0.1],
            &[0.0, 0.0, 1.0],
            &[0.5, 0.5, 0.5],
            &[0.3, 0.0, 0.7],
        ]);
        let ranking = rank(&m, &[0.2, 0.4, 0.6]).unwrap();
        assert_eq!(ranking.len(), 5);
        assert!(is_permutation(&ranking, 5));
    }

    #[test]
    fn near_duplicate_of_query_ranks_first() {
        let query = [0.3, -0.2, 0.9, 0.1];
        let m = matrix(&[
            &[1.0, 0.0, 0.0, 0.0],
            &[0.0, 1.0, 0.0, 0.0],
            &[0.31, -0.19, 0.88, 0.1],
            &[-0.3, 0.2, -0.9, -0.1],
        ]);
        let ranking = rank(&m, &query).unwrap();
        assert_eq!(ranking[0], 2);
        assert_eq!(*ranking.last().unwrap(), 3);
    }

    #[test]
    fn scaling_a_row_does_not_change_its_position() {
        let query = [1.0, 0.5, 0.0];
        let rows: Vec<Vec<f32>> = vec![
            vec![0.0, 1.0, 0.0],
            vec![1.0, 0.4, 0.1],
            vec![0.2, 0.2, 1.0],
        ];
        let base = rank(&EmbeddingMatrix::from_rows(3, &rows).unwrap(), &query)
            .unwrap();

        for factor in [0.001f32, 3.0, 1000.0] {
            let mut scaled = rows.clone();
            for x in &mut scaled[0] {
                *x *= factor;
            }
            let m = EmbeddingMatrix::from_rows(3, &scaled).unwrap();
            assert_eq!(rank(&m, &query).unwrap(), base, "factor {factor}");
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let m = matrix(&[
            &[0.6, 0.8],
            &[0.8, 0.6],
            &[0.6, 0.8],
            &[1.0, 0.0],
        ]);
        let first = score(&m, &[0.7, 0.7]).unwrap();
        let second = score(&m, &[0.7, 0.7]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ties_keep_corpus_order() {
        let m = matrix(&[
            &[0.0, 1.0],
            &[1.0, 0.0],
            &[0.0, 2.0],
            &[2.0, 0.0],
            &[3.0, 0.0],
        ]);
        assert_eq!(rank(&m, &[1.0, 0.0]).unwrap(), vec![1, 3, 4, 0, 2]);
    }

    #[test]
    fn zero_row_ranks_below_every_real_row() {
        let m = matrix(&[
            &[0.0, 0.0],
            &[-1.0, 0.0],
            &[1.0, 0.0],
        ]);
        let ranked = score(&m, &[1.0, 0.0]).unwrap();
        let order: Vec<_> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert!(ranked.iter().all(|r| !r.distance.is_nan()));
        assert_eq!(ranked[2].similarity(), None);
        assert!((ranked[0].similarity().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_query_keeps_corpus_order() {
        let m = matrix(&[&[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0]]);
        assert_eq!(rank(&m, &[0.0, 0.0]).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn empty_matrix_gives_empty_ranking() {
        let m = EmbeddingMatrix::empty(4);
        assert!(rank(&m, &[1.0, 0.0, 0.0, 0.0]).unwrap().is_empty());
    }

    #[test]
    fn wrong_query_length_is_rejected() {
        let m = matrix(&[&[1.0, 0.0]]);
        assert!(matches!(
            rank(&m, &[1.0, 0.0, 0.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }
}
