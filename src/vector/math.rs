//! Vector arithmetic shared by the index and the recommendation layer.
//!
//! Every stored and every query vector is kept at unit length so that the
//! inner product of two vectors is their cosine similarity.

/// Norms within this distance of 1.0 are treated as already normalized.
const UNIT_NORM_TOLERANCE: f32 = 1e-6;

/// Euclidean length of a vector.
#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scales a vector to unit length in place.
///
/// Returns `false` when the vector has zero norm. Such vectors are left
/// untouched and act as degenerate queries that score 0.0 against everything.
pub fn normalize_in_place(vector: &mut [f32]) -> bool {
    let norm = l2_norm(vector);
    if norm == 0.0 {
        return false;
    }
    if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
    true
}

/// Returns a unit-length copy of a vector.
#[must_use]
pub fn normalized(vector: &[f32]) -> Vec<f32> {
    let mut copy = vector.to_vec();
    normalize_in_place(&mut copy);
    copy
}

/// Inner product of two vectors of equal length.
///
/// For unit vectors this is the cosine similarity, in the range [-1, 1].
#[must_use]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Arithmetic mean of a set of equally sized vectors, re-normalized to unit length.
///
/// Returns `None` for an empty set or when the lengths disagree.
#[must_use]
pub fn normalized_mean(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dimension = vectors.first()?.len();
    if vectors.iter().any(|v| v.len() != dimension) {
        return None;
    }

    let mut mean = vec![0.0f32; dimension];
    for vector in vectors {
        for (acc, &value) in mean.iter_mut().zip(vector.iter()) {
            *acc += value;
        }
    }
    let count = vectors.len() as f32;
    for value in mean.iter_mut() {
        *value /= count;
    }

    normalize_in_place(&mut mean);
    Some(mean)
}
