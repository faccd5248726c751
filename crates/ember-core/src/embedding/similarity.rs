//! Vector similarity helpers shared by search and clustering.

/// Cosine similarity between two vectors.
///
/// Returns 0.0 if the lengths differ, either vector is empty, or either
/// vector has zero magnitude. The result is clamped to [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Element-wise mean of equally sized vectors. Empty input gives an empty
/// vector; vectors whose length differs from the first are ignored.
pub fn mean_vector<'a, I>(vectors: I) -> Vec<f32>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum: Vec<f64> = Vec::new();
    let mut count = 0usize;

    for v in vectors {
        if count == 0 {
            sum = vec![0.0; v.len()];
        } else if v.len() != sum.len() {
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += *x as f64;
        }
        count += 1;
    }

    if count == 0 {
        return Vec::new();
    }
    sum.into_iter().map(|s| (s / count as f64) as f32).collect()
}

/// Mean cosine similarity over all unordered pairs. Defined as 1.0 for
/// zero or one vector.
pub fn mean_pairwise_similarity(vectors: &[&[f32]]) -> f64 {
    if vectors.len() < 2 {
        return 1.0;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            total += cosine_similarity(vectors[i], vectors[j]);
            pairs += 1;
        }
    }
    total / pairs as f64
}
