//! Feature comparison functions used by the classifiers.

/// Alternative chi-square distance, `Σ 2(a-b)² / (a+b)`.
///
/// Bins where both inputs are zero contribute nothing.
pub fn chi_square(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let sum = x + y;
            if sum > f64::EPSILON {
                2.0 * (x - y) * (x - y) / sum
            } else {
                0.0
            }
        })
        .sum()
}

/// Pearson correlation coefficient.
///
/// Returns 1.0 when both inputs have zero variance (identical distributions),
/// and 0.0 when only one has zero variance (undefined, treated as uncorrelated).
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let n = len as f64;

    let mean_a = a[..len].iter().sum::<f64>() / n;
    let mean_b = b[..len].iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for i in 0..len {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        return if var_a < f64::EPSILON && var_b < f64::EPSILON {
            1.0
        } else {
            0.0
        };
    }

    cov / denom
}

pub fn l2_normalize(v: &mut [f64]) {
    let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product of L2-normalized vectors equals cosine similarity.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
