/// In-place L2 normalization helper to keep allocations down during hot paths.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Average the token vectors of one sequence, counting only positions whose
/// attention mask is set.
///
/// `hidden` is the `[seq_len, hidden_dim]` slice of the model's last hidden
/// state for that sequence; `mask` has `seq_len` entries.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) fn mean_pool(hidden: &[f32], mask: &[i64], hidden_dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_dim];
    let mut count = 0usize;

    for (token, &m) in hidden.chunks_exact(hidden_dim).zip(mask) {
        if m == 0 {
            continue;
        }
        for (acc, &val) in pooled.iter_mut().zip(token) {
            *acc += val;
        }
        count += 1;
    }

    // sentence-transformers clamps the divisor the same way
    let denom = count.max(1) as f32;
    for val in &mut pooled {
        *val /= denom;
    }
    pooled
}
