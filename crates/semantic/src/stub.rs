use fxhash::hash64;

/// Deterministic embedding used by the `fast` mode.
/// Generates sinusoid values derived from a hash of the input text to guarantee reproducible
/// vectors with minimal CPU cost. Normalization is left to the caller.
pub(crate) fn stub_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut v = vec![0f32; dimension];
    let h = hash64(text.as_bytes());
    for (idx, value) in v.iter_mut().enumerate() {
        // Vary the phase per component so distinct hashes stay distinct after normalization.
        let shifted = (h >> (idx % 32)) as f32 * 0.0001;
        *value = (shifted + idx as f32).sin();
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_has_requested_dimension() {
        assert_eq!(stub_embedding("hello world", 384).len(), 384);
        assert_eq!(stub_embedding("hello world", 8).len(), 8);
    }

    #[test]
    fn stub_deterministic() {
        assert_eq!(
            stub_embedding("same text", 64),
            stub_embedding("same text", 64)
        );
    }

    #[test]
    fn stub_different_text() {
        assert_ne!(
            stub_embedding("hello", 64),
            stub_embedding("world", 64)
        );
    }

    #[test]
    fn stub_values_in_range() {
        for val in stub_embedding("Hello 世界 🌍", 128) {
            assert!((-1.0..=1.0).contains(&val));
        }
    }

    #[test]
    fn stub_empty_text() {
        let v = stub_embedding("", 16);
        assert_eq!(v.len(), 16);
        assert!(!v.iter().all(|&x| x == 0.0));
    }
}
