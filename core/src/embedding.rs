use sha2::{Digest, Sha256};

/// Hash-seeded embedding used when no hosted model is reachable.
/// Identical text always maps to the identical vector.
///
/// Each component is `byte / 127.5 - 1` for a digest byte in `0..=255`, which
/// can never equal zero, so the norm is strictly positive and the vector is
/// always a valid cosine similarity input.
pub fn deterministic_embedding(text: &str, model_id: &str, dims: usize) -> Vec<f64> {
    let dims = dims.max(1);

    let mut hasher = Sha256::new();
    hasher.update(model_id.as_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut out = Vec::with_capacity(dims);
    for i in 0..dims {
        let byte = digest[i % digest.len()];
        let value = (byte as f64 / 127.5) - 1.0;
        out.push(value);
    }

    out
}
