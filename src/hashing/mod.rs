use blake3::Hasher;
use sha2::{Digest, Sha256};

#[inline]
pub fn hash_prompt(prompt: &str) -> [u8; 32] {
    *blake3::hash(prompt.as_bytes()).as_bytes()
}

/// Derives a stable `chunk_id` from the owning document, its source hash, and the chunk text.
/// Re-ingesting a document whose `source_hash` is unchanged reproduces the same chunk ids, so
/// unchanged chunks are a no-op write.
#[inline]
pub fn chunk_id(document_id: &str, source_hash: &str, text: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(document_id.as_bytes());
    hasher.update(b"|");
    hasher.update(source_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// SHA-256 of a document's source bytes, hex-encoded, for the `Chunk::source_hash` field.
#[inline]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// # Truncation Rationale
///
/// This function takes the first 8 bytes (64 bits) of a BLAKE3 hash. This truncation
/// is acceptable for the following use cases:
///
/// - **Cache keys**: Fast lookups in hash maps and tiered caches
/// - **Identifiers**: Tenant IDs, context hashes, and content fingerprints
/// - **Deduplication**: Detecting likely-duplicate entries before expensive operations
///
/// # Collision Probability
///
/// With 64 bits of entropy, the birthday paradox gives us the following collision probabilities:
///
/// | Number of Items | Collision Probability |
/// |-----------------|----------------------|
/// | 1 million       | ~0.00003% (negligible) |
/// | 10 million      | ~0.003% (very low) |
/// | 100 million     | ~0.3% (low) |
/// | 1 billion       | ~3% (noticeable) |
/// | ~4.3 billion    | ~50% (birthday bound) |
///
/// For practical cache sizes (millions of entries), the collision probability is negligible.
/// The formula is approximately: `P(collision) ≈ n² / (2 × 2^64)` for `n` items.
///
/// # Collision Tolerance
///
/// The higher-level logic (tiered cache, content-addressed storage) is designed to tolerate
/// rare collisions gracefully:
///
/// - **Cache lookups**: A collision results in a cache miss, not data corruption. The full
///   content is verified downstream, so a false positive simply triggers a cache refresh.
/// - **No security dependency**: This hash is not used for cryptographic verification or
///   authentication—only for fast indexing and probabilistic deduplication.
///
/// # When to Use Full 256-bit Hashes
///
/// If stricter uniqueness guarantees are ever required (e.g., content-addressed storage
/// where collisions would cause data loss), use [`hash_prompt`], which returns the full
/// 32-byte BLAKE3 output. The full hash provides ~128 bits of collision resistance, making
/// collisions computationally infeasible.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_prompt_determinism() {
        let prompt = "What is the capital of France?";

        let hash1 = hash_prompt(prompt);
        let hash2 = hash_prompt(prompt);
        let hash3 = hash_prompt(prompt);

        assert_eq!(hash1, hash2);
        assert_eq!(hash2, hash3);
    }

    #[test]
    fn test_hash_prompt_uniqueness() {
        let prompts = [
            "What is the capital of France?",
            "What is the capital of Germany?",
            "what is the capital of france?",
            "What is the capital of France? ",
        ];

        let hashes: Vec<_> = prompts.iter().map(|p| hash_prompt(p)).collect();
        let unique_hashes: HashSet<_> = hashes.iter().collect();

        assert_eq!(unique_hashes.len(), prompts.len());
    }

    #[test]
    fn test_hash_prompt_output_size() {
        let hash = hash_prompt("test");
        assert_eq!(hash.len(), 32);
    }

    #[test]
    fn test_hash_prompt_empty_string() {
        let hash = hash_prompt("");
        assert!(!hash.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_hash_prompt_unicode() {
        let prompt = "Quelle est la capitale de la France? ";
        let hash = hash_prompt(prompt);
        assert_eq!(hash.len(), 32);

        let hash2 = hash_prompt("What is the capital of France?");
        assert_ne!(hash, hash2);
    }

    #[test]
    fn test_hash_to_u64_determinism() {
        let data = b"test-tenant-id-12345";

        let hash1 = hash_to_u64(data);
        let hash2 = hash_to_u64(data);
        let hash3 = hash_to_u64(data);

        assert_eq!(hash1, hash2);
        assert_eq!(hash2, hash3);
    }

    #[test]
    fn test_hash_to_u64_uniqueness() {
        let inputs = [
            b"tenant-001".as_slice(),
            b"tenant-002".as_slice(),
            b"TENANT-001".as_slice(),
            b"tenant-001 ".as_slice(),
        ];

        let hashes: Vec<_> = inputs.iter().map(|i| hash_to_u64(i)).collect();
        let unique_hashes: HashSet<_> = hashes.iter().collect();

        assert_eq!(unique_hashes.len(), inputs.len());
    }

    #[test]
    fn test_hash_to_u64_empty_input() {
        let hash = hash_to_u64(b"");
        let hash2 = hash_to_u64(b"");
        assert_eq!(hash, hash2);
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let a = chunk_id("doc-1", "abc123", "some text");
        let b = chunk_id("doc-1", "abc123", "some text");
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_id_changes_with_text() {
        let a = chunk_id("doc-1", "abc123", "some text");
        let b = chunk_id("doc-1", "abc123", "other text");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_performance_sanity() {
        let prompt = "A moderately long prompt that represents typical user input for testing.";

        let prompt = std::hint::black_box(prompt);
        for _ in 0..10_000 {
            let _ = std::hint::black_box(hash_prompt(std::hint::black_box(prompt)));
        }
    }
}
