use compsync_types::ContentHash;

/// Domain-separated, owner-scoped BLAKE3 hasher.
///
/// Every hash covers the domain tag, the owner's full id (length-prefixed so
/// `("ab", "c")` and `("a", "bc")` cannot collide) and the content bytes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for component storage blobs.
    pub const STORAGE: Self = Self {
        domain: "compsync-storage-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash `data` as owned by the component with full id `owner`.
    pub fn hash(&self, owner: &str, data: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&(owner.len() as u64).to_le_bytes());
        hasher.update(owner.as_bytes());
        hasher.update(data);
        ContentHash::from_digest(*hasher.finalize().as_bytes())
    }

    /// Verify that `data` owned by `owner` produces the expected hash.
    pub fn verify(&self, owner: &str, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(owner, data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
