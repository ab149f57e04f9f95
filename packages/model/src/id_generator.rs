use crc32fast::Hasher;

/// Seed derived from a document identifier using CRC32
pub fn get_document_seed(scope: &str) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(scope.as_bytes());
    hasher.finalize()
}

/// Generator for 24-hex-digit object ids (timestamp, seed, counter)
#[derive(Debug, Clone)]
pub struct IDGenerator {
    timestamp: u32, // Seconds since epoch at creation
    seed: u32,      // Document seed (CRC32)
    count: u32,     // Sequential counter
}

impl IDGenerator {
    pub fn new(scope: &str) -> Self {
        let timestamp = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
        Self::from_parts(timestamp, get_document_seed(scope))
    }

    pub fn from_parts(timestamp: u32, seed: u32) -> Self {
        Self {
            timestamp,
            seed,
            count: 0,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count = self.count.wrapping_add(1);
        format!("{:08x}{:08x}{:08x}", self.timestamp, self.seed, self.count)
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}
