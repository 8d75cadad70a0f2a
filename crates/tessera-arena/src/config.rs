//! Arena configuration parameters.

use crate::error::ArenaError;

/// Configuration for an [`Arena`](crate::Arena).
///
/// Controls block sizing and an optional hard byte budget. Validated at
/// construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size in bytes of the first block.
    ///
    /// Default: 256. Must be non-zero and no larger than `max_block_size`.
    pub initial_block_size: usize,

    /// Upper bound for geometric block growth, in bytes.
    ///
    /// Each new block doubles the previous size until this cap is reached.
    /// Requests larger than the cap get a dedicated block of exactly the
    /// requested size. Default: 32 KiB.
    pub max_block_size: usize,

    /// Optional hard limit on the total bytes of block storage.
    ///
    /// A bounded arena returns `OutOfMemory` once the limit would be
    /// exceeded, and refuses to fuse with any other arena.
    pub byte_limit: Option<usize>,
}

impl ArenaConfig {
    /// Default first-block size in bytes.
    pub const DEFAULT_INITIAL_BLOCK_SIZE: usize = 256;

    /// Default cap for geometric block growth in bytes.
    pub const DEFAULT_MAX_BLOCK_SIZE: usize = 32 * 1024;

    /// Create an unbounded config with default block sizes.
    pub fn new() -> Self {
        Self {
            initial_block_size: Self::DEFAULT_INITIAL_BLOCK_SIZE,
            max_block_size: Self::DEFAULT_MAX_BLOCK_SIZE,
            byte_limit: None,
        }
    }

    /// Create a bounded config that never allocates more than `limit` bytes.
    pub fn bounded(limit: usize) -> Self {
        Self {
            initial_block_size: Self::DEFAULT_INITIAL_BLOCK_SIZE.min(limit.max(1)),
            byte_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Check the config for internal consistency.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.initial_block_size == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "initial_block_size must be non-zero".into(),
            });
        }
        if self.initial_block_size > self.max_block_size {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "initial_block_size ({}) exceeds max_block_size ({})",
                    self.initial_block_size, self.max_block_size
                ),
            });
        }
        if self.max_block_size > u32::MAX as usize {
            return Err(ArenaError::InvalidConfig {
                reason: "max_block_size must fit in 32 bits".into(),
            });
        }
        Ok(())
    }

    /// Whether arenas built from this config may be fused.
    pub fn is_fusable(&self) -> bool {
        self.byte_limit.is_none()
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}
