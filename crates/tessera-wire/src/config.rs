//! Encoder and decoder options.

use crate::error::{DecodeError, EncodeError};

/// Options for [`decode`](crate::decode).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum message nesting, counting the top-level message as 1.
    ///
    /// Also bounds the group stack when skipping unknown groups.
    /// Default: 100. Must be non-zero.
    pub max_depth: usize,

    /// Keep the raw bytes of unrecognised fields in each message's unknown
    /// span. When `false` they are skipped. Default: `true`.
    pub preserve_unknown: bool,
}

impl DecodeOptions {
    /// Default nesting limit.
    pub const DEFAULT_MAX_DEPTH: usize = 100;

    /// Default options.
    pub fn new() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            preserve_unknown: true,
        }
    }

    /// Replace the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check the options for internal consistency.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.max_depth == 0 {
            return Err(DecodeError::InvalidOptions {
                reason: "max_depth must be non-zero",
            });
        }
        Ok(())
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`encode`](crate::encode).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Maximum message nesting, counting the top-level message as 1.
    /// Default: 100. Must be non-zero.
    pub max_depth: usize,

    /// Leave preserved unknown bytes out of the output. Default: `false`.
    pub skip_unknown: bool,
}

impl EncodeOptions {
    /// Default nesting limit.
    pub const DEFAULT_MAX_DEPTH: usize = 100;

    /// Default options.
    pub fn new() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            skip_unknown: false,
        }
    }

    /// Replace the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check the options for internal consistency.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.max_depth == 0 {
            return Err(EncodeError::InvalidOptions {
                reason: "max_depth must be non-zero",
            });
        }
        Ok(())
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let d = DecodeOptions::default();
        assert_eq!(d.max_depth, 100);
        assert!(d.preserve_unknown);
        assert!(d.validate().is_ok());
        let e = EncodeOptions::default();
        assert!(!e.skip_unknown);
        assert!(e.validate().is_ok());
    }

    #[test]
    fn zero_depth_rejected() {
        assert!(matches!(
            DecodeOptions::new().with_max_depth(0).validate(),
            Err(DecodeError::InvalidOptions { .. })
        ));
        assert!(matches!(
            EncodeOptions::new().with_max_depth(0).validate(),
            Err(EncodeError::InvalidOptions { .. })
        ));
    }
}
