//! Resume tokens: `name` or `name:offset`.
//!
//! The logical file name carries the declared byte size after its last `-`
//! (`v583747_0-1071263.mp4` declares 1071263 bytes), so a token alone is enough
//! to know both where the upload stands and where it ends.

use std::fmt;

/// One entry of a task's upload queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeToken {
    /// Logical file name as listed in `config.file`.
    pub name: String,
    /// Next byte to send.
    pub offset: u64,
}

impl ResumeToken {
    pub fn new(name: impl Into<String>, offset: u64) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }

    /// Parse `name` or `name:offset`. An unparsable offset is logged and read as 0,
    /// which restarts that file rather than losing it from the queue.
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((name, offset)) if !name.is_empty() => {
                let offset = offset.trim().parse::<u64>().unwrap_or_else(|e| {
                    tracing::warn!(token = s, "bad resume offset: {}", e);
                    0
                });
                Self::new(name, offset)
            }
            _ => Self::new(s, 0),
        }
    }

    /// Declared total size: digits right after the last `-` of the name. 0 when absent.
    pub fn declared_size(&self) -> u64 {
        declared_size(&self.name)
    }

    /// Bytes still to send according to the declared size.
    pub fn remaining(&self) -> u64 {
        self.declared_size().saturating_sub(self.offset)
    }

    /// Same file, new offset.
    pub fn with_offset(&self, offset: u64) -> Self {
        Self::new(self.name.clone(), offset)
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.name, self.offset)
        }
    }
}

/// Size encoded in a logical file name (`prefix{id}_0-{size}.{ext}`).
pub fn declared_size(name: &str) -> u64 {
    let Some(pos) = name.rfind('-') else {
        return 0;
    };
    let digits: String = name[pos + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().unwrap_or(0)
}
