//! File-identity tracking for rotation detection.
//!
//! On POSIX, inode number is the ground truth: rename-and-recreate always
//! changes it even when size and mtime coincidentally line up. Elsewhere
//! we fall back to the weaker heuristic of "size went backwards or the
//! creation time moved".

use std::fs::Metadata;
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FileIdentity {
    #[cfg(unix)]
    inode: u64,
    size: u64,
    created: Option<SystemTime>,
}

impl FileIdentity {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            #[cfg(unix)]
            inode: {
                use std::os::unix::fs::MetadataExt;
                metadata.ino()
            },
            size: metadata.len(),
            created: metadata.created().ok(),
        }
    }

    /// True when `self` (the last-observed identity) no longer describes
    /// the same underlying file as `current`.
    pub fn rotated(&self, current: &FileIdentity) -> bool {
        #[cfg(unix)]
        {
            self.inode != current.inode
        }
        #[cfg(not(unix))]
        {
            current.size < self.size || current.created != self.created
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}
