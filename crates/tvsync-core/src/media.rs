//! Read access to the media files referenced by `realFiles`.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is shorter than the logical name declares.
    #[error("{path}: expected {expected} bytes at offset {offset}, got {received}")]
    ShortRead {
        path: PathBuf,
        offset: u64,
        expected: usize,
        received: usize,
    },
}

/// Media directory; `realFiles` entries are relative to it.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, real_file: &str) -> PathBuf {
        self.root.join(real_file.trim_start_matches('/'))
    }

    /// Read exactly `len` bytes of `real_file` starting at `offset`.
    pub async fn read_chunk(
        &self,
        real_file: &str,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>, MediaError> {
        let path = self.resolve(real_file);
        let io_err = |source| MediaError::Io {
            path: path.clone(),
            source,
        };

        let mut file = tokio::fs::File::open(&path).await.map_err(io_err)?;
        file.seek(SeekFrom::Start(offset)).await.map_err(io_err)?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = file.read(&mut buf[filled..]).await.map_err(io_err)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled != len {
            return Err(MediaError::ShortRead {
                path,
                offset,
                expected: len,
                received: filled,
            });
        }
        Ok(buf)
    }

    /// Size of a media file in bytes.
    pub async fn file_size(&self, real_file: &str) -> Result<u64, MediaError> {
        let path = self.resolve(real_file);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(source) => Err(MediaError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_chunk_at_offset() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std::fs::write(dir.path().join("a.bin"), &data).unwrap();

        let lib = MediaLibrary::new(dir.path());
        let chunk = lib.read_chunk("a.bin", 1000, 100).await.unwrap();
        assert_eq!(chunk, &data[1000..1100]);
        assert_eq!(lib.file_size("/a.bin").await.unwrap(), 4096);
    }

    #[tokio::test]
    async fn short_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), [7u8; 10]).unwrap();

        let lib = MediaLibrary::new(dir.path());
        let err = lib.read_chunk("a.bin", 4, 10).await.unwrap_err();
        match err {
            MediaError::ShortRead {
                expected, received, ..
            } => {
                assert_eq!(expected, 10);
                assert_eq!(received, 6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let lib = MediaLibrary::new(dir.path());
        assert!(matches!(
            lib.read_chunk("nope.mp4", 0, 1).await,
            Err(MediaError::Io { .. })
        ));
    }
}
