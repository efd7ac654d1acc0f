//! File-stream collaborator used to resolve local attachments.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::TryStreamExt;
use tokio_util::io::ReaderStream;

use crate::transport::{ByteStream, TransportError};

/// Opens a local path as a byte stream.
pub trait FileOpener: Send + Sync {
    fn open(&self, path: &Path) -> BoxFuture<'_, io::Result<ByteStream>>;
}

/// `tokio::fs` backed opener. Relative paths resolve against the working
/// directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFiles;

impl FileOpener for TokioFiles {
    fn open(&self, path: &Path) -> BoxFuture<'_, io::Result<ByteStream>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            let resolved = resolve(&path)?;
            let file = tokio::fs::File::open(&resolved).await?;
            let stream = ReaderStream::new(file).map_err(TransportError::from);
            Ok(Box::pin(stream) as ByteStream)
        })
    }
}

/// Absolute form of a path.
pub fn resolve(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::body::collect_stream;
    use std::io::Write;

    #[tokio::test]
    async fn test_open_streams_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"attachment bytes").unwrap();

        let stream = TokioFiles.open(file.path()).await.unwrap();
        let contents = collect_stream(stream).await.unwrap();
        assert_eq!(&contents[..], b"attachment bytes");
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let err = TokioFiles.open(Path::new("/no/such/file.bin")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_relative_paths_resolve_against_cwd() {
        let resolved = resolve(Path::new("a/b.txt")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("a/b.txt"));
    }
}
