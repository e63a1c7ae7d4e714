//! Uploaded file handles and their cleanup.
//!
//! A [`FormParser`](crate::FormParser) spools uploaded files somewhere (a temp
//! directory, memory, object storage) and hands back one [`UploadedFile`] per
//! file. The handler may read them through
//! [`Request::files`](crate::Request::files); the middleware destroys every one
//! of them exactly once when the request is over.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::error::BoxError;

/// A file received as part of an upload, backed by transient storage.
pub trait UploadedFile: Send + Sync + 'static {
    /// Name of the form field the file was sent under.
    fn field_name(&self) -> &str;

    /// File name as reported by the client. Untrusted.
    fn file_name(&self) -> Option<&str> { None }

    fn content_type(&self) -> Option<&str> { None }

    /// Where the content lives on disk, if it lives on disk.
    fn path(&self) -> Option<&Path> { None }

    /// Releases the backing storage.
    ///
    /// Called exactly once per handle, after the handler has finished.
    fn destroy(&self) -> Result<(), BoxError>;
}

/// Shared handle to an uploaded file.
///
/// The handler and the middleware both hold one. Handles must not be used
/// after the handler returns: by then the storage is gone.
pub type FileHandle = Arc<dyn UploadedFile>;

// ── DiskFile ──────────────────────────────────────────────────────────────────

/// An uploaded file spooled to a path on disk.
///
/// `destroy` removes the file. A file that is already gone counts as
/// released, so a handler is free to move it somewhere permanent.
#[derive(Debug)]
pub struct DiskFile {
    field_name: String,
    path: PathBuf,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl DiskFile {
    pub fn new(field_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field_name: field_name.into(),
            path: path.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Boxes the file into a [`FileHandle`] for a [`ParsedForm`](crate::ParsedForm).
    pub fn into_handle(self) -> FileHandle {
        Arc::new(self)
    }
}

impl UploadedFile for DiskFile {
    fn field_name(&self) -> &str { &self.field_name }
    fn file_name(&self) -> Option<&str> { self.file_name.as_deref() }
    fn content_type(&self) -> Option<&str> { self.content_type.as_deref() }
    fn path(&self) -> Option<&Path> { Some(&self.path) }

    fn destroy(&self) -> Result<(), BoxError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Cleanup guard ─────────────────────────────────────────────────────────────

/// Owns the middleware's copy of the uploaded files and destroys them.
///
/// The guard lives inside the handler task. Destruction happens in
/// [`release`](Self::release) once the handler returns or, if the task
/// panics or is aborted first, in `Drop`. Either way the handler future is
/// already gone and each file is destroyed once: the list is taken before it
/// is walked.
pub(crate) struct UploadGuard {
    files: Vec<FileHandle>,
}

impl UploadGuard {
    pub(crate) fn new(files: Vec<FileHandle>) -> Self {
        Self { files }
    }

    /// Handles to give to the handler.
    pub(crate) fn handles(&self) -> Vec<FileHandle> {
        self.files.clone()
    }

    pub(crate) fn release(mut self) {
        self.destroy_all();
    }

    // Best-effort: a failing file is logged and the rest are still destroyed.
    fn destroy_all(&mut self) {
        for file in std::mem::take(&mut self.files) {
            if let Err(e) = file.destroy() {
                warn!(
                    field = file.field_name(),
                    file_name = file.file_name(),
                    error = %e,
                    "failed to destroy uploaded file",
                );
            }
        }
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counted {
        destroyed: Arc<AtomicUsize>,
        fail: bool,
    }

    impl UploadedFile for Counted {
        fn field_name(&self) -> &str { "file" }

        fn destroy(&self) -> Result<(), BoxError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            if self.fail { Err("disk on fire".into()) } else { Ok(()) }
        }
    }

    fn counted(destroyed: &Arc<AtomicUsize>, fail: bool) -> FileHandle {
        Arc::new(Counted { destroyed: Arc::clone(destroyed), fail })
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tsu-upload-{}-{name}", std::process::id()))
    }

    #[test]
    fn release_destroys_each_file_once() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let guard = UploadGuard::new(vec![counted(&destroyed, false), counted(&destroyed, false)]);
        let handed_out = guard.handles();

        guard.release();

        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(handed_out.len(), 2);
    }

    #[test]
    fn drop_without_release_still_destroys() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        drop(UploadGuard::new(vec![counted(&destroyed, false)]));
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_does_not_stop_the_rest() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let guard = UploadGuard::new(vec![
            counted(&destroyed, true),
            counted(&destroyed, false),
            counted(&destroyed, true),
        ]);

        guard.release();

        assert_eq!(destroyed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn disk_file_destroy_removes_the_file() {
        let path = scratch("remove");
        std::fs::write(&path, b"payload").unwrap();

        let file = DiskFile::new("avatar", &path)
            .with_file_name("me.png")
            .with_content_type("image/png");
        assert_eq!(file.field_name(), "avatar");
        assert_eq!(file.file_name(), Some("me.png"));
        assert_eq!(file.content_type(), Some("image/png"));
        assert_eq!(file.path(), Some(path.as_path()));

        file.destroy().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn disk_file_already_gone_is_released() {
        let file = DiskFile::new("avatar", scratch("never-written"));
        assert!(file.destroy().is_ok());
    }
}
