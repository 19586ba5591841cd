// # Directory Mount
//
// MountAdapter backed by a directory on the host filesystem.
//
// ## Purpose
//
// On a host where the OS already mounted the card (or where logs simply go
// to a local directory), "mounting" means checking that the directory is
// there and writable. The volume enforces the configured bound on
// concurrently open files.
//
// ## Failure Modes
//
// - Mount point missing: mount error, unless `create_mount_point` is set
// - Mount point is a file or read-only: mount error
// - Too many open files on the volume: open error

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::MountConfig;
use crate::error::Error;
use crate::traits::{LogFile, MountAdapter, Volume};

/// Mount adapter for host directories
#[derive(Debug, Default)]
pub struct DirectoryMount {
    mounted: Option<PathBuf>,
}

impl DirectoryMount {
    /// Create an unmounted adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount point of the live volume, if any
    pub fn mounted(&self) -> Option<&Path> {
        self.mounted.as_deref()
    }

    fn check_mount_point(config: &MountConfig) -> Result<(), Error> {
        let root = &config.mount_point;

        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound && config.create_mount_point => {
                fs::create_dir_all(root).map_err(|e| {
                    Error::mount(format!(
                        "Failed to create mount point {}: {}",
                        root.display(),
                        e
                    ))
                })?;
                tracing::info!(mount_point = %root.display(), "Created mount point");
                fs::metadata(root)?
            }
            Err(e) => {
                return Err(Error::mount(format!(
                    "Mount point {} is not available: {}",
                    root.display(),
                    e
                )));
            }
        };

        if !metadata.is_dir() {
            return Err(Error::mount(format!(
                "Mount point {} is not a directory",
                root.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(Error::mount(format!(
                "Mount point {} is read-only",
                root.display()
            )));
        }

        Ok(())
    }
}

impl MountAdapter for DirectoryMount {
    fn mount(&mut self, config: &MountConfig) -> Result<Box<dyn Volume>, Error> {
        if let Some(existing) = &self.mounted {
            return Err(Error::mount(format!(
                "Already mounted at {}",
                existing.display()
            )));
        }

        Self::check_mount_point(config)?;

        self.mounted = Some(config.mount_point.clone());
        Ok(Box::new(DirectoryVolume::new(
            config.mount_point.clone(),
            config.max_files,
        )))
    }

    fn unmount(&mut self, volume: Box<dyn Volume>) -> Result<(), Error> {
        match self.mounted.take() {
            Some(root) if root == volume.mount_point() => Ok(()),
            Some(root) => {
                let other = volume.mount_point().display().to_string();
                self.mounted = Some(root);
                Err(Error::storage(format!("Volume {} was not mounted by this adapter", other)))
            }
            None => Err(Error::storage("Nothing mounted")),
        }
    }
}

/// Volume rooted at a host directory
#[derive(Debug)]
pub struct DirectoryVolume {
    root: PathBuf,
    max_files: usize,
    open_files: Arc<AtomicUsize>,
}

impl DirectoryVolume {
    /// Create a volume at `root` allowing `max_files` open handles
    pub fn new(root: impl Into<PathBuf>, max_files: usize) -> Self {
        Self {
            root: root.into(),
            max_files,
            open_files: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of handles currently open on this volume
    pub fn open_files(&self) -> usize {
        self.open_files.load(Ordering::SeqCst)
    }

    /// Reserve an open-file slot, failing when all are taken
    fn reserve_slot(&self) -> bool {
        self.open_files
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |open| {
                (open < self.max_files).then_some(open + 1)
            })
            .is_ok()
    }
}

impl Volume for DirectoryVolume {
    fn mount_point(&self) -> &Path {
        &self.root
    }

    fn open_append(&self, file_name: &str) -> Result<LogFile, Error> {
        let path = self.root.join(file_name);

        if !self.reserve_slot() {
            return Err(Error::open(format!(
                "Could not open {}: too many open files (max {})",
                path.display(),
                self.max_files
            )));
        }

        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Ok(Box::new(TrackedFile {
                file,
                open_files: Arc::clone(&self.open_files),
            })),
            Err(e) => {
                self.open_files.fetch_sub(1, Ordering::SeqCst);
                Err(Error::open(format!("Could not open {}: {}", path.display(), e)))
            }
        }
    }
}

/// File handle that releases its volume slot when dropped
struct TrackedFile {
    file: File,
    open_files: Arc<AtomicUsize>,
}

impl Write for TrackedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for TrackedFile {
    fn drop(&mut self) {
        self.open_files.fetch_sub(1, Ordering::SeqCst);
    }
}
