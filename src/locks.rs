use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::cycles::Cycle;

#[derive(Debug)]
pub enum LockError {
    Busy(PathBuf),
    Io(std::io::Error),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::Busy(path) => write!(f, "block lock busy: {}", path.display()),
            LockError::Io(err) => write!(f, "block lock I/O error: {}", err),
        }
    }
}

impl std::error::Error for LockError {}

impl From<std::io::Error> for LockError {
    fn from(value: std::io::Error) -> Self {
        LockError::Io(value)
    }
}

/// Serializes redistribution runs that target the same block and cycle.
/// Completions on disjoint blocks never contend.
#[derive(Debug)]
pub struct BlockLock {
    path: PathBuf,
    _file: File,
}

impl BlockLock {
    pub fn acquire(
        data_root: &Path,
        block: u32,
        cycle: Cycle,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        let path = lock_path(data_root, block, cycle);
        let start = Instant::now();
        loop {
            match try_acquire(&path)? {
                Some(guard) => return Ok(guard),
                None if start.elapsed() >= timeout => {
                    return Err(LockError::Busy(path));
                }
                None => thread::sleep(Duration::from_millis(10)),
            }
        }
    }

    pub fn try_acquire(data_root: &Path, block: u32, cycle: Cycle) -> Result<Option<Self>, LockError> {
        try_acquire(&lock_path(data_root, block, cycle))
    }
}

impl Drop for BlockLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lock_path(data_root: &Path, block: u32, cycle: Cycle) -> PathBuf {
    data_root
        .join(".surco")
        .join("locks")
        .join(format!("bloque-{}-c{}.lock", block, cycle.number()))
}

fn try_acquire(path: &Path) -> Result<Option<BlockLock>, LockError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(BlockLock {
            path: path.to_path_buf(),
            _file: file,
        })),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(LockError::Io(err)),
    }
}
