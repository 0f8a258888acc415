use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, WriteBytesExt};
use log::debug;

/// Buffered file output keeping track of the number of bytes written
pub struct TrackedWriter {
    inner: BufWriter<File>,
    position: u64,
}

impl TrackedWriter {
    pub fn new(file: File) -> Self {
        Self {
            inner: BufWriter::new(file),
            position: 0,
        }
    }

    /// Current offset in the file
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn write_u32(&mut self, value: u32) -> std::io::Result<()> {
        self.inner.write_u32::<BigEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> std::io::Result<()> {
        self.inner.write_u64::<BigEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string
    pub fn write_str(&mut self, value: &str) -> std::io::Result<()> {
        let len: u32 = value
            .len()
            .try_into()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "string too long"))?;
        self.write_u32(len)?;
        self.inner.write_all(value.as_bytes())?;
        self.position += value.len() as u64;
        Ok(())
    }

    /// Flushes and closes the file
    pub fn finish(self) -> std::io::Result<()> {
        let file = self.inner.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

/// Files written during a segment write: unless committed, they are all
/// removed when the guard is dropped
#[derive(Default)]
pub struct FileGuard {
    paths: Vec<PathBuf>,
    committed: bool,
}

impl FileGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or truncates) a file and registers it for removal
    pub fn create(&mut self, path: &Path) -> std::io::Result<File> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        self.paths.push(path.to_path_buf());
        Ok(file)
    }

    /// Keeps the files
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in self.paths.iter() {
            if path.exists() {
                debug!("Removing partially written file {}", path.display());
                let _ = fs::remove_file(path);
            }
        }
    }
}
