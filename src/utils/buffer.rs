use byteorder::{BigEndian, ReadBytesExt};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read-only random access to the content of a file
pub trait Buffer: Send + Sync {
    fn data(&'_ self) -> &'_ [u8];

    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns the bytes in `[start, end)` (fails if out of bounds)
    fn slice(&'_ self, start: usize, end: usize) -> std::io::Result<&'_ [u8]> {
        self.data().get(start..end).ok_or_else(|| {
            std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("range {}..{} beyond {} bytes", start, end, self.len()),
            )
        })
    }

    fn u32_at(&self, offset: usize) -> std::io::Result<u32> {
        self.slice(offset, offset + 4)?.read_u32::<BigEndian>()
    }

    fn u64_at(&self, offset: usize) -> std::io::Result<u64> {
        self.slice(offset, offset + 8)?.read_u64::<BigEndian>()
    }
}

/// Stores the data in memory
pub struct MemoryBuffer {
    data: Vec<u8>,
}

impl MemoryBuffer {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let mut file = File::options().read(true).open(path)?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        Ok(Self { data })
    }
}

impl Buffer for MemoryBuffer {
    fn data(&'_ self) -> &'_ [u8] {
        &self.data
    }
}

/// Uses a memory map
pub struct MmapBuffer {
    mmap: Mmap,
}

impl MmapBuffer {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = File::options().read(true).open(path)?;
        // Safety: segment files are immutable once written
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Self { mmap })
    }
}

impl Buffer for MmapBuffer {
    fn data(&'_ self) -> &'_ [u8] {
        &self.mmap
    }
}

/// Opens a file either in memory or through a memory map
pub fn open_buffer(path: &Path, in_memory: bool) -> std::io::Result<Box<dyn Buffer>> {
    // Empty files cannot be mapped on every platform
    if in_memory || std::fs::metadata(path)?.len() == 0 {
        Ok(Box::new(MemoryBuffer::new(path)?))
    } else {
        Ok(Box::new(MmapBuffer::new(path)?))
    }
}
