//! Storage backings
//!
//! An image is bound to exactly one random-access byte store for its whole
//! lifetime. Disk-backed images use [`std::fs::File`]; byte-exact tests and
//! in-memory composition use [`std::io::Cursor<Vec<u8>>`].

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Random-access storage backing a [`FileImage`](crate::FileImage).
///
/// The implementation must support reads and writes at arbitrary offsets via
/// [`Seek`]; writes past the current end extend the store with zeroes.
pub trait Storage: Read + Write + Seek {
    /// Truncate or zero-extend the store to `len` bytes.
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Flush buffered writes to durable storage.
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Current length of the store in bytes.
    fn len(&mut self) -> io::Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }
}

impl Storage for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl Storage for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }

    fn len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
}
