//! Caller-buffer access.
//!
//! Handlers never touch the caller's buffer directly; they go through a
//! reader or writer that bounds-checks every copy, mirroring the kernel's
//! user-slice discipline. Out-of-bounds access fails with `EFAULT`.

use crate::error::{linux_err::EFAULT, KernelResult};

/// A reader over the bytes a caller passed to `write`.
///
/// Used to incrementally read from the caller's slice.
pub struct UserSliceReader<'a> {
    data: &'a [u8],
}

impl<'a> UserSliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns the number of bytes left to be read from this reader.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no data is left in the buffer.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Skip the provided number of bytes.
    ///
    /// Fails with `EFAULT` when skipping more than the remaining length.
    pub fn skip(&mut self, num_skip: usize) -> KernelResult {
        if num_skip > self.data.len() {
            return Err(EFAULT);
        }
        self.data = &self.data[num_skip..];
        Ok(())
    }

    /// Reads exactly `out.len()` bytes into `out`, advancing the reader.
    ///
    /// Fails with `EFAULT` if the read goes out of bounds of this reader.
    pub fn read_slice(&mut self, out: &mut [u8]) -> KernelResult {
        let len = out.len();
        if len > self.data.len() {
            return Err(EFAULT);
        }
        out.copy_from_slice(&self.data[..len]);
        self.data = &self.data[len..];
        Ok(())
    }

    /// Reads the entirety of the remaining bytes.
    pub fn read_all(mut self) -> KernelResult<Vec<u8>> {
        let mut out = vec![0u8; self.data.len()];
        self.read_slice(&mut out)?;
        Ok(out)
    }
}

/// A writer over the buffer a caller passed to `read`.
pub struct UserSliceWriter<'a> {
    data: &'a mut [u8],
    written: usize,
}

impl<'a> UserSliceWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, written: 0 }
    }

    /// Remaining capacity in the caller's buffer.
    pub fn len(&self) -> usize {
        self.data.len() - self.written
    }

    /// Returns `true` if no capacity is left.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Appends `src` to the caller's buffer.
    ///
    /// Fails with `EFAULT` if `src` does not fit in the remaining capacity.
    pub fn write(&mut self, src: &[u8]) -> KernelResult {
        if src.len() > self.len() {
            return Err(EFAULT);
        }
        self.data[self.written..self.written + src.len()].copy_from_slice(src);
        self.written += src.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_tracks_remaining_bytes() {
        let mut reader = UserSliceReader::new(b"abcdef");
        let mut out = [0u8; 2];
        reader.read_slice(&mut out).unwrap();
        assert_eq!(&out, b"ab");
        assert_eq!(reader.len(), 4);
        reader.skip(1).unwrap();
        assert_eq!(reader.read_all().unwrap(), b"def");
    }

    #[test]
    fn reader_rejects_out_of_bounds() {
        let mut reader = UserSliceReader::new(b"ab");
        let mut out = [0u8; 3];
        assert_eq!(reader.read_slice(&mut out), Err(EFAULT));
        assert_eq!(reader.skip(3), Err(EFAULT));
    }

    #[test]
    fn writer_appends_and_bounds_checks() {
        let mut storage = [0u8; 4];
        let mut writer = UserSliceWriter::new(&mut storage);
        writer.write(b"ab").unwrap();
        writer.write(b"cd").unwrap();
        assert_eq!(writer.written(), 4);
        assert!(writer.is_empty());
        assert_eq!(writer.write(b"e"), Err(EFAULT));
        assert_eq!(&storage, b"abcd");
    }
}
