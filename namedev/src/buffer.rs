//! The device payload: one fixed-size name buffer behind a try-lock.
//!
//! All persistent state of the device lives here. Access is serialized by a
//! non-blocking lock; a contended operation fails with `EBUSY` at once
//! rather than queueing, leaving retry to the caller.

use khost::{
    code::EBUSY,
    sync::TryLock,
    uaccess::{UserSliceReader, UserSliceWriter},
    KernelResult,
};

/// Capacity of the name buffer, in bytes.
pub const NAME_CAPACITY: usize = 20;

/// A 20-byte buffer plus the lock serializing every access to it.
///
/// Two long-standing quirks of this device are kept as documented contract:
///
/// * writes ignore the caller's file offset and always overwrite from the
///   start of the buffer, and
/// * the buffer is never zero-cleared between writes, so a short write
///   leaves the previous trailing bytes in place.
pub struct NameBuffer {
    data: TryLock<[u8; NAME_CAPACITY]>,
}

impl NameBuffer {
    pub const fn new() -> Self {
        Self {
            data: TryLock::new([0; NAME_CAPACITY]),
        }
    }

    /// Copies up to `out.len()` bytes starting at `*pos` into `out`,
    /// advancing `*pos` by the bytes copied.
    ///
    /// Clamps at capacity: a cursor at or past the end copies nothing.
    /// Fails with `EBUSY` without blocking if the lock is contended.
    pub fn try_read(&self, pos: &mut u64, out: &mut UserSliceWriter<'_>) -> KernelResult<usize> {
        let guard = self.data.try_lock().ok_or(EBUSY)?;
        let start = usize::try_from(*pos)
            .unwrap_or(NAME_CAPACITY)
            .min(NAME_CAPACITY);
        let len = out.len().min(NAME_CAPACITY - start);
        out.write(&guard[start..start + len])?;
        *pos += len as u64;
        Ok(len)
    }

    /// Overwrites the buffer from index 0 with the caller's bytes, truncating
    /// silently at capacity.
    ///
    /// Returns the caller's full requested length even when truncated; that
    /// matches what the device has always reported, and the divergence from
    /// bytes actually stored is pinned down in the test suite.
    /// Fails with `EBUSY` without blocking if the lock is contended.
    pub fn try_write(&self, data: &mut UserSliceReader<'_>) -> KernelResult<usize> {
        let mut guard = self.data.try_lock().ok_or(EBUSY)?;
        let requested = data.len();
        let stored = requested.min(NAME_CAPACITY);
        data.read_slice(&mut guard[..stored])?;
        Ok(requested)
    }
}

impl Default for NameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(buf: &NameBuffer, data: &[u8]) -> KernelResult<usize> {
        buf.try_write(&mut UserSliceReader::new(data))
    }

    fn read(buf: &NameBuffer, pos: &mut u64, len: usize) -> KernelResult<Vec<u8>> {
        let mut storage = vec![0u8; len];
        let mut writer = UserSliceWriter::new(&mut storage);
        let copied = buf.try_read(pos, &mut writer)?;
        storage.truncate(copied);
        Ok(storage)
    }

    #[test]
    fn write_then_read_returns_prefix() {
        let buf = NameBuffer::new();
        assert_eq!(write(&buf, b"alice").unwrap(), 5);
        let mut pos = 0;
        let out = read(&buf, &mut pos, NAME_CAPACITY).unwrap();
        assert_eq!(&out[..5], b"alice");
        assert_eq!(&out[5..], &[0u8; 15]);
        assert_eq!(pos, NAME_CAPACITY as u64);
    }

    #[test]
    fn short_write_leaves_trailing_bytes() {
        let buf = NameBuffer::new();
        write(&buf, b"abcdefghijklmnopqrst").unwrap();
        write(&buf, b"bob").unwrap();
        let mut pos = 0;
        let out = read(&buf, &mut pos, NAME_CAPACITY).unwrap();
        assert_eq!(&out, b"bobdefghijklmnopqrst");
    }

    #[test]
    fn oversized_write_truncates_but_reports_requested_length() {
        let buf = NameBuffer::new();
        let data = b"0123456789012345678901234567"; // 28 bytes
        assert_eq!(write(&buf, data).unwrap(), 28);
        let mut pos = 0;
        let out = read(&buf, &mut pos, NAME_CAPACITY).unwrap();
        assert_eq!(&out[..], &data[..NAME_CAPACITY]);
    }

    #[test]
    fn read_respects_cursor_and_clamps() {
        let buf = NameBuffer::new();
        write(&buf, b"abcdefghij").unwrap();
        let mut pos = 8;
        let out = read(&buf, &mut pos, 4).unwrap();
        assert_eq!(&out, b"ij\0\0");
        assert_eq!(pos, 12);
    }

    #[test]
    fn read_at_or_past_end_returns_nothing() {
        let buf = NameBuffer::new();
        let mut pos = NAME_CAPACITY as u64;
        assert_eq!(read(&buf, &mut pos, 8).unwrap(), b"");
        assert_eq!(pos, NAME_CAPACITY as u64);

        let mut pos = u64::MAX;
        assert_eq!(read(&buf, &mut pos, 8).unwrap(), b"");
        assert_eq!(pos, u64::MAX);
    }

    #[test]
    fn contended_operations_fail_busy_without_modifying() {
        let buf = NameBuffer::new();
        write(&buf, b"alice").unwrap();

        let held = buf.data.try_lock().unwrap();
        assert_eq!(write(&buf, b"mallory"), Err(EBUSY));
        let mut pos = 0;
        assert_eq!(read(&buf, &mut pos, 4), Err(EBUSY));
        assert_eq!(pos, 0);
        drop(held);

        let mut pos = 0;
        assert_eq!(read(&buf, &mut pos, 5).unwrap(), b"alice");
    }
}
