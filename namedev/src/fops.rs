//! VFS entry points.
//!
//! Each handler is a thin policy layer over [`NameBuffer`]: open and close
//! have no state effect beyond a log line, read and write delegate to the
//! buffer and surface its `EBUSY` unchanged.

use std::sync::Arc;

use khost::{
    kernel::{File, FileOperations},
    uaccess::{UserSliceReader, UserSliceWriter},
    KernelResult,
};

use crate::buffer::NameBuffer;

pub struct NameDevOps {
    buffer: Arc<NameBuffer>,
}

impl NameDevOps {
    pub fn new(buffer: Arc<NameBuffer>) -> Self {
        Self { buffer }
    }
}

impl FileOperations for NameDevOps {
    fn open(&self, file: &File) -> KernelResult {
        log::info!("open, flags {:?}", file.flags());
        Ok(())
    }

    fn release(&self, _file: &File) -> KernelResult {
        log::info!("close");
        Ok(())
    }

    fn read(
        &self,
        _file: &File,
        buf: &mut UserSliceWriter<'_>,
        offset: &mut u64,
    ) -> KernelResult<usize> {
        log::info!("read, {} bytes at offset {}", buf.len(), offset);
        self.buffer.try_read(offset, buf)
    }

    fn write(
        &self,
        _file: &File,
        buf: &mut UserSliceReader<'_>,
        offset: &mut u64,
    ) -> KernelResult<usize> {
        // The caller's offset is deliberately not consulted; see NameBuffer.
        log::info!("write, {} bytes at offset {}", buf.len(), offset);
        self.buffer.try_write(buf)
    }
}
