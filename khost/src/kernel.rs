// SPDX-License-Identifier: GPL-2.0

//! The OS collaborator surface.
//!
//! A driver consumes kernel services only through the [`Kernel`] trait and
//! exposes itself back through [`FileOperations`]. The trait boundary is what
//! lets tests stand in a fake kernel and observe every registry interaction.

use std::sync::Arc;

use crate::{
    device::{ClassHandle, DevId, NodeHandle},
    error::KernelResult,
    uaccess::{UserSliceReader, UserSliceWriter},
};

/// Kernel services a character driver depends on: device-number namespace,
/// class/device registry, and the VFS dispatch table.
///
/// The release/destroy half of each pair takes already-created handles only;
/// callers are expected to skip resources whose creation never happened.
pub trait Kernel: Send + Sync {
    /// Allocates a region of `count` consecutive device identities tagged
    /// with `name`, returning the base identity.
    fn alloc_chrdev_region(&self, name: &str, count: u32) -> KernelResult<DevId>;

    /// Returns a previously allocated region to the namespace. Must be
    /// called at most once per allocation.
    fn unregister_chrdev_region(&self, base: DevId, count: u32);

    /// Creates a class grouping under which device nodes may be published.
    fn class_create(&self, name: &str) -> KernelResult<ClassHandle>;

    fn class_destroy(&self, class: ClassHandle);

    /// Publishes a device node named `name` under `class`, bound to `id`.
    /// The node becomes addressable through [`Kernel::open`] immediately.
    fn device_create(&self, class: ClassHandle, id: DevId, name: &str) -> KernelResult<NodeHandle>;

    fn device_destroy(&self, node: NodeHandle);

    /// Adds `fops` to the dispatch table for `count` minors starting at
    /// `base`, so opens of a matching node reach the driver.
    fn cdev_add(&self, base: DevId, count: u32, fops: Arc<dyn FileOperations>) -> KernelResult;

    fn cdev_del(&self, base: DevId);
}

/// The top level entrypoint to implementing a driver module.
///
/// For any teardown or cleanup operations, your type may implement [`Drop`].
pub trait Module: Sized + Send + Sync {
    /// Called at module load time.
    ///
    /// Use this method to perform whatever setup or registration the module
    /// should do against `kernel`.
    fn init(kernel: Arc<dyn Kernel>) -> KernelResult<Self>;
}

bitflags::bitflags! {
    /// Access mode requested at open time.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

/// Per-open session state tracked by the kernel on the driver's behalf.
pub struct File {
    flags: OpenFlags,
}

impl File {
    pub fn new(flags: OpenFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }
}

/// The four entry points the VFS dispatches into a character driver.
///
/// `offset` is the caller's file cursor; an implementation that consumes
/// bytes is responsible for advancing it.
pub trait FileOperations: Send + Sync {
    fn open(&self, _file: &File) -> KernelResult {
        Ok(())
    }

    fn release(&self, _file: &File) -> KernelResult {
        Ok(())
    }

    fn read(
        &self,
        _file: &File,
        _buf: &mut UserSliceWriter<'_>,
        _offset: &mut u64,
    ) -> KernelResult<usize> {
        Err(crate::error::linux_err::EINVAL)
    }

    fn write(
        &self,
        _file: &File,
        _buf: &mut UserSliceReader<'_>,
        _offset: &mut u64,
    ) -> KernelResult<usize> {
        Err(crate::error::linux_err::EINVAL)
    }
}
