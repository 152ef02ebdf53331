//! Host-side kernel services for character drivers.
//!
//! This crate is the seam between a driver and the operating system: the
//! [`kernel::Kernel`] trait is the service surface a driver consumes
//! (device-number namespace, class/device registry, VFS dispatch), and
//! [`kernel::FileOperations`] is the callback surface it exposes back.
//! [`host::HostKernel`] satisfies the whole surface in memory so drivers can
//! be loaded, exercised, and torn down inside ordinary tests.

pub mod device;
pub mod error;
pub mod host;
pub mod kernel;
pub mod logger;
pub mod sync;
pub mod uaccess;

pub use error::linux_err as code;
pub use error::{Error, KernelResult};
