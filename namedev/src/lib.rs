//! A minimal single-instance character device.
//!
//! The device publishes one node and serves reads and writes against a
//! 20-byte name buffer guarded by a non-blocking lock: contended access
//! fails with `EBUSY` immediately instead of queueing in the driver.
//!
//! The driver consumes kernel services through [`khost::kernel::Kernel`],
//! so it runs unchanged against the in-memory [`khost::host::HostKernel`]:
//!
//! ```
//! use khost::{host::HostKernel, kernel::OpenFlags};
//! use namedev::{InitPolicy, NameDev, NODE_NAME};
//!
//! let kernel = HostKernel::new();
//! let dev = NameDev::load(kernel.clone(), InitPolicy::default()).unwrap();
//!
//! let mut file = kernel.open(NODE_NAME, OpenFlags::WRITE).unwrap();
//! assert_eq!(file.write(b"alice").unwrap(), 5);
//!
//! drop(dev); // unload, tearing resources down in reverse order
//! ```

pub mod buffer;
pub mod driver;
pub mod fops;

pub use buffer::{NameBuffer, NAME_CAPACITY};
pub use driver::{
    InitError, InitPolicy, InitStep, LifecycleState, NameDev, StepPolicy, CLASS_NAME, DEVICE_NAME,
    MINOR_COUNT, NODE_NAME,
};
