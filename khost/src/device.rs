// SPDX-License-Identifier: GPL-2.0

//! Device identity and registry handles.

use core::fmt;

/// A major/minor pair identifying one device within the device-number
/// namespace.
///
/// Allocated once at load time, immutable for the driver's lifetime, and
/// released exactly once at unload. Callers must not double-release.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevId {
    major: u32,
    minor: u32,
}

impl DevId {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub const fn major(&self) -> u32 {
        self.major
    }

    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// The identity `offset` minors above this one, within the same major.
    pub const fn with_offset(&self, offset: u32) -> Self {
        Self::new(self.major, self.minor + offset)
    }
}

impl fmt::Debug for DevId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Opaque handle to a device class created in the registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClassHandle(pub(crate) u64);

/// Opaque handle to a published device node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeHandle(pub(crate) u64);
