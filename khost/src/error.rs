//! Kernel-style error codes.
//!
//! Driver entry points report failure the way the kernel does: an opaque
//! [`Error`] wrapping a negative errno, converted to the caller-visible
//! integer at the dispatch boundary.

use core::{fmt, fmt::Debug, num::TryFromIntError, str::Utf8Error};

/// The largest errno value that still denotes an error.
const MAX_ERRNO: i32 = 4095;

pub type KernelResult<T = ()> = Result<T, Error>;

/// An integer error code in the range `-MAX_ERRNO..0`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error(i32);

impl Error {
    pub fn from_errno(errno: i32) -> Error {
        if errno < -MAX_ERRNO || errno >= 0 {
            log::warn!(
                "attempted to create `Error` with out of range `errno`: {}",
                errno
            );
            return linux_err::EINVAL;
        }
        // INVARIANT: The check above ensures the type invariant
        // will hold.
        Error(errno)
    }

    pub fn to_errno(&self) -> i32 {
        self.0
    }

    /// Returns the symbolic name of the error, if one exists.
    pub fn name(&self) -> Option<&'static str> {
        linux_err::errname(self)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            // Print out number if no name can be found.
            None => f.debug_tuple("Error").field(&-self.0).finish(),
            Some(name) => f.debug_tuple(name).finish(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Contains the C-compatible error codes.
#[rustfmt::skip]
#[allow(unused)]
pub mod linux_err {
    macro_rules! declare_err {
        ($err:ident, $num:expr, $($doc:expr),+) => {
            $(
            #[doc = $doc]
            )*
            pub const $err: super::Error = super::Error(-$num);
        };
    }

    declare_err!(EPERM,   1, "Operation not permitted.");
    declare_err!(ENOENT,  2, "No such file or directory.");
    declare_err!(EINTR,   4, "Interrupted system call.");
    declare_err!(EIO,     5, "I/O error.");
    declare_err!(ENXIO,   6, "No such device or address.");
    declare_err!(EBADF,   9, "Bad file number.");
    declare_err!(EAGAIN, 11, "Try again.");
    declare_err!(ENOMEM, 12, "Out of memory.");
    declare_err!(EACCES, 13, "Permission denied.");
    declare_err!(EFAULT, 14, "Bad address.");
    declare_err!(EBUSY,  16, "Device or resource busy.");
    declare_err!(EEXIST, 17, "File exists.");
    declare_err!(ENODEV, 19, "No such device.");
    declare_err!(EINVAL, 22, "Invalid argument.");
    declare_err!(ENFILE, 23, "File table overflow.");
    declare_err!(EMFILE, 24, "Too many open files.");
    declare_err!(EFBIG,  27, "File too large.");
    declare_err!(ENOSPC, 28, "No space left on device.");
    declare_err!(ESPIPE, 29, "Illegal seek.");
    declare_err!(EROFS,  30, "Read-only file system.");

    pub(super) fn errname(err: &super::Error) -> Option<&'static str> {
        Some(match -err.to_errno() {
            1 => "EPERM",
            2 => "ENOENT",
            4 => "EINTR",
            5 => "EIO",
            6 => "ENXIO",
            9 => "EBADF",
            11 => "EAGAIN",
            12 => "ENOMEM",
            13 => "EACCES",
            14 => "EFAULT",
            16 => "EBUSY",
            17 => "EEXIST",
            19 => "ENODEV",
            22 => "EINVAL",
            23 => "ENFILE",
            24 => "EMFILE",
            27 => "EFBIG",
            28 => "ENOSPC",
            29 => "ESPIPE",
            30 => "EROFS",
            _ => return None,
        })
    }
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Error {
        linux_err::EINVAL
    }
}

impl From<Utf8Error> for Error {
    fn from(_: Utf8Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<core::convert::Infallible> for Error {
    fn from(e: core::convert::Infallible) -> Error {
        match e {}
    }
}
