// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the encoder, transport and publisher.
//!
//! Errors are grouped into the categories reported by [`Error::kind`]:
//! configuration and lifecycle errors leave a publisher in its prior state,
//! sequence and collaborator errors abort only the current pulse.

use std::fmt;
use std::io;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing parameters, rejected without side effects.
    Config,
    /// Operation not valid in the current lifecycle state.
    State,
    /// Socket syscall failure.
    Transport,
    /// Registry, physical id, size or data type mismatch.
    Encoding,
    /// Unset, invalid or duplicate fiducial.
    Sequence,
    /// Value source or trigger chain failure.
    Collaborator,
}

/// Socket setup step that failed while opening a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStep {
    Socket,
    SendBufferSize,
    Bind,
    LocalAddr,
    MulticastTtl,
    MulticastInterface,
    ResolveInterface,
}

impl fmt::Display for SocketStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketStep::Socket => "socket()",
            SocketStep::SendBufferSize => "setsockopt(SO_SNDBUF)",
            SocketStep::Bind => "bind()",
            SocketStep::LocalAddr => "getsockname()",
            SocketStep::MulticastTtl => "setsockopt(IP_MULTICAST_TTL)",
            SocketStep::MulticastInterface => "setsockopt(IP_MULTICAST_IF)",
            SocketStep::ResolveInterface => "resolve interface",
        };
        f.write_str(name)
    }
}

/// Errors returned by BLD operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid or missing configuration parameter.
    Config(String),
    /// Payload larger than the configured maximum.
    PayloadTooLarge { len: usize, max: usize },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Publisher is not started.
    NotStarted,
    /// Publisher is already started.
    AlreadyStarted,
    /// Invalid state for the requested operation.
    InvalidState(String),
    /// Instance id outside the registry.
    InstanceOutOfRange(usize),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Socket setup failed at `step`.
    Transport { step: SocketStep, source: io::Error },
    /// Datagram send failed.
    SendFailed { len: usize, source: io::Error },

    // ========================================================================
    // Encoding Errors
    // ========================================================================
    /// Payload field could not be encoded.
    Encoding(String),
    /// Buffer too small for the packet.
    BufferTooSmall { needed: usize, capacity: usize },

    // ========================================================================
    // Sequence Errors
    // ========================================================================
    /// No fiducial was prepared for this cycle.
    FiducialUnset,
    /// Fiducial outside the valid range.
    InvalidFiducial(u32),
    /// Same fiducial as the previous cycle.
    DuplicateFiducial(u32),

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// Value source or trigger chain failure on `name`.
    Collaborator { name: String, reason: String },
}

impl Error {
    /// Category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::PayloadTooLarge { .. } => ErrorKind::Config,
            Error::NotStarted
            | Error::AlreadyStarted
            | Error::InvalidState(_)
            | Error::InstanceOutOfRange(_) => ErrorKind::State,
            Error::Transport { .. } | Error::SendFailed { .. } => ErrorKind::Transport,
            Error::Encoding(_) | Error::BufferTooSmall { .. } => ErrorKind::Encoding,
            Error::FiducialUnset | Error::InvalidFiducial(_) | Error::DuplicateFiducial(_) => {
                ErrorKind::Sequence
            }
            Error::Collaborator { .. } => ErrorKind::Collaborator,
        }
    }

    /// OS error code of a transport failure.
    #[must_use]
    pub fn os_error_code(&self) -> Option<i32> {
        match self {
            Error::Transport { source, .. } | Error::SendFailed { source, .. } => {
                source.raw_os_error()
            }
            _ => None,
        }
    }

    /// Status code as reported on the command surface.
    ///
    /// `1` is a lifecycle no-op (already started, not started), `2` a failure.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        match self {
            Error::NotStarted | Error::AlreadyStarted => 1,
            _ => 2,
        }
    }

    pub(crate) fn collaborator(name: &str, reason: impl Into<String>) -> Self {
        Error::Collaborator {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::PayloadTooLarge { len, max } => {
                write!(f, "Payload of {} bytes exceeds maximum of {} bytes", len, max)
            }
            Error::NotStarted => write!(f, "BLD is not started"),
            Error::AlreadyStarted => write!(f, "BLD is already started"),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::InstanceOutOfRange(id) => write!(f, "BLD instance {} out of range", id),
            Error::Transport { step, source } => write!(
                f,
                "{} failed, errno = {} ({})",
                step,
                source.raw_os_error().unwrap_or(0),
                source
            ),
            Error::SendFailed { len, source } => write!(
                f,
                "send of {} bytes failed, errno = {} ({})",
                len,
                source.raw_os_error().unwrap_or(0),
                source
            ),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::BufferTooSmall { needed, capacity } => write!(
                f,
                "Packet size ({}) is larger than buffer size ({})",
                needed, capacity
            ),
            Error::FiducialUnset => write!(f, "Fiducial not set"),
            Error::InvalidFiducial(fid) => write!(f, "Invalid fiducial 0x{:x}", fid),
            Error::DuplicateFiducial(fid) => write!(f, "Duplicate fiducial 0x{:x}", fid),
            Error::Collaborator { name, reason } => write!(f, "{}: {}", name, reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } | Error::SendFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenient alias for results using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
