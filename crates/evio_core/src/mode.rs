//! Open modes and targets.

use crate::error::{EvioError, EvioResult};
use evio_storage::{BackendKind, InMemoryBackend};
use std::fmt;
use std::net::TcpStream;
use std::path::PathBuf;
use std::str::FromStr;

/// What a session does with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sequential reading.
    Read,
    /// Writing from scratch.
    Write,
    /// Writing after existing data.
    Append,
    /// Indexed, memory-mapped reading.
    RandomAccess,
}

impl Mode {
    /// Returns true for modes that produce data.
    #[must_use]
    pub const fn is_writing(self) -> bool {
        matches!(self, Self::Write | Self::Append)
    }
}

/// A parsed open-mode string such as `"r"`, `"wb"` or `"ws"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Direction of the session.
    pub mode: Mode,
    /// Kind of target.
    pub backend: BackendKind,
    /// Whether output files are split by size.
    pub split: bool,
}

impl FromStr for OpenFlags {
    type Err = EvioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mode, backend, split) = match s.to_ascii_lowercase().as_str() {
            "r" => (Mode::Read, BackendKind::File, false),
            "w" => (Mode::Write, BackendKind::File, false),
            "s" => (Mode::Write, BackendKind::File, true),
            "a" => (Mode::Append, BackendKind::File, false),
            "ra" => (Mode::RandomAccess, BackendKind::File, false),
            "rb" => (Mode::Read, BackendKind::Memory, false),
            "wb" => (Mode::Write, BackendKind::Memory, false),
            "ab" => (Mode::Append, BackendKind::Memory, false),
            "rab" => (Mode::RandomAccess, BackendKind::Memory, false),
            "rs" => (Mode::Read, BackendKind::Socket, false),
            "ws" => (Mode::Write, BackendKind::Socket, false),
            _ => return Err(EvioError::bad_argument(format!("unknown open mode {s:?}"))),
        };
        Ok(Self {
            mode,
            backend,
            split,
        })
    }
}

impl fmt::Display for OpenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Read => "read",
            Mode::Write if self.split => "split-write",
            Mode::Write => "write",
            Mode::Append => "append",
            Mode::RandomAccess => "random-access",
        };
        write!(f, "{} {mode}", self.backend)
    }
}

/// Where a session reads or writes.
#[derive(Debug)]
pub enum Target {
    /// A file path, or a file name template when writing.
    File(PathBuf),
    /// A shared in-memory buffer.
    Buffer(InMemoryBackend),
    /// A connected TCP stream.
    Socket(TcpStream),
}

impl Target {
    /// Kind of backend this target needs.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::File(_) => BackendKind::File,
            Self::Buffer(_) => BackendKind::Memory,
            Self::Socket(_) => BackendKind::Socket,
        }
    }

    pub(crate) fn check(&self, flags: OpenFlags) -> EvioResult<()> {
        if self.kind() != flags.backend {
            return Err(EvioError::bad_argument(format!(
                "{} target cannot be opened as {flags}",
                self.kind()
            )));
        }
        Ok(())
    }
}

impl From<PathBuf> for Target {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&std::path::Path> for Target {
    fn from(path: &std::path::Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<InMemoryBackend> for Target {
    fn from(buffer: InMemoryBackend) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<TcpStream> for Target {
    fn from(stream: TcpStream) -> Self {
        Self::Socket(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_modes() {
        let cases = [
            ("r", Mode::Read, BackendKind::File),
            ("W", Mode::Write, BackendKind::File),
            ("a", Mode::Append, BackendKind::File),
            ("Ra", Mode::RandomAccess, BackendKind::File),
            ("rb", Mode::Read, BackendKind::Memory),
            ("wb", Mode::Write, BackendKind::Memory),
            ("ab", Mode::Append, BackendKind::Memory),
            ("rab", Mode::RandomAccess, BackendKind::Memory),
            ("rs", Mode::Read, BackendKind::Socket),
            ("ws", Mode::Write, BackendKind::Socket),
        ];
        for (text, mode, backend) in cases {
            let flags: OpenFlags = text.parse().unwrap();
            assert_eq!(flags.mode, mode, "{text}");
            assert_eq!(flags.backend, backend, "{text}");
            assert!(!flags.split);
        }
        let split: OpenFlags = "s".parse().unwrap();
        assert!(split.split);
        assert_eq!(split.mode, Mode::Write);
    }

    #[test]
    fn sockets_cannot_append() {
        assert!("as".parse::<OpenFlags>().is_err());
        assert!("ras".parse::<OpenFlags>().is_err());
        assert!("x".parse::<OpenFlags>().is_err());
    }

    #[test]
    fn target_must_match_mode() {
        let target = Target::Buffer(InMemoryBackend::new());
        assert!(target.check("rb".parse().unwrap()).is_ok());
        assert!(target.check("r".parse().unwrap()).is_err());
    }

    #[test]
    fn display_flags() {
        let flags: OpenFlags = "s".parse().unwrap();
        assert_eq!(flags.to_string(), "file split-write");
    }
}
