use std::path::PathBuf;

/// The error taxonomy of the traversal engine.
///
/// Most variants are recovered locally by the engine (see each module's
/// documentation for how); only [`Error::DebuggerSessionLost`] and
/// [`Error::Io`] are meant to propagate all the way out to a driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identity of a record was already present in the dedup index.
    #[error("identity already found")]
    AlreadyFound,

    /// The referenced value has no observable storage.
    #[error("value is optimized out")]
    OptimizedOut,

    /// Dereferencing or reading a field failed against inferior memory.
    #[error("memory at {address:#x} is unreadable: {reason}")]
    MemoryUnreadable { address: u64, reason: String },

    /// A pointer-shaped value holds the null address.
    #[error("pointer is null")]
    NullPointer,

    /// A pointer did not decode as a printable, null-terminated string.
    #[error("pointer does not point to a printable string")]
    InvalidStringInterpretation,

    /// A symbol's resolution requires a frame and none was supplied.
    #[error("symbol resolution requires a frame")]
    MissingFrame,

    /// The species classifier could not place a debugger type code.
    #[error("unknown species for type code {0:?}")]
    UnknownSpecies(String),

    /// The debugger session ended or became unreachable mid-traversal.
    #[error("debugger session lost: {0}")]
    DebuggerSessionLost(String),

    /// Writing the graph to disk failed.
    #[error("failed to write graph to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True for errors the engine recovers from locally (drop-and-continue);
    /// false for the two fatal variants that must reach the driver.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::DebuggerSessionLost(_) | Error::Io { .. })
    }
}

/// Process exit codes, as specified for the driver binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    DebuggerSessionFailed = 1,
    NoSymbolsOrFrame = 2,
    IoError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
