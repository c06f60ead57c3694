//! Error type, reply lines and the values of the `TYPE` command

use std::fmt;
use std::io;

use thiserror::Error;

/// A shorthand for a Result whose error type is always an FtpError.
pub type Result<T> = ::std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while using FTP.
#[derive(Debug, Error)]
pub enum FtpError {
    /// The control connection could not be established.
    #[error("FTP ConnectError: {0}")]
    ConnectError(ConnectFailure),
    /// I/O failure on an established control or data connection.
    #[error("FTP ConnectionError: {0}")]
    ConnectionError(#[source] io::Error),
    /// A socket deadline expired.
    #[error("FTP Timeout: {0}")]
    Timeout(#[source] io::Error),
    /// The server answered with a code the operation does not accept.
    #[error("FTP ProtocolError: expected code {expected:?}, got response: {response}")]
    ProtocolError { expected: Vec<u32>, response: Line },
    /// The reply could not be understood.
    #[error("FTP InvalidResponse: {0}")]
    InvalidResponse(Line),
    #[error("FTP LoginFailed: {0}")]
    LoginFailed(Line),
    /// No listing recognizer accepted the line.
    #[error("FTP FormatError: unsupported listing line: {0:?}")]
    FormatError(String),
}

/// Why `connect` failed.
#[derive(Debug, Error)]
pub enum ConnectFailure {
    #[error("{0}")]
    Dial(#[source] io::Error),
    /// The connection broke before a greeting arrived.
    #[error("no greeting: {0}")]
    Handshake(#[source] io::Error),
    #[error("unexpected greeting: {0}")]
    Greeting(Line),
}

impl From<io::Error> for FtpError {
    fn from(err: io::Error) -> FtpError {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FtpError::Timeout(err),
            _ => FtpError::ConnectionError(err),
        }
    }
}

impl FtpError {
    /// Returns the server reply carried by the error, if any.
    pub fn response(&self) -> Option<&Line> {
        match self {
            FtpError::ConnectError(ConnectFailure::Greeting(line))
            | FtpError::ProtocolError { response: line, .. }
            | FtpError::InvalidResponse(line)
            | FtpError::LoginFailed(line) => Some(line),
            _ => None,
        }
    }
}

/// Text Format Control used in `TYPE` command
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatControl {
    /// Default text format control (is NonPrint)
    Default,
    /// Non-print (not destined for printing)
    NonPrint,
    /// Telnet format control (\<CR\>, \<FF\>, etc.)
    Telnet,
    /// ASA (Fortran) Carriage Control
    Asa,
}

/// File Type used in `TYPE` command
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileType {
    /// ASCII text (the argument is the text format control)
    Ascii(FormatControl),
    /// EBCDIC text (the argument is the text format control)
    Ebcdic(FormatControl),
    /// Image,
    Image,
    /// Binary (the synonym to Image)
    Binary,
    /// Local format (the argument is the number of bits in one byte on local machine)
    Local(u8),
}

/// `Line` is one logical server reply: the status code and the message text.
///
/// For multi-line replies the message holds every line joined with `\n`,
/// with the leading code stripped from the lines that carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(pub u32, pub String);

impl fmt::Display for FormatControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatControl::Default | FormatControl::NonPrint => write!(f, "N"),
            FormatControl::Telnet => write!(f, "T"),
            FormatControl::Asa => write!(f, "C"),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileType::Ascii(fc) => write!(f, "A {}", fc),
            FileType::Ebcdic(fc) => write!(f, "E {}", fc),
            FileType::Image | FileType::Binary => write!(f, "I"),
            FileType::Local(bits) => write!(f, "L {}", bits),
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.0, self.1)
    }
}
