#![crate_name = "ftp_client"]
#![crate_type = "lib"]

//! ftp_client is a synchronous FTP client.
//!
//! Each transfer gets its own passive data connection. `EPSV` is tried first; after
//! the first failure the session sticks to `PASV` and always dials the host the
//! control connection reached, whatever address the server advertises.
//! Directory listings in RFC 3659 (`MLSD`), `ls -l` and MS-DOS `DIR` formats are
//! parsed into [`Entry`] values.
//!
//! ### Usage
//!
//! ```rust,no_run
//! use ftp_client::FtpStream;
//! let mut ftp_stream = FtpStream::connect("127.0.0.1:21").unwrap_or_else(|err|
//!     panic!("{}", err)
//! );
//! ftp_stream.login("anonymous", "anonymous").unwrap();
//! for entry in ftp_stream.list(None).unwrap() {
//!     println!("{} {} {}", entry.entry_type, entry.size, entry.name);
//! }
//! let _ = ftp_stream.close();
//! ```
//!

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod data_stream;
mod feature;
mod ftp;
pub mod list;
mod passive;
pub mod status;
pub mod types;

#[cfg(test)]
mod mock;

pub use self::data_stream::DataStream;
pub use self::feature::Features;
pub use self::ftp::FtpStream;
pub use self::list::{Entry, EntryType};
pub use self::types::{ConnectFailure, FtpError, Line, Result};

#[cfg(test)]
pub(crate) fn log_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
