//! FTP module.

use std::io::{self, copy, BufRead, BufReader, Cursor, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

use super::data_stream::DataStream;
use super::feature::Features;
use super::list::{self, Entry};
use super::passive;
use super::status;
use super::types::{ConnectFailure, FileType, FtpError, Line, Result};

lazy_static! {
    // This regex extracts modification time from MDTM command response.
    static ref MDTM_RE: Regex = Regex::new(r"\b(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})\b").unwrap();

    // This regex extracts file size from SIZE command response.
    static ref SIZE_RE: Regex = Regex::new(r"^\s*(\d+)\s*$").unwrap();
}

/// Stream to interface with the FTP server. This interface is only for the command stream.
///
/// Every data transfer opens its own connection through [`DataStream`].
#[derive(Debug)]
pub struct FtpStream {
    reader: BufReader<TcpStream>,
    /// Address the control connection actually reached; data connections go here.
    host: IpAddr,
    timeout: Option<Duration>,
    features: Features,
    mlsd: bool,
    epsv_disabled: bool,
}

impl FtpStream {
    /// Creates an FTP Stream.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<FtpStream> {
        let stream = TcpStream::connect(addr).map_err(dial_error)?;
        FtpStream::handshake(stream, None)
    }

    /// Creates an FTP Stream, giving up on each address after `timeout`.
    ///
    /// The same timeout bounds every data connection dialed later.
    pub fn connect_timeout<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<FtpStream> {
        let mut last_err = None;
        for addr in addr.to_socket_addrs().map_err(dial_error)? {
            debug!("Connecting to server {}", addr);
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return FtpStream::handshake(stream, Some(timeout)),
                Err(err) => last_err = Some(err),
            }
        }
        Err(dial_error(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        })))
    }

    fn handshake(stream: TcpStream, timeout: Option<Duration>) -> Result<FtpStream> {
        let host = stream.peer_addr().map_err(dial_error)?.ip();
        let mut ftp_stream = FtpStream {
            reader: BufReader::new(stream),
            host,
            timeout,
            features: Features::default(),
            mlsd: false,
            epsv_disabled: false,
        };

        let greeting = ftp_stream.read_reply().map_err(|err| match err {
            FtpError::ConnectionError(err) => FtpError::ConnectError(ConnectFailure::Handshake(err)),
            FtpError::InvalidResponse(line) => FtpError::ConnectError(ConnectFailure::Greeting(line)),
            err => err,
        })?;
        if greeting.0 != status::READY {
            return Err(FtpError::ConnectError(ConnectFailure::Greeting(greeting)));
        }
        debug!("Server READY; greeting: {}", greeting);

        ftp_stream.negotiate_features()?;
        Ok(ftp_stream)
    }

    /// Issues `FEAT` and records what the server supports.
    fn negotiate_features(&mut self) -> Result<()> {
        let reply = self.command(None, "FEAT")?;
        self.features = Features::from_reply(&reply);
        self.mlsd = self.features.contains("MLST");
        debug!(
            "Server features: {:?}; MLSD {}",
            self.features.names().collect::<Vec<_>>(),
            if self.mlsd { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        self.reader.get_ref()
    }

    /// Capabilities advertised by the server right after connecting.
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Log in to the FTP server.
    ///
    /// On success the transfer type is switched to binary, and to UTF-8 paths when
    /// the server advertises `UTF8`.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        debug!("Signing in with user '{}'", user);
        let reply = self.command(None, &format!("USER {}", user))?;
        match reply.0 {
            status::LOGGED_IN => {}
            status::NEED_PASSWORD => {
                debug!("Password is required");
                self.command(Some(status::LOGGED_IN), &format!("PASS {}", password))?;
            }
            _ => return Err(FtpError::LoginFailed(reply)),
        }
        debug!("Login OK");

        self.transfer_type(FileType::Binary)?;
        self.set_utf8()
    }

    fn set_utf8(&mut self) -> Result<()> {
        if !self.features.contains("UTF8") {
            return Ok(());
        }
        // Some servers advertise UTF8 but answer 202 because it is always on.
        self.command(None, "OPTS UTF8 ON").and_then(|reply| match reply.0 {
            status::COMMAND_OK | status::COMMAND_NOT_IMPLEMENTED => Ok(()),
            _ => Err(FtpError::ProtocolError {
                expected: vec![status::COMMAND_OK, status::COMMAND_NOT_IMPLEMENTED],
                response: reply,
            }),
        })
    }

    /// Change the current directory to the path specified.
    pub fn cwd(&mut self, path: &str) -> Result<()> {
        self.command(Some(status::REQUESTED_FILE_ACTION_OK), &format!("CWD {}", path))
            .map(|_| ())
    }

    /// Move the current directory to the parent directory.
    pub fn cdup(&mut self) -> Result<()> {
        self.write_line("CDUP")?;
        self.read_response_in(&[status::COMMAND_OK, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| ())
    }

    /// Gets the current directory
    pub fn pwd(&mut self) -> Result<String> {
        let reply = self.command(Some(status::PATH_CREATED), "PWD")?;
        match (reply.1.find('"'), reply.1.rfind('"')) {
            (Some(begin), Some(end)) if begin < end => Ok(reply.1[begin + 1..end].to_string()),
            _ => Err(FtpError::InvalidResponse(reply)),
        }
    }

    /// This does nothing. This is usually just used to keep the connection open.
    pub fn noop(&mut self) -> Result<()> {
        self.command(Some(status::COMMAND_OK), "NOOP").map(|_| ())
    }

    /// This creates a new directory on the server.
    pub fn mkdir(&mut self, pathname: &str) -> Result<()> {
        self.command(Some(status::PATH_CREATED), &format!("MKD {}", pathname))
            .map(|_| ())
    }

    /// Removes the remote pathname from the server.
    pub fn rmdir(&mut self, pathname: &str) -> Result<()> {
        self.command(Some(status::REQUESTED_FILE_ACTION_OK), &format!("RMD {}", pathname))
            .map(|_| ())
    }

    /// Remove the remote file from the server.
    pub fn rm(&mut self, filename: &str) -> Result<()> {
        self.command(Some(status::REQUESTED_FILE_ACTION_OK), &format!("DELE {}", filename))
            .map(|_| ())
    }

    /// Renames the file from_name to to_name
    pub fn rename(&mut self, from_name: &str, to_name: &str) -> Result<()> {
        self.command(Some(status::REQUEST_FILE_PENDING), &format!("RNFR {}", from_name))?;
        self.command(Some(status::REQUESTED_FILE_ACTION_OK), &format!("RNTO {}", to_name))
            .map(|_| ())
    }

    /// Sets the type of file to be transferred. That is the implementation
    /// of `TYPE` command.
    pub fn transfer_type(&mut self, file_type: FileType) -> Result<()> {
        self.command(Some(status::COMMAND_OK), &format!("TYPE {}", file_type))
            .map(|_| ())
    }

    /// Retrieves the size of the file in bytes at `pathname`.
    pub fn size(&mut self, pathname: &str) -> Result<u64> {
        let reply = self.command(Some(status::FILE), &format!("SIZE {}", pathname))?;
        SIZE_RE
            .captures(&reply.1)
            .and_then(|caps| caps[1].parse::<u64>().ok())
            .ok_or(FtpError::InvalidResponse(reply))
    }

    /// Retrieves the modification time of the file at `pathname`.
    pub fn mdtm(&mut self, pathname: &str) -> Result<DateTime<Utc>> {
        let reply = self.command(Some(status::FILE), &format!("MDTM {}", pathname))?;
        let parsed = MDTM_RE.captures(&reply.1).and_then(|caps| {
            let date = NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            )?;
            let time = NaiveTime::from_hms_opt(
                caps[4].parse().ok()?,
                caps[5].parse().ok()?,
                caps[6].parse().ok()?,
            )?;
            Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
        });
        parsed.ok_or(FtpError::InvalidResponse(reply))
    }

    /// Quits the current FTP session.
    pub fn quit(&mut self) -> Result<()> {
        debug!("Quitting stream");
        self.command(Some(status::CLOSING), "QUIT").map(|_| ())
    }

    /// Logs out with `REIN`, says goodbye with `QUIT` and closes the socket.
    ///
    /// Every step is attempted even if an earlier one failed; the first failure
    /// is returned.
    pub fn close(mut self) -> Result<()> {
        let rein = self.command(Some(status::READY), "REIN").map(|_| ());
        let quit = self.quit();
        let shutdown = self
            .reader
            .get_ref()
            .shutdown(Shutdown::Both)
            .map_err(FtpError::from);
        rein.and(quit).and(shutdown)
    }

    /// Retrieves the file name specified from the server.
    ///
    /// The transfer is completed when the returned stream is finished or dropped.
    pub fn get(&mut self, file_name: &str) -> Result<DataStream<'_>> {
        self.retr_from(file_name, 0)
    }

    /// Like [`FtpStream::get`], but the server skips the first `offset` bytes.
    pub fn retr_from(&mut self, file_name: &str, offset: u64) -> Result<DataStream<'_>> {
        debug!("Retrieving '{}' from offset {}", file_name, offset);
        self.data_command(offset, &format!("RETR {}", file_name))
    }

    /// The implementation of `RETR` command where `filename` is the name of the file
    /// to download from FTP and `reader` is the function which operates with the
    /// data stream opened.
    ///
    /// The completion reply is read even when `reader` fails.
    pub fn retr<F, T>(&mut self, filename: &str, reader: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Read) -> Result<T>,
    {
        let mut data_stream = self.get(filename)?;
        let result = reader(&mut data_stream);
        let finished = data_stream.finish();
        let value = result?;
        finished.map(|_| value)
    }

    /// Simple way to retr a file from the server. This stores the file in memory.
    pub fn simple_retr(&mut self, file_name: &str) -> Result<Cursor<Vec<u8>>> {
        self.retr(file_name, |reader| {
            let mut buffer = Vec::new();
            reader
                .read_to_end(&mut buffer)
                .map(|_| buffer)
                .map_err(FtpError::from)
        })
        .map(Cursor::new)
    }

    /// Send `STOR` and return the data stream the file content must be written to.
    pub fn put_with_stream(&mut self, filename: &str) -> Result<DataStream<'_>> {
        debug!("Put file {}", filename);
        self.data_command(0, &format!("STOR {}", filename))
    }

    /// This stores a file on the server.
    pub fn put<R: Read>(&mut self, filename: &str, r: &mut R) -> Result<()> {
        self.put_from(filename, r, 0)
    }

    /// Stores a file on the server, starting to write at byte `offset`.
    pub fn put_from<R: Read>(&mut self, filename: &str, r: &mut R, offset: u64) -> Result<()> {
        debug!("Put file {} from offset {}", filename, offset);
        let mut data_stream = self.data_command(offset, &format!("STOR {}", filename))?;
        let copied = copy(r, &mut data_stream).map_err(FtpError::from);
        let finished = data_stream.finish();
        copied?;
        finished
    }

    /// Execute `NLST` command which returns the list of file names only.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn nlst(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        self.list_command(with_path("NLST", pathname))
    }

    /// Lists the directory at `pathname`, or the current one.
    ///
    /// `MLSD` is used when the server advertised `MLST`, `LIST` otherwise. Lines
    /// that cannot be parsed are skipped.
    pub fn list(&mut self, pathname: Option<&str>) -> Result<Vec<Entry>> {
        let command = if self.mlsd { "MLSD" } else { "LIST" };
        let parse: fn(&str) -> Result<Entry> = if self.mlsd {
            list::parse_mlsd_line
        } else {
            list::parse_list_line
        };
        let lines = self.list_command(with_path(command, pathname))?;
        Ok(lines
            .iter()
            .filter_map(|line| match parse(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    trace!("skipping listing line: {}", err);
                    None
                }
            })
            .collect())
    }

    /// Execute a command which returns list of strings in a separate stream
    fn list_command(&mut self, command: String) -> Result<Vec<String>> {
        let mut data_stream = self.data_command(0, &command)?;
        let lines = read_lines(&mut data_stream).map_err(FtpError::from);
        let finished = data_stream.finish();
        let lines = lines?;
        finished.map(|_| lines)
    }

    /// Opens a data connection, then issues `command` which uses it.
    fn data_command(&mut self, offset: u64, command: &str) -> Result<DataStream<'_>> {
        let stream = self.open_data_connection()?;
        if offset > 0 {
            self.command(Some(status::REQUEST_FILE_PENDING), &format!("REST {}", offset))?;
        }
        let reply = self.command(None, command)?;
        if reply.0 != status::ABOUT_TO_SEND && reply.0 != status::ALREADY_OPEN {
            return Err(FtpError::ProtocolError {
                expected: vec![status::ABOUT_TO_SEND, status::ALREADY_OPEN],
                response: reply,
            });
        }
        Ok(DataStream::new(stream, self))
    }

    fn open_data_connection(&mut self) -> Result<TcpStream> {
        let addr = SocketAddr::new(self.host, self.data_port()?);
        debug!("Opening data connection to {}", addr);
        let stream = match self.timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        Ok(stream)
    }

    /// Asks the server for a data port, with `EPSV` until it fails once, `PASV` after.
    fn data_port(&mut self) -> Result<u16> {
        if !self.epsv_disabled {
            match self.epsv() {
                Ok(port) => return Ok(port),
                Err(err) => {
                    debug!("EPSV failed ({}); using PASV from now on", err);
                    self.epsv_disabled = true;
                }
            }
        }
        self.pasv()
    }

    fn epsv(&mut self) -> Result<u16> {
        let reply = self.command(Some(status::EXTENDED_PASSIVE_MODE), "EPSV")?;
        passive::parse_epsv(&reply)
    }

    fn pasv(&mut self) -> Result<u16> {
        let reply = self.command(Some(status::PASSIVE_MODE), "PASV")?;
        passive::parse_pasv(&reply)
    }

    /// Sends one command line and reads its reply.
    ///
    /// With `Some(code)` any other reply code is a `ProtocolError`; with `None`
    /// every reply is returned as is.
    pub fn command(&mut self, expected: Option<u32>, command: &str) -> Result<Line> {
        self.write_line(command)?;
        match expected {
            Some(code) => self.read_response(code),
            None => self.read_reply(),
        }
    }

    fn write_line(&mut self, command: &str) -> Result<()> {
        if command.starts_with("PASS ") {
            debug!("CMD PASS ******");
        } else {
            debug!("CMD {}", command);
        }

        let stream = self.reader.get_mut();
        stream.write_all(format!("{}\r\n", command).as_bytes())?;
        Ok(())
    }

    pub fn read_response(&mut self, expected_code: u32) -> Result<Line> {
        self.read_response_in(&[expected_code])
    }

    /// Reads one reply and checks its code against `expected_code`.
    pub fn read_response_in(&mut self, expected_code: &[u32]) -> Result<Line> {
        let reply = self.read_reply()?;
        if expected_code.iter().any(|ec| reply.0 == *ec) {
            Ok(reply)
        } else {
            Err(FtpError::ProtocolError {
                expected: expected_code.to_vec(),
                response: reply,
            })
        }
    }

    /// Reads one logical reply, joining the lines of a multi-line reply.
    fn read_reply(&mut self) -> Result<Line> {
        let first = self.read_line()?;
        let code = match first.get(..3) {
            Some(code) if code.bytes().all(|b| b.is_ascii_digit()) => code.to_string(),
            _ => return Err(FtpError::InvalidResponse(Line(0, first))),
        };
        let separator = first.as_bytes().get(3).copied();
        let number = match (code.parse::<u32>(), separator) {
            (Ok(number), None) | (Ok(number), Some(b' ')) | (Ok(number), Some(b'-')) => number,
            _ => return Err(FtpError::InvalidResponse(Line(0, first))),
        };
        let mut message = first.get(4..).unwrap_or("").to_string();

        // multiple line reply
        // loop until a line begins with the code and a space
        if separator == Some(b'-') {
            let last = format!("{} ", code);
            let continued = format!("{}-", code);
            loop {
                let line = self.read_line()?;
                let done = line == code || line.starts_with(&last);
                message.push('\n');
                match line.get(..4) {
                    Some(prefix) if prefix == last || prefix == continued => {
                        message.push_str(&line[4..])
                    }
                    _ if line == code => {}
                    _ => message.push_str(&line),
                }
                if done {
                    break;
                }
            }
        }
        Ok(Line(number, message))
    }

    fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Err(FtpError::ConnectionError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "control connection closed by server",
            )));
        }
        let line = decode_line(&buf);
        trace!("FTP {}", line);
        Ok(line)
    }
}

fn dial_error(err: io::Error) -> FtpError {
    match err.kind() {
        io::ErrorKind::TimedOut => FtpError::Timeout(err),
        _ => FtpError::ConnectError(ConnectFailure::Dial(err)),
    }
}

fn with_path(command: &str, pathname: Option<&str>) -> String {
    match pathname {
        Some(path) => format!("{} {}", command, path),
        None => command.to_string(),
    }
}

/// Splits a data stream into lines, tolerating `\n` or `\r\n` and invalid UTF-8.
fn read_lines<R: Read>(reader: R) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lines.push(decode_line(&buf));
    }
    Ok(lines)
}

/// Servers send paths in whatever encoding they like; bytes that are not
/// UTF-8 become U+FFFD so a line is never lost.
fn decode_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches(&['\r', '\n'][..])
        .to_string()
}
