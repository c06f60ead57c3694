use std::io::{self, Read, Write};
use std::net::TcpStream;

use super::ftp::FtpStream;
use super::status;
use super::types::Result;

/// An open data connection, borrowed from the control stream that negotiated it.
///
/// Closing the socket and reading the transfer's completion reply on the control
/// connection happen together, either through [`DataStream::finish`] or when the
/// value is dropped. Until then the control stream cannot issue new commands.
#[derive(Debug)]
pub struct DataStream<'a> {
    stream: Option<TcpStream>,
    control: &'a mut FtpStream,
}

impl<'a> DataStream<'a> {
    pub(crate) fn new(stream: TcpStream, control: &'a mut FtpStream) -> DataStream<'a> {
        DataStream {
            stream: Some(stream),
            control,
        }
    }

    /// Closes the data connection and waits for the server to confirm the transfer.
    pub fn finish(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(stream) => {
                drop(stream);
                trace!("data connection closed");
                self.control
                    .read_response_in(&[
                        status::CLOSING_DATA_CONNECTION,
                        status::REQUESTED_FILE_ACTION_OK,
                    ])
                    .map(|_| ())
            }
            None => Ok(()),
        }
    }
}

impl Drop for DataStream<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("transfer did not complete cleanly: {}", err);
        }
    }
}

impl Read for DataStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => Ok(0),
        }
    }
}

impl Write for DataStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.write(buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "data connection closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}
