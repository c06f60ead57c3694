//! Scripted FTP server for tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pretty_assertions::assert_eq;

/// A server thread accepting one control connection and running a script on it.
pub struct MockServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub fn serve<F>(script: F) -> MockServer
    where
        F: FnOnce(&mut Session) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut session = Session {
                reader: BufReader::new(stream),
            };
            script(&mut session);
        });
        MockServer { addr, handle }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the script to end, failing the test if it panicked.
    pub fn join(self) {
        self.handle.join().expect("mock server script failed");
    }
}

pub struct Session {
    reader: BufReader<TcpStream>,
}

impl Session {
    pub fn send(&mut self, line: &str) {
        let stream = self.reader.get_mut();
        stream.write_all(format!("{}\r\n", line).as_bytes()).unwrap();
    }

    /// Sends a line that need not be valid UTF-8.
    pub fn send_raw(&mut self, line: &[u8]) {
        let stream = self.reader.get_mut();
        stream.write_all(line).unwrap();
        stream.write_all(b"\r\n").unwrap();
    }

    pub fn recv(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line.trim_end_matches(&['\r', '\n'][..]).to_string()
    }

    pub fn expect(&mut self, command: &str) {
        assert_eq!(self.recv(), command);
    }

    pub fn reply(&mut self, command: &str, reply: &str) {
        self.expect(command);
        self.send(reply);
    }

    /// Greeting plus a `FEAT` reply listing `features`.
    pub fn greet(&mut self, features: &[&str]) {
        self.send("220 mock ready");
        self.expect("FEAT");
        if features.is_empty() {
            self.send("502 FEAT not implemented");
            return;
        }
        self.send("211-Features:");
        for feature in features {
            self.send(&format!(" {}", feature));
        }
        self.send("211 End");
    }

    /// Answers `EPSV` with the port of a fresh data listener.
    pub fn epsv(&mut self) -> TcpListener {
        self.expect("EPSV");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        self.send(&format!("229 Entering Extended Passive Mode (|||{}|)", port));
        listener
    }

    /// Answers `PASV` with a fresh data listener's port and an unroutable address.
    pub fn pasv(&mut self) -> TcpListener {
        self.expect("PASV");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        self.send(&format!(
            "227 Entering Passive Mode (192,0,2,1,{},{}).",
            port >> 8,
            port & 0xff
        ));
        listener
    }

    /// Sends `data` over the next data connection, then reports completion.
    pub fn send_data(&mut self, listener: TcpListener, data: &[u8]) {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = stream.write_all(data);
        drop(stream);
        self.send("226 Transfer complete");
    }

    /// Sends `data` over the next data connection, then resets it instead of
    /// closing and reports the aborted transfer.
    pub fn reset_data(&mut self, listener: TcpListener, data: &[u8]) {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = stream.write_all(data);
        socket2::SockRef::from(&stream)
            .set_linger(Some(Duration::from_secs(0)))
            .unwrap();
        drop(stream);
        self.send("426 Connection closed; transfer aborted");
    }

    /// Reads the next data connection to its end, then reports completion.
    pub fn receive_data(&mut self, listener: TcpListener) -> Vec<u8> {
        let (mut stream, _) = listener.accept().unwrap();
        let mut data = Vec::new();
        stream.read_to_end(&mut data).unwrap();
        self.send("226 Transfer complete");
        data
    }

    /// Blocks until the client closes the control connection.
    pub fn wait_hangup(&mut self) {
        let mut rest = Vec::new();
        let _ = self.reader.read_to_end(&mut rest);
    }
}
