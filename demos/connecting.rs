use std::env;
use std::io::Cursor;
use std::time::Duration;

use ftp_client::{FtpError, FtpStream};

fn test_ftp(addr: &str, user: &str, pass: &str) -> Result<(), FtpError> {
    let mut ftp_stream = FtpStream::connect_timeout((addr, 21), Duration::from_secs(10))?;
    ftp_stream.login(user, pass)?;
    println!("current dir: {}", ftp_stream.pwd()?);
    println!("features: {:?}", ftp_stream.features().names().collect::<Vec<_>>());

    for entry in ftp_stream.list(None)? {
        println!("{:<8} {:>10} {}", entry.entry_type, entry.size, entry.name);
    }

    ftp_stream.cwd("test_data")?;

    // An easy way to retrieve a file
    let cursor = ftp_stream.simple_retr("ftpext-charter.txt")?;
    let vec = cursor.into_inner();
    println!("got data: {}", String::from_utf8_lossy(&vec));

    // Store a file
    let file_data = "Some awesome file data man!!".to_string();
    let mut reader = Cursor::new(file_data.into_bytes());
    ftp_stream.put("my_random_file.txt", &mut reader)?;

    ftp_stream.close()
}

fn main() {
    env_logger::init();
    let host = env::args().nth(1).unwrap_or_else(|| "127.0.0.1".to_string());
    test_ftp(&host, "Doe", "mumble").unwrap_or_else(|err| panic!("{}", err));
    println!("test successful")
}
