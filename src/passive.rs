//! Parsers for the `EPSV` and `PASV` replies.

use regex::Regex;

use super::types::{FtpError, Line, Result};

lazy_static! {
    // This regex extracts IP and Port details from PASV command response.
    // The regex looks for the pattern (h1,h2,h3,h4,p1,p2).
    static ref PORT_RE: Regex = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();

    // EPSV response format: 229 Entering Extended Passive Mode (|||port|).
    static ref EPSV_PORT_RE: Regex = Regex::new(r"\|\|\|(\d+)\|").unwrap();
}

/// Extracts the port from a `229` reply.
pub fn parse_epsv(reply: &Line) -> Result<u16> {
    EPSV_PORT_RE
        .captures(&reply.1)
        .and_then(|caps| caps[1].parse::<u16>().ok())
        .ok_or_else(|| FtpError::InvalidResponse(reply.clone()))
}

/// Extracts the port from a `227` reply.
///
/// The advertised host octets are validated but dropped: data connections always
/// go to the host the control connection reached.
pub fn parse_pasv(reply: &Line) -> Result<u16> {
    let caps = PORT_RE
        .captures(&reply.1)
        .ok_or_else(|| FtpError::InvalidResponse(reply.clone()))?;
    let mut octets = [0u8; 6];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = caps[i + 1]
            .parse::<u8>()
            .map_err(|_| FtpError::InvalidResponse(reply.clone()))?;
    }
    let (msb, lsb) = (octets[4], octets[5]);
    Ok(((msb as u16) << 8) + lsb as u16)
}
