//! Parsers for directory listing lines.
//!
//! Servers disagree on what `LIST` prints. Three shapes are understood, tried in
//! this order:
//!
//! - RFC 3659 facts, as sent by `MLSD`: `type=file;size=12;modify=20200101120000; name`
//! - `ls -l` style output of UNIX-like servers, including a few vendor variants
//! - MS-DOS `DIR` style output: `01-01-20  10:00AM <DIR> name`
//!
//! A line that none of them accepts is dropped by `FtpStream::list`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use super::types::{FtpError, Result};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Folder,
    Symlink,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub entry_type: EntryType,
    /// Size in bytes; only meaningful for files.
    pub size: u64,
    /// Last modification time, when the line carries one.
    pub time: Option<DateTime<Utc>>,
}

impl Entry {
    fn new(entry_type: EntryType, name: String) -> Entry {
        Entry {
            name,
            entry_type,
            size: 0,
            time: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_folder(&self) -> bool {
        self.entry_type == EntryType::Folder
    }
}

impl FromStr for Entry {
    type Err = FtpError;

    fn from_str(line: &str) -> Result<Entry> {
        parse_list_line(line)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntryType::File => write!(f, "file"),
            EntryType::Folder => write!(f, "folder"),
            EntryType::Symlink => write!(f, "symlink"),
        }
    }
}

/// Outcome of a single recognizer.
#[derive(Debug, PartialEq)]
enum Recognized {
    Entry(Entry),
    /// The line is not in this recognizer's format.
    Unsupported,
    /// The line looks like this format but a field is broken.
    Malformed,
}

type Recognizer = fn(&str) -> Recognized;

const LIST_RECOGNIZERS: [Recognizer; 3] = [recognize_facts, recognize_ls, recognize_dir];
const MLSD_RECOGNIZERS: [Recognizer; 1] = [recognize_facts];

/// `DIR` timestamp prefixes, with the width of the text they cover. Runs of
/// blanks inside the prefix are squeezed to one before parsing.
const DIR_TIME_FORMATS: [(&str, usize); 2] = [
    // 01-02-06  03:04PM
    ("%m-%d-%y %I:%M%p", 17),
    // 2006-01-02  15:04
    ("%Y-%m-%d %H:%M", 17),
];

/// Parses a line of `LIST` output with every known recognizer.
pub fn parse_list_line(line: &str) -> Result<Entry> {
    parse_with(&LIST_RECOGNIZERS, line)
}

/// Parses a line of `MLSD` output.
pub fn parse_mlsd_line(line: &str) -> Result<Entry> {
    parse_with(&MLSD_RECOGNIZERS, line)
}

fn parse_with(recognizers: &[Recognizer], line: &str) -> Result<Entry> {
    for recognize in recognizers {
        match recognize(line) {
            Recognized::Entry(entry) => return Ok(entry),
            Recognized::Unsupported | Recognized::Malformed => continue,
        }
    }
    Err(FtpError::FormatError(line.to_string()))
}

fn recognize_facts(line: &str) -> Recognized {
    let space = match (line.find(';'), line.find(' ')) {
        (Some(semicolon), Some(space)) if semicolon < space => space,
        _ => return Recognized::Unsupported,
    };

    let mut entry = Entry::new(EntryType::File, line[space + 1..].to_string());
    let facts = line[..space].trim_end_matches(';');
    for fact in facts.split(';') {
        let (key, value) = match fact.find('=') {
            Some(i) if i > 0 => (fact[..i].to_ascii_lowercase(), &fact[i + 1..]),
            _ => return Recognized::Unsupported,
        };
        match key.as_str() {
            "modify" => match parse_fact_time(value) {
                Some(time) => entry.time = Some(time),
                None => return Recognized::Malformed,
            },
            "type" => match value.to_ascii_lowercase().as_str() {
                "dir" | "cdir" | "pdir" => entry.entry_type = EntryType::Folder,
                "file" => entry.entry_type = EntryType::File,
                _ => {}
            },
            "size" => match value.parse::<u64>() {
                Ok(size) => entry.size = size,
                Err(_) => return Recognized::Malformed,
            },
            _ => {}
        }
    }
    Recognized::Entry(entry)
}

/// `YYYYMMDDHHMMSS[.sss]`, always UTC.
fn parse_fact_time(value: &str) -> Option<DateTime<Utc>> {
    let whole = value.split('.').next().unwrap_or(value);
    NaiveDateTime::parse_from_str(whole, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn recognize_ls(line: &str) -> Recognized {
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() >= 7 && fields[1] == "folder" && fields[2] == "0" {
        let mut entry = Entry::new(EntryType::Folder, fields[6..].join(" "));
        return match parse_ls_time(&fields[3..6]) {
            Some(time) => {
                entry.time = Some(time);
                Recognized::Entry(entry)
            }
            None => Recognized::Malformed,
        };
    }

    if fields.len() < 8 {
        return Recognized::Unsupported;
    }

    if fields[1] == "0" {
        let mut entry = Entry::new(EntryType::File, fields[7..].join(" "));
        return match (fields[2].parse::<u64>(), parse_ls_time(&fields[4..7])) {
            (Ok(size), Some(time)) => {
                entry.size = size;
                entry.time = Some(time);
                Recognized::Entry(entry)
            }
            _ => Recognized::Malformed,
        };
    }

    if fields.len() < 9 {
        return Recognized::Unsupported;
    }

    let entry_type = match fields[0].chars().next() {
        Some('-') => EntryType::File,
        Some('d') => EntryType::Folder,
        Some('l') => EntryType::Symlink,
        _ => return Recognized::Malformed,
    };
    let mut entry = Entry::new(entry_type, fields[8..].join(" "));
    if entry_type == EntryType::File {
        match fields[4].parse::<u64>() {
            Ok(size) => entry.size = size,
            Err(_) => return Recognized::Malformed,
        }
    }
    match parse_ls_time(&fields[5..8]) {
        Some(time) => entry.time = Some(time),
        None => return Recognized::Malformed,
    }
    Recognized::Entry(entry)
}

/// Parses `[month, day, year | HH:MM]`.
///
/// Recent files show a time of day instead of a year; they are assumed to be
/// from the current year.
fn parse_ls_time(fields: &[&str]) -> Option<DateTime<Utc>> {
    let (month, day, last) = (fields[0], fields[1], fields[2]);
    let (year, time) = if last.contains(':') {
        (Utc::now().year(), NaiveTime::parse_from_str(last, "%H:%M").ok()?)
    } else {
        if last.len() != 4 {
            return None;
        }
        (last.parse::<i32>().ok()?, NaiveTime::from_hms_opt(0, 0, 0)?)
    };
    let date = NaiveDate::parse_from_str(&format!("{} {} {}", year, month, day), "%Y %b %d").ok()?;
    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

fn recognize_dir(line: &str) -> Recognized {
    let mut parsed = None;
    for (format, width) in DIR_TIME_FORMATS.iter() {
        if line.len() <= *width {
            continue;
        }
        let prefix = match line.get(..*width) {
            Some(prefix) => prefix,
            None => continue,
        };
        let prefix = prefix.split_whitespace().collect::<Vec<_>>().join(" ");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&prefix, format) {
            parsed = Some((Utc.from_utc_datetime(&naive), &line[*width..]));
            break;
        }
    }
    let (time, rest) = match parsed {
        Some(parsed) => parsed,
        None => return Recognized::Unsupported,
    };

    let rest = rest.trim_start();
    let mut entry = if let Some(name) = rest.strip_prefix("<DIR>") {
        Entry::new(EntryType::Folder, name.trim_start().to_string())
    } else {
        let space = match rest.find(' ') {
            Some(space) => space,
            None => return Recognized::Unsupported,
        };
        let size = match rest[..space].parse::<u64>() {
            Ok(size) => size,
            Err(_) => return Recognized::Unsupported,
        };
        let mut entry = Entry::new(EntryType::File, rest[space..].trim_start().to_string());
        entry.size = size;
        entry
    };
    entry.time = Some(time);
    Recognized::Entry(entry)
}
