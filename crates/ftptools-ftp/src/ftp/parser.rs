//! Directory-listing and metadata parsing.
//!
//! Listing lines are recognised in this order:
//! 1. MLSD facts (RFC 3659): `type=file;size=1234;modify=20260101120000; file.txt`
//! 2. Unix `ls -l`: `-rwxr-xr-x 1 owner group 1234 Jan  1 12:00 file.txt`
//! 3. DOS / IIS: `01-01-26  12:00AM       1234 file.txt`
//!
//! Anything else becomes a name-only entry of unknown type.

use crate::ftp::types::{FtpEntry, FtpEntryKind};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref UNIX_LINE: Regex = Regex::new(
        r"(?x)
        ^([dlcbps-][rwxsStT-]{9})[@+.]?\s+   # permissions
        (\d+)\s+                             # link count
        (\S+)\s+                             # owner
        (\S+)\s+                             # group
        (\d+)\s+                             # size
        ([A-Za-z]{3}\s+\d{1,2}\s+[\d:]+)\s+  # date
        (.+)$                                # name (maybe with -> target)
        "
    )
    .expect("static regex");
    static ref DOS_LINE: Regex = Regex::new(
        r"(?x)
        ^(\d{2}-\d{2}-\d{2,4})\s+            # date
        (\d{1,2}:\d{2}(?:AM|PM)?)\s+         # time
        (<DIR>|\d+)\s+                       # size or <DIR>
        (.+)$                                # name
        "
    )
    .expect("static regex");
}

/// Parse a full LIST or MLSD response body. `.` / `..` and MLSD
/// `cdir`/`pdir` entries are dropped.
pub fn parse_listing(raw: &str) -> Vec<FtpEntry> {
    raw.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty() && !is_total_line(l))
        .filter_map(parse_line)
        .filter(|e| e.name != "." && e.name != "..")
        .collect()
}

/// `total 42` header emitted by `ls -l` style servers.
fn is_total_line(line: &str) -> bool {
    line.strip_prefix("total ")
        .map_or(false, |rest| rest.trim().bytes().all(|b| b.is_ascii_digit()))
}

fn parse_line(line: &str) -> Option<FtpEntry> {
    if line.contains(';') && line.contains('=') {
        if let Some(parsed) = parse_mlsd(line) {
            return parsed;
        }
    }
    let line = line.trim_start();
    parse_unix(line)
        .or_else(|| parse_dos(line))
        .or_else(|| Some(FtpEntry::name_only(line)))
}

// ─── MLSD ────────────────────────────────────────────────────────────

/// `Some(None)` means the line parsed but names the listed directory itself.
fn parse_mlsd(line: &str) -> Option<Option<FtpEntry>> {
    let (facts_str, name) = line.split_once(' ')?;
    if name.is_empty() || !facts_str.contains('=') {
        return None;
    }

    let facts: HashMap<String, String> = facts_str
        .split(';')
        .filter_map(|segment| segment.trim().split_once('='))
        .map(|(k, v)| (k.to_lowercase(), v.to_string()))
        .collect();

    let kind = match facts.get("type").map(|s| s.to_lowercase()).as_deref() {
        Some("cdir") | Some("pdir") => return Some(None),
        Some("dir") => FtpEntryKind::Directory,
        Some("file") => FtpEntryKind::File,
        Some(t) if t.contains("link") => FtpEntryKind::Symlink,
        _ => FtpEntryKind::Unknown,
    };

    Some(Some(FtpEntry {
        name: name.to_string(),
        kind,
        size: facts
            .get("size")
            .or_else(|| facts.get("sizd"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        modified: facts.get("modify").and_then(|v| parse_mlsd_time(v)),
        permissions: facts
            .get("unix.mode")
            .or_else(|| facts.get("perm"))
            .cloned(),
        owner: facts.get("unix.owner").cloned(),
        group: facts.get("unix.group").cloned(),
        link_target: None,
        raw: Some(line.to_string()),
        facts,
    }))
}

/// Parse an RFC 3659 time-val `YYYYMMDDHHMMSS[.sss]` (always UTC).
pub fn parse_mlsd_time(s: &str) -> Option<DateTime<Utc>> {
    let base = s.trim().get(..14)?;
    NaiveDateTime::parse_from_str(base, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Extract the time-val from an MDTM reply such as `213 20240101120000`.
pub fn parse_mdtm_reply(text: &str) -> Option<(String, DateTime<Utc>)> {
    let value = text
        .lines()
        .last()?
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim();
    let value = value.split_whitespace().next()?;
    let parsed = parse_mlsd_time(value)?;
    Some((value.get(..14)?.to_string(), parsed))
}

/// Render a timestamp as an MDTM time-val.
pub fn format_mdtm(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d%H%M%S").to_string()
}

// ─── Unix ────────────────────────────────────────────────────────────

fn parse_unix(line: &str) -> Option<FtpEntry> {
    let caps = UNIX_LINE.captures(line)?;

    let perms = caps.get(1)?.as_str();
    let name_raw = caps.get(7)?.as_str();

    let kind = match perms.as_bytes().first() {
        Some(b'd') => FtpEntryKind::Directory,
        Some(b'l') => FtpEntryKind::Symlink,
        Some(b'-') => FtpEntryKind::File,
        _ => FtpEntryKind::Unknown,
    };

    let (name, link_target) = match (kind, name_raw.split_once(" -> ")) {
        (FtpEntryKind::Symlink, Some((n, t))) => (n.to_string(), Some(t.to_string())),
        _ => (name_raw.to_string(), None),
    };

    Some(FtpEntry {
        name,
        kind,
        size: caps.get(5)?.as_str().parse().unwrap_or(0),
        modified: parse_unix_date(caps.get(6)?.as_str(), Utc::now()),
        permissions: Some(perms.to_string()),
        owner: caps.get(3).map(|m| m.as_str().to_string()),
        group: caps.get(4).map(|m| m.as_str().to_string()),
        link_target,
        raw: Some(line.to_string()),
        facts: HashMap::new(),
    })
}

/// `Jan  1 12:00` (within the last six months) or `Jan  1  2025`.
fn parse_unix_date(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let normalised = s.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalised.contains(':') {
        let with_year = |year: i32| {
            NaiveDateTime::parse_from_str(&format!("{} {}", year, normalised), "%Y %b %d %H:%M")
                .ok()
                .map(|dt| Utc.from_utc_datetime(&dt))
        };
        let guess = with_year(now.year())?;
        // A date in the future belongs to last year.
        if guess > now + Duration::days(1) {
            return with_year(now.year() - 1);
        }
        return Some(guess);
    }

    let date = NaiveDate::parse_from_str(&normalised, "%b %d %Y").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

// ─── DOS / IIS ───────────────────────────────────────────────────────

fn parse_dos(line: &str) -> Option<FtpEntry> {
    let caps = DOS_LINE.captures(line)?;

    let size_or_dir = caps.get(3)?.as_str();
    let (kind, size) = if size_or_dir == "<DIR>" {
        (FtpEntryKind::Directory, 0)
    } else {
        (FtpEntryKind::File, size_or_dir.parse().unwrap_or(0))
    };

    let stamp = format!("{} {}", caps.get(1)?.as_str(), caps.get(2)?.as_str());
    let modified = ["%m-%d-%y %I:%M%p", "%m-%d-%y %H:%M", "%m-%d-%Y %I:%M%p", "%m-%d-%Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&stamp, fmt).ok())
        .map(|dt| Utc.from_utc_datetime(&dt));

    Some(FtpEntry {
        name: caps.get(4)?.as_str().to_string(),
        kind,
        size,
        modified,
        permissions: None,
        owner: None,
        group: None,
        link_target: None,
        raw: Some(line.to_string()),
        facts: HashMap::new(),
    })
}

// ─── Path helpers ────────────────────────────────────────────────────

/// Split a remote path into (parent, basename). The parent is `None` for a
/// bare name, meaning the working directory.
pub fn split_remote_path(path: &str) -> (Option<String>, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", name)) => (Some("/".to_string()), name.to_string()),
        Some((parent, name)) => (Some(parent.to_string()), name.to_string()),
        None => (None, trimmed.to_string()),
    }
}

/// Find an entry by exact name.
pub fn find_entry<'a>(entries: &'a [FtpEntry], name: &str) -> Option<&'a FtpEntry> {
    entries.iter().find(|e| e.name == name)
}
