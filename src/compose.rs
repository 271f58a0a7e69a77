use chrono::{DateTime, TimeZone};
use rand::Rng;
use std::fmt::Display;
use std::io::{self, Read, Write};

use crate::error::BounceError;
use crate::headers::HeaderStore;

const COPY_CHUNK: usize = 8192;

/// Fixed values stamped into every bounce.
#[derive(Debug, Clone)]
pub struct BounceSettings {
    /// Address used for the `From:` header.
    pub mail_from: String,
    /// Right-hand side of generated `Message-Id`s.
    pub msgid_domain: String,
}

/// Write the bounce header block and the explanation text that precedes the
/// returned copy of the original message.
pub fn write_bounce_header<W, Tz, R>(
    out: &mut W,
    store: &HeaderStore,
    settings: &BounceSettings,
    now: &DateTime<Tz>,
    rng: &mut R,
) -> io::Result<()>
where
    W: Write + ?Sized,
    Tz: TimeZone,
    Tz::Offset: Display,
    R: Rng,
{
    let failed = store.get("Envelope-to").unwrap_or_default();
    let sender = store.get("Return-path").unwrap_or_default();
    let (a, b, c): (u16, u16, u16) = (rng.gen(), rng.gen(), rng.gen());

    writeln!(out, "Return-path: <>")?;
    out.write_all(b"X-Failed-Recipients: ")?;
    out.write_all(failed)?;
    out.write_all(b"\n")?;
    writeln!(out, "Auto-Submitted: auto-replied")?;
    writeln!(out, "From: {}", settings.mail_from)?;
    out.write_all(b"To: ")?;
    out.write_all(sender)?;
    out.write_all(b"\n")?;
    writeln!(out, "Subject: Mail delivery failed: returning message to sender")?;
    writeln!(
        out,
        "Message-Id: <{:04x}-{:04x}-{:04x}@{}>",
        a, b, c, settings.msgid_domain
    )?;
    writeln!(out, "Date: {}", now.to_rfc2822())?;
    writeln!(out)?;
    writeln!(out, "This message was created automatically by mail delivery software.")?;
    writeln!(out)?;
    writeln!(out, "A message that you sent could not be delivered to one or more of its")?;
    writeln!(out, "recipients. This is a permanent error. The following address(es) failed:")?;
    writeln!(out)?;
    out.write_all(b"  ")?;
    out.write_all(failed)?;
    out.write_all(b"\n")?;
    writeln!(out, "    No such user here")?;
    writeln!(out)?;
    writeln!(out, "------ This is a copy of the message, including all the headers. ------")?;
    writeln!(out)?;
    Ok(())
}

/// Replay the original header block exactly as it was read.
pub fn write_original_headers<W: Write + ?Sized>(out: &mut W, store: &HeaderStore) -> io::Result<()> {
    for record in store.iter() {
        out.write_all(record.raw_line())?;
    }
    out.write_all(b"\n")
}

/// Stream the rest of `input` to `out` unchanged. Returns the byte count.
pub fn copy_body<R, W>(input: &mut R, out: &mut W) -> Result<u64, BounceError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = [0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(BounceError::Input(e)),
        };
        out.write_all(&buf[..n]).map_err(BounceError::PipeWrite)?;
        total += n as u64;
    }
}
