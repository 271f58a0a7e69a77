use log::{debug, warn};
use std::io::{BufRead, Read};

use crate::error::BounceError;
use crate::headers::{HeaderRecord, HeaderStore};

/// Longest accepted header line, newline included.
pub const MAX_LINE_LEN: usize = 8192;

/// Read the header block of a message, leaving `input` positioned at the
/// first byte of the body.
pub fn read_headers<R: BufRead>(input: &mut R) -> Result<HeaderStore, BounceError> {
    let mut store = HeaderStore::new();
    let mut line = Vec::with_capacity(256);

    if !read_line(input, &mut line)? {
        return Err(BounceError::NoHeaders);
    }

    loop {
        if matches!(line.first(), Some(b'\r' | b'\n')) {
            break;
        }
        add_line(&mut store, &line);

        if !read_line(input, &mut line)? {
            warn!("[reader] end of file before message body");
            break;
        }
    }

    debug!("[reader] read {} headers", store.len());
    Ok(store)
}

fn add_line(store: &mut HeaderStore, line: &[u8]) {
    if matches!(line.first(), Some(b' ' | b'\t')) {
        match store.last_mut() {
            Some(last) => last.extend(line),
            None => debug!("[reader] dropping continuation line before first header"),
        }
    } else {
        store.push(HeaderRecord::new(line));
    }
}

/// Fill `buf` with the next line. Returns `false` at end of input.
fn read_line<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> Result<bool, BounceError> {
    buf.clear();
    let n = input
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', buf)
        .map_err(BounceError::Input)?;

    if n == 0 {
        return Ok(false);
    }
    // Either the cap was hit or the input ended mid-line.
    if buf.last() != Some(&b'\n') {
        return Err(BounceError::LineTooLong(MAX_LINE_LEN));
    }
    Ok(true)
}
