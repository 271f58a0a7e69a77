use std::borrow::Cow;
use std::cell::OnceCell;

/// A single header as read from the message, folding included.
#[derive(Debug, Clone)]
pub struct HeaderRecord {
    name: String,
    raw_line: Vec<u8>,
    decoded: OnceCell<Vec<u8>>,
}

impl HeaderRecord {
    /// Start a record from the first physical line of a header.
    pub(crate) fn new(line: &[u8]) -> Self {
        let name_end = line
            .iter()
            .position(|&b| b == b':')
            .unwrap_or_else(|| trim_line_end(line).len());
        Self {
            name: String::from_utf8_lossy(&line[..name_end]).into_owned(),
            raw_line: line.to_vec(),
            decoded: OnceCell::new(),
        }
    }

    /// Append a continuation line. Any value decoded so far is dropped so the
    /// next read sees the whole folded header.
    pub(crate) fn extend(&mut self, line: &[u8]) {
        self.raw_line.extend_from_slice(line);
        self.decoded = OnceCell::new();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_line(&self) -> &[u8] {
        &self.raw_line
    }

    /// The unfolded value with surrounding whitespace removed, decoded on first
    /// use. Bytes are kept as they appeared in the message.
    pub fn value(&self) -> &[u8] {
        self.decoded.get_or_init(|| decode_value(&self.raw_line))
    }

    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.value())
    }
}

/// Insertion-ordered headers of one message.
#[derive(Debug, Clone, Default)]
pub struct HeaderStore {
    records: Vec<HeaderRecord>,
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: HeaderRecord) {
        self.records.push(record);
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut HeaderRecord> {
        self.records.last_mut()
    }

    /// First header whose name matches `name`, ignoring ASCII case.
    pub fn find(&self, name: &str) -> Option<&HeaderRecord> {
        self.records
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.find(name).map(HeaderRecord::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

// Skip the name and the blanks after the colon, then join the physical lines.
fn decode_value(raw: &[u8]) -> Vec<u8> {
    let Some(colon) = raw.iter().position(|&b| b == b':') else {
        return Vec::new();
    };
    let rest = &raw[colon + 1..];
    let start = rest
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(rest.len());

    let mut value = Vec::with_capacity(rest.len() - start);
    for &b in &rest[start..] {
        if b != b'\r' && b != b'\n' {
            value.push(b);
        }
    }
    while matches!(value.last(), Some(b' ' | b'\t')) {
        value.pop();
    }
    value
}
