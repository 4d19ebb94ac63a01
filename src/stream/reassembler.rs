/// Prefix of every deliverable record line.
pub const DATA_MARKER: &str = "data: ";

/// Turns raw network chunks into complete `data:` record payloads.
///
/// Bytes of a multi-byte character split across chunks are held back until the rest arrives,
/// and the text after the last newline is carried into the next chunk.
#[derive(Debug, Default)]
pub struct LineReassembler {
    pending_bytes: Vec<u8>,
    pending_line: String,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and collect the payloads of every record it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode(chunk);
        self.pending_line.push_str(&text);

        // Only the part before the last newline is complete
        let Some(last_newline) = self.pending_line.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.pending_line.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending_line, rest);

        complete.split('\n').filter_map(record_payload).collect()
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.pending_line.push_str(&String::from_utf8_lossy(&tail));
        }
        let remaining = std::mem::take(&mut self.pending_line);
        if remaining.trim().is_empty() {
            return None;
        }
        record_payload(&remaining)
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end of the chunk
                            self.pending_bytes = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Payload of a `data:` line, or `None` for comments, other fields and blank payloads.
pub fn record_payload(line: &str) -> Option<String> {
    let payload = line.strip_prefix(DATA_MARKER)?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}
