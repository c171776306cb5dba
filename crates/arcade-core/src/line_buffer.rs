//! Newline framing for the serial byte stream.

/// Accumulates raw bytes from one open connection and yields complete lines.
///
/// Holds at most one partial (newline-less) trailing fragment. Framing is
/// done on bytes, so a multi-byte UTF-8 character split across two reads is
/// decoded intact once its line completes.
#[derive(Debug, Default, Clone)]
pub struct SerialLineBuffer {
    pending: Vec<u8>,
}

impl SerialLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completes, in receipt order.
    ///
    /// Lines are split on `\n`, lose a trailing `\r`, are trimmed, and empty
    /// lines are dropped. Invalid UTF-8 is replaced, not rejected.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut raw: Vec<u8> = self.pending.drain(..=pos).collect();
            raw.pop(); // '\n'
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// The trailing fragment not yet terminated by a newline.
    pub fn pending(&self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }

    /// Drop any partial fragment.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_strips_carriage_return() {
        let mut buf = SerialLineBuffer::new();
        let lines = buf.push(b"A\r\nB\nC");
        assert_eq!(lines, ["A", "B"]);
        assert_eq!(buf.pending(), "C");
    }

    #[test]
    fn completes_fragment_on_later_chunk() {
        let mut buf = SerialLineBuffer::new();
        assert!(buf.push(b"TEMP=2").is_empty());
        assert_eq!(buf.push(b"1.5\n"), ["TEMP=21.5"]);
        assert_eq!(buf.pending(), "");
    }

    #[test]
    fn skips_blank_and_whitespace_lines() {
        let mut buf = SerialLineBuffer::new();
        assert_eq!(buf.push(b"\n\r\n   \nOK  \n"), ["OK"]);
    }

    #[test]
    fn multibyte_char_split_across_reads() {
        let mut buf = SerialLineBuffer::new();
        let bytes = "NFC→READY\n".as_bytes();
        // split inside the 3-byte arrow
        assert!(buf.push(&bytes[..4]).is_empty());
        assert_eq!(buf.push(&bytes[4..]), ["NFC→READY"]);
    }

    #[test]
    fn clear_drops_fragment() {
        let mut buf = SerialLineBuffer::new();
        buf.push(b"half");
        buf.clear();
        assert_eq!(buf.push(b"line\n"), ["line"]);
    }

    #[test]
    fn every_chunking_yields_same_lines() {
        let stream = b"A\r\nB\nC";
        for split_a in 0..=stream.len() {
            for split_b in split_a..=stream.len() {
                let mut buf = SerialLineBuffer::new();
                let mut lines = buf.push(&stream[..split_a]);
                lines.extend(buf.push(&stream[split_a..split_b]));
                lines.extend(buf.push(&stream[split_b..]));
                assert_eq!(lines, ["A", "B"], "splits at {split_a},{split_b}");
                assert_eq!(buf.pending(), "C");
            }
        }
    }
}
