//! Splits a byte stream into CRLF-delimited lines.

const DELIMITER: &[u8; 2] = b"\r\n";

/// Accumulates raw reads and yields complete lines.
///
/// Whatever follows the last delimiter is carried over to the next
/// [`feed`](Self::feed), so a line split across reads (including a CR/LF pair
/// split between two reads) is returned exactly once, when it completes.
/// Empty lines are preserved.
#[derive(Debug, Default)]
pub struct LineFramer {
    carry: Vec<u8>,
}

impl LineFramer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        // A CR left at the end of the carry may pair with an LF at the start of
        // this chunk, so scanning restarts one byte early.
        let mut start = self.carry.len().saturating_sub(1);
        self.carry.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut line_start = 0;

        while let Some(offset) = self.carry[start..]
            .windows(DELIMITER.len())
            .position(|window| window == DELIMITER)
        {
            let end = start + offset;
            lines.push(String::from_utf8_lossy(&self.carry[line_start..end]).into_owned());
            line_start = end + DELIMITER.len();
            start = line_start;
        }

        self.carry.drain(..line_start);
        lines
    }

    /// Number of bytes waiting for a delimiter.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &[u8] = b"+OK 3 messages\r\n1 120\r\n\r\n2 200\r\n3 310\r\n.\r\npartial";

    fn expected() -> Vec<String> {
        ["+OK 3 messages", "1 120", "", "2 200", "3 310", "."]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_single_chunk() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(TRANSCRIPT), expected());
        assert_eq!(framer.pending(), "partial".len());
    }

    #[test]
    fn test_split_points_do_not_change_output() {
        for split in 0..=TRANSCRIPT.len() {
            let mut framer = LineFramer::new();
            let mut lines = framer.feed(&TRANSCRIPT[..split]);
            lines.extend(framer.feed(&TRANSCRIPT[split..]));
            assert_eq!(lines, expected(), "split at {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = TRANSCRIPT
            .iter()
            .flat_map(|byte| framer.feed(std::slice::from_ref(byte)))
            .collect();
        assert_eq!(lines, expected());
    }

    #[test]
    fn test_carry_completes_on_later_read() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"220 mail.example").is_empty());
        assert!(framer.feed(b".com ESMTP\r").is_empty());
        assert_eq!(framer.feed(b"\n250 OK"), vec!["220 mail.example.com ESMTP"]);
        assert_eq!(framer.feed(b"\r\n"), vec!["250 OK"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_lone_lf_is_not_a_delimiter() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"a\nb\r\n"), vec!["a\nb"]);
    }
}
