use std::io::{self, Read};

/// Positional wrapper over the input byte source. Every read of the pass
/// goes through here, so the driver always knows how far into the snapshot
/// it is when something goes wrong.
pub struct SnapshotReader<R> {
    inner: R,
    position: u64,
    peeked: Option<u8>,
}

impl<R: Read> SnapshotReader<R> {
    pub fn new(inner: R) -> SnapshotReader<R> {
        SnapshotReader {
            inner,
            position: 0,
            peeked: None,
        }
    }

    /// Bytes consumed so far. A byte fetched by `peek_u8` does not count
    /// until it is actually read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&mut self) -> io::Result<u8> {
        if let Some(byte) = self.peeked {
            return Ok(byte);
        }
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        self.peeked = Some(buf[0]);
        Ok(buf[0])
    }

    /// Discard exactly `n` bytes.
    pub fn skip(&mut self, mut n: u64) -> io::Result<()> {
        let mut buf = [0u8; 4096];
        while n > 0 {
            let want = n.min(buf.len() as u64) as usize;
            let got = self.read(&mut buf[..want])?;
            if got == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "skip ran past the end of input",
                ));
            }
            n -= got as u64;
        }
        Ok(())
    }
}

impl<R: Read> Read for SnapshotReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.peeked.take() {
            buf[0] = byte;
            self.position += 1;
            return Ok(1);
        }
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}
