use std::cmp;

/// Fixed-capacity byte ring.
///
/// NOTE: When `read_pos` equals `write_pos` the ring is either completely
/// empty or completely full; `full` disambiguates the two.
pub struct RingBuffer {
    arr: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
    full: bool,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            arr: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
            full: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.arr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos && !self.full
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn len(&self) -> usize {
        if self.full {
            self.arr.len()
        } else if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.arr.len() - self.read_pos + self.write_pos
        }
    }

    pub fn free(&self) -> usize {
        self.arr.len() - self.len()
    }

    /// Copy as much of `buf` as fits, wrapping at the end of the ring.
    /// Returns the number of bytes consumed.
    pub fn push(&mut self, buf: &[u8]) -> usize {
        let n = self.arr.len();
        let mut written = 0;

        while written < buf.len() && !self.full {
            let chunk = if self.write_pos >= self.read_pos {
                n - self.write_pos
            } else {
                self.read_pos - self.write_pos
            };
            let chunk = cmp::min(chunk, buf.len() - written);

            self.arr[self.write_pos..self.write_pos + chunk]
                .copy_from_slice(&buf[written..written + chunk]);

            written += chunk;
            self.write_pos += chunk;
            if self.write_pos == n {
                self.write_pos = 0;
            }
            if self.write_pos == self.read_pos {
                self.full = true;
            }
        }

        written
    }

    /// Drain up to `buf.len()` bytes, wrapping at the end of the ring.
    /// Returns the number of bytes produced.
    pub fn pop(&mut self, buf: &mut [u8]) -> usize {
        let n = self.arr.len();
        let mut read = 0;

        while read < buf.len() && !self.is_empty() {
            let chunk = if self.read_pos < self.write_pos {
                self.write_pos - self.read_pos
            } else {
                n - self.read_pos
            };
            let chunk = cmp::min(chunk, buf.len() - read);

            buf[read..read + chunk]
                .copy_from_slice(&self.arr[self.read_pos..self.read_pos + chunk]);

            read += chunk;
            self.read_pos += chunk;
            if self.read_pos == n {
                self.read_pos = 0;
            }
            self.full = false;
        }

        read
    }
}
