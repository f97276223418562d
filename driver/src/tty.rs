use std::io::{self, Read, Write};

use device_core::CharDevice;
use sync::Mutex;

const EOT: u8 = 4;

struct TtyReader {
    stdin: io::Stdin,
    /// One character of lookahead for `peek_char`.
    pushback: Option<u8>,
}

/// Console device over the host terminal: characters in from stdin, text
/// out to stdout.
pub struct HostTty {
    reader: Mutex<TtyReader>,
}

impl HostTty {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(TtyReader {
                stdin: io::stdin(),
                pushback: None,
            }),
        }
    }

    fn pull(reader: &mut TtyReader) -> Option<u8> {
        let mut byte = [0u8; 1];
        match reader.stdin.read(&mut byte) {
            Ok(1) if byte[0] != EOT => Some(byte[0]),
            Ok(_) => None,
            Err(err) => {
                log::warn!("[HostTty] stdin read failed: {err}");
                None
            }
        }
    }
}

impl Default for HostTty {
    fn default() -> Self {
        Self::new()
    }
}

impl CharDevice for HostTty {
    fn read_char(&self) -> Option<u8> {
        let mut reader = self.reader.lock();
        if let Some(ch) = reader.pushback.take() {
            return Some(ch);
        }
        Self::pull(&mut reader)
    }

    fn peek_char(&self) -> Option<u8> {
        let mut reader = self.reader.lock();
        if reader.pushback.is_none() {
            reader.pushback = Self::pull(&mut reader);
        }
        reader.pushback
    }

    fn write_str(&self, s: &[u8]) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(s);
        let _ = out.flush();
    }

    fn write_char(&self, ch: u8) {
        self.write_str(&[ch]);
    }
}
