//! In-memory writer standing in for stdout.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Clonable byte sink; every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Returns everything written so far as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().expect("buffer mutex poisoned");
        String::from_utf8(bytes.clone()).expect("buffer holds UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("buffer mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
