use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crossterm::style::Stylize;

/// The single sink all shell output goes through
///
/// Cloning shares the underlying writer, so the shell, the engine and the step listener
/// all print into the same stream.
#[derive(Clone)]
pub struct Console {
    sink: Rc<RefCell<Box<dyn Write>>>,
    colored: bool,
}

impl Console {
    pub fn stdout(colored: bool) -> Self {
        Self::from_writer(io::stdout(), colored)
    }

    pub fn from_writer(writer: impl Write + 'static, colored: bool) -> Self {
        Self {
            sink: Rc::new(RefCell::new(Box::new(writer))),
            colored,
        }
    }

    /// Uncoloured console writing into a buffer that can be read back
    pub fn buffered() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::from_writer(buffer.clone(), false), buffer)
    }

    fn write_line(&self, text: &str) -> io::Result<()> {
        let mut sink = self.sink.borrow_mut();
        writeln!(sink, "{}", text)?;
        sink.flush()
    }

    /// Print raw text
    pub fn line(&self, text: &str) -> io::Result<()> {
        self.write_line(text)
    }

    /// Print `head message`, with the head emphasised
    pub fn output(&self, head: &str, message: &str) -> io::Result<()> {
        if self.colored {
            self.write_line(&format!("{} {}", head.bold(), message))
        } else {
            self.write_line(&format!("{} {}", head, message))
        }
    }

    /// Print `head message` as an error
    pub fn error(&self, head: &str, message: &str) -> io::Result<()> {
        let text = format!("{} {}", head, message);
        if self.colored {
            self.write_line(&text.red().to_string())
        } else {
            self.write_line(&text)
        }
    }
}

/// In-memory writer shared between clones
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Forget what has been written so far
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
