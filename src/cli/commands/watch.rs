use std::cell::RefCell;
use std::io;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};

use anchornet::{ConsoleMode, Reactor, ReactorConfig, callback, timeout_callback};

type Shared = Rc<RefCell<Echo>>;

/// Line splitter and counter for console input.
#[derive(Default)]
struct Echo {
    lines: u64,
    pending: Vec<u8>,
}

impl Echo {
    /// Numbered output for every complete line; the unterminated tail is kept.
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            out.push(self.number(&line[..pos]));
        }
        out
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(self.number(&tail))
    }

    fn number(&mut self, line: &[u8]) -> String {
        self.lines += 1;
        let text = String::from_utf8_lossy(line);
        format!("{:>4}: {}", self.lines, text.trim_end_matches('\r'))
    }
}

fn read_chunk(fd: RawFd, buf: &mut [u8]) -> Result<usize> {
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err).context("reading console failed");
        }
    }
}

pub(crate) fn cmd_watch(timeout_ms: Option<u64>, always: bool, polled_console: bool) -> Result<()> {
    let mode = if polled_console {
        ConsoleMode::Polled
    } else {
        ConsoleMode::Selectable
    };
    let mut reactor: Reactor<Shared> =
        Reactor::with_config(ReactorConfig::default().with_console_mode(mode));
    let echo = Shared::default();

    let on_input = callback(|r, fd, echo: &Shared, _| {
        let mut buf = [0u8; 4096];
        let n = read_chunk(fd, &mut buf)?;
        let mut echo = echo.borrow_mut();
        if n == 0 {
            if let Some(line) = echo.finish() {
                println!("{line}");
            }
            r.unregister_console();
            r.unregister_timeout();
            return Ok(());
        }
        for line in echo.feed(&buf[..n]) {
            println!("{line}");
        }
        r.set_active_units(usize::from(!echo.pending.is_empty()));
        Ok(())
    });
    reactor.register_console(libc::STDIN_FILENO, echo.clone(), on_input);

    if let Some(ms) = timeout_ms {
        let on_idle = timeout_callback(|_, echo: &Shared| {
            let echo = echo.borrow();
            eprintln!(
                "idle: {} line(s), {} byte(s) pending",
                echo.lines,
                echo.pending.len()
            );
            Ok(())
        });
        reactor.register_timeout(Duration::from_millis(ms), echo.clone(), on_idle, always);
    }

    reactor.run()?;
    eprintln!("{} line(s) read", echo.borrow().lines);
    Ok(())
}
