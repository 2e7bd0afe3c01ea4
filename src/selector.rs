//! Readiness wait primitive used by the reactor.

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Conditions the reactor wants to hear about for one descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interest {
    pub fd: RawFd,
    pub read: bool,
    pub write: bool,
    pub except: bool,
}

impl Interest {
    pub fn read(fd: RawFd) -> Self {
        Self {
            fd,
            read: true,
            write: false,
            except: false,
        }
    }
}

/// Conditions that actually hold for one descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Readiness {
    pub fd: RawFd,
    pub read: bool,
    pub write: bool,
    pub except: bool,
}

impl Readiness {
    pub fn any(&self) -> bool {
        self.read || self.write || self.except
    }
}

/// Outcome of one wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// The timeout elapsed with nothing ready.
    TimedOut,
    /// The wait woke up. The list may be empty when the only events were
    /// outside the requested interests.
    Ready(Vec<Readiness>),
}

/// Blocks until one of `interests` is ready or `timeout` elapses.
///
/// `None` blocks indefinitely.
pub trait Selector {
    fn select(&mut self, interests: &[Interest], timeout: Option<Duration>) -> Result<Selection>;
}

/// [`Selector`] over `poll(2)`.
#[derive(Default)]
pub struct PollSelector {
    fds: Vec<libc::pollfd>,
}

impl PollSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

fn timeout_millis(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) if d.is_zero() => 0,
        // Round up so a sub-millisecond wait does not become a busy poll.
        Some(d) => d
            .as_micros()
            .div_ceil(1000)
            .min(libc::c_int::MAX as u128) as libc::c_int,
    }
}

impl Selector for PollSelector {
    fn select(
        &mut self,
        interests: &[Interest],
        timeout: Option<Duration>,
    ) -> Result<Selection> {
        self.fds.clear();
        self.fds.extend(interests.iter().map(|i| {
            let mut events = 0;
            if i.read {
                events |= libc::POLLIN;
            }
            if i.write {
                events |= libc::POLLOUT;
            }
            if i.except {
                events |= libc::POLLPRI;
            }
            libc::pollfd {
                fd: i.fd,
                events,
                revents: 0,
            }
        }));

        let millis = timeout_millis(timeout);
        let count = loop {
            // SAFETY: `fds` is a live, initialised buffer of exactly `len` pollfd entries.
            let rc = unsafe {
                libc::poll(
                    self.fds.as_mut_ptr(),
                    self.fds.len() as libc::nfds_t,
                    millis,
                )
            };
            if rc >= 0 {
                break rc;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err).context("poll failed");
            }
        };
        if count == 0 {
            return Ok(Selection::TimedOut);
        }

        let mut ready = Vec::new();
        for (interest, pfd) in interests.iter().zip(&self.fds) {
            let revents = pfd.revents;
            if revents & libc::POLLNVAL != 0 {
                bail!("descriptor {} is not open", pfd.fd);
            }
            let hangup = revents & (libc::POLLHUP | libc::POLLERR) != 0;
            // Hangup and error go to read and write interests, or to the
            // exceptional group when that is all the descriptor asked for.
            let hangup_except = hangup && !interest.read && !interest.write;
            let r = Readiness {
                fd: pfd.fd,
                read: interest.read && (revents & libc::POLLIN != 0 || hangup),
                write: interest.write && (revents & libc::POLLOUT != 0 || hangup),
                except: interest.except && (revents & libc::POLLPRI != 0 || hangup_except),
            };
            if r.any() {
                ready.push(r);
            }
        }
        Ok(Selection::Ready(ready))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    fn ready_list(selection: Selection) -> Vec<Readiness> {
        match selection {
            Selection::Ready(list) => list,
            Selection::TimedOut => Vec::new(),
        }
    }

    #[test]
    fn reports_readable_after_write() -> Result<()> {
        let (mut a, b) = UnixStream::pair()?;
        let mut sel = PollSelector::new();
        let idle = sel.select(&[Interest::read(b.as_raw_fd())], Some(Duration::ZERO))?;
        assert_eq!(idle, Selection::TimedOut);

        a.write_all(b"ping")?;
        let ready = ready_list(
            sel.select(&[Interest::read(b.as_raw_fd())], Some(Duration::from_secs(1)))?,
        );
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].fd, b.as_raw_fd());
        assert!(ready[0].read);
        assert!(!ready[0].write);
        Ok(())
    }

    #[test]
    fn socket_pair_is_writable() -> Result<()> {
        let (a, _b) = UnixStream::pair()?;
        let interest = Interest {
            fd: a.as_raw_fd(),
            read: true,
            write: true,
            except: false,
        };
        let ready = ready_list(PollSelector::new().select(&[interest], Some(Duration::ZERO))?);
        assert_eq!(ready.len(), 1);
        assert!(ready[0].write);
        assert!(!ready[0].read);
        Ok(())
    }

    #[test]
    fn hangup_counts_as_readable() -> Result<()> {
        let (a, b) = UnixStream::pair()?;
        drop(a);
        let ready = ready_list(
            PollSelector::new().select(&[Interest::read(b.as_raw_fd())], Some(Duration::ZERO))?,
        );
        assert_eq!(ready.len(), 1);
        assert!(ready[0].read);
        Ok(())
    }

    #[test]
    fn hangup_goes_to_except_only_interest() -> Result<()> {
        let (a, b) = UnixStream::pair()?;
        drop(a);
        let interest = Interest {
            fd: b.as_raw_fd(),
            read: false,
            write: false,
            except: true,
        };
        let selection = PollSelector::new().select(&[interest], Some(Duration::from_secs(1)))?;
        let Selection::Ready(ready) = selection else {
            panic!("a hung-up descriptor must not look like a timeout");
        };
        assert_eq!(ready.len(), 1);
        assert!(ready[0].except);
        assert!(!ready[0].read && !ready[0].write);
        Ok(())
    }

    #[test]
    fn timeout_rounds_up() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_micros(10))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_millis(250))), 250);
    }
}
