//! Single-threaded event loop dispatching descriptor readiness to callbacks.
//!
//! Every cycle waits on the registered interests, then services the console
//! channel, then every ready descriptor: exceptional conditions first, then
//! writes, then reads, each group in ascending descriptor order. Callbacks
//! receive the reactor itself and may register or unregister anything,
//! including the descriptor being dispatched.

use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use smallvec::SmallVec;

use crate::config::{ConsoleMode, ReactorConfig};
use crate::selector::{Interest, PollSelector, Readiness, Selection, Selector};
use crate::socket_table::{Cleared, SocketTable};
use crate::sockops::{self, Group, Priority, SockOps};
use crate::trace;

/// Invoked with the descriptor, its registration context and the ready flags.
pub type Callback<R> = Rc<dyn Fn(&mut Reactor<R>, RawFd, &R, SockOps) -> Result<()>>;

/// Invoked when the wait times out.
pub type TimeoutCallback<R> = Rc<dyn Fn(&mut Reactor<R>, &R) -> Result<()>>;

pub fn callback<R>(
    f: impl Fn(&mut Reactor<R>, RawFd, &R, SockOps) -> Result<()> + 'static,
) -> Callback<R> {
    Rc::new(f)
}

pub fn timeout_callback<R>(
    f: impl Fn(&mut Reactor<R>, &R) -> Result<()> + 'static,
) -> TimeoutCallback<R> {
    Rc::new(f)
}

struct Console<R> {
    fd: RawFd,
    context: R,
    callback: Callback<R>,
}

struct Timeout<R> {
    duration: Duration,
    context: R,
    callback: TimeoutCallback<R>,
    always: bool,
}

enum Wait {
    TimedOut,
    Ready {
        console: bool,
        sockets: Vec<Readiness>,
    },
}

pub struct Reactor<R> {
    config: ReactorConfig,
    selector: Box<dyn Selector>,
    table: SocketTable<R>,
    console: Option<Console<R>>,
    timeout: Option<Timeout<R>>,
    active_units: usize,
    stopped: bool,
}

impl<R: Clone> Default for Reactor<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone> Reactor<R> {
    pub fn new() -> Self {
        Self::with_config(ReactorConfig::default())
    }

    pub fn with_config(config: ReactorConfig) -> Self {
        Self::with_selector(config, Box::new(PollSelector::new()))
    }

    pub fn with_selector(config: ReactorConfig, selector: Box<dyn Selector>) -> Self {
        Self {
            config,
            selector,
            table: SocketTable::default(),
            console: None,
            timeout: None,
            active_units: 0,
            stopped: false,
        }
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `fd`. The mask, callback, context and priority of an earlier
    /// registration are replaced; interest groups are only ever added.
    ///
    /// Including [`sockops::UNREGISTER`] in `ops` asks for one callback with
    /// that flag when the last event bit is later cleared. Without a callback
    /// the descriptor is still waited on, and dispatch does nothing.
    pub fn register(
        &mut self,
        fd: RawFd,
        context: R,
        ops: SockOps,
        callback: Option<Callback<R>>,
        priority: Priority,
    ) {
        trace!("event"; "register {fd} ops {ops:#04x}");
        self.table.register(fd, context, ops, callback, priority);
    }

    /// Clear `ops` from `fd`. Returns `false` if `fd` was not registered.
    ///
    /// When the mask drops to zero the entry is freed, after the
    /// unregister-notify callback (if requested) has run. An entry the
    /// callback re-registered survives. A failing callback does not keep the
    /// entry alive; its error is returned once the entry is gone.
    pub fn unregister(&mut self, fd: RawFd, ops: SockOps) -> Result<bool> {
        match self.table.clear(fd, ops) {
            Cleared::Unknown => Ok(false),
            Cleared::StillActive => Ok(true),
            Cleared::Idle { notify } => {
                let notified = match notify {
                    Some((callback, context)) => {
                        trace!("event"; "notify {fd} of unregistration");
                        callback(self, fd, &context, sockops::UNREGISTER)
                    }
                    None => Ok(()),
                };
                if self.table.release_if_idle(fd) {
                    trace!("event"; "released {fd}");
                }
                notified.map(|()| true)
            }
        }
    }

    /// Unregister every descriptor, then drop every entry and interest.
    ///
    /// Notify callbacks all run, but registrations they make are discarded.
    /// The first callback error is returned after the table is empty.
    pub fn unregister_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for fd in self.table.descriptors() {
            if let Err(err) = self.unregister(fd, sockops::ALL) {
                first_err.get_or_insert(err);
            }
        }
        self.table.clear_all();
        trace!("event"; "all sockets unregistered");
        first_err.map_or(Ok(()), Err)
    }

    /// Attach the console channel, replacing any previous one.
    pub fn register_console(&mut self, fd: RawFd, context: R, callback: Callback<R>) {
        trace!("event"; "console on {fd} ({:?})", self.config.console_mode);
        self.console = Some(Console {
            fd,
            context,
            callback,
        });
    }

    pub fn unregister_console(&mut self) -> bool {
        self.console.take().is_some()
    }

    /// Install the single timeout, replacing any previous one.
    ///
    /// With `always` unset the callback only fires while
    /// [`Reactor::set_active_units`] reports outstanding work.
    pub fn register_timeout(
        &mut self,
        duration: Duration,
        context: R,
        callback: TimeoutCallback<R>,
        always: bool,
    ) {
        self.timeout = Some(Timeout {
            duration,
            context,
            callback,
            always,
        });
    }

    pub fn unregister_timeout(&mut self) -> bool {
        self.timeout.take().is_some()
    }

    pub fn set_active_units(&mut self, units: usize) {
        self.active_units = units;
    }

    pub fn active_units(&self) -> usize {
        self.active_units
    }

    /// Make [`Reactor::run`] return once the current cycle has been dispatched.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Callback and context registered for `fd`, console included.
    pub fn retrieve(&self, fd: RawFd) -> Option<(Option<Callback<R>>, R)> {
        self.table.retrieve(fd).or_else(|| {
            self.console
                .as_ref()
                .filter(|c| c.fd == fd)
                .map(|c| (Some(c.callback.clone()), c.context.clone()))
        })
    }

    pub fn is_readable(&self, fd: RawFd) -> bool {
        self.table.in_group(fd, Group::Read)
    }

    pub fn is_writable(&self, fd: RawFd) -> bool {
        self.table.in_group(fd, Group::Write)
    }

    pub fn is_exceptional(&self, fd: RawFd) -> bool {
        self.table.in_group(fd, Group::Except)
    }

    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.table.contains(fd)
    }

    pub fn ops(&self, fd: RawFd) -> Option<SockOps> {
        self.table.ops(fd)
    }

    pub fn priority(&self, fd: RawFd) -> Option<Priority> {
        self.table.priority(fd)
    }

    /// Largest registered descriptor.
    pub fn max_fd(&self) -> Option<RawFd> {
        self.table.max_fd()
    }

    /// Registered sockets, the console excluded.
    pub fn sockets_in_use(&self) -> usize {
        self.table.len()
    }

    // ------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------

    /// Run until stopped, until a callback or the wait fails, or until
    /// nothing is left to wait for.
    pub fn run(&mut self) -> Result<()> {
        self.stopped = false;
        loop {
            if self.stopped {
                trace!("event"; "stopped");
                return Ok(());
            }
            let interests = self.table.interests();
            if interests.is_empty() && self.console.is_none() && self.timeout.is_none() {
                trace!("event"; "nothing registered");
                return Ok(());
            }
            match self.wait(interests)? {
                Wait::TimedOut => self.fire_timeout()?,
                Wait::Ready { console, sockets } => {
                    if console {
                        self.dispatch_console()?;
                    }
                    self.dispatch(&sockets)?;
                }
            }
        }
    }

    fn wait(&mut self, mut interests: Vec<Interest>) -> Result<Wait> {
        let mut timeout = self.timeout.as_ref().map(|t| t.duration);
        let mut console_ready = false;
        let mut selectable_console = None;

        if let Some(console) = &self.console {
            match self.config.console_mode {
                ConsoleMode::Selectable => {
                    selectable_console = Some(console.fd);
                    interests.push(Interest::read(console.fd));
                }
                ConsoleMode::Polled => {
                    let bound = if interests.is_empty() {
                        timeout
                    } else {
                        Some(self.config.console_poll_interval)
                    };
                    let fd = console.fd;
                    let selection = self
                        .selector
                        .select(&[Interest::read(fd)], bound)
                        .context("console wait failed")?;
                    let timed_out = match &selection {
                        Selection::TimedOut => true,
                        Selection::Ready(ready) => {
                            console_ready = ready.iter().any(|r| r.fd == fd && r.read);
                            false
                        }
                    };
                    if console_ready {
                        timeout = Some(Duration::ZERO);
                    } else if interests.is_empty() {
                        return Ok(if timed_out {
                            Wait::TimedOut
                        } else {
                            Wait::Ready {
                                console: false,
                                sockets: Vec::new(),
                            }
                        });
                    }
                }
            }
        }

        if interests.is_empty() && console_ready {
            return Ok(Wait::Ready {
                console: true,
                sockets: Vec::new(),
            });
        }

        let selection = self
            .selector
            .select(&interests, timeout)
            .context("multiplexed wait failed")?;
        let mut ready = match selection {
            Selection::Ready(ready) => ready,
            // A console found ready before the wait still has to be served.
            Selection::TimedOut if console_ready => Vec::new(),
            Selection::TimedOut => return Ok(Wait::TimedOut),
        };
        if let Some(fd) = selectable_console {
            for r in ready.iter_mut().filter(|r| r.fd == fd && r.read) {
                console_ready = true;
                r.read = false;
            }
            ready.retain(Readiness::any);
        }

        Ok(Wait::Ready {
            console: console_ready,
            sockets: ready,
        })
    }

    fn fire_timeout(&mut self) -> Result<()> {
        let Some(timeout) = &self.timeout else {
            return Ok(());
        };
        if !timeout.always && self.active_units == 0 {
            return Ok(());
        }
        let (callback, context) = (timeout.callback.clone(), timeout.context.clone());
        trace!("event"; "timeout after {:?}", timeout.duration);
        callback(self, &context)
    }

    fn dispatch_console(&mut self) -> Result<()> {
        let Some(console) = &self.console else {
            return Ok(());
        };
        let (fd, callback, context) = (
            console.fd,
            console.callback.clone(),
            console.context.clone(),
        );
        trace!("event"; "console {fd} ready");
        callback(self, fd, &context, sockops::READ)
    }

    fn dispatch(&mut self, ready: &[Readiness]) -> Result<()> {
        for group in Group::DISPATCH_ORDER {
            let mut fds: SmallVec<[RawFd; 16]> = ready
                .iter()
                .filter(|r| match group {
                    Group::Except => r.except,
                    Group::Write => r.write,
                    Group::Read => r.read,
                })
                .map(|r| r.fd)
                .collect();
            fds.sort_unstable();
            for fd in fds {
                // An earlier callback may have dropped this descriptor or this group.
                if !self.table.in_group(fd, group) {
                    trace!("event"; "skip {fd}: no longer {}", group.name());
                    continue;
                }
                let Some((Some(callback), context)) = self.table.retrieve(fd) else {
                    continue;
                };
                let ops = match self.table.ops(fd).unwrap_or(0) & group.bits() {
                    0 => group.primary(),
                    ops => ops,
                };
                trace!("event"; "dispatch {fd} {}", group.name());
                callback(self, fd, &context, ops)?;
            }
        }
        Ok(())
    }
}
