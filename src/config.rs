//! Tunables for the registry and the reactor.

use std::time::Duration;

/// Default bucket count of the identity table. Arbitrary prime.
pub const DEFAULT_BUCKETS: usize = 101;

/// Bounded wait applied to a polled console while sockets are registered.
pub const DEFAULT_CONSOLE_POLL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of hash buckets; clamped to at least one.
    pub buckets: usize,
}

impl RegistryConfig {
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets.max(1);
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
        }
    }
}

/// How the console channel participates in the wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConsoleMode {
    /// The console descriptor is folded into the multiplexed wait like a socket.
    #[default]
    Selectable,
    /// The console is waited on alone before each multiplexed wait.
    Polled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactorConfig {
    pub console_mode: ConsoleMode,
    /// Upper bound on a polled console wait while sockets are registered.
    pub console_poll_interval: Duration,
}

impl ReactorConfig {
    pub fn with_console_mode(mut self, mode: ConsoleMode) -> Self {
        self.console_mode = mode;
        self
    }

    pub fn with_console_poll_interval(mut self, interval: Duration) -> Self {
        self.console_poll_interval = interval;
        self
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            console_mode: ConsoleMode::default(),
            console_poll_interval: DEFAULT_CONSOLE_POLL,
        }
    }
}
