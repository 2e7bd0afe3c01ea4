//! Resource identity registry and single-threaded socket reactor for hypertext clients.

pub mod address;
pub mod anchor;
pub mod config;
pub mod link;
pub mod metadata;
pub mod reactor;
pub mod registry;
pub mod selector;
pub mod snapshot;
mod socket_table;
pub mod sockops;
pub mod trace;

pub type Result<T> = anyhow::Result<T>;

pub use anchor::AnchorId;
pub use config::{ConsoleMode, ReactorConfig, RegistryConfig};
pub use link::{Link, LinkResult, LinkType, Method, MethodSet};
pub use metadata::Metadata;
pub use reactor::{Callback, Reactor, TimeoutCallback, callback, timeout_callback};
pub use registry::Registry;
pub use selector::{Interest, PollSelector, Readiness, Selection, Selector};
pub use snapshot::GraphSnapshot;
pub use sockops::SockOps;
