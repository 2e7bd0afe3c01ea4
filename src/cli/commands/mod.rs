mod graph;
mod resolve;
mod watch;

pub(crate) use graph::{GraphPlan, cmd_graph};
pub(crate) use resolve::cmd_resolve;
pub(crate) use watch::cmd_watch;
