//! CHP 过程图: 信号表、控制流图及其展平、仿真与缺陷检测.
pub mod channel;
pub mod defects;
pub mod explore;
pub mod flatten;
pub mod graph;
pub mod netspace;
pub mod simulator;
pub mod state;

pub use channel::{ChannelClassifier, ChannelError, ChannelKind, ChannelOp, NetRole};
pub use defects::{Deadlock, ErrorLedger, Instability, Interference, Mutex};
pub use explore::{Exploration, ExploreStats, explore};
pub use flatten::{Branch, BranchFlattener, FlattenError, FlattenReport, SplitProjection};
pub use graph::ChpGraph;
pub use netspace::{NetNameError, NetSpace, Variable};
pub use simulator::{GuardOutcome, SimError, Simulator};
pub use state::{EnabledTransition, Firing, State, TermIndex, Token};
