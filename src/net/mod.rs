//! # 受控 Petri 网（Guarded Petri Net）
//!
//! 设库所集合 `P`、变迁集合 `T` 与弧集合 `F ⊆ (P × T) ∪ (T × P)`。每个变迁
//! `t ∈ T` 带有守卫 `g(t)`（网络变量上的表达式）与动作 `a(t)`（并行赋值组的
//! 选择, 即析取范式）。
//!
//! * 变迁 **可发生** 当且仅当 `•t` 中每个库所都持有 token；
//! * 发生时消耗 `•t` 上的 token 并在 `t•` 上产生新 token；
//! * 节点存放于索引稳定的 arena 中, 删除节点不会改变其余节点的编号。
//!
//! ## 示例
//!
//! ```rust
//! use chp_net::net::*;
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::new());
//! let t0 = net.add_transition(Transition::default());
//! let p1 = net.add_place(Place::new());
//! net.connect_sequence(&[p0.into(), t0.into(), p1.into()]).unwrap();
//!
//! let enabled = net.enabled(&[p0]);
//! assert_eq!(enabled[0].transition, t0);
//! assert_eq!(net.output_places(t0), vec![p1]);
//! ```

pub mod core;
pub mod ids;
pub mod index_vec;
pub mod reduce;
pub mod structure;

pub use core::{Enabling, Net, NetError};
pub use ids::{ArcId, NetId, PlaceId, TransitionId};
pub use index_vec::{Arena, Idx, IndexVec};
pub use structure::{Arc, Composition, Node, Place, Transition};
