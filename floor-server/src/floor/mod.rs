//! 桌台分配与等位子系统
//!
//! 本模块是服务的核心：决定客人坐哪张桌子、无桌时排队、
//! 超时未到店自动回收、释放后从队首补位。
//!
//! # 组件
//!
//! - [`TableRegistry`] - 实体桌台的权威记录 (容量、预订状态)
//! - [`Waitlist`] - 严格先进先出的等位队列
//! - [`AllocationCoordinator`] - 唯一同时变更两者的协调器
//! - [`ReclaimScheduler`] - 每个预订一个可取消的宽限期看门狗
//! - [`GuestStore`] - 外部客人存储的接缝 (SurrealDB / 内存)

pub mod coordinator;
pub mod events;
pub mod reclaim;
pub mod registry;
pub mod store;
pub mod waitlist;

pub use coordinator::{AllocationCoordinator, AllocationError, AllocationResult, BookingOutcome};
pub use events::{FloorEvent, ReleaseTrigger};
pub use reclaim::ReclaimScheduler;
pub use registry::{TableRegistry, TableState};
pub use store::{GuestStore, MemGuestStore, StoreError, StoreResult};
pub use waitlist::{Waitlist, WaitlistEntry};
