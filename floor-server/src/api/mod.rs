//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`tables`] - 桌台管理接口 (座位计划、释放、结账触发)
//! - [`bookings`] - 预订与签到接口
//! - [`waitlist`] - 等位队列接口

pub mod bookings;
pub mod health;
pub mod tables;
pub mod waitlist;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};
