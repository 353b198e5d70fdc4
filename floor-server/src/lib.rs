//! Floor Server - 餐厅楼面管理服务
//!
//! # 架构概述
//!
//! 本模块是 Floor Server 的主入口，提供以下核心功能：
//!
//! - **桌台分配** (`floor`): 最优匹配选桌、等位队列、超时回收
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储 (座位计划、客人投影)
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! floor-server/src/
//! ├── core/          # 配置、状态、HTTP 服务器、错误
//! ├── floor/         # 分配协调器、注册表、等位队列、回收调度
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod floor;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use crate::floor::{
    AllocationCoordinator, BookingOutcome, FloorEvent, GuestStore, MemGuestStore, ReleaseTrigger,
    TableRegistry, Waitlist,
};
pub use crate::utils::{AppError, AppResult};

// Re-export logger functions
pub use crate::utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv, 工作目录, 日志)
///
/// 必须在 [`Config::from_env`] 之前调用。
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let logs_dir = config.logs_dir();
    init_logger_with_file(Some(config.log_level.as_str()), logs_dir.to_str());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ________
   / ____/ /___  ____  _____
  / /_  / / __ \/ __ \/ ___/
 / __/ / / /_/ / /_/ / /
/_/   /_/\____/\____/_/
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
