use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{DiningTableRepository, GuestRepository};
use crate::floor::{AllocationCoordinator, GuestStore, TableRegistry};
use crate::utils::time::now_millis;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是楼面服务的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | coordinator | Arc<AllocationCoordinator> | 桌台分配协调器 |
/// | started_at | i64 | 启动时间 (Unix millis) |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 桌台分配协调器
    pub coordinator: Arc<AllocationCoordinator>,
    /// 启动时间戳
    pub started_at: i64,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 数据库 (work_dir/database/floor.db)
    /// 3. 座位平面图 (从 dining_table 表载入注册表)
    /// 4. 协调器 + 恢复重启前仍关联桌台的预订
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB
        let db_path = config.database_dir().join("floor.db");
        let db_path_str = db_path.to_string_lossy();
        let db_service = DbService::new(&db_path_str)
            .await
            .expect("Failed to initialize database");
        let db = db_service.db;

        // 2. Load the seating plan
        let table_repo = DiningTableRepository::new(db.clone());
        let mut registry = TableRegistry::new();
        let plan = table_repo
            .find_all()
            .await
            .expect("Failed to load seating plan");
        for table in &plan {
            registry.insert(table.table_no, table.capacity);
        }
        tracing::info!(tables = plan.len(), "Seating plan loaded");

        // 3. Coordinator over the persistent guest store
        let guest_repo = GuestRepository::new(db.clone());
        let guests: Arc<dyn GuestStore> = Arc::new(guest_repo.clone());
        let coordinator = AllocationCoordinator::new(registry, guests, config.grace_period());

        let state = Self {
            config: config.clone(),
            db,
            coordinator,
            started_at: now_millis(),
        };

        // 4. Restore bookings that survived a restart. Guests who had not
        // checked in get a fresh grace period.
        let assigned = guest_repo
            .find_assigned()
            .await
            .expect("Failed to read assigned guests");
        for guest in assigned {
            if let Some(table_no) = guest.assigned_table {
                state
                    .coordinator
                    .restore_booking(&guest.guest_id, table_no, guest.checked_in)
                    .await;
            }
        }

        state
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取分配协调器
    pub fn coordinator(&self) -> &Arc<AllocationCoordinator> {
        &self.coordinator
    }

    /// 运行时长（秒）
    pub fn uptime_secs(&self) -> i64 {
        (now_millis() - self.started_at) / 1000
    }
}
