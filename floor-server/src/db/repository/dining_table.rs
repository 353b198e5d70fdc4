//! Dining Table Repository

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{RepoError, RepoResult};
use crate::db::models::{DiningTable, DiningTableCreate};

const TABLE: &str = "dining_table";

#[derive(Clone)]
pub struct DiningTableRepository {
    db: Surreal<Db>,
}

impl DiningTableRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    /// Find all active dining tables, ordered by table number
    pub async fn find_all(&self) -> RepoResult<Vec<DiningTable>> {
        let tables: Vec<DiningTable> = self
            .db
            .query("SELECT * FROM dining_table WHERE is_active = true ORDER BY table_no")
            .await?
            .take(0)?;
        Ok(tables)
    }

    /// Find a table by its table number
    pub async fn find_by_no(&self, table_no: i64) -> RepoResult<Option<DiningTable>> {
        let table: Option<DiningTable> = self
            .db
            .select(RecordId::from_table_key(TABLE, table_no.to_string()))
            .await?;
        Ok(table)
    }

    /// Provision a new dining table
    pub async fn create(&self, data: DiningTableCreate) -> RepoResult<DiningTable> {
        if data.table_no < 1 {
            return Err(RepoError::Validation(format!(
                "Invalid table number: {}",
                data.table_no
            )));
        }
        if self.find_by_no(data.table_no).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Table {} already exists",
                data.table_no
            )));
        }

        let table = DiningTable {
            id: None,
            table_no: data.table_no,
            capacity: data.capacity.unwrap_or(4),
            is_active: true,
        };

        // 桌号即记录 ID，天然去重
        let created: Option<DiningTable> = self
            .db
            .upsert(RecordId::from_table_key(TABLE, data.table_no.to_string()))
            .content(table)
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to create dining table".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn repo() -> DiningTableRepository {
        let service = DbService::new_in_memory().await.unwrap();
        DiningTableRepository::new(service.db)
    }

    #[tokio::test]
    async fn create_and_list_ordered_by_table_no() {
        let repo = repo().await;
        for (no, cap) in [(3, 6), (1, 2), (2, 4)] {
            repo.create(DiningTableCreate {
                table_no: no,
                capacity: Some(cap),
            })
            .await
            .unwrap();
        }

        let all = repo.find_all().await.unwrap();
        let nos: Vec<i64> = all.iter().map(|t| t.table_no).collect();
        assert_eq!(nos, vec![1, 2, 3]);
        assert_eq!(all[1].capacity, 4);
    }

    #[tokio::test]
    async fn duplicate_table_no_is_rejected() {
        let repo = repo().await;
        repo.create(DiningTableCreate {
            table_no: 1,
            capacity: Some(2),
        })
        .await
        .unwrap();

        let result = repo
            .create(DiningTableCreate {
                table_no: 1,
                capacity: Some(8),
            })
            .await;
        assert!(matches!(result, Err(RepoError::Duplicate(_))));
        // 原有容量不变
        assert_eq!(repo.find_by_no(1).await.unwrap().unwrap().capacity, 2);
    }

    #[tokio::test]
    async fn capacity_defaults_to_four() {
        let repo = repo().await;
        let created = repo
            .create(DiningTableCreate {
                table_no: 7,
                capacity: None,
            })
            .await
            .unwrap();
        assert_eq!(created.capacity, 4);
    }
}
