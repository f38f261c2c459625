use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;

pub use backend::SeaOrmStorage;

pub struct StorageFactory;

impl StorageFactory {
    /// 使用全局静态配置创建存储（需先调用 `init_config`）
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        Self::connect(&config.database).await
    }

    /// 使用显式传入的数据库配置创建存储
    pub async fn connect(config: &DatabaseConfig) -> Result<Arc<SeaOrmStorage>> {
        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(&config.database_url)?;

        let storage = SeaOrmStorage::new(&config.database_url, &backend_type, config).await?;
        Ok(Arc::new(storage))
    }
}
