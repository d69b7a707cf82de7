use crate::api::{ApiError, ProductDownload, RerunReceipt};
use crate::app::BulletinSummary;
use crate::log::LogDocument;
use async_trait::async_trait;

#[async_trait]
pub trait BulletinApi: Send + Sync {
    async fn list_bulletins(&self) -> Result<Vec<BulletinSummary>, ApiError>;
    async fn rerun(&self, id: &str) -> Result<RerunReceipt, ApiError>;
    async fn fetch_full_log(&self, id: &str) -> Result<LogDocument, ApiError>;
    async fn download_product(&self, id: &str, index: usize) -> Result<ProductDownload, ApiError>;
}
