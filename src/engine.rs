use crate::types::{AnalysisRequest, TextAnalysis};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Engine {
    async fn analyze(&self, request: AnalysisRequest) -> Result<TextAnalysis>;
}

#[async_trait]
pub trait BatchedEngine: Send + Sync {
    async fn analyze_batch(
        &self,
        requests: Vec<AnalysisRequest>,
    ) -> Result<Vec<Result<TextAnalysis>>>;
}
