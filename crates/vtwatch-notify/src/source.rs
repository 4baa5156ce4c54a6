//! Seam over the stream-data client so cycles can be driven by any source.

use async_trait::async_trait;
use vtwatch_api::{FetchError, StreamApi};
use vtwatch_core::StreamRecord;

#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn fetch_lives(&self) -> Result<Vec<StreamRecord>, FetchError>;
    async fn fetch_upcoming(&self) -> Result<Vec<StreamRecord>, FetchError>;
}

#[async_trait]
impl StreamSource for StreamApi {
    async fn fetch_lives(&self) -> Result<Vec<StreamRecord>, FetchError> {
        StreamApi::fetch_lives(self).await
    }

    async fn fetch_upcoming(&self) -> Result<Vec<StreamRecord>, FetchError> {
        StreamApi::fetch_upcoming(self).await
    }
}
