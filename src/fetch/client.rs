use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam between the loaders and the network; wrappers such as
/// [`ApiKey`](super::auth::ApiKey) decorate a request before it goes out.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl HttpClient for Box<dyn HttpClient> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
