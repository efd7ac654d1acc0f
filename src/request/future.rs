//! Future and callback adapters over `Request::end`.

use std::future::IntoFuture;

use futures_util::future::BoxFuture;

use super::builder::Request;
use crate::error::Error;
use crate::response::Response;

impl IntoFuture for Request {
    type Output = Result<Response, Error>;
    type IntoFuture = BoxFuture<'static, Result<Response, Error>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.end())
    }
}

impl Request {
    /// Send the request and map the response.
    pub async fn then<F, T>(self, f: F) -> Result<T, Error>
    where
        F: FnOnce(Response) -> T,
    {
        self.end().await.map(f)
    }

    /// Send the request and hand the outcome to a callback.
    pub async fn end_with<F, T>(self, callback: F) -> T
    where
        F: FnOnce(Result<Response, Error>) -> T,
    {
        callback(self.end().await)
    }
}
