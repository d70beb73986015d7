use crate::monitoring::increment_status_code;
use axum::body::Body;
use axum::{http::Request, middleware::Next, response::Response};

pub async fn status_code_metric_middleware(req: Request<Body>, next: Next) -> Response {
    let response = next.run(req).await;
    increment_status_code(response.status().as_str());
    response
}
