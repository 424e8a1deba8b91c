use crate::api::routes;
use crate::node::Node;
use std::future::Future;

/// Build the HTTP server future. It stops accepting new connections and
/// drains in-flight requests once `shutdown` resolves.
pub fn new(
    node: Node,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> impl Future<Output = hyper::Result<()>> {
    let addr = node.config.http_listen;
    axum::Server::bind(&addr)
        .serve(routes::new(node).into_make_service())
        .with_graceful_shutdown(shutdown)
}
