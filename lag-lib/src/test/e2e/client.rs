use std::time::Duration;

use rama::{
    Layer as _, Service,
    error::BoxError,
    http::{
        Body, Request, Response, client::EasyHttpWebClient,
        layer::map_request_body::MapRequestBodyLayer,
    },
    layer::TimeoutLayer,
};

/// Plain http client for the lag server, pooling its connections.
pub(super) fn new_web_client() -> impl Service<Request, Output = Response, Error = BoxError> {
    (
        // lagged requests in these tests stay well below this
        TimeoutLayer::new(Duration::from_secs(30)),
        MapRequestBodyLayer::new(Body::new),
    )
        .into_layer(EasyHttpWebClient::default())
}
