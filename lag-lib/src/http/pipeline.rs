//! Ordered request stages in front of the [`RouteTable`].
//!
//! Each [`Stage`] inspects the [`Exchange`] and either lets it continue
//! (possibly after a delay) or terminates it with a response.
//! Only once all stages continued is the request dispatched to a route.

use std::{convert::Infallible, fmt, sync::Arc, time::Duration};

use rama::{
    Service,
    error::{BoxError, ErrorContext as _},
    http::{
        HeaderMap, Method, Request, Response, Uri,
        body::util::BodyExt as _,
        header::CONTENT_TYPE,
        headers::{ContentLength, HeaderMapExt as _},
    },
    telemetry::tracing,
};

use crate::{
    config::ServerConfig,
    http::{params::Params, response, routes::RouteTable},
    latency::{self, Decision, LagPolicy},
};

/// Form bodies larger than this are not parsed.
const MAX_FORM_BODY_SIZE: u64 = 10 << 20;

/// The view on a request that stages and handlers work with.
#[derive(Debug)]
pub struct Exchange {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Option<String>,
    form: Option<String>,
    params: Params,
}

impl Exchange {
    pub fn from_parts(
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
        form: Option<String>,
    ) -> Self {
        Self {
            method,
            path: uri.path().to_owned(),
            headers,
            query: uri.query().map(ToOwned::to_owned),
            form,
            params: Params::default(),
        }
    }

    /// Buffers the body if it is a (reasonably sized) urlencoded form.
    pub async fn read_from(req: Request) -> Result<Self, BoxError> {
        let (parts, body) = req.into_parts();
        let form = if has_form_body(&parts.method, &parts.headers) {
            let payload = body
                .collect()
                .await
                .context("collect urlencoded form body")?
                .to_bytes();
            Some(String::from_utf8(payload.to_vec()).context("decode urlencoded form body")?)
        } else {
            None
        };
        Ok(Self::from_parts(parts.method, &parts.uri, parts.headers, form))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Parsed parameters, empty until the [`ParseParams`] stage ran.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn parse_params(&mut self) {
        self.params = Params::parse(self.form.as_deref(), self.query.as_deref());
    }
}

fn has_form_body(method: &Method, headers: &HeaderMap) -> bool {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        return false;
    }

    let is_urlencoded = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
        .unwrap_or_default();
    if !is_urlencoded {
        return false;
    }

    match headers.typed_get::<ContentLength>() {
        Some(ContentLength(length)) if length <= MAX_FORM_BODY_SIZE => true,
        length => {
            tracing::debug!("skip urlencoded form body of unsupported length: {length:?}");
            false
        }
    }
}

#[derive(Debug)]
pub enum StageOutcome {
    Continue,
    /// Continue once the delay has passed.
    Delay(Duration),
    /// Terminate the pipeline with this response.
    Respond(Response),
}

pub trait Stage: fmt::Debug + Send + Sync + 'static {
    fn evaluate(&self, exchange: &mut Exchange) -> StageOutcome;
}

/// Populates [`Exchange::params`] from the form body and query.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ParseParams;

impl Stage for ParseParams {
    fn evaluate(&self, exchange: &mut Exchange) -> StageOutcome {
        exchange.parse_params();
        StageOutcome::Continue
    }
}

/// Injects the requested lag (`lag` or `t`), within the configured limit.
#[derive(Debug, Clone)]
pub struct LatencyGate {
    max_lag: Duration,
    policy: LagPolicy,
}

impl LatencyGate {
    pub fn new(max_lag: Duration, policy: LagPolicy) -> Self {
        Self { max_lag, policy }
    }
}

impl Stage for LatencyGate {
    fn evaluate(&self, exchange: &mut Exchange) -> StageOutcome {
        match latency::evaluate(exchange.params().lag(), self.max_lag, self.policy) {
            Decision::PassThrough => StageOutcome::Continue,
            Decision::Sleep(delay) => StageOutcome::Delay(delay),
            Decision::Reject(message) => StageOutcome::Respond(response::bad_request(message)),
        }
    }
}

/// The lag http service: stages first, routes last.
#[derive(Debug)]
pub struct LagService {
    config: Arc<ServerConfig>,
    stages: Vec<Box<dyn Stage>>,
    routes: RouteTable,
}

impl LagService {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ParseParams),
            Box::new(LatencyGate::new(config.max_lag, config.lag_policy)),
        ];
        Self {
            config,
            stages,
            routes: RouteTable::default(),
        }
    }

    pub async fn handle(&self, mut exchange: Exchange) -> Response {
        for stage in &self.stages {
            match stage.evaluate(&mut exchange) {
                StageOutcome::Continue => (),
                StageOutcome::Delay(delay) => {
                    if !delay.is_zero() {
                        tracing::debug!("inject lag of {delay:?} for {}", exchange.path());
                        tokio::time::sleep(delay).await;
                    }
                }
                StageOutcome::Respond(resp) => return resp,
            }
        }
        self.routes.dispatch(&exchange, &self.config)
    }
}

impl Service<Request> for LagService {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        match Exchange::read_from(req).await {
            Ok(exchange) => Ok(self.handle(exchange).await),
            Err(err) => {
                tracing::debug!("failed to read request: {err}");
                Ok(response::bad_request("invalid form body"))
            }
        }
    }
}
