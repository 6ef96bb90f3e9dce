use rama::http::{Method, Response};

use crate::{
    config::ServerConfig,
    http::{handlers, pipeline::Exchange, response},
};

/// Everything a handler gets to see.
#[derive(Debug)]
pub struct RouteContext<'a> {
    pub exchange: &'a Exchange,
    /// The captured path segment for [`PathPattern::NumericSegment`] routes.
    pub segment: Option<&'a str>,
    pub config: &'a ServerConfig,
}

pub type Handler = fn(&RouteContext<'_>) -> Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    /// GET and HEAD
    Get,
}

impl MethodFilter {
    fn allows(self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Get => method == Method::GET || method == Method::HEAD,
        }
    }

    fn allow_header(self) -> &'static str {
        match self {
            Self::Any => "*",
            Self::Get => "GET, HEAD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    Exact(&'static str),
    /// `<prefix><digits>`, where the digits are captured.
    NumericSegment(&'static str),
}

impl PathPattern {
    /// `None` if the path does not match, otherwise the (optional) captured segment.
    fn capture<'a>(&self, path: &'a str) -> Option<Option<&'a str>> {
        match self {
            Self::Exact(expected) => (path == *expected).then_some(None),
            Self::NumericSegment(prefix) => path
                .strip_prefix(prefix)
                .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
                .map(Some),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: MethodFilter,
    pub pattern: PathPattern,
    pub handler: Handler,
}

/// Ordered routes, the first route matching the path wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
            .with_route(MethodFilter::Any, PathPattern::Exact("/"), handlers::index)
            .with_route(MethodFilter::Get, PathPattern::Exact("/data"), handlers::data)
            .with_route(
                MethodFilter::Get,
                PathPattern::NumericSegment("/error/"),
                handlers::error,
            )
            .with_route(MethodFilter::Any, PathPattern::Exact("/headers"), handlers::headers)
            .with_route(MethodFilter::Any, PathPattern::Exact("/health"), handlers::health)
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn with_route(mut self, method: MethodFilter, pattern: PathPattern, handler: Handler) -> Self {
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        self
    }

    /// Dispatch to the first matching route.
    ///
    /// A path matched only by routes not accepting the method gives a `405`,
    /// an unmatched path a `404`.
    pub fn dispatch(&self, exchange: &Exchange, config: &ServerConfig) -> Response {
        let mut disallowed = None;

        for route in &self.routes {
            let Some(segment) = route.pattern.capture(exchange.path()) else {
                continue;
            };
            if !route.method.allows(exchange.method()) {
                disallowed.get_or_insert(route.method);
                continue;
            }
            return (route.handler)(&RouteContext {
                exchange,
                segment,
                config,
            });
        }

        match disallowed {
            Some(filter) => response::method_not_allowed(filter.allow_header()),
            None => response::not_found(),
        }
    }
}
