use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    Data, Orbit, Request, Response, Rocket,
};

use crate::model::mongodb::Id;

/// A unique identifier for a particular request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl RequestId {
    /// Atomically get the next ID. Wraps around to zero on overflow.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bookkeeping for a single request, kept in the request-local cache.
#[derive(Debug)]
pub struct RequestTrace {
    pub id: RequestId,
    received: Instant,
}

impl RequestTrace {
    fn new() -> Self {
        Self {
            id: RequestId::next(),
            received: Instant::now(),
        }
    }

    /// The trace for this request, started the first time it is asked for.
    pub fn of<'r>(req: &'r Request<'_>) -> &'r Self {
        req.local_cache(Self::new)
    }

    /// Time since the request was received.
    pub fn elapsed(&self) -> Duration {
        self.received.elapsed()
    }
}

/// The authenticated user behind a request, if any.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Caller(Option<Id>);

impl Caller {
    /// Note that this request was made by `user`. Only the first call per request counts.
    pub fn record(req: &Request<'_>, user: Id) {
        req.local_cache(|| Caller(Some(user)));
    }

    /// The recorded caller of this request.
    pub fn of(req: &Request<'_>) -> Option<Id> {
        req.local_cache(Caller::default).0
    }
}

/// Format a response log line.
fn response_line(
    trace: &RequestTrace,
    status: impl Display,
    route: &str,
    caller: Option<Id>,
) -> String {
    let millis = trace.elapsed().as_millis();
    match caller {
        Some(user) => format!("<-rsp{} {status} {route} in {millis}ms by {user}", trace.id),
        None => format!("<-rsp{} {status} {route} in {millis}ms", trace.id),
    }
}

/// A rocket fairing that logs every request and response, plus liftoff and shutdown.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        let protocol = if config.tls_enabled() { "https" } else { "http" };
        info!(
            "Poll server listening on {protocol}://{}:{}",
            config.address, config.port
        );
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let trace = RequestTrace::of(req);
        info!("->req{} {} {}", trace.id, req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let status = res.status();
        let route = req
            .route()
            .map(|route| match route.name {
                Some(ref name) => format!("{name} ({})", route.uri),
                None => route.uri.to_string(),
            })
            .unwrap_or_else(|| "UNKNOWN ROUTE".to_string());
        let line = response_line(RequestTrace::of(req), status, &route, Caller::of(req));
        match status.class() {
            StatusClass::ServerError => error!("{line}"),
            StatusClass::ClientError => warn!("{line}"),
            _ => info!("{line}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, stopping gracefully...");
    }
}
