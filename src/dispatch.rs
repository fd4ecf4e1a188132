//! Sending optimisation requests to the external solver.
//!
//! A request is attempted exactly once. When the solver cannot be reached the
//! [`SimulatedSolver`] answers instead; when the solver is reached but rejects
//! the request, the rejection is returned as a failed result.

use std::env;
use std::io::{self, Read};
use std::time::Duration;

use log::{error, info, warn};

use crate::errors::DispatchError;
use crate::parameters::OptimizationParameters;
use crate::result::{OptimizationResult, SourceOfTruth, WireResponse};
use crate::simulate::SimulatedSolver;

/// Path appended to the solver base URL.
pub const OPTIMIZE_PATH: &str = "/api/optimize";

/// Solver base URL used when none is configured.
pub const DEFAULT_SOLVER_URL: &str = "http://localhost:8000";

/// Environment variable holding the solver base URL.
pub const SOLVER_URL_VAR: &str = "TOPOBRIEF_SOLVER_URL";

/// Environment variable holding the request timeout in seconds.
pub const SOLVER_TIMEOUT_VAR: &str = "TOPOBRIEF_SOLVER_TIMEOUT_SECS";

/// Where and how to reach the external solver.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Base URL of the solver service.
    pub base_url: String,
    /// Transport-level timeout for the whole request.
    pub request_timeout: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOLVER_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl SolverConfig {
    /// Build a configuration for `base_url` with no timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read [`SOLVER_URL_VAR`] and [`SOLVER_TIMEOUT_VAR`] from the process
    /// environment, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key-value source.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use topobrief::SolverConfig;
    ///
    /// let config = SolverConfig::from_lookup(|key| match key {
    ///     "TOPOBRIEF_SOLVER_URL" => Some("http://solver:9000/".to_string()),
    ///     "TOPOBRIEF_SOLVER_TIMEOUT_SECS" => Some("30".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.endpoint(), "http://solver:9000/api/optimize");
    /// assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(SOLVER_URL_VAR)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_SOLVER_URL.to_string());
        let request_timeout = lookup(SOLVER_TIMEOUT_VAR)
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        Self {
            base_url,
            request_timeout,
        }
    }

    /// Full URL of the optimisation endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{OPTIMIZE_PATH}", self.base_url.trim_end_matches('/'))
    }
}

/// What happened to a request at the transport level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportOutcome {
    /// The solver answered with an HTTP status and body.
    Delivered {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The solver could not be reached (refused, unresolvable, dropped).
    Unreachable(String),
    /// The request could not be issued for a reason other than connectivity.
    Failed(String),
}

/// Carries one JSON request to the solver and reports what happened.
pub trait SolverTransport {
    /// POST `body` as JSON to `url`.
    fn post_json(&mut self, url: &str, body: &str) -> TransportOutcome;
}

/// Blocking HTTP transport.
#[derive(Debug)]
pub struct HttpTransport {
    /// Connection pool and timeouts.
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Create a transport with an optional whole-request timeout.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }
}

impl SolverTransport for HttpTransport {
    fn post_json(&mut self, url: &str, body: &str) -> TransportOutcome {
        let response = self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_string(body);
        match response {
            Ok(response) => {
                let status = response.status();
                delivered(status, read_body(response))
            }
            Err(ureq::Error::Status(status, response)) => delivered(status, read_body(response)),
            Err(ureq::Error::Transport(transport)) => match transport.kind() {
                ureq::ErrorKind::Dns
                | ureq::ErrorKind::ConnectionFailed
                | ureq::ErrorKind::Io
                | ureq::ErrorKind::ProxyConnect => {
                    TransportOutcome::Unreachable(transport.to_string())
                }
                _ => TransportOutcome::Failed(transport.to_string()),
            },
        }
    }
}

/// Read a whole reply body. Density fields at high resolution run to tens of
/// megabytes, so no size cap is applied.
fn read_body(response: ureq::Response) -> io::Result<String> {
    let mut body = String::new();
    response.into_reader().read_to_string(&mut body)?;
    Ok(body)
}

/// Outcome once the solver has answered with `status`.
///
/// The solver was reached, so a body that cannot be read is a failure, never
/// a reason to simulate.
fn delivered(status: u16, body: io::Result<String>) -> TransportOutcome {
    match body {
        Ok(body) => TransportOutcome::Delivered { status, body },
        Err(err) => TransportOutcome::Failed(format!(
            "solver replied HTTP {status} but the body could not be read: {err}"
        )),
    }
}

/// Sends parameter records to the solver, falling back to simulation when the
/// solver is unreachable.
#[derive(Debug)]
pub struct Dispatcher<T: SolverTransport> {
    /// Solver location.
    config: SolverConfig,
    /// Transport used for the single request.
    transport: T,
    /// Fallback used on connectivity failure.
    simulator: SimulatedSolver,
}

impl Dispatcher<HttpTransport> {
    /// Dispatcher speaking HTTP to the solver described by `config`.
    #[must_use]
    pub fn http(config: SolverConfig) -> Self {
        let transport = HttpTransport::new(config.request_timeout);
        Self::new(config, transport)
    }
}

impl<T: SolverTransport> Dispatcher<T> {
    /// Create a dispatcher with the default simulated fallback.
    pub fn new(config: SolverConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            simulator: SimulatedSolver::new(),
        }
    }

    /// Replace the simulated fallback.
    #[must_use]
    pub fn with_simulator(mut self, simulator: SimulatedSolver) -> Self {
        self.simulator = simulator;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Give back the transport, e.g. to inspect a test double.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Validate `params` and send them to the solver once.
    ///
    /// Returns the solver's result tagged [`SourceOfTruth::External`], a
    /// simulated result when the solver is unreachable, or a failed result
    /// carrying the solver's message when it rejects the request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidParameters`] when `params` fails
    /// validation; nothing is sent in that case.
    pub fn dispatch(
        &mut self,
        params: &OptimizationParameters,
    ) -> Result<OptimizationResult, DispatchError> {
        params.validate()?;
        let payload = serde_json::to_string(params)?;
        let endpoint = self.config.endpoint();
        info!("sending optimization request to {endpoint}");

        let result = match self.transport.post_json(&endpoint, &payload) {
            TransportOutcome::Unreachable(reason) => {
                warn!("solver unreachable ({reason}), using simulated optimization");
                self.simulator.simulate(params)
            }
            TransportOutcome::Failed(reason) => {
                error!("solver request failed: {reason}");
                OptimizationResult::failure(SourceOfTruth::External, reason)
            }
            TransportOutcome::Delivered { status, body } if (200..300).contains(&status) => {
                accepted_reply(&body)
            }
            TransportOutcome::Delivered { status, body } => {
                let message = rejection_message(status, &body);
                error!("{message}");
                OptimizationResult::failure(SourceOfTruth::External, message)
            }
        };

        if result.success {
            info!("optimization finished ({:?})", result.source_of_truth);
        }
        Ok(result)
    }
}

/// Interpret a 2xx reply body.
fn accepted_reply(body: &str) -> OptimizationResult {
    let decoded = WireResponse::from_json(body)
        .and_then(|reply| reply.into_result(SourceOfTruth::External));
    match decoded {
        Ok(result) if result.success => result,
        Ok(result) => {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "solver reported failure without a message".to_string());
            error!("solver reported failure: {message}");
            OptimizationResult {
                error: Some(message),
                ..result
            }
        }
        Err(err) => {
            error!("unusable solver reply: {err}");
            OptimizationResult::failure(SourceOfTruth::External, err.to_string())
        }
    }
}

/// Human-readable reason for a non-2xx reply.
///
/// Uses the body's `error` or `detail` string when present, the raw body
/// otherwise.
fn rejection_message(status: u16, body: &str) -> String {
    let reason = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "detail"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string());
    if reason.is_empty() {
        format!("solver returned HTTP {status}")
    } else {
        format!("solver returned HTTP {status}: {reason}")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    use serde_json::json;

    use super::*;

    /// Accept one connection on a local port, consume the request and answer
    /// with `status_line` and `body`. Returns the base URL to dispatch to.
    fn serve_once(status_line: &'static str, body: String) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
        let address = listener.local_addr().expect("local address");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept connection");
            let mut request = Vec::new();
            let mut chunk = [0_u8; 4096];
            loop {
                let read = stream.read(&mut chunk).expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..read]);
                let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + length {
                    break;
                }
            }
            write!(
                stream,
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n",
                body.len()
            )
            .expect("write reply head");
            stream.write_all(body.as_bytes()).expect("write reply body");
        });
        (format!("http://{address}"), handle)
    }

    #[test]
    fn large_successful_reply_stays_external() {
        let body = json!({
            "success": true,
            "stl_url": "/results/large.stl",
            "message": "x".repeat(11 * 1024 * 1024),
        })
        .to_string();
        let (base_url, server) = serve_once("HTTP/1.1 200 OK", body);

        let mut dispatcher = Dispatcher::http(SolverConfig::new(base_url))
            .with_simulator(SimulatedSolver::with_seed(3).with_latency(Duration::ZERO));
        let result = dispatcher
            .dispatch(&OptimizationParameters::default())
            .expect("valid parameters");
        server.join().expect("server thread");

        assert!(result.success);
        assert_eq!(result.source_of_truth, SourceOfTruth::External);
        assert_eq!(result.artifact_reference.as_deref(), Some("/results/large.stl"));
        assert_eq!(result.message.map(|message| message.len()), Some(11 * 1024 * 1024));
    }

    #[test]
    fn rejection_body_is_read_over_http() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 422 Unprocessable Entity",
            r#"{"detail": "resolution too high"}"#.to_string(),
        );
        let mut dispatcher = Dispatcher::http(SolverConfig::new(base_url));
        let result = dispatcher
            .dispatch(&OptimizationParameters::default())
            .expect("valid parameters");
        server.join().expect("server thread");

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("solver returned HTTP 422: resolution too high")
        );
    }

    #[test]
    fn unreadable_body_after_status_is_a_failure() {
        let outcome = delivered(
            200,
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed")),
        );
        assert_eq!(
            outcome,
            TransportOutcome::Failed(
                "solver replied HTTP 200 but the body could not be read: connection closed"
                    .to_string()
            )
        );
        assert_eq!(
            delivered(201, Ok("{}".to_string())),
            TransportOutcome::Delivered {
                status: 201,
                body: "{}".to_string()
            }
        );
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(
            SolverConfig::new("https://solver.example/").endpoint(),
            "https://solver.example/api/optimize"
        );
        assert_eq!(
            SolverConfig::default().endpoint(),
            "http://localhost:8000/api/optimize"
        );
    }

    #[test]
    fn empty_lookup_gives_defaults() {
        assert_eq!(SolverConfig::from_lookup(|_| None), SolverConfig::default());
        let blank = SolverConfig::from_lookup(|key| {
            (key == SOLVER_URL_VAR).then(|| "  ".to_string())
        });
        assert_eq!(blank.base_url, DEFAULT_SOLVER_URL);
    }

    #[test]
    fn unparsable_timeout_is_ignored() {
        let config = SolverConfig::from_lookup(|key| {
            (key == SOLVER_TIMEOUT_VAR).then(|| "soon".to_string())
        });
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn rejection_message_prefers_structured_reason() {
        assert_eq!(
            rejection_message(422, r#"{"detail": "dimensions missing"}"#),
            "solver returned HTTP 422: dimensions missing"
        );
        assert_eq!(
            rejection_message(500, r#"{"success": false, "error": "boom"}"#),
            "solver returned HTTP 500: boom"
        );
        assert_eq!(
            rejection_message(502, "Bad Gateway\n"),
            "solver returned HTTP 502: Bad Gateway"
        );
        assert_eq!(rejection_message(503, ""), "solver returned HTTP 503");
    }

    #[test]
    fn accepted_reply_with_failure_flag_is_a_failure() {
        let result = accepted_reply(r#"{"success": false, "error": "mesh export failed"}"#);
        assert!(!result.success);
        assert_eq!(result.source_of_truth, SourceOfTruth::External);
        assert_eq!(result.error.as_deref(), Some("mesh export failed"));
    }

    #[test]
    fn malformed_accepted_reply_is_a_failure() {
        let result = accepted_reply("not json");
        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .is_some_and(|error| error.contains("not valid JSON")));
    }
}
