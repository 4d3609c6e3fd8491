//! Plugin RPC client with connection retry.

use std::fmt;
use std::time::{Duration, Instant};

use berth_common::config::RetryPolicy;
use berth_common::error::{BerthError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::transport::{HttpTransport, Transport, TransportError};

/// Client bound to a single plugin endpoint.
///
/// Calls block the current thread, including while waiting between
/// connection attempts.
pub struct Client {
    addr: String,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.addr)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for `addr` with the default retry policy.
    ///
    /// `addr` is `tcp://host:port`, `http://host:port` or `host:port`.
    ///
    /// # Errors
    ///
    /// Returns `BerthError::InvalidAddress` if the address is malformed.
    pub fn new(addr: &str) -> Result<Self> {
        Self::with_retry(addr, RetryPolicy::default())
    }

    /// Creates a client for `addr` with an explicit retry policy.
    ///
    /// # Errors
    ///
    /// Returns `BerthError::InvalidAddress` if the address is malformed.
    pub fn with_retry(addr: &str, retry: RetryPolicy) -> Result<Self> {
        let host = parse_addr(addr)?;
        let transport = HttpTransport::new(host.clone())?;
        Ok(Self::with_transport(host, transport, retry))
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(
        addr: impl Into<String>,
        transport: impl Transport + 'static,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            addr: addr.into(),
            transport: Box::new(transport),
            retry,
        }
    }

    /// Returns the `host:port` this client talks to.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Calls `method` on the plugin and decodes its answer.
    ///
    /// Connection failures are retried with exponential backoff. Once the
    /// next wait would exceed the retry budget, the last connection error
    /// is returned. A non-200 answer is never retried.
    ///
    /// # Errors
    ///
    /// - `ConnectionFailed` when the plugin stayed unreachable for the whole budget.
    /// - `RemoteError` carrying the body of a non-200 answer.
    /// - `DecodeError` when a 200 body does not decode into `Resp`.
    /// - `TimeoutExceeded` when a connected plugin did not answer in time.
    pub fn call<Req, Resp>(&self, method: &str, args: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(args)?;
        let path = format!("/{method}");
        let start = Instant::now();
        let mut retries = 0_u32;

        loop {
            // Each attempt only gets what is left of the budget.
            let remaining = self.retry.timeout().saturating_sub(start.elapsed());
            match self.transport.post(&path, body.clone(), remaining) {
                Ok(resp) if resp.is_ok() => {
                    tracing::trace!(addr = %self.addr, method, "plugin call succeeded");
                    return serde_json::from_slice(&resp.body).map_err(|e| {
                        BerthError::DecodeError {
                            method: method.to_owned(),
                            message: e.to_string(),
                        }
                    });
                }
                Ok(resp) => {
                    let message = String::from_utf8_lossy(&resp.body).into_owned();
                    tracing::debug!(addr = %self.addr, method, status = resp.status, "plugin returned an error");
                    return Err(BerthError::RemoteError { message });
                }
                Err(TransportError::Connect(message)) => {
                    let delay = backoff(retries, &self.retry);
                    if delay + start.elapsed() > self.retry.timeout() {
                        return Err(BerthError::ConnectionFailed {
                            addr: self.addr.clone(),
                            message,
                        });
                    }
                    retries += 1;
                    tracing::warn!(
                        addr = %self.addr,
                        method,
                        retry_in = ?delay,
                        error = %message,
                        "unable to connect to plugin, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(TransportError::Timeout(message)) => {
                    return Err(BerthError::TimeoutExceeded {
                        method: method.to_owned(),
                        message,
                    });
                }
                Err(TransportError::Body(message)) => {
                    return Err(BerthError::DecodeError {
                        method: method.to_owned(),
                        message,
                    });
                }
            }
        }
    }
}

/// Delay to wait after the `retries`-th consecutive connection failure.
///
/// Starts at the policy's base, doubles per retry, capped at the ceiling.
#[must_use]
pub fn backoff(retries: u32, policy: &RetryPolicy) -> Duration {
    let cap = policy.cap();
    let mut delay = policy.base();
    for _ in 0..retries {
        if delay >= cap {
            break;
        }
        delay = delay.saturating_mul(2);
    }
    delay.min(cap)
}

fn parse_addr(addr: &str) -> Result<String> {
    let invalid = || BerthError::InvalidAddress {
        addr: addr.to_owned(),
    };
    let host = match addr.split_once("://") {
        Some(("tcp" | "http", rest)) => rest,
        Some(_) => return Err(invalid()),
        None => addr,
    };
    let (name, port) = host.rsplit_once(':').ok_or_else(invalid)?;
    if name.is_empty() || name.contains('/') || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(host.to_owned())
}
