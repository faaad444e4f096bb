//!
//! Poll, render and sleep loop.
//!
use crate::block_rate::BlockRate;
use crate::render::{render, CLEAR_SCREEN};
use crate::report::{aggregate, Report};
use crate::{Client, Error, ErrorKind, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::io::Write;
use std::time::Duration;

/// Printed when the status server cannot be used
#[must_use]
pub fn connection_hint(address: &str) -> String {
    format!(
        "Got error when connecting to {}, be sure status server is enabled in SEVM with flags --statusserver.addr=127.0.0.1 --statusserver.port=6539",
        address
    )
}

/// Loop behaviour
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Pause between polls
    pub refresh: Duration,
    /// Clear the terminal before each dashboard
    pub clear_screen: bool,
    /// Stop after the first poll
    pub once: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(5),
            clear_screen: true,
            once: false,
        }
    }
}

/// State kept between polls
#[derive(Debug)]
pub struct Monitor {
    client: Client,
    min_balance: u64,
    block_rate: BlockRate,
}

impl Monitor {
    /// Monitor with an unbounded block rate history
    #[must_use]
    pub fn new(client: Client, min_balance: u64) -> Self {
        Self {
            client,
            min_balance,
            block_rate: BlockRate::new(),
        }
    }

    /// Replace the block rate history, e.g. with a bounded one
    #[must_use]
    pub fn with_block_rate(self, block_rate: BlockRate) -> Self {
        Self { block_rate, ..self }
    }

    /// Client used for polling
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Block samples collected so far
    #[must_use]
    pub const fn block_rate(&self) -> &BlockRate {
        &self.block_rate
    }

    /// Fetch status and metrics once and build a report.
    ///
    /// Only the status request can fail, metrics degrade to an empty snapshot.
    pub async fn poll_once(&mut self, now: DateTime<Utc>) -> Result<Report> {
        let status = self.client.status().await?;
        let metrics = self.client.metrics().await;
        tracing::debug!(
            "block {} with {} metrics",
            status.current_block,
            metrics.len()
        );

        self.block_rate.record(status.current_block, now);
        Ok(aggregate(
            status,
            &metrics,
            self.min_balance,
            &self.block_rate,
        ))
    }
}

fn cancellation(signal: std::io::Result<()>) -> Error {
    match signal {
        Ok(()) => Error::Cancelled,
        Err(e) => Error::IO(e),
    }
}

/// Run until `cancel` resolves, normally `tokio::signal::ctrl_c()`.
///
/// Status fetch and decode failures are reported and the loop carries on.
/// Returns `Ok` on user cancellation and `Err` for anything that should end
/// the process with a failure.
pub async fn run<W, C>(
    monitor: &mut Monitor,
    options: Options,
    out: &mut W,
    cancel: C,
) -> Result<()>
where
    W: Write,
    C: Future<Output = std::io::Result<()>>,
{
    let address = monitor.client().status_url().to_string();
    tokio::pin!(cancel);

    loop {
        let cycle = tokio::select! {
            report = monitor.poll_once(Utc::now()) => report,
            signal = &mut cancel => Err(cancellation(signal)),
        };

        if options.clear_screen {
            write!(out, "{}", CLEAR_SCREEN)?;
        }

        match cycle {
            Ok(report) => writeln!(out, "{}", render(&address, &report))?,
            Err(e) => match e.kind() {
                ErrorKind::Fetch | ErrorKind::Decode => {
                    tracing::warn!("poll of {} failed: {}", address, e);
                    writeln!(out, "{}\n{}", connection_hint(&address), e)?;
                    if options.once {
                        return Err(e);
                    }
                }
                ErrorKind::CancelledByUser => {
                    writeln!(out, "\nExiting")?;
                    return Ok(());
                }
                ErrorKind::Unexpected => return Err(e),
            },
        }
        out.flush()?;

        if options.once {
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(options.refresh) => {}
            signal = &mut cancel => {
                return match cancellation(signal) {
                    Error::Cancelled => {
                        writeln!(out, "\nExiting")?;
                        Ok(())
                    }
                    e => Err(e),
                };
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hint_names_flags() {
        let hint = connection_hint("http://localhost:6539/status");
        assert!(hint.contains("http://localhost:6539/status"));
        assert!(hint.contains("--statusserver.port=6539"));
    }

    #[tokio::test]
    async fn unreachable_node_once() {
        // Nothing listens on port 9 on the loopback interface
        let client = crate::ClientBuilder::new()
            .status_timeout(Duration::from_millis(500))
            .build("http://127.0.0.1:9")
            .unwrap();
        let mut monitor = Monitor::new(client, 10);
        let mut out = Vec::new();

        let options = Options {
            once: true,
            clear_screen: false,
            ..Default::default()
        };
        let err = run(&mut monitor, options, &mut out, std::future::pending::<std::io::Result<()>>())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("be sure status server is enabled"));
        assert!(monitor.block_rate().is_empty());
    }

    #[tokio::test]
    async fn cancel_during_poll() {
        let client = crate::ClientBuilder::new()
            .build("http://127.0.0.1:9")
            .unwrap();
        let mut monitor = Monitor::new(client, 10);
        let mut out = Vec::new();

        let options = Options {
            clear_screen: false,
            ..Default::default()
        };
        run(&mut monitor, options, &mut out, async { Ok::<(), std::io::Error>(()) })
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Exiting"));
    }

    #[tokio::test]
    async fn failed_signal_is_unexpected() {
        let client = crate::ClientBuilder::new()
            .build("http://127.0.0.1:9")
            .unwrap();
        let mut monitor = Monitor::new(client, 10);
        let mut out = Vec::new();

        let signal = async { Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "no handler")) };
        let err = run(&mut monitor, Options::default(), &mut out, signal)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }
}
