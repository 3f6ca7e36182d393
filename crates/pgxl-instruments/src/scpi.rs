//! SCPI-over-TCP VNA client (raw socket, port 5025).
//!
//! SCPI over a raw socket is newline-terminated text with one answer line
//! per query, so the same [`LineFramer`] that splits device replies splits
//! instrument answers. There is no sequence numbering: answers come back in
//! query order.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use pgxl_core::error::{Error, Result};
use pgxl_core::transport::Transport;
use pgxl_line_io::{LineFramer, POLL_INTERVAL};
use pgxl_transport::TcpTransport;

use crate::backend::{check_sweep, linear_axis, MeasurementBackend, Sweep, VnaVendor};

/// Raw-socket SCPI port.
pub const DEFAULT_SCPI_PORT: u16 = 5025;

/// Default answer deadline.
pub const DEFAULT_SCPI_TIMEOUT: Duration = Duration::from_secs(5);

/// A networked VNA driven with SCPI commands.
pub struct ScpiVna {
    vendor: VnaVendor,
    transport: Option<Box<dyn Transport>>,
    framer: LineFramer,
    timeout: Duration,
}

impl ScpiVna {
    /// Connect to `host:port`.
    pub async fn connect(
        vendor: VnaVendor,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self> {
        let transport = TcpTransport::connect_with_timeout(host, port, timeout).await?;
        tracing::info!(%vendor, host, port, "VNA connected");
        Ok(Self::from_transport(vendor, Box::new(transport), timeout))
    }

    /// Drive an instrument over an already-connected transport.
    pub fn from_transport(vendor: VnaVendor, transport: Box<dyn Transport>, timeout: Duration) -> Self {
        ScpiVna {
            vendor,
            transport: Some(transport),
            framer: LineFramer::new(),
            timeout,
        }
    }

    /// Send a command that has no answer.
    pub async fn write(&mut self, scpi: &str) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        tracing::trace!(scpi, "scpi write");
        transport
            .send(format!("{}\n", scpi.trim_end()).as_bytes())
            .await
    }

    async fn read_answer(&mut self, scpi: &str) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(line) = self.framer.next_line() {
                return Ok(line);
            }
            if self.framer.is_peer_closed() {
                return Err(Error::ConnectionLost);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Protocol(format!(
                    "no answer to {scpi} within {:?}",
                    self.timeout
                )));
            }
            let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
            self.framer
                .fill(transport.as_mut(), (deadline - now).min(POLL_INTERVAL))
                .await?;
        }
    }

    async fn query_f64(&mut self, scpi: &str) -> Result<f64> {
        let answer = self.query(scpi).await?;
        answer
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Protocol(format!("{scpi} answered {answer:?}")))
    }

    /// Frequency axis of the last sweep, as the instrument reports it.
    async fn frequency_axis(&mut self) -> Result<Vec<f64>> {
        let start = self.query_f64(":SENS:FREQ:STAR?").await?;
        let stop = self.query_f64(":SENS:FREQ:STOP?").await?;
        let points = self.query_f64(":SENS:SWE:POIN?").await?;
        Ok(linear_axis(start, stop, points.max(1.0) as usize))
    }
}

/// Parse a comma-separated trace.
pub fn parse_trace(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| Error::Protocol(format!("bad trace value {v:?}")))
        })
        .collect()
}

#[async_trait]
impl MeasurementBackend for ScpiVna {
    fn name(&self) -> &str {
        match self.vendor {
            VnaVendor::Siglent => "siglent",
            VnaVendor::Rigol => "rigol",
        }
    }

    async fn sweep(&mut self, start_hz: f64, stop_hz: f64, points: usize) -> Result<Sweep> {
        check_sweep(start_hz, stop_hz, points)?;
        for cmd in [
            ":SYST:PRES".to_string(),
            ":INIT:CONT OFF".to_string(),
            format!(":SENS:FREQ:STAR {start_hz}"),
            format!(":SENS:FREQ:STOP {stop_hz}"),
            format!(":SENS:SWE:POIN {points}"),
            ":INIT:IMM".to_string(),
            "*WAI".to_string(),
            ":CALC:FORM LOGM".to_string(),
        ] {
            self.write(&cmd).await?;
        }
        let raw = self.query(":CALC:DATA:FDAT?").await?;
        let values = parse_trace(&raw)?;
        let frequencies = self.frequency_axis().await?;
        tracing::debug!(points = values.len(), "scpi sweep");
        Ok(Sweep::new(frequencies, values))
    }

    async fn query(&mut self, scpi: &str) -> Result<String> {
        self.write(scpi).await?;
        self.read_answer(scpi).await
    }

    async fn close(&mut self) -> Result<()> {
        self.framer.clear();
        match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        }
    }
}
