//! Control session
//!
//! A [`ControlSession`] owns one open device for its whole lifetime. Every
//! operation is a single synchronous control transfer that succeeds only if
//! the transferred byte count exactly matches the payload length. Failed
//! transfers are reported immediately and never retried; the session stays
//! usable afterwards.

use crate::backend::{ControlPipe, UsbBackend};
use crate::error::{Result, TransportError};
use protocol::{Command, CommandCode, ControlVersion, ResourceId, SetupPacket, Transaction};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for a single control transfer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Configuration selected when opening a device
pub const DEFAULT_CONFIGURATION: u8 = 1;

/// Parameters for opening a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Interface to claim
    pub interface: u8,
    /// Configuration to select, or `None` to keep the active one
    pub configuration: Option<u8>,
    pub claim_interface: bool,
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(vendor_id: u16, product_id: u16, interface: u8) -> Self {
        Self {
            vendor_id,
            product_id,
            interface,
            configuration: Some(DEFAULT_CONFIGURATION),
            claim_interface: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_configuration(mut self, configuration: Option<u8>) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_claim_interface(mut self, claim: bool) -> Self {
        self.claim_interface = claim;
        self
    }
}

/// Open control session with one device
///
/// Closing consumes the session. Dropping an open session releases the
/// claimed interface on a best-effort basis.
pub struct ControlSession<P: ControlPipe> {
    pipe: P,
    claimed: Option<u8>,
    timeout: Duration,
    transactions: u64,
}

impl<P: ControlPipe> ControlSession<P> {
    /// Locate, open and claim the device described by `config`
    pub fn open<B>(backend: &mut B, config: &SessionConfig) -> Result<Self>
    where
        B: UsbBackend<Pipe = P>,
    {
        let mut pipe = backend
            .open(config.vendor_id, config.product_id)
            .inspect_err(|e| warn!("Could not open device: {}", e))?;

        if let Some(configuration) = config.configuration {
            pipe.set_configuration(configuration)
                .inspect_err(|e| warn!("Error setting configuration: {}", e))?;
        }

        let claimed = if config.claim_interface {
            pipe.claim_interface(config.interface)
                .inspect_err(|e| warn!("Error claiming interface: {}", e))?;
            Some(config.interface)
        } else {
            None
        };

        info!(
            "Opened control session to {:04x}:{:04x} (interface {})",
            config.vendor_id, config.product_id, config.interface
        );

        Ok(Self {
            pipe,
            claimed,
            timeout: config.timeout,
            transactions: 0,
        })
    }

    /// Release the claimed interface and close the device
    pub fn close(mut self) -> Result<()> {
        if let Some(interface) = self.claimed.take() {
            self.pipe.release_interface(interface)?;
        }
        info!(
            "Closed control session after {} transactions",
            self.transactions
        );
        Ok(())
    }

    /// Number of transfers issued so far, including failed ones
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the device's control protocol version
    pub fn query_version(&mut self) -> Result<ControlVersion> {
        let transaction = Transaction::version_query();
        let setup = self.begin(&transaction, "version");

        let mut buf = [0u8; ControlVersion::SIZE];
        let result = self.pipe.control_in(&setup, &mut buf, self.timeout);
        let len = check_length("version", result, ControlVersion::SIZE)?;

        let version = ControlVersion::from_bytes(&buf[..len])?;
        debug!("Version returned: {:#x}", version.0);
        Ok(version)
    }

    /// Send `payload` to resource `resid` with write command `code`
    pub fn write_command(
        &mut self,
        resid: ResourceId,
        code: CommandCode,
        payload: &[u8],
    ) -> Result<()> {
        let transaction = Transaction::new(resid, Command::write(code), payload.len())?;
        let setup = self.begin(&transaction, "write");
        debug!("Write data: {:02x?}", payload);

        let result = self.pipe.control_out(&setup, payload, self.timeout);
        check_length("write", result, payload.len())?;
        Ok(())
    }

    /// Fill `payload` from resource `resid` with read command `code`
    ///
    /// The payload length is `payload.len()`. On error the buffer contents
    /// are unspecified.
    pub fn read_command(
        &mut self,
        resid: ResourceId,
        code: CommandCode,
        payload: &mut [u8],
    ) -> Result<()> {
        let transaction = Transaction::new(resid, Command::read(code), payload.len())?;
        let setup = self.begin(&transaction, "read");

        let result = self.pipe.control_in(&setup, payload, self.timeout);
        check_length("read", result, payload.len())?;
        debug!("Read data returned: {:02x?}", payload);
        Ok(())
    }

    /// Read `len` bytes into a new buffer
    pub fn read_command_vec(
        &mut self,
        resid: ResourceId,
        code: CommandCode,
        len: usize,
    ) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; len];
        self.read_command(resid, code, &mut payload)?;
        Ok(payload)
    }

    fn begin(&mut self, transaction: &Transaction, kind: &str) -> SetupPacket {
        let header = transaction.header();
        debug!(
            "{}: send {} command: {:#06x} {:#06x} {:#06x}",
            self.transactions, kind, header.windex, header.wvalue, header.wlength
        );
        self.transactions += 1;
        SetupPacket::for_transaction(transaction)
    }
}

impl<P: ControlPipe> Drop for ControlSession<P> {
    fn drop(&mut self) {
        if let Some(interface) = self.claimed.take()
            && let Err(e) = self.pipe.release_interface(interface)
        {
            debug!("Failed to release interface {} on drop: {}", interface, e);
        }
    }
}

fn check_length(kind: &str, result: Result<usize>, expected: usize) -> Result<usize> {
    match result {
        Ok(actual) if actual == expected => Ok(actual),
        Ok(actual) => {
            warn!(
                "{} transfer returned {} bytes, expected {}",
                kind, actual, expected
            );
            Err(TransportError::LengthMismatch { expected, actual })
        }
        Err(e) => {
            warn!("{} transfer failed: {}", kind, e);
            Err(e)
        }
    }
}
