//! PC/SC contactless reader (e.g. Sony RC-S380).
//!
//! Each poll runs one connect/transmit/disconnect sequence on the blocking
//! thread pool, bounded by the configured reader timeout. A sequence that
//! overruns is reported as [`HardwareError::Timeout`] and left to finish in
//! the background; polls made before it finishes start no new sequence.

use std::ffi::{CStr, CString};
use std::time::Duration;

use badgelock_core::CardIdentifier;
use pcsc::{Context, Disposition, Protocols, Scope, ShareMode};
use tracing::{debug, info};

use crate::{
    HardwareError, Result, apdu, exchange::BlockingExchange, traits::CardReader,
    types::ReaderInfo,
};

/// Card reader backed by the platform PC/SC service.
pub struct PcscReader {
    context: Context,
    reader: CString,
    exchange: BlockingExchange<Option<CardIdentifier>>,
}

impl PcscReader {
    /// List the names of all attached PC/SC readers.
    ///
    /// # Errors
    ///
    /// Returns an error if the PC/SC service is unavailable.
    pub fn list_readers() -> Result<Vec<String>> {
        let context = Context::establish(Scope::User)?;
        list_reader_names(&context)
    }

    /// Open the first reader whose name contains `name_filter`, or the first
    /// reader when no filter is given.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::DeviceNotFound` if no reader matches, or a PC/SC
    /// error if the service cannot be reached.
    pub fn open(name_filter: Option<&str>, timeout: Duration) -> Result<Self> {
        let context = Context::establish(Scope::User)?;
        let readers = context.list_readers_owned()?;

        let reader = readers
            .into_iter()
            .find(|name| match name_filter {
                Some(filter) => name.to_string_lossy().contains(filter),
                None => true,
            })
            .ok_or_else(|| {
                HardwareError::device_not_found(name_filter.unwrap_or("any PC/SC reader"))
            })?;

        info!("Using reader: {}", reader.to_string_lossy());

        Ok(Self {
            context,
            reader,
            exchange: BlockingExchange::new(timeout),
        })
    }
}

impl std::fmt::Debug for PcscReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscReader")
            .field("reader", &self.reader)
            .field("timeout", &self.exchange.timeout())
            .field("busy", &self.exchange.is_busy())
            .finish_non_exhaustive()
    }
}

impl CardReader for PcscReader {
    async fn read_uid(&mut self) -> Result<Option<CardIdentifier>> {
        let context = self.context.clone();
        let reader = self.reader.clone();
        self.exchange
            .run(move || read_uid_blocking(&context, &reader))
            .await
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(self.reader.to_string_lossy(), "pcsc"))
    }
}

fn list_reader_names(context: &Context) -> Result<Vec<String>> {
    Ok(context
        .list_readers_owned()?
        .into_iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

fn read_uid_blocking(context: &Context, reader: &CStr) -> Result<Option<CardIdentifier>> {
    let card = match context.connect(reader, ShareMode::Shared, Protocols::ANY) {
        Ok(card) => card,
        Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
    let result = card
        .transmit(apdu::get_uid_command(), &mut buffer)
        .map_err(HardwareError::from)
        .and_then(apdu::parse_uid_response);

    if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
        debug!("Reader disconnect failed: {}", e);
    }

    result.map(Some)
}
