/// Transaction ID type.
///
/// Negative values never identify a real transaction; buffers use
/// [`NO_TXNUM`] to mean "not modified" and checkpoint log records carry it
/// as a dummy id.
pub type TxNum = i32;

/// LSN (Log Sequence Number) type.
///
/// The log manager hands out LSNs starting from 1; [`NO_LSN`] marks a buffer
/// whose modifications have no associated log record.
pub type Lsn = i64;

/// Sentinel transaction id for an unmodified buffer.
pub const NO_TXNUM: TxNum = -1;

/// Sentinel LSN for "no log record".
pub const NO_LSN: Lsn = -1;
