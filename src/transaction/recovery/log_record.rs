use std::fmt;

use crate::common::types::{Lsn, TxNum, NO_TXNUM};
use crate::storage::file::manager::Result as FileResult;
use crate::storage::file::{BlockId, Page};
use crate::transaction::transaction::{Transaction, TransactionError};
use crate::transaction::wal::LogManager;

// On-disk record type tags. The tag is the first i32 of every record.
pub const CHECKPOINT: i32 = 0;
pub const START: i32 = 1;
pub const COMMIT: i32 = 2;
pub const ROLLBACK: i32 = 3;
pub const SETINT: i32 = 4;
pub const SETSTRING: i32 = 5;

/// One record of the recovery log.
///
/// The SETINT and SETSTRING variants carry the value a block location held
/// *before* the change they describe. That is all undo-only recovery needs:
/// committed changes are forced to disk before their COMMIT record, so
/// nothing is ever redone, and uncommitted changes are reverted by writing
/// the old value back.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Checkpoint,
    Start {
        txnum: TxNum,
    },
    Commit {
        txnum: TxNum,
    },
    Rollback {
        txnum: TxNum,
    },
    SetInt {
        txnum: TxNum,
        blk: BlockId,
        offset: usize,
        old_val: i32,
    },
    SetString {
        txnum: TxNum,
        blk: BlockId,
        offset: usize,
        old_val: String,
    },
}

impl LogRecord {
    /// Interpret the bytes returned by the log iterator.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let p = Page::from_bytes(bytes.to_vec());
        match p.get_int(0) {
            CHECKPOINT => Ok(LogRecord::Checkpoint),
            START => Ok(LogRecord::Start {
                txnum: p.get_int(4),
            }),
            COMMIT => Ok(LogRecord::Commit {
                txnum: p.get_int(4),
            }),
            ROLLBACK => Ok(LogRecord::Rollback {
                txnum: p.get_int(4),
            }),
            SETINT => {
                let (txnum, blk, offset, vpos) = Self::decode_set_header(&p);
                Ok(LogRecord::SetInt {
                    txnum,
                    blk,
                    offset,
                    old_val: p.get_int(vpos),
                })
            }
            SETSTRING => {
                let (txnum, blk, offset, vpos) = Self::decode_set_header(&p);
                Ok(LogRecord::SetString {
                    txnum,
                    blk,
                    offset,
                    old_val: p.get_string(vpos),
                })
            }
            other => Err(TransactionError::UnknownLogRecord(other)),
        }
    }

    /// The transaction this record belongs to. Checkpoint records belong to
    /// no transaction and report a dummy negative id.
    pub fn tx_number(&self) -> TxNum {
        match self {
            LogRecord::Checkpoint => NO_TXNUM,
            LogRecord::Start { txnum }
            | LogRecord::Commit { txnum }
            | LogRecord::Rollback { txnum } => *txnum,
            LogRecord::SetInt { txnum, .. } | LogRecord::SetString { txnum, .. } => *txnum,
        }
    }

    /// Undo the change this record describes, if it describes one.
    ///
    /// For the SET records this pins the block, writes the saved old value
    /// back without logging, and unpins. Every other kind carries no undo
    /// information and is a no-op.
    pub fn undo(&self, tx: &Transaction) -> Result<(), TransactionError> {
        match self {
            LogRecord::SetInt {
                blk,
                offset,
                old_val,
                ..
            } => {
                tx.pin(blk)?;
                tx.set_int(blk, *offset, *old_val, false)?;
                tx.unpin(blk);
                Ok(())
            }
            LogRecord::SetString {
                blk,
                offset,
                old_val,
                ..
            } => {
                tx.pin(blk)?;
                tx.set_string(blk, *offset, old_val, false)?;
                tx.unpin(blk);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Append a CHECKPOINT record and return its LSN.
    pub fn write_checkpoint(lm: &LogManager) -> FileResult<Lsn> {
        let mut p = Page::from_bytes(vec![0; 4]);
        p.set_int(0, CHECKPOINT);
        lm.append(p.contents())
    }

    /// Append a START record and return its LSN.
    pub fn write_start(lm: &LogManager, txnum: TxNum) -> FileResult<Lsn> {
        Self::write_tx_marker(lm, START, txnum)
    }

    /// Append a COMMIT record and return its LSN.
    pub fn write_commit(lm: &LogManager, txnum: TxNum) -> FileResult<Lsn> {
        Self::write_tx_marker(lm, COMMIT, txnum)
    }

    /// Append a ROLLBACK record and return its LSN.
    pub fn write_rollback(lm: &LogManager, txnum: TxNum) -> FileResult<Lsn> {
        Self::write_tx_marker(lm, ROLLBACK, txnum)
    }

    /// Append a SETINT record holding the previous integer value at the
    /// given block location, and return its LSN.
    pub fn write_set_int(
        lm: &LogManager,
        txnum: TxNum,
        blk: &BlockId,
        offset: usize,
        old_val: i32,
    ) -> FileResult<Lsn> {
        let (mut p, vpos) = Self::encode_set_header(SETINT, txnum, blk, offset, 4);
        p.set_int(vpos, old_val);
        lm.append(p.contents())
    }

    /// Append a SETSTRING record holding the previous string value at the
    /// given block location, and return its LSN.
    pub fn write_set_string(
        lm: &LogManager,
        txnum: TxNum,
        blk: &BlockId,
        offset: usize,
        old_val: &str,
    ) -> FileResult<Lsn> {
        let (mut p, vpos) =
            Self::encode_set_header(SETSTRING, txnum, blk, offset, Page::max_length(old_val.len()));
        p.set_string(vpos, old_val);
        lm.append(p.contents())
    }

    fn write_tx_marker(lm: &LogManager, op: i32, txnum: TxNum) -> FileResult<Lsn> {
        let mut p = Page::from_bytes(vec![0; 8]);
        p.set_int(0, op);
        p.set_int(4, txnum);
        lm.append(p.contents())
    }

    /// Lay out `[op][txnum][filename][blknum][offset]` and leave `val_size`
    /// bytes for the value, whose offset is returned alongside the page.
    fn encode_set_header(
        op: i32,
        txnum: TxNum,
        blk: &BlockId,
        offset: usize,
        val_size: usize,
    ) -> (Page, usize) {
        let tpos = 4;
        let fpos = tpos + 4;
        let bpos = fpos + Page::max_length(blk.filename().len());
        let opos = bpos + 4;
        let vpos = opos + 4;

        let mut p = Page::from_bytes(vec![0; vpos + val_size]);
        p.set_int(0, op);
        p.set_int(tpos, txnum);
        p.set_string(fpos, blk.filename());
        p.set_int(bpos, blk.number());
        p.set_int(opos, offset as i32);
        (p, vpos)
    }

    /// Inverse of [`encode_set_header`]: returns txnum, block, offset and
    /// the position of the value field.
    ///
    /// [`encode_set_header`]: LogRecord::encode_set_header
    fn decode_set_header(p: &Page) -> (TxNum, BlockId, usize, usize) {
        let tpos = 4;
        let txnum = p.get_int(tpos);
        let fpos = tpos + 4;
        let filename = p.get_string(fpos);
        let bpos = fpos + Page::max_length(filename.len());
        let blknum = p.get_int(bpos);
        let opos = bpos + 4;
        let offset = p.get_int(opos) as usize;
        let vpos = opos + 4;
        (txnum, BlockId::new(filename, blknum), offset, vpos)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRecord::Checkpoint => write!(f, "<CHECKPOINT>"),
            LogRecord::Start { txnum } => write!(f, "<START {}>", txnum),
            LogRecord::Commit { txnum } => write!(f, "<COMMIT {}>", txnum),
            LogRecord::Rollback { txnum } => write!(f, "<ROLLBACK {}>", txnum),
            LogRecord::SetInt {
                txnum,
                blk,
                offset,
                old_val,
            } => write!(f, "<SETINT {} {} {} {}>", txnum, blk, offset, old_val),
            LogRecord::SetString {
                txnum,
                blk,
                offset,
                old_val,
            } => write!(f, "<SETSTRING {} {} {} {}>", txnum, blk, offset, old_val),
        }
    }
}
