use crate::record::{FieldType, Layout, Result};
use crate::storage::file::BlockId;
use crate::transaction::Transaction;

/// Slot flag values.
const EMPTY: i32 = 0;
const USED: i32 = 1;

/// Stores records within one block as an array of equal-sized slots.
///
/// Slot numbers index the array; a slot whose flag word is [`EMPTY`] is
/// free for reuse. The page keeps its block pinned from construction; the
/// owning scan unpins it when it moves on.
pub struct RecordPage<'a> {
    tx: &'a Transaction,
    blk: BlockId,
    layout: &'a Layout,
}

impl<'a> RecordPage<'a> {
    /// Pin the block and wrap it as a record page.
    pub fn new(tx: &'a Transaction, blk: BlockId, layout: &'a Layout) -> Result<Self> {
        tx.pin(&blk)?;
        Ok(Self { tx, blk, layout })
    }

    /// The block this page wraps.
    pub fn block(&self) -> &BlockId {
        &self.blk
    }

    /// Read the integer stored for the given field of the given slot.
    pub fn get_int(&self, slot: i32, field: &str) -> Result<i32> {
        let pos = self.field_pos(slot, field)?;
        Ok(self.tx.get_int(&self.blk, pos)?)
    }

    /// Read the string stored for the given field of the given slot.
    pub fn get_string(&self, slot: i32, field: &str) -> Result<String> {
        let pos = self.field_pos(slot, field)?;
        Ok(self.tx.get_string(&self.blk, pos)?)
    }

    /// Store an integer for the given field of the given slot.
    pub fn set_int(&self, slot: i32, field: &str, val: i32) -> Result<()> {
        let pos = self.field_pos(slot, field)?;
        Ok(self.tx.set_int(&self.blk, pos, val, true)?)
    }

    /// Store a string for the given field of the given slot.
    pub fn set_string(&self, slot: i32, field: &str, val: &str) -> Result<()> {
        let pos = self.field_pos(slot, field)?;
        Ok(self.tx.set_string(&self.blk, pos, val, true)?)
    }

    /// Mark the slot as unused.
    pub fn delete(&self, slot: i32) -> Result<()> {
        self.set_flag(slot, EMPTY)
    }

    /// Format the block as an empty array of record slots.
    ///
    /// The writes are not logged: the block's previous contents are
    /// meaningless, so there is nothing worth undoing to.
    pub fn format(&self) -> Result<()> {
        let mut slot = 0;
        while self.is_valid_slot(slot) {
            self.tx
                .set_int(&self.blk, self.slot_offset(slot), EMPTY, false)?;
            let schema = self.layout.schema();
            for field in schema.fields() {
                let pos = self.field_pos(slot, field)?;
                match schema.field_type(field)? {
                    FieldType::Integer => self.tx.set_int(&self.blk, pos, 0, false)?,
                    FieldType::Varchar => self.tx.set_string(&self.blk, pos, "", false)?,
                }
            }
            slot += 1;
        }
        Ok(())
    }

    /// The next used slot after `slot`, or -1 if there is none.
    pub fn next_after(&self, slot: i32) -> Result<i32> {
        self.search_after(slot, USED)
    }

    /// Claim the first unused slot after `slot`, marking it used.
    /// Returns -1 if the block has no free slot.
    pub fn insert_after(&self, slot: i32) -> Result<i32> {
        let slot = self.search_after(slot, EMPTY)?;
        if slot >= 0 {
            self.set_flag(slot, USED)?;
        }
        Ok(slot)
    }

    fn set_flag(&self, slot: i32, flag: i32) -> Result<()> {
        Ok(self
            .tx
            .set_int(&self.blk, self.slot_offset(slot), flag, true)?)
    }

    fn search_after(&self, mut slot: i32, flag: i32) -> Result<i32> {
        slot += 1;
        while self.is_valid_slot(slot) {
            if self.tx.get_int(&self.blk, self.slot_offset(slot))? == flag {
                return Ok(slot);
            }
            slot += 1;
        }
        Ok(-1)
    }

    fn is_valid_slot(&self, slot: i32) -> bool {
        self.slot_offset(slot + 1) <= self.tx.block_size()
    }

    fn slot_offset(&self, slot: i32) -> usize {
        slot as usize * self.layout.slot_size()
    }

    fn field_pos(&self, slot: i32, field: &str) -> Result<usize> {
        Ok(self.slot_offset(slot) + self.layout.offset(field)?)
    }
}
