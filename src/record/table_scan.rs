use crate::record::{FieldType, Layout, RecordError, RecordPage, Result, Rid, Value};
use crate::storage::file::BlockId;
use crate::transaction::Transaction;

/// Scans through the records of a table file, presenting it as an
/// arbitrarily large array of records.
///
/// The scan keeps exactly one block pinned at a time. Positioning follows
/// the classic cursor protocol: the scan starts before the first record,
/// [`next`] advances to the following used slot (crossing block boundaries
/// as needed), and the getters and setters operate on the current record.
///
/// [`next`]: TableScan::next
pub struct TableScan<'a> {
    tx: &'a Transaction,
    layout: &'a Layout,
    rp: Option<RecordPage<'a>>,
    filename: String,
    current_slot: i32,
}

impl<'a> TableScan<'a> {
    /// Open a scan over the named table, creating the table's first block
    /// if the file is empty.
    pub fn new(tx: &'a Transaction, table_name: &str, layout: &'a Layout) -> Result<Self> {
        let filename = format!("{}.tbl", table_name);
        let mut scan = Self {
            tx,
            layout,
            rp: None,
            filename,
            current_slot: -1,
        };
        if tx.size(&scan.filename)? == 0 {
            scan.move_to_new_block()?;
        } else {
            scan.move_to_block(0)?;
        }
        Ok(scan)
    }

    /// Position the scan before the first record.
    pub fn before_first(&mut self) -> Result<()> {
        self.move_to_block(0)
    }

    /// Advance to the next record. Returns false when the scan is past the
    /// last record of the table.
    pub fn next(&mut self) -> Result<bool> {
        self.current_slot = self.rp().next_after(self.current_slot)?;
        while self.current_slot < 0 {
            if self.at_last_block()? {
                return Ok(false);
            }
            let next_blk = self.rp().block().number() + 1;
            self.move_to_block(next_blk)?;
            self.current_slot = self.rp().next_after(self.current_slot)?;
        }
        Ok(true)
    }

    /// Integer value of the named field in the current record.
    pub fn get_int(&self, field: &str) -> Result<i32> {
        self.rp().get_int(self.current_slot, field)
    }

    /// String value of the named field in the current record.
    pub fn get_string(&self, field: &str) -> Result<String> {
        self.rp().get_string(self.current_slot, field)
    }

    /// Value of the named field in the current record.
    pub fn get_val(&self, field: &str) -> Result<Value> {
        match self.layout.schema().field_type(field)? {
            FieldType::Integer => Ok(Value::Int(self.get_int(field)?)),
            FieldType::Varchar => Ok(Value::Str(self.get_string(field)?)),
        }
    }

    /// True if the table has a field with the given name.
    pub fn has_field(&self, field: &str) -> bool {
        self.layout.schema().has_field(field)
    }

    /// Store an integer into the named field of the current record.
    pub fn set_int(&self, field: &str, val: i32) -> Result<()> {
        self.rp().set_int(self.current_slot, field, val)
    }

    /// Store a string into the named field of the current record.
    pub fn set_string(&self, field: &str, val: &str) -> Result<()> {
        self.rp().set_string(self.current_slot, field, val)
    }

    /// Store a value into the named field of the current record. The value
    /// variant must match the field's declared type.
    pub fn set_val(&self, field: &str, val: &Value) -> Result<()> {
        match (self.layout.schema().field_type(field)?, val) {
            (FieldType::Integer, Value::Int(n)) => self.set_int(field, *n),
            (FieldType::Varchar, Value::Str(s)) => self.set_string(field, s),
            _ => Err(RecordError::TypeMismatch(field.to_string())),
        }
    }

    /// Move to a free slot and claim it, appending and formatting a new
    /// block if the rest of the table is full.
    pub fn insert(&mut self) -> Result<()> {
        self.current_slot = self.rp().insert_after(self.current_slot)?;
        while self.current_slot < 0 {
            if self.at_last_block()? {
                self.move_to_new_block()?;
            } else {
                let next_blk = self.rp().block().number() + 1;
                self.move_to_block(next_blk)?;
            }
            self.current_slot = self.rp().insert_after(self.current_slot)?;
        }
        Ok(())
    }

    /// Delete the current record.
    pub fn delete(&self) -> Result<()> {
        self.rp().delete(self.current_slot)
    }

    /// The RID of the current record.
    pub fn rid(&self) -> Rid {
        Rid::new(self.rp().block().number(), self.current_slot)
    }

    /// Position the scan at the record with the given RID.
    pub fn move_to_rid(&mut self, rid: Rid) -> Result<()> {
        self.close();
        let blk = BlockId::new(self.filename.as_str(), rid.block_number());
        self.rp = Some(RecordPage::new(self.tx, blk, self.layout)?);
        self.current_slot = rid.slot();
        Ok(())
    }

    /// Unpin the current block. The scan is also closed on drop, so an
    /// explicit call is only needed to release the pin early.
    pub fn close(&mut self) {
        if let Some(rp) = self.rp.take() {
            self.tx.unpin(rp.block());
        }
    }

    fn move_to_block(&mut self, blknum: i32) -> Result<()> {
        self.close();
        let blk = BlockId::new(self.filename.as_str(), blknum);
        self.rp = Some(RecordPage::new(self.tx, blk, self.layout)?);
        self.current_slot = -1;
        Ok(())
    }

    fn move_to_new_block(&mut self) -> Result<()> {
        self.close();
        let blk = self.tx.append(&self.filename)?;
        let rp = RecordPage::new(self.tx, blk, self.layout)?;
        rp.format()?;
        self.rp = Some(rp);
        self.current_slot = -1;
        Ok(())
    }

    fn at_last_block(&self) -> Result<bool> {
        let num_blocks = self.tx.size(&self.filename)?;
        Ok(self.rp().block().number() == num_blocks - 1)
    }

    fn rp(&self) -> &RecordPage<'a> {
        // The record page only goes away on close(), after which the scan
        // must not be used.
        self.rp.as_ref().expect("table scan is closed")
    }
}

impl Drop for TableScan<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
