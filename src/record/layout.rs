use std::collections::HashMap;

use crate::record::{RecordError, Result, Schema};

/// The physical layout of a record: the byte offset of each field within a
/// slot, and the total slot size.
///
/// Slot structure: a 4-byte empty/in-use flag, then the fields in schema
/// order at fixed offsets.
#[derive(Debug, Clone)]
pub struct Layout {
    schema: Schema,
    offsets: HashMap<String, usize>,
    slot_size: usize,
}

impl Layout {
    /// Compute the layout for a schema. Used when a table is created.
    pub fn new(schema: Schema) -> Result<Self> {
        let mut offsets = HashMap::new();
        let mut pos = 4; // leave space for the empty/in-use flag
        for name in schema.fields() {
            offsets.insert(name.clone(), pos);
            pos += schema.length_in_bytes(name)?;
        }
        Ok(Self {
            schema,
            offsets,
            slot_size: pos,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Byte offset of the named field within a slot.
    pub fn offset(&self, name: &str) -> Result<usize> {
        self.offsets
            .get(name)
            .copied()
            .ok_or_else(|| RecordError::FieldNotFound(name.to_string()))
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_follow_schema_order() {
        let mut schema = Schema::new();
        schema.add_int_field("id");
        schema.add_string_field("name", 9);
        schema.add_int_field("age");
        let layout = Layout::new(schema).unwrap();

        assert_eq!(layout.offset("id").unwrap(), 4);
        assert_eq!(layout.offset("name").unwrap(), 8);
        assert_eq!(layout.offset("age").unwrap(), 21);
        assert_eq!(layout.slot_size(), 25);
    }

    #[test]
    fn test_unknown_field_offset_is_an_error() {
        let layout = Layout::new(Schema::new()).unwrap();
        assert!(matches!(
            layout.offset("ghost"),
            Err(RecordError::FieldNotFound(_))
        ));
    }
}
