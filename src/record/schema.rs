use std::collections::HashMap;

use crate::record::{RecordError, Result};
use crate::storage::file::Page;

/// The type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Varchar,
}

#[derive(Debug, Clone, Copy)]
struct FieldInfo {
    field_type: FieldType,
    length: usize,
}

/// The record schema of a table: the name and type of each field, and the
/// declared length of each varchar field.
///
/// Field order matters; it is the order fields are laid out in a slot.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<String>,
    info: HashMap<String, FieldInfo>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field with the given name, type and length. The length is
    /// ignored for integer fields.
    pub fn add_field(&mut self, name: &str, field_type: FieldType, length: usize) {
        self.fields.push(name.to_string());
        self.info
            .insert(name.to_string(), FieldInfo { field_type, length });
    }

    /// Add an integer field.
    pub fn add_int_field(&mut self, name: &str) {
        self.add_field(name, FieldType::Integer, 0);
    }

    /// Add a string field. `length` is the declared length: a `varchar(8)`
    /// field has length 8.
    pub fn add_string_field(&mut self, name: &str, length: usize) {
        self.add_field(name, FieldType::Varchar, length);
    }

    /// Add a field with the same type and length as the corresponding field
    /// of another schema.
    pub fn add_from(&mut self, name: &str, other: &Schema) -> Result<()> {
        let info = other.field_info(name)?;
        self.add_field(name, info.field_type, info.length);
        Ok(())
    }

    /// Add every field of the other schema to this one.
    pub fn add_all(&mut self, other: &Schema) {
        for name in &other.fields {
            let info = other.info[name];
            self.fields.push(name.clone());
            self.info.insert(name.clone(), info);
        }
    }

    /// Field names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.info.contains_key(name)
    }

    /// The type of the named field.
    pub fn field_type(&self, name: &str) -> Result<FieldType> {
        Ok(self.field_info(name)?.field_type)
    }

    /// The declared length of the named field. Undefined (zero) for
    /// integer fields.
    pub fn length(&self, name: &str) -> Result<usize> {
        Ok(self.field_info(name)?.length)
    }

    /// Number of bytes the named field occupies in a slot.
    pub fn length_in_bytes(&self, name: &str) -> Result<usize> {
        let info = self.field_info(name)?;
        Ok(match info.field_type {
            FieldType::Integer => 4,
            FieldType::Varchar => Page::max_length(info.length),
        })
    }

    fn field_info(&self, name: &str) -> Result<FieldInfo> {
        self.info
            .get(name)
            .copied()
            .ok_or_else(|| RecordError::FieldNotFound(name.to_string()))
    }
}
