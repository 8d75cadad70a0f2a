//! The resolved def graph: files, messages, fields, oneofs, enums.
//!
//! Defs are immutable once their file is added. Cross references are ids
//! into the owning [`DefPool`](crate::DefPool).

use indexmap::IndexMap;
use tessera_core::{FieldMode, FieldType};
use tessera_layout::{MiniTableExtension, MiniTableField, Presence, TableId};
use tessera_message::Value;

use crate::descriptor::{EnumValueDescriptor, Label, Syntax};
use crate::id::{EnumId, ExtensionId, FileId, MessageId};

/// A file in the pool.
#[derive(Clone, Debug)]
pub struct FileDef {
    pub(crate) id: FileId,
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) syntax: Syntax,
    pub(crate) dependencies: Vec<FileId>,
    pub(crate) top_messages: Vec<MessageId>,
    pub(crate) messages: Vec<MessageId>,
    pub(crate) enums: Vec<EnumId>,
    pub(crate) extensions: Vec<ExtensionId>,
}

impl FileDef {
    /// This file's id.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// File name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package, empty for none.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Schema edition.
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Direct dependencies.
    pub fn dependencies(&self) -> &[FileId] {
        &self.dependencies
    }

    /// Top-level messages in declaration order.
    pub fn top_level_messages(&self) -> &[MessageId] {
        &self.top_messages
    }

    /// Every message of the file, nested ones included, in pre-order.
    pub fn messages(&self) -> &[MessageId] {
        &self.messages
    }

    /// Every enum of the file, nested ones included.
    pub fn enums(&self) -> &[EnumId] {
        &self.enums
    }

    /// Every extension declared in the file, at any scope.
    pub fn extensions(&self) -> &[ExtensionId] {
        &self.extensions
    }
}

/// A message type, linked to exactly one mini-table.
#[derive(Clone, Debug)]
pub struct MessageDef {
    pub(crate) id: MessageId,
    pub(crate) full_name: String,
    pub(crate) name: String,
    pub(crate) file: FileId,
    pub(crate) containing: Option<MessageId>,
    pub(crate) table: TableId,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) by_number: Vec<(u32, usize)>,
    pub(crate) by_name: IndexMap<String, usize>,
    pub(crate) oneofs: Vec<OneofDef>,
    pub(crate) oneofs_by_name: IndexMap<String, usize>,
    pub(crate) nested_messages: Vec<MessageId>,
    pub(crate) nested_enums: Vec<EnumId>,
    pub(crate) extensions: Vec<ExtensionId>,
    pub(crate) map_entry: bool,
}

impl MessageDef {
    /// This message's id.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Fully qualified name, without a leading dot.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defining file.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Enclosing message, for nested types.
    pub fn containing_type(&self) -> Option<MessageId> {
        self.containing
    }

    /// The mini-table instances of this type are laid out by.
    pub fn table(&self) -> TableId {
        self.table
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Field by number. Binary search.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDef> {
        let i = self
            .by_number
            .binary_search_by_key(&number, |&(n, _)| n)
            .ok()?;
        Some(&self.fields[self.by_number[i].1])
    }

    /// Field by short name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Oneofs in declaration order, synthetic ones included.
    pub fn oneofs(&self) -> &[OneofDef] {
        &self.oneofs
    }

    /// Oneof by short name.
    pub fn oneof_by_name(&self, name: &str) -> Option<&OneofDef> {
        self.oneofs_by_name.get(name).map(|&i| &self.oneofs[i])
    }

    /// Messages declared directly inside this one.
    pub fn nested_messages(&self) -> &[MessageId] {
        &self.nested_messages
    }

    /// Enums declared directly inside this one.
    pub fn nested_enums(&self) -> &[EnumId] {
        &self.nested_enums
    }

    /// Extensions declared in this message's scope.
    pub fn extensions(&self) -> &[ExtensionId] {
        &self.extensions
    }

    /// Whether this is a map field's entry type.
    pub fn is_map_entry(&self) -> bool {
        self.map_entry
    }
}

/// A field of a message, or an extension.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) label: Label,
    pub(crate) layout: MiniTableField,
    pub(crate) containing: MessageId,
    pub(crate) oneof: Option<usize>,
    pub(crate) message_type: Option<MessageId>,
    pub(crate) enum_type: Option<EnumId>,
    pub(crate) default: Value,
    pub(crate) extension: Option<MiniTableExtension>,
    pub(crate) scope: Option<MessageId>,
}

impl FieldDef {
    /// Short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Field number.
    pub fn number(&self) -> u32 {
        self.layout.number
    }

    /// Cardinality as declared.
    pub fn label(&self) -> Label {
        self.label
    }

    /// Value type.
    pub fn field_type(&self) -> FieldType {
        self.layout.field_type
    }

    /// Storage mode.
    pub fn mode(&self) -> FieldMode {
        self.layout.mode
    }

    /// Repeated, including maps.
    pub fn is_repeated(&self) -> bool {
        self.layout.mode.is_repeated()
    }

    /// A map field.
    pub fn is_map(&self) -> bool {
        self.layout.mode == FieldMode::Map
    }

    /// Packed wire encoding.
    pub fn is_packed(&self) -> bool {
        self.layout.packed
    }

    /// The mini-table field this def is linked to.
    pub fn layout(&self) -> &MiniTableField {
        &self.layout
    }

    /// Whether the field distinguishes "unset" from "set to the default".
    pub fn has_presence(&self) -> bool {
        if self.extension.is_some() {
            return !self.is_repeated();
        }
        !matches!(self.layout.presence, Presence::Implicit)
            || (self.layout.field_type == FieldType::Message && !self.is_repeated())
    }

    /// The message this field belongs to; for extensions, the extendee.
    pub fn containing_type(&self) -> MessageId {
        self.containing
    }

    /// Index into the containing message's [`oneofs`](MessageDef::oneofs).
    pub fn containing_oneof(&self) -> Option<usize> {
        self.oneof
    }

    /// Value type of message fields; entry type of map fields.
    pub fn message_type(&self) -> Option<MessageId> {
        self.message_type
    }

    /// Value type of enum fields.
    pub fn enum_type(&self) -> Option<EnumId> {
        self.enum_type
    }

    /// The value read when the field is unset.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Whether this is an extension.
    pub fn is_extension(&self) -> bool {
        self.extension.is_some()
    }

    /// Extension layout, for extensions.
    pub fn extension_layout(&self) -> Option<&MiniTableExtension> {
        self.extension.as_ref()
    }

    /// Message an extension was declared in, if not at file scope.
    pub fn extension_scope(&self) -> Option<MessageId> {
        self.scope
    }
}

/// A oneof of a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneofDef {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) fields: Vec<u32>,
    pub(crate) layout_index: Option<u16>,
}

impl OneofDef {
    /// Short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Member field numbers in declaration order.
    pub fn field_numbers(&self) -> &[u32] {
        &self.fields
    }

    /// A proto3 `optional` wrapper. Its single member is tracked with a
    /// presence bit rather than a case slot.
    pub fn is_synthetic(&self) -> bool {
        self.layout_index.is_none()
    }

    /// Index of the oneof in the mini-table; `None` when synthetic.
    pub fn layout_index(&self) -> Option<u16> {
        self.layout_index
    }
}

/// An enum type.
#[derive(Clone, Debug)]
pub struct EnumDef {
    pub(crate) full_name: String,
    pub(crate) name: String,
    pub(crate) file: FileId,
    pub(crate) values: Vec<EnumValueDescriptor>,
}

impl EnumDef {
    /// Fully qualified name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Short name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defining file.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[EnumValueDescriptor] {
        &self.values
    }

    /// The default: the first declared value.
    pub fn default_value(&self) -> i32 {
        self.values.first().map_or(0, |v| v.number)
    }

    /// Value by name.
    pub fn value_by_name(&self, name: &str) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.name == name)
    }

    /// First value with this number (aliases share numbers).
    pub fn value_by_number(&self, number: i32) -> Option<&EnumValueDescriptor> {
        self.values.iter().find(|v| v.number == number)
    }
}
