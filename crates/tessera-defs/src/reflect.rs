//! Reflective access to messages through their defs.
//!
//! [`DynamicMessage`] pairs a [`Message`] with its [`MessageDef`], so
//! fields are addressed by [`FieldDef`] instead of by raw number, absent
//! proto2 fields read as their declared defaults, and iteration yields
//! defs alongside values.

use std::fmt;
use std::iter::Peekable;
use std::vec;

use tessera_arena::Arena;
use tessera_core::{FieldMode, FieldType};
use tessera_layout::MiniTableField;
use tessera_message::{AccessError, Message, PresentFields, Value};

use crate::def::{FieldDef, MessageDef, OneofDef};
use crate::error::ReflectError;
use crate::id::MessageId;
use crate::pool::DefPool;

/// A message viewed through its def.
#[derive(Clone, Copy)]
pub struct DynamicMessage<'a> {
    pool: &'a DefPool,
    def: &'a MessageDef,
    msg: Message<'a>,
}

impl<'a> DynamicMessage<'a> {
    /// Allocate an empty instance of `message` in `arena`.
    pub fn new(pool: &'a DefPool, arena: &'a Arena, message: MessageId) -> Result<Self, ReflectError> {
        let def = pool
            .message(message)
            .ok_or(ReflectError::UnknownMessage { message })?;
        let msg = Message::new(arena, pool.tables(), def.table())?;
        Ok(Self { pool, def, msg })
    }

    /// View an existing message, which must be laid out by one of `pool`'s
    /// tables.
    pub fn wrap(pool: &'a DefPool, msg: Message<'a>) -> Result<Self, ReflectError> {
        let unknown = ReflectError::UnknownTable {
            table: msg.table_id(),
        };
        if !std::ptr::eq(msg.tables(), pool.tables()) {
            return Err(unknown);
        }
        let def = pool.message_for_table(msg.table_id()).ok_or(unknown)?;
        Ok(Self { pool, def, msg })
    }

    /// The underlying mini-table view.
    pub fn message(&self) -> Message<'a> {
        self.msg
    }

    /// This message's def.
    pub fn def(&self) -> &'a MessageDef {
        self.def
    }

    /// The pool the def came from.
    pub fn pool(&self) -> &'a DefPool {
        self.pool
    }

    /// The table field behind a regular field def of this message.
    fn layout(&self, field: &FieldDef) -> Result<&'a MiniTableField, ReflectError> {
        if field.is_extension() {
            return Err(ReflectError::NotAnExtension {
                field: field.full_name().to_owned(),
            });
        }
        if field.containing_type() != self.def.id() {
            return Err(ReflectError::WrongMessage {
                field: field.full_name().to_owned(),
                message: self.def.full_name().to_owned(),
            });
        }
        Ok(self.msg.field(field.number())?)
    }

    /// Whether `field` is present.
    pub fn has(&self, field: &FieldDef) -> Result<bool, ReflectError> {
        let layout = self.layout(field)?;
        Ok(self.msg.has_field(layout)?)
    }

    /// The value of `field`.
    ///
    /// Unset scalars with presence read as their declared default.
    pub fn get(&self, field: &FieldDef) -> Result<Value, ReflectError> {
        let layout = self.layout(field)?;
        if Self::uses_declared_default(field) && !self.msg.has_field(layout)? {
            return Ok(field.default_value().clone());
        }
        Ok(self.msg.get_field(layout)?)
    }

    fn uses_declared_default(field: &FieldDef) -> bool {
        field.has_presence() && field.mode() == FieldMode::Scalar && field.field_type() != FieldType::Message
    }

    /// Set `field`. Oneof members displace the active alternative.
    pub fn set(&self, field: &FieldDef, value: Value) -> Result<(), ReflectError> {
        let layout = self.layout(field)?;
        Ok(self.msg.set_field(layout, value)?)
    }

    /// The aggregate in `field`, created in `arena` if absent.
    pub fn mutable(&self, field: &FieldDef, arena: Option<&Arena>) -> Result<Value, ReflectError> {
        self.layout(field)?;
        Ok(self.msg.mutable(field.number(), arena)?)
    }

    /// The submessage in `field`, created in `arena` if absent.
    pub fn mutable_message(&self, field: &FieldDef, arena: Option<&Arena>) -> Result<DynamicMessage<'a>, ReflectError> {
        self.layout(field)?;
        let sub = self.msg.mutable_message(field.number(), arena)?;
        Self::wrap(self.pool, sub)
    }

    /// The submessage in `field`, if set.
    pub fn sub_message(&self, field: &FieldDef) -> Result<Option<DynamicMessage<'a>>, ReflectError> {
        self.layout(field)?;
        match self.msg.sub_message(field.number())? {
            Some(sub) => Ok(Some(Self::wrap(self.pool, sub)?)),
            None => Ok(None),
        }
    }

    /// Clear `field`.
    pub fn clear(&self, field: &FieldDef) -> Result<(), ReflectError> {
        let layout = self.layout(field)?;
        Ok(self.msg.clear_field(layout)?)
    }

    /// Clear every field, the unknown data, and every extension.
    pub fn clear_all(&self) -> Result<(), ReflectError> {
        Ok(self.msg.clear_all()?)
    }

    /// The present member of `oneof`, if any.
    pub fn which_oneof(&self, oneof: &OneofDef) -> Result<Option<&'a FieldDef>, ReflectError> {
        if self.def.oneof_by_name(oneof.name()) != Some(oneof) {
            return Err(ReflectError::WrongMessage {
                field: oneof.full_name().to_owned(),
                message: self.def.full_name().to_owned(),
            });
        }
        let number = match oneof.layout_index() {
            Some(index) => self.msg.which_oneof(index)?.map(|f| f.number),
            None => {
                let mut present = None;
                for &n in oneof.field_numbers() {
                    if self.msg.has(n)? {
                        present = Some(n);
                    }
                }
                present
            }
        };
        Ok(number.and_then(|n| self.def.field_by_number(n)))
    }

    /// Drop unknown data here and in every reachable submessage, counting
    /// this message as depth 1.
    pub fn discard_unknown(&self, max_depth: usize) -> Result<(), ReflectError> {
        Ok(self.msg.discard_unknown(max_depth)?)
    }

    /// Present fields with their defs, in ascending number order.
    ///
    /// With `ext_pool`, set extensions that pool knows about are merged in
    /// by number; other extensions are skipped.
    pub fn iter(&self, ext_pool: Option<&'a DefPool>) -> Result<Fields<'a>, ReflectError> {
        let mut extensions = Vec::new();
        if let Some(pool) = ext_pool {
            let extendee = pool.find_message(self.def.full_name());
            for (ext, value) in self.msg.extensions()? {
                let Some(def) = extendee.and_then(|m| pool.find_extension_by_number(m.id(), ext.number())) else {
                    continue;
                };
                if self.msg.has_extension(&ext)? {
                    extensions.push((def, value));
                }
            }
        }
        Ok(Fields {
            def: self.def,
            present: self.msg.present_fields(),
            held: None,
            extensions: extensions.into_iter().peekable(),
        })
    }

    // Extensions.

    fn ext_layout<'f>(&self, ext: &'f FieldDef) -> Result<&'f tessera_layout::MiniTableExtension, ReflectError> {
        let layout = ext.extension_layout().ok_or_else(|| ReflectError::NotAnExtension {
            field: ext.full_name().to_owned(),
        })?;
        if layout.extendee != self.def.table() {
            return Err(ReflectError::WrongMessage {
                field: ext.full_name().to_owned(),
                message: self.def.full_name().to_owned(),
            });
        }
        Ok(layout)
    }

    /// Whether extension `ext` is set.
    pub fn has_extension(&self, ext: &FieldDef) -> Result<bool, ReflectError> {
        Ok(self.msg.has_extension(self.ext_layout(ext)?)?)
    }

    /// The value of extension `ext`, or its declared default.
    pub fn get_extension(&self, ext: &FieldDef) -> Result<Value, ReflectError> {
        let layout = self.ext_layout(ext)?;
        if Self::uses_declared_default(ext) && !self.msg.has_extension(layout)? {
            return Ok(ext.default_value().clone());
        }
        Ok(self.msg.get_extension(layout)?)
    }

    /// Set extension `ext`.
    pub fn set_extension(&self, ext: &FieldDef, value: Value) -> Result<(), ReflectError> {
        Ok(self.msg.set_extension(self.ext_layout(ext)?, value)?)
    }

    /// Remove extension `ext`.
    pub fn clear_extension(&self, ext: &FieldDef) -> Result<(), ReflectError> {
        Ok(self.msg.clear_extension(self.ext_layout(ext)?)?)
    }

    /// The aggregate in extension `ext`, created in `arena` if absent.
    pub fn mutable_extension(&self, ext: &FieldDef, arena: Option<&Arena>) -> Result<Value, ReflectError> {
        Ok(self.msg.mutable_extension(self.ext_layout(ext)?, arena)?)
    }
}

impl fmt::Debug for DynamicMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicMessage")
            .field("type", &self.def.full_name())
            .field("msg", &self.msg)
            .finish()
    }
}

/// Iterator over a message's present fields and extensions.
///
/// Regular fields are read lazily; set extensions are collected when the
/// iterator is created.
pub struct Fields<'a> {
    def: &'a MessageDef,
    present: PresentFields<'a>,
    held: Option<(&'a MiniTableField, Value)>,
    extensions: Peekable<vec::IntoIter<(&'a FieldDef, Value)>>,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<(&'a FieldDef, Value), ReflectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.held.is_none() {
            match self.present.next() {
                Some(Ok(item)) => self.held = Some(item),
                Some(Err(e)) => return Some(Err(e.into())),
                None => {}
            }
        }
        let extension_first = match (&self.held, self.extensions.peek()) {
            (Some((field, _)), Some((ext, _))) => ext.number() < field.number,
            (None, Some(_)) => true,
            (_, None) => false,
        };
        if extension_first {
            return self.extensions.next().map(Ok);
        }
        let (field, value) = self.held.take()?;
        Some(
            self.def
                .field_by_number(field.number)
                .map(|def| (def, value))
                .ok_or(ReflectError::Access(AccessError::NoSuchField {
                    number: field.number,
                })),
        )
    }
}
