//! Schema description input.
//!
//! These types are the already-parsed form of a schema file: names,
//! numbers, types, and nesting, as a front end would hand them over. They
//! carry no layout information. [`DefPool::add_file`](crate::DefPool::add_file)
//! resolves them into defs.
//!
//! Type names in [`FieldDescriptor::type_name`] and
//! [`FieldDescriptor::extendee`] may be fully qualified with a leading dot
//! (`.pkg.Outer.Inner`) or relative, in which case they are resolved from
//! the innermost enclosing scope outwards.

use tessera_core::FieldType;

/// Schema language edition of a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// Explicit presence for singular fields, custom defaults, unpacked
    /// repeated scalars by default.
    #[default]
    Proto2,
    /// Implicit presence unless `optional`, packed repeated scalars by
    /// default, no custom defaults.
    Proto3,
}

/// Field cardinality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Label {
    /// Zero or one value.
    #[default]
    Optional,
    /// Exactly one value (proto2 only).
    Required,
    /// Any number of values. Maps are repeated fields of a map-entry type.
    Repeated,
}

/// One field of a message, or one extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Short name.
    pub name: String,
    /// Field number.
    pub number: u32,
    /// Cardinality.
    pub label: Label,
    /// Value type.
    pub field_type: FieldType,
    /// Message or enum type name, for message and enum fields.
    pub type_name: Option<String>,
    /// Proto2 default in text form. Bytes defaults use C escapes.
    pub default_value: Option<String>,
    /// Index into the containing message's oneofs.
    pub oneof_index: Option<u32>,
    /// Proto3 `optional`: the field sits alone in a synthetic oneof.
    pub proto3_optional: bool,
    /// Explicit packed option; `None` takes the syntax default: packed in
    /// proto3, unpacked in proto2.
    pub packed: Option<bool>,
    /// Extended message, for extensions only.
    pub extendee: Option<String>,
}

impl FieldDescriptor {
    /// A singular field.
    pub fn new(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            number,
            label: Label::Optional,
            field_type,
            type_name: None,
            default_value: None,
            oneof_index: None,
            proto3_optional: false,
            packed: None,
            extendee: None,
        }
    }

    /// A singular message field of type `type_name`.
    pub fn message(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        Self::new(name, number, FieldType::Message).with_type_name(type_name)
    }

    /// A singular enum field of type `type_name`.
    pub fn enumeration(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        Self::new(name, number, FieldType::Enum).with_type_name(type_name)
    }

    /// Make the field repeated.
    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Make the field required.
    pub fn required(mut self) -> Self {
        self.label = Label::Required;
        self
    }

    /// Set the referenced type name.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set the default value text.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Place the field in oneof `index` of its message.
    pub fn in_oneof(mut self, index: u32) -> Self {
        self.oneof_index = Some(index);
        self
    }

    /// Mark as proto3 `optional`, owning synthetic oneof `index`.
    pub fn proto3_optional(mut self, index: u32) -> Self {
        self.proto3_optional = true;
        self.oneof_index = Some(index);
        self
    }

    /// Set the packed option.
    pub fn with_packed(mut self, packed: bool) -> Self {
        self.packed = Some(packed);
        self
    }

    /// Make this an extension of `extendee`.
    pub fn extending(mut self, extendee: impl Into<String>) -> Self {
        self.extendee = Some(extendee.into());
        self
    }
}

/// A oneof declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneofDescriptor {
    /// Short name.
    pub name: String,
}

impl OneofDescriptor {
    /// A oneof named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One named enum number.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValueDescriptor {
    /// Short name.
    pub name: String,
    /// Value.
    pub number: i32,
}

impl EnumValueDescriptor {
    /// A value `name = number`.
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

/// An enum declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    /// Short name.
    pub name: String,
    /// Values in declaration order. The first is the default.
    pub values: Vec<EnumValueDescriptor>,
}

impl EnumDescriptor {
    /// An enum with no values yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Append a value.
    pub fn value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push(EnumValueDescriptor::new(name, number));
        self
    }
}

/// A message declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// Short name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Oneofs, addressed by [`FieldDescriptor::oneof_index`].
    pub oneofs: Vec<OneofDescriptor>,
    /// Messages declared inside this one.
    pub nested_messages: Vec<MessageDescriptor>,
    /// Enums declared inside this one.
    pub nested_enums: Vec<EnumDescriptor>,
    /// Extensions declared inside this one (they extend other messages).
    pub extensions: Vec<FieldDescriptor>,
    /// This message is the synthesized entry type of a map field.
    pub map_entry: bool,
}

impl MessageDescriptor {
    /// An empty message.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A map entry type with `key` (field 1) and `value` (field 2).
    ///
    /// `value_type_name` names the value's message or enum type.
    pub fn map_entry(
        name: impl Into<String>,
        key: FieldType,
        value: FieldType,
        value_type_name: Option<&str>,
    ) -> Self {
        let mut value_field = FieldDescriptor::new("value", 2, value);
        value_field.type_name = value_type_name.map(str::to_owned);
        Self {
            name: name.into(),
            fields: vec![FieldDescriptor::new("key", 1, key), value_field],
            map_entry: true,
            ..Self::default()
        }
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a oneof.
    pub fn oneof(mut self, name: impl Into<String>) -> Self {
        self.oneofs.push(OneofDescriptor::new(name));
        self
    }

    /// Append a nested message.
    pub fn nested(mut self, message: MessageDescriptor) -> Self {
        self.nested_messages.push(message);
        self
    }

    /// Append a nested enum.
    pub fn nested_enum(mut self, e: EnumDescriptor) -> Self {
        self.nested_enums.push(e);
        self
    }

    /// Append an extension declared in this message's scope.
    pub fn extension(mut self, field: FieldDescriptor) -> Self {
        self.extensions.push(field);
        self
    }
}

/// A schema file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileDescriptor {
    /// File name, unique within a pool.
    pub name: String,
    /// Dot-separated package; empty for none.
    pub package: String,
    /// Names of files whose types this file may reference.
    pub dependencies: Vec<String>,
    /// Schema edition.
    pub syntax: Syntax,
    /// Top-level messages.
    pub messages: Vec<MessageDescriptor>,
    /// Top-level enums.
    pub enums: Vec<EnumDescriptor>,
    /// Top-level extensions.
    pub extensions: Vec<FieldDescriptor>,
}

impl FileDescriptor {
    /// An empty proto2 file.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the package.
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Set the syntax.
    pub fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Add a dependency by file name.
    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Append a top-level message.
    pub fn message(mut self, message: MessageDescriptor) -> Self {
        self.messages.push(message);
        self
    }

    /// Append a top-level enum.
    pub fn enumeration(mut self, e: EnumDescriptor) -> Self {
        self.enums.push(e);
        self
    }

    /// Append a top-level extension.
    pub fn extension(mut self, field: FieldDescriptor) -> Self {
        self.extensions.push(field);
        self
    }
}
