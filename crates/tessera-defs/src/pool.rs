//! The def pool: resolving schema descriptions into linked defs.
//!
//! [`DefPool::add_file`] runs in three passes over one file:
//!
//! 1. **Names.** Every message, enum, and extension gets a fully qualified
//!    name and an id. Collisions with anything already defined fail.
//! 2. **Messages.** Field types are resolved (this file first, then its
//!    dependencies), oneofs and map entries validated, defaults parsed,
//!    and each message's mini-table built (or taken from a supplied
//!    layout and checked). Every field def is linked to its table field.
//! 3. **Links and extensions.** Message and map fields are linked to their
//!    value tables, and extensions are registered against their extendees.
//!
//! The pool records the length of every internal registry before starting;
//! on any error it truncates back, so a failed add leaves no trace.

use indexmap::IndexMap;
use tessera_core::{FieldMode, FieldType};
use tessera_layout::{
    decode_file, ExtensionRegistry, FieldSpec, MiniDescriptorEncoder, MiniTable,
    MiniTableBuilder, MiniTableExtension, Presence, TableId, TableSet,
};
use tessera_message::Value;

use crate::def::{EnumDef, FieldDef, FileDef, MessageDef, OneofDef};
use crate::default::parse_default;
use crate::descriptor::{EnumDescriptor, FieldDescriptor, FileDescriptor, Label, MessageDescriptor, Syntax};
use crate::error::BuildError;
use crate::id::{EnumId, ExtensionId, FileId, MessageId};
use crate::init::FileInit;

#[derive(Clone, Copy, Debug)]
enum SymbolKind {
    Message(MessageId),
    Enum(EnumId),
    Extension(ExtensionId),
}

#[derive(Clone, Copy, Debug)]
struct Symbol {
    file: FileId,
    kind: SymbolKind,
}

/// Registry lengths at the start of an add.
struct Checkpoint {
    tables: usize,
    registry: usize,
    files: usize,
    messages: usize,
    enums: usize,
    extensions: usize,
    file_names: usize,
    symbols: usize,
    by_table: usize,
    ext_by_number: usize,
}

struct PendingMessage<'d> {
    desc: &'d MessageDescriptor,
    full_name: String,
    parent: Option<usize>,
    nested: Vec<usize>,
    enums: Vec<usize>,
}

struct PendingEnum<'d> {
    desc: &'d EnumDescriptor,
    full_name: String,
}

struct PendingExtension<'d> {
    desc: &'d FieldDescriptor,
    full_name: String,
    scope: Option<usize>,
}

/// What a field's type name resolved to.
enum Resolved {
    Scalar,
    Message { id: MessageId, map_entry: bool },
    Enum(EnumId),
}

/// Everything about one file while it is being added.
struct FileScope<'d> {
    file: &'d FileDescriptor,
    id: FileId,
    visible: Vec<FileId>,
    messages: Vec<PendingMessage<'d>>,
    enums: Vec<PendingEnum<'d>>,
    extensions: Vec<PendingExtension<'d>>,
    first_message: u32,
    first_table: u32,
}

impl FileScope<'_> {
    fn local(&self, id: MessageId) -> Option<&PendingMessage<'_>> {
        id.0
            .checked_sub(self.first_message)
            .and_then(|i| self.messages.get(i as usize))
    }
}

fn join(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{scope}.{name}")
    }
}

/// A registry of resolved schema files.
///
/// Adding a file needs `&mut self`; every lookup takes `&self` and touches
/// only immutable data, so a built pool can be shared across threads
/// without locking.
///
/// ```
/// use tessera_core::FieldType;
/// use tessera_defs::{DefPool, FieldDescriptor, FileDescriptor, MessageDescriptor};
///
/// let file = FileDescriptor::new("point.proto").package("geo").message(
///     MessageDescriptor::new("Point")
///         .field(FieldDescriptor::new("x", 1, FieldType::Int32))
///         .field(FieldDescriptor::new("y", 2, FieldType::Int32)),
/// );
/// let mut pool = DefPool::new();
/// pool.add_file(&file).unwrap();
/// let point = pool.find_message("geo.Point").unwrap();
/// assert_eq!(point.field_by_name("y").unwrap().number(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DefPool {
    tables: TableSet,
    registry: ExtensionRegistry,
    files: Vec<FileDef>,
    messages: Vec<MessageDef>,
    enums: Vec<EnumDef>,
    extensions: Vec<FieldDef>,
    file_names: IndexMap<String, FileId>,
    symbols: IndexMap<String, Symbol>,
    by_table: IndexMap<TableId, MessageId>,
    ext_by_number: IndexMap<(MessageId, u32), ExtensionId>,
}

impl DefPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Building ──────────────────────────────────────────────────────

    /// Resolve `file` and build a mini-table for each of its messages.
    ///
    /// Every dependency must already be in the pool. All-or-nothing: on
    /// error the pool is exactly as it was.
    pub fn add_file(&mut self, file: &FileDescriptor) -> Result<FileId, BuildError> {
        self.add(file, None)
    }

    /// Resolve `file`, laying out its messages with pre-built tables.
    ///
    /// `layout` is a file-form mini-descriptor with one table per message,
    /// in declaration pre-order with nesting brackets, as produced by
    /// [`file_layout`](Self::file_layout). Each table must agree with the
    /// schema on field numbers, types, modes, packing, presence classes,
    /// and oneof membership; offsets are taken as given.
    pub fn add_file_with_layout(&mut self, file: &FileDescriptor, layout: &[u8]) -> Result<FileId, BuildError> {
        self.add(file, Some(layout))
    }

    /// Load an ahead-of-time initializer and, first, its dependencies.
    ///
    /// Files already in the pool (by name) are not loaded again. A
    /// dependency that was loaded before a later failure stays loaded.
    pub fn load_init(&mut self, init: &FileInit<'_>) -> Result<FileId, BuildError> {
        let mut loading = Vec::new();
        self.load_init_inner(init, &mut loading)
    }

    fn load_init_inner<'i>(&mut self, init: &FileInit<'i>, loading: &mut Vec<&'i str>) -> Result<FileId, BuildError> {
        if let Some(&id) = self.file_names.get(init.name) {
            return Ok(id);
        }
        if loading.contains(&init.name) {
            return Err(BuildError::CyclicDependency {
                file: init.name.to_owned(),
            });
        }
        loading.push(init.name);
        for dep in init.deps {
            self.load_init_inner(dep, loading)?;
        }
        loading.pop();

        let descriptor = (init.descriptor)();
        if descriptor.name != init.name {
            return Err(BuildError::InitNameMismatch {
                expected: init.name.to_owned(),
                actual: descriptor.name,
            });
        }
        let id = self.add(&descriptor, init.layout)?;
        tracing::debug!(file = init.name, deps = init.deps.len(), "file loaded from initializer");
        Ok(id)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tables: self.tables.len(),
            registry: self.registry.len(),
            files: self.files.len(),
            messages: self.messages.len(),
            enums: self.enums.len(),
            extensions: self.extensions.len(),
            file_names: self.file_names.len(),
            symbols: self.symbols.len(),
            by_table: self.by_table.len(),
            ext_by_number: self.ext_by_number.len(),
        }
    }

    fn rollback(&mut self, cp: Checkpoint) {
        self.tables.truncate(cp.tables);
        self.registry.truncate(cp.registry);
        self.files.truncate(cp.files);
        self.messages.truncate(cp.messages);
        self.enums.truncate(cp.enums);
        self.extensions.truncate(cp.extensions);
        self.file_names.truncate(cp.file_names);
        self.symbols.truncate(cp.symbols);
        self.by_table.truncate(cp.by_table);
        self.ext_by_number.truncate(cp.ext_by_number);
    }

    fn add(&mut self, file: &FileDescriptor, layout: Option<&[u8]>) -> Result<FileId, BuildError> {
        let cp = self.checkpoint();
        match self.add_inner(file, layout) {
            Ok(id) => {
                tracing::debug!(
                    file = %file.name,
                    messages = self.messages.len() - cp.messages,
                    enums = self.enums.len() - cp.enums,
                    "file added"
                );
                Ok(id)
            }
            Err(e) => {
                self.rollback(cp);
                tracing::warn!(file = %file.name, error = %e, "add_file rolled back");
                Err(e)
            }
        }
    }

    fn add_inner(&mut self, file: &FileDescriptor, layout: Option<&[u8]>) -> Result<FileId, BuildError> {
        if self.file_names.contains_key(&file.name) {
            return Err(BuildError::DuplicateFile {
                file: file.name.clone(),
            });
        }
        let id = FileId(self.files.len() as u32);
        let mut dependencies = Vec::with_capacity(file.dependencies.len());
        for dep in &file.dependencies {
            let dep_id = self
                .file_names
                .get(dep)
                .copied()
                .ok_or_else(|| BuildError::MissingDependency {
                    file: file.name.clone(),
                    dependency: dep.clone(),
                })?;
            dependencies.push(dep_id);
        }
        let mut visible = dependencies.clone();
        visible.push(id);

        let scope = self.collect(file, id, visible);
        self.define_names(&scope)?;
        self.add_enums(&scope)?;

        let supplied = match layout {
            Some(bytes) => Some(self.check_file_layout(&scope, bytes)?),
            None => None,
        };
        for i in 0..scope.messages.len() {
            let table = supplied.as_ref().map(|t| &t[i]);
            self.add_message(&scope, i, table)?;
        }
        self.link_messages(&scope)?;
        self.add_extensions(&scope)?;

        let first_message = scope.first_message as usize;
        let first_enum = self.enums.len() - scope.enums.len();
        let first_ext = self.extensions.len() - scope.extensions.len();
        self.files.push(FileDef {
            id,
            name: file.name.clone(),
            package: file.package.clone(),
            syntax: file.syntax,
            dependencies,
            top_messages: (0..scope.messages.len())
                .filter(|&i| scope.messages[i].parent.is_none())
                .map(|i| MessageId((first_message + i) as u32))
                .collect(),
            messages: (first_message..self.messages.len())
                .map(|i| MessageId(i as u32))
                .collect(),
            enums: (first_enum..self.enums.len()).map(|i| EnumId(i as u32)).collect(),
            extensions: (first_ext..self.extensions.len())
                .map(|i| ExtensionId(i as u32))
                .collect(),
        });
        self.file_names.insert(file.name.clone(), id);
        Ok(id)
    }

    /// Flatten the file's declarations in pre-order.
    fn collect<'d>(&self, file: &'d FileDescriptor, id: FileId, visible: Vec<FileId>) -> FileScope<'d> {
        let mut scope = FileScope {
            file,
            id,
            visible,
            messages: Vec::new(),
            enums: Vec::new(),
            extensions: Vec::new(),
            first_message: self.messages.len() as u32,
            first_table: self.tables.len() as u32,
        };
        let mut stack: Vec<(&MessageDescriptor, Option<usize>)> =
            file.messages.iter().rev().map(|m| (m, None)).collect();
        while let Some((desc, parent)) = stack.pop() {
            let outer = match parent {
                Some(p) => scope.messages[p].full_name.clone(),
                None => file.package.clone(),
            };
            let full_name = join(&outer, &desc.name);
            let index = scope.messages.len();
            if let Some(p) = parent {
                scope.messages[p].nested.push(index);
            }
            let mut enums = Vec::with_capacity(desc.nested_enums.len());
            for e in &desc.nested_enums {
                enums.push(scope.enums.len());
                scope.enums.push(PendingEnum {
                    desc: e,
                    full_name: join(&full_name, &e.name),
                });
            }
            for x in &desc.extensions {
                scope.extensions.push(PendingExtension {
                    desc: x,
                    full_name: join(&full_name, &x.name),
                    scope: Some(index),
                });
            }
            scope.messages.push(PendingMessage {
                desc,
                full_name,
                parent,
                nested: Vec::new(),
                enums,
            });
            stack.extend(desc.nested_messages.iter().rev().map(|m| (m, Some(index))));
        }
        for e in &file.enums {
            scope.enums.push(PendingEnum {
                desc: e,
                full_name: join(&file.package, &e.name),
            });
        }
        for x in &file.extensions {
            scope.extensions.push(PendingExtension {
                desc: x,
                full_name: join(&file.package, &x.name),
                scope: None,
            });
        }
        scope
    }

    fn define(&mut self, name: &str, symbol: Symbol) -> Result<(), BuildError> {
        if self.symbols.contains_key(name) {
            return Err(BuildError::DuplicateName { name: name.to_owned() });
        }
        self.symbols.insert(name.to_owned(), symbol);
        Ok(())
    }

    fn define_names(&mut self, scope: &FileScope<'_>) -> Result<(), BuildError> {
        let file = scope.id;
        for (i, m) in scope.messages.iter().enumerate() {
            let kind = SymbolKind::Message(MessageId(scope.first_message + i as u32));
            self.define(&m.full_name, Symbol { file, kind })?;
        }
        let first_enum = self.enums.len() as u32;
        for (i, e) in scope.enums.iter().enumerate() {
            let kind = SymbolKind::Enum(EnumId(first_enum + i as u32));
            self.define(&e.full_name, Symbol { file, kind })?;
        }
        let first_ext = self.extensions.len() as u32;
        for (i, x) in scope.extensions.iter().enumerate() {
            let kind = SymbolKind::Extension(ExtensionId(first_ext + i as u32));
            self.define(&x.full_name, Symbol { file, kind })?;
        }
        Ok(())
    }

    fn add_enums(&mut self, scope: &FileScope<'_>) -> Result<(), BuildError> {
        for e in &scope.enums {
            let invalid = match e.desc.values.first() {
                None => true,
                Some(first) => scope.file.syntax == Syntax::Proto3 && first.number != 0,
            };
            if invalid {
                return Err(BuildError::InvalidEnum {
                    name: e.full_name.clone(),
                });
            }
            self.enums.push(EnumDef {
                full_name: e.full_name.clone(),
                name: e.desc.name.clone(),
                file: scope.id,
                values: e.desc.values.clone(),
            });
        }
        Ok(())
    }

    // ── Resolution ────────────────────────────────────────────────────

    fn visible_symbol(&self, name: &str, visible: &[FileId]) -> Option<Symbol> {
        let symbol = self.symbols.get(name)?;
        visible.contains(&symbol.file).then_some(*symbol)
    }

    /// Resolve `name` from inside `scope`: innermost enclosing scope first.
    fn lookup(&self, scope: &str, name: &str, visible: &[FileId]) -> Option<Symbol> {
        if let Some(absolute) = name.strip_prefix('.') {
            return self.visible_symbol(absolute, visible);
        }
        let mut scope = scope;
        loop {
            if let Some(symbol) = self.visible_symbol(&join(scope, name), visible) {
                return Some(symbol);
            }
            if scope.is_empty() {
                return None;
            }
            scope = scope.rfind('.').map_or("", |i| &scope[..i]);
        }
    }

    fn resolve_type(
        &self,
        file: &FileScope<'_>,
        scope: &str,
        field_name: &str,
        desc: &FieldDescriptor,
    ) -> Result<Resolved, BuildError> {
        let want_message = match desc.field_type {
            FieldType::Message => true,
            FieldType::Enum => false,
            _ => return Ok(Resolved::Scalar),
        };
        let type_name = desc.type_name.as_deref().unwrap_or_default();
        let symbol = self
            .lookup(scope, type_name, &file.visible)
            .ok_or_else(|| BuildError::UnresolvedType {
                field: field_name.to_owned(),
                type_name: type_name.to_owned(),
            })?;
        match (symbol.kind, want_message) {
            (SymbolKind::Message(id), true) => {
                let map_entry = match file.local(id) {
                    Some(pending) => pending.desc.map_entry,
                    None => self.messages[id.0 as usize].map_entry,
                };
                Ok(Resolved::Message { id, map_entry })
            }
            (SymbolKind::Enum(id), false) => Ok(Resolved::Enum(id)),
            _ => Err(BuildError::WrongTypeKind {
                field: field_name.to_owned(),
                type_name: type_name.to_owned(),
            }),
        }
    }

    /// The declared default of a singular field, or the type's zero value.
    fn field_default(
        &self,
        syntax: Syntax,
        field_name: &str,
        desc: &FieldDescriptor,
        mode: FieldMode,
        enum_type: Option<EnumId>,
    ) -> Result<Value, BuildError> {
        let enum_values = enum_type.map_or(&[][..], |id| &self.enums[id.0 as usize].values[..]);
        match &desc.default_value {
            Some(text) => {
                let invalid = || BuildError::InvalidDefault {
                    field: field_name.to_owned(),
                    value: text.clone(),
                };
                if syntax == Syntax::Proto3 || mode != FieldMode::Scalar {
                    return Err(invalid());
                }
                parse_default(desc.field_type, text, enum_values).ok_or_else(invalid)
            }
            None => Ok(match (mode, enum_type) {
                (FieldMode::Scalar, Some(id)) => Value::Enum(self.enums[id.0 as usize].default_value()),
                _ => Value::default_for_field(desc.field_type, mode),
            }),
        }
    }

    // ── Messages ──────────────────────────────────────────────────────

    fn check_map_entry(full_name: &str, desc: &MessageDescriptor) -> Result<(), BuildError> {
        let key = desc.fields.iter().find(|f| f.number == 1);
        let value = desc.fields.iter().find(|f| f.number == 2);
        let ok = match (key, value) {
            (Some(k), Some(v)) => {
                desc.fields.len() == 2
                    && desc.oneofs.is_empty()
                    && k.label != Label::Repeated
                    && v.label != Label::Repeated
                    && k.field_type.is_valid_map_key()
            }
            _ => false,
        };
        if !ok {
            return Err(BuildError::InvalidMapEntry {
                message: full_name.to_owned(),
            });
        }
        Ok(())
    }

    /// Which oneofs are synthetic, after checking every membership.
    fn check_oneofs(full_name: &str, desc: &MessageDescriptor) -> Result<Vec<bool>, BuildError> {
        let invalid = |reason| BuildError::InvalidOneof {
            message: full_name.to_owned(),
            reason,
        };
        let mut members = vec![0usize; desc.oneofs.len()];
        let mut optional = vec![0usize; desc.oneofs.len()];
        for f in &desc.fields {
            let Some(index) = f.oneof_index else {
                continue;
            };
            let index = index as usize;
            if index >= desc.oneofs.len() {
                return Err(invalid("oneof index out of range"));
            }
            if f.label == Label::Repeated {
                return Err(invalid("repeated field in a oneof"));
            }
            members[index] += 1;
            optional[index] += f.proto3_optional as usize;
        }
        let mut synthetic = Vec::with_capacity(desc.oneofs.len());
        for (&m, &o) in members.iter().zip(&optional) {
            if m == 0 {
                return Err(invalid("oneof has no members"));
            }
            if o > 0 && m != 1 {
                return Err(invalid("proto3 optional field shares its oneof"));
            }
            synthetic.push(o == 1);
        }
        Ok(synthetic)
    }

    fn add_message(&mut self, file: &FileScope<'_>, index: usize, supplied: Option<&MiniTable>) -> Result<(), BuildError> {
        let pending = &file.messages[index];
        let desc = pending.desc;
        let full_name = pending.full_name.as_str();
        let syntax = file.file.syntax;
        let id = MessageId(file.first_message + index as u32);
        let table_id = TableId(file.first_table + index as u32);

        if desc.map_entry {
            Self::check_map_entry(full_name, desc)?;
        }
        let synthetic = Self::check_oneofs(full_name, desc)?;

        let mut by_name = IndexMap::with_capacity(desc.fields.len());
        let mut by_number = Vec::with_capacity(desc.fields.len());
        for (i, f) in desc.fields.iter().enumerate() {
            if by_name.insert(f.name.clone(), i).is_some() {
                return Err(BuildError::DuplicateField {
                    message: full_name.to_owned(),
                    field: f.name.clone(),
                });
            }
            by_number.push((f.number, i));
        }
        let mut oneofs_by_name = IndexMap::with_capacity(desc.oneofs.len());
        for (k, o) in desc.oneofs.iter().enumerate() {
            // fields and oneofs share one scope per message
            if by_name.contains_key(&o.name) || oneofs_by_name.insert(o.name.clone(), k).is_some() {
                return Err(BuildError::DuplicateName {
                    name: join(full_name, &o.name),
                });
            }
        }
        by_number.sort_unstable();
        if let Some(w) = by_number.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(BuildError::DuplicateField {
                message: full_name.to_owned(),
                field: desc.fields[w[1].1].name.clone(),
            });
        }

        struct Partial {
            spec: FieldSpec,
            message_type: Option<MessageId>,
            enum_type: Option<EnumId>,
            default: Value,
        }
        let mut partials = Vec::with_capacity(desc.fields.len());
        for f in &desc.fields {
            let field_name = join(full_name, &f.name);
            let resolved = self.resolve_type(file, full_name, &field_name, f)?;
            let repeated = f.label == Label::Repeated;
            let (mode, message_type, enum_type) = match resolved {
                Resolved::Scalar => (Self::mode_of(repeated, false), None, None),
                Resolved::Message { id, map_entry } => (Self::mode_of(repeated, map_entry), Some(id), None),
                Resolved::Enum(e) => (Self::mode_of(repeated, false), None, Some(e)),
            };
            let in_real_oneof = f.oneof_index.is_some_and(|o| !synthetic[o as usize]);
            let explicit_presence = !repeated
                && !in_real_oneof
                && match syntax {
                    Syntax::Proto2 => true,
                    Syntax::Proto3 => f.proto3_optional || f.field_type == FieldType::Message,
                };
            let spec = FieldSpec {
                number: f.number,
                field_type: f.field_type,
                mode,
                packed: Self::packed(syntax, f, mode),
                explicit_presence,
            };
            let default = self.field_default(syntax, &field_name, f, mode, enum_type)?;
            partials.push(Partial {
                spec,
                message_type,
                enum_type,
                default,
            });
        }

        let layout_err = |error| BuildError::Layout {
            message: full_name.to_owned(),
            error,
        };
        let mut builder = MiniTableBuilder::new(partials.len());
        for p in &partials {
            builder.add_field(p.spec).map_err(layout_err)?;
        }
        for (k, _) in desc.oneofs.iter().enumerate().filter(|(k, _)| !synthetic[*k]) {
            let members: Vec<u32> = desc
                .fields
                .iter()
                .filter(|f| f.oneof_index == Some(k as u32))
                .map(|f| f.number)
                .collect();
            builder.add_oneof(&members).map_err(layout_err)?;
        }
        let built = builder.finish().map_err(layout_err)?;
        let table = match supplied {
            Some(t) => {
                Self::check_table(full_name, &built, t)?;
                t.clone()
            }
            None => built,
        };

        let mut oneofs = Vec::with_capacity(desc.oneofs.len());
        for (k, o) in desc.oneofs.iter().enumerate() {
            let numbers: Vec<u32> = desc
                .fields
                .iter()
                .filter(|f| f.oneof_index == Some(k as u32))
                .map(|f| f.number)
                .collect();
            let layout_index = if synthetic[k] {
                None
            } else {
                Some(Self::oneof_layout_index(full_name, &table, &numbers)?)
            };
            oneofs.push(OneofDef {
                name: o.name.clone(),
                full_name: join(full_name, &o.name),
                fields: numbers,
                layout_index,
            });
        }

        let mut fields = Vec::with_capacity(partials.len());
        for (f, p) in desc.fields.iter().zip(partials) {
            let layout = *table.find_field(f.number).ok_or(BuildError::LayoutMismatch {
                message: full_name.to_owned(),
                reason: "field missing from table",
            })?;
            fields.push(FieldDef {
                name: f.name.clone(),
                full_name: join(full_name, &f.name),
                label: f.label,
                layout,
                containing: id,
                oneof: f.oneof_index.map(|o| o as usize),
                message_type: p.message_type,
                enum_type: p.enum_type,
                default: p.default,
                extension: None,
                scope: None,
            });
        }

        let inserted = self.tables.insert(table);
        debug_assert_eq!(inserted, table_id);
        self.by_table.insert(table_id, id);
        let first_enum = (self.enums.len() - file.enums.len()) as u32;
        self.messages.push(MessageDef {
            id,
            full_name: full_name.to_owned(),
            name: desc.name.clone(),
            file: file.id,
            containing: pending.parent.map(|p| MessageId(file.first_message + p as u32)),
            table: table_id,
            fields,
            by_number,
            by_name,
            oneofs,
            oneofs_by_name,
            nested_messages: pending
                .nested
                .iter()
                .map(|&n| MessageId(file.first_message + n as u32))
                .collect(),
            nested_enums: pending
                .enums
                .iter()
                .map(|&e| EnumId(first_enum + e as u32))
                .collect(),
            extensions: Vec::new(),
            map_entry: desc.map_entry,
        });
        Ok(())
    }

    fn mode_of(repeated: bool, map_entry: bool) -> FieldMode {
        match (repeated, map_entry) {
            (true, true) => FieldMode::Map,
            (true, false) => FieldMode::Array,
            (false, _) => FieldMode::Scalar,
        }
    }

    fn packed(syntax: Syntax, desc: &FieldDescriptor, mode: FieldMode) -> bool {
        if mode != FieldMode::Array || !desc.field_type.is_packable() {
            return false;
        }
        desc.packed.unwrap_or(syntax == Syntax::Proto3)
    }

    /// The table index shared by every member of a oneof.
    fn oneof_layout_index(full_name: &str, table: &MiniTable, numbers: &[u32]) -> Result<u16, BuildError> {
        let mismatch = BuildError::LayoutMismatch {
            message: full_name.to_owned(),
            reason: "oneof membership differs",
        };
        let mut index = None;
        for &n in numbers {
            let Some(Presence::Oneof { index: i }) = table.find_field(n).map(|f| f.presence) else {
                return Err(mismatch);
            };
            if index.is_some_and(|prev| prev != i) {
                return Err(mismatch);
            }
            index = Some(i);
        }
        index.ok_or(mismatch)
    }

    /// Check a supplied table against the one the schema implies.
    fn check_table(full_name: &str, built: &MiniTable, supplied: &MiniTable) -> Result<(), BuildError> {
        let mismatch = |reason| BuildError::LayoutMismatch {
            message: full_name.to_owned(),
            reason,
        };
        if built.field_count() != supplied.field_count() {
            return Err(mismatch("field count differs"));
        }
        if built.oneof_count() != supplied.oneof_count() {
            return Err(mismatch("oneof count differs"));
        }
        for (b, s) in built.fields().iter().zip(supplied.fields()) {
            if b.number != s.number || b.field_type != s.field_type || b.mode != s.mode || b.packed != s.packed {
                return Err(mismatch("field shape differs"));
            }
            let same_class = matches!(
                (b.presence, s.presence),
                (Presence::Implicit, Presence::Implicit)
                    | (Presence::HasBit(_), Presence::HasBit(_))
                    | (Presence::Oneof { .. }, Presence::Oneof { .. })
            );
            if !same_class {
                return Err(mismatch("presence differs"));
            }
        }
        Ok(())
    }

    fn check_file_layout(&self, file: &FileScope<'_>, bytes: &[u8]) -> Result<Vec<MiniTable>, BuildError> {
        let decoded = decode_file(bytes)?;
        let mismatch = |reason| BuildError::LayoutMismatch {
            message: file.file.name.clone(),
            reason,
        };
        if decoded.len() != file.messages.len() {
            return Err(mismatch("table count differs"));
        }
        let mut tables = Vec::with_capacity(decoded.len());
        for (d, m) in decoded.into_iter().zip(&file.messages) {
            if d.parent != m.parent {
                return Err(mismatch("nesting differs"));
            }
            tables.push(d.table);
        }
        Ok(tables)
    }

    fn table_of(&self, id: MessageId) -> TableId {
        self.messages[id.0 as usize].table
    }

    fn link_messages(&mut self, file: &FileScope<'_>) -> Result<(), BuildError> {
        let first = file.first_message as usize;
        for i in first..self.messages.len() {
            let parent = self.messages[i].table;
            let links: Vec<(u32, TableId)> = self.messages[i]
                .fields
                .iter()
                .filter_map(|f| f.message_type.map(|m| (f.number(), self.table_of(m))))
                .collect();
            for (number, child) in links {
                self.tables.link(parent, number, child).map_err(|error| BuildError::Layout {
                    message: self.messages[i].full_name.clone(),
                    error,
                })?;
            }
        }
        Ok(())
    }

    // ── Extensions ────────────────────────────────────────────────────

    fn add_extensions(&mut self, file: &FileScope<'_>) -> Result<(), BuildError> {
        for x in &file.extensions {
            let desc = x.desc;
            let full_name = x.full_name.as_str();
            let scope_name = match x.scope {
                Some(i) => file.messages[i].full_name.clone(),
                None => file.file.package.clone(),
            };
            let invalid = |reason| BuildError::InvalidExtension {
                field: full_name.to_owned(),
                reason,
            };

            let extendee_name = desc.extendee.as_deref().ok_or(invalid("no extendee"))?;
            let symbol = self
                .lookup(&scope_name, extendee_name, &file.visible)
                .ok_or_else(|| BuildError::UnresolvedType {
                    field: full_name.to_owned(),
                    type_name: extendee_name.to_owned(),
                })?;
            let SymbolKind::Message(extendee) = symbol.kind else {
                return Err(invalid("extendee is not a message"));
            };
            let number = desc.number;
            if self.messages[extendee.0 as usize].field_by_number(number).is_some() {
                return Err(invalid("number is a field of the extendee"));
            }
            if self.ext_by_number.contains_key(&(extendee, number)) {
                return Err(invalid("number already extended"));
            }

            let resolved = self.resolve_type(file, &scope_name, full_name, desc)?;
            let repeated = desc.label == Label::Repeated;
            let (message_type, enum_type) = match resolved {
                Resolved::Scalar => (None, None),
                Resolved::Message { map_entry: true, .. } if repeated => {
                    return Err(invalid("map extensions are not allowed"));
                }
                Resolved::Message { id, .. } => (Some(id), None),
                Resolved::Enum(e) => (None, Some(e)),
            };
            let mode = Self::mode_of(repeated, false);
            let syntax = file.file.syntax;
            let default = self.field_default(syntax, full_name, desc, mode, enum_type)?;

            let layout_err = |error| BuildError::Layout {
                message: full_name.to_owned(),
                error,
            };
            let extendee_table = self.table_of(extendee);
            let mut ext = MiniTableExtension::new(
                extendee_table,
                number,
                desc.field_type,
                mode,
                Self::packed(syntax, desc, mode),
            )
            .map_err(layout_err)?;
            if let Some(m) = message_type {
                ext = ext.with_sub(self.table_of(m));
            }
            self.registry.add(ext).map_err(layout_err)?;

            let ext_id = ExtensionId(self.extensions.len() as u32);
            let scope = x.scope.map(|i| MessageId(file.first_message + i as u32));
            if let Some(s) = scope {
                self.messages[s.0 as usize].extensions.push(ext_id);
            }
            self.extensions.push(FieldDef {
                name: desc.name.clone(),
                full_name: full_name.to_owned(),
                label: desc.label,
                layout: ext.field,
                containing: extendee,
                oneof: None,
                message_type,
                enum_type,
                default,
                extension: Some(ext),
                scope,
            });
            self.ext_by_number.insert((extendee, number), ext_id);
        }
        Ok(())
    }

    // ── Export ────────────────────────────────────────────────────────

    /// A file-form mini-descriptor of every message table in `file`.
    ///
    /// The result can be handed to
    /// [`add_file_with_layout`](Self::add_file_with_layout) together with
    /// the same descriptor, in this or another pool.
    pub fn file_layout(&self, file: FileId) -> Result<Vec<u8>, BuildError> {
        enum Step {
            Table(MessageId),
            Leave,
        }
        let def = self.file(file).ok_or(BuildError::UnknownFile { file })?;
        let layout_err = |error| BuildError::Layout {
            message: def.name.clone(),
            error,
        };
        let mut enc = MiniDescriptorEncoder::new();
        let mut stack: Vec<Step> = def.top_messages.iter().rev().map(|&m| Step::Table(m)).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Leave => enc.leave_nested().map_err(layout_err)?,
                Step::Table(id) => {
                    let message = &self.messages[id.0 as usize];
                    let table = self.tables.get(message.table).ok_or(BuildError::UnknownFile { file })?;
                    enc.put_table(table).map_err(layout_err)?;
                    if !message.nested_messages.is_empty() {
                        enc.enter_nested().map_err(layout_err)?;
                        stack.push(Step::Leave);
                        stack.extend(message.nested_messages.iter().rev().map(|&n| Step::Table(n)));
                    }
                }
            }
        }
        enc.finish().map_err(layout_err)
    }

    // ── Lookups ───────────────────────────────────────────────────────

    /// The mini-tables of every message, addressed by [`MessageDef::table`].
    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// Every extension in the pool, for the wire decoder.
    pub fn extension_registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Number of files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// File by id.
    pub fn file(&self, id: FileId) -> Option<&FileDef> {
        self.files.get(id.0 as usize)
    }

    /// File by name.
    pub fn find_file(&self, name: &str) -> Option<&FileDef> {
        self.file_names.get(name).and_then(|&id| self.file(id))
    }

    /// Message by id.
    pub fn message(&self, id: MessageId) -> Option<&MessageDef> {
        self.messages.get(id.0 as usize)
    }

    /// Message by fully qualified name; a leading dot is accepted.
    pub fn find_message(&self, full_name: &str) -> Option<&MessageDef> {
        match self.symbol(full_name)?.kind {
            SymbolKind::Message(id) => self.message(id),
            _ => None,
        }
    }

    /// The message laid out by `table`.
    pub fn message_for_table(&self, table: TableId) -> Option<&MessageDef> {
        self.by_table.get(&table).and_then(|&id| self.message(id))
    }

    /// Enum by id.
    pub fn enum_def(&self, id: EnumId) -> Option<&EnumDef> {
        self.enums.get(id.0 as usize)
    }

    /// Enum by fully qualified name; a leading dot is accepted.
    pub fn find_enum(&self, full_name: &str) -> Option<&EnumDef> {
        match self.symbol(full_name)?.kind {
            SymbolKind::Enum(id) => self.enum_def(id),
            _ => None,
        }
    }

    /// Extension by id.
    pub fn extension(&self, id: ExtensionId) -> Option<&FieldDef> {
        self.extensions.get(id.0 as usize)
    }

    /// Extension by fully qualified name; a leading dot is accepted.
    pub fn find_extension(&self, full_name: &str) -> Option<&FieldDef> {
        match self.symbol(full_name)?.kind {
            SymbolKind::Extension(id) => self.extension(id),
            _ => None,
        }
    }

    /// Extension `number` of `extendee`.
    pub fn find_extension_by_number(&self, extendee: MessageId, number: u32) -> Option<&FieldDef> {
        self.ext_by_number
            .get(&(extendee, number))
            .and_then(|&id| self.extension(id))
    }

    /// Field `name` of `message`.
    pub fn field_by_name(&self, message: MessageId, name: &str) -> Option<&FieldDef> {
        self.message(message)?.field_by_name(name)
    }

    /// Field `number` of `message`.
    pub fn field_by_number(&self, message: MessageId, number: u32) -> Option<&FieldDef> {
        self.message(message)?.field_by_number(number)
    }

    /// Fields of `message` in declaration order; empty for unknown ids.
    pub fn fields(&self, message: MessageId) -> &[FieldDef] {
        self.message(message).map_or(&[], MessageDef::fields)
    }

    fn symbol(&self, full_name: &str) -> Option<&Symbol> {
        self.symbols.get(full_name.strip_prefix('.').unwrap_or(full_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EnumDescriptor, FieldDescriptor, MessageDescriptor};

    fn person_file() -> FileDescriptor {
        FileDescriptor::new("person.proto")
            .package("acme")
            .enumeration(EnumDescriptor::new("Kind").value("HUMAN", 0).value("ROBOT", 1))
            .message(
                MessageDescriptor::new("Person")
                    .field(FieldDescriptor::new("name", 1, FieldType::String))
                    .field(FieldDescriptor::new("id", 2, FieldType::Int32).with_default("42"))
                    .field(FieldDescriptor::message("address", 3, "Address"))
                    .field(FieldDescriptor::enumeration("kind", 4, "Kind").with_default("ROBOT"))
                    .field(FieldDescriptor::new("scores", 5, FieldType::Int32).repeated())
                    .field(FieldDescriptor::message("attrs", 6, "AttrsEntry").repeated())
                    .field(FieldDescriptor::new("email", 7, FieldType::String).in_oneof(0))
                    .field(FieldDescriptor::new("phone", 8, FieldType::Int64).in_oneof(0))
                    .oneof("contact")
                    .nested(MessageDescriptor::new("Address").field(FieldDescriptor::new(
                        "street",
                        1,
                        FieldType::String,
                    )))
                    .nested(MessageDescriptor::map_entry(
                        "AttrsEntry",
                        FieldType::String,
                        FieldType::Int32,
                        None,
                    )),
            )
    }

    #[test]
    fn resolves_names_and_links_tables() {
        let mut pool = DefPool::new();
        let file = pool.add_file(&person_file()).unwrap();
        assert_eq!(pool.file(file).unwrap().messages().len(), 3);

        let person = pool.find_message(".acme.Person").unwrap();
        let address = pool.find_message("acme.Person.Address").unwrap();
        let entry = pool.find_message("acme.Person.AttrsEntry").unwrap();
        assert!(entry.is_map_entry());
        assert_eq!(address.containing_type(), Some(person.id()));

        let addr_field = person.field_by_name("address").unwrap();
        assert_eq!(addr_field.message_type(), Some(address.id()));
        let table = pool.tables().get(person.table()).unwrap();
        assert_eq!(table.sub_table(addr_field.layout()), Some(address.table()));
        assert!(table.is_fully_linked());

        let attrs = person.field_by_number(6).unwrap();
        assert!(attrs.is_map());
        assert_eq!(attrs.mode(), FieldMode::Map);
        assert_eq!(pool.message_for_table(entry.table()).unwrap().id(), entry.id());
    }

    #[test]
    fn proto2_defaults_and_presence() {
        let mut pool = DefPool::new();
        pool.add_file(&person_file()).unwrap();
        let person = pool.find_message("acme.Person").unwrap();
        let id = person.field_by_name("id").unwrap();
        assert_eq!(id.default_value(), &Value::Int32(42));
        assert!(id.has_presence());
        assert_eq!(person.field_by_name("kind").unwrap().default_value(), &Value::Enum(1));
        let scores = person.field_by_name("scores").unwrap();
        assert!(!scores.is_packed());
        assert!(!scores.has_presence());
    }

    #[test]
    fn oneof_members_share_a_case_slot() {
        let mut pool = DefPool::new();
        pool.add_file(&person_file()).unwrap();
        let person = pool.find_message("acme.Person").unwrap();
        let contact = person.oneof_by_name("contact").unwrap();
        assert_eq!(contact.field_numbers(), &[7, 8]);
        assert!(!contact.is_synthetic());
        let index = contact.layout_index().unwrap();
        for n in [7, 8] {
            assert_eq!(
                person.field_by_number(n).unwrap().layout().presence,
                Presence::Oneof { index }
            );
            assert_eq!(person.field_by_number(n).unwrap().containing_oneof(), Some(0));
        }
    }

    #[test]
    fn proto3_presence_and_packing() {
        let file = FileDescriptor::new("p3.proto")
            .syntax(Syntax::Proto3)
            .message(
                MessageDescriptor::new("M")
                    .field(FieldDescriptor::new("plain", 1, FieldType::Int32))
                    .field(FieldDescriptor::new("opt", 2, FieldType::Int32).proto3_optional(0))
                    .field(FieldDescriptor::new("nums", 3, FieldType::Int32).repeated())
                    .field(FieldDescriptor::message("child", 4, "M"))
                    .oneof("_opt"),
            );
        let mut pool = DefPool::new();
        pool.add_file(&file).unwrap();
        let m = pool.find_message("M").unwrap();
        assert_eq!(m.field_by_number(1).unwrap().layout().presence, Presence::Implicit);
        assert!(!m.field_by_number(1).unwrap().has_presence());
        assert!(matches!(m.field_by_number(2).unwrap().layout().presence, Presence::HasBit(_)));
        assert!(m.oneof_by_name("_opt").unwrap().is_synthetic());
        assert!(m.field_by_number(3).unwrap().is_packed());
        assert!(m.field_by_number(4).unwrap().has_presence());
        assert_eq!(pool.tables().get(m.table()).unwrap().oneof_count(), 0);
    }

    #[test]
    fn scoping_prefers_innermost() {
        let file = FileDescriptor::new("s.proto")
            .package("a.b")
            .message(MessageDescriptor::new("Item"))
            .message(
                MessageDescriptor::new("Outer")
                    .field(FieldDescriptor::message("inner", 1, "Item"))
                    .field(FieldDescriptor::message("top", 2, ".a.b.Item"))
                    .nested(MessageDescriptor::new("Item")),
            );
        let mut pool = DefPool::new();
        pool.add_file(&file).unwrap();
        let outer = pool.find_message("a.b.Outer").unwrap();
        let nested = pool.find_message("a.b.Outer.Item").unwrap().id();
        let top = pool.find_message("a.b.Item").unwrap().id();
        assert_eq!(outer.field_by_number(1).unwrap().message_type(), Some(nested));
        assert_eq!(outer.field_by_number(2).unwrap().message_type(), Some(top));
    }

    #[test]
    fn failed_add_leaves_pool_unchanged() {
        let mut pool = DefPool::new();
        pool.add_file(&person_file()).unwrap();
        let before = (pool.tables().len(), pool.file_count());

        let bad = FileDescriptor::new("bad.proto")
            .package("acme")
            .message(MessageDescriptor::new("Fine"))
            .message(MessageDescriptor::new("Broken").field(FieldDescriptor::message("x", 1, "Nope")));
        let err = pool.add_file(&bad).unwrap_err();
        assert!(matches!(err, BuildError::UnresolvedType { .. }));
        assert_eq!((pool.tables().len(), pool.file_count()), before);
        assert!(pool.find_message("acme.Fine").is_none());
        assert!(pool.find_file("bad.proto").is_none());

        let fixed = FileDescriptor::new("bad.proto")
            .package("acme")
            .message(MessageDescriptor::new("Fine"));
        assert!(pool.add_file(&fixed).is_ok());
    }

    #[test]
    fn build_errors() {
        let mut pool = DefPool::new();
        pool.add_file(&person_file()).unwrap();

        let dup = FileDescriptor::new("dup.proto")
            .package("acme")
            .message(MessageDescriptor::new("Person"));
        assert!(matches!(pool.add_file(&dup), Err(BuildError::DuplicateName { .. })));

        assert!(matches!(pool.add_file(&person_file()), Err(BuildError::DuplicateFile { .. })));

        let missing = FileDescriptor::new("m.proto").dependency("nowhere.proto");
        assert!(matches!(pool.add_file(&missing), Err(BuildError::MissingDependency { .. })));

        let same_number = FileDescriptor::new("n.proto").message(
            MessageDescriptor::new("N")
                .field(FieldDescriptor::new("a", 1, FieldType::Int32))
                .field(FieldDescriptor::new("b", 1, FieldType::Int32)),
        );
        assert!(matches!(pool.add_file(&same_number), Err(BuildError::DuplicateField { .. })));

        let wrong_kind = FileDescriptor::new("w.proto")
            .dependency("person.proto")
            .message(MessageDescriptor::new("W").field(FieldDescriptor::message("k", 1, "acme.Kind")));
        assert!(matches!(pool.add_file(&wrong_kind), Err(BuildError::WrongTypeKind { .. })));

        let bad_default = FileDescriptor::new("d.proto").message(
            MessageDescriptor::new("D").field(FieldDescriptor::new("b", 1, FieldType::Bool).with_default("maybe")),
        );
        assert!(matches!(pool.add_file(&bad_default), Err(BuildError::InvalidDefault { .. })));

        let empty_oneof = FileDescriptor::new("o.proto").message(MessageDescriptor::new("O").oneof("none"));
        assert!(matches!(pool.add_file(&empty_oneof), Err(BuildError::InvalidOneof { .. })));

        let mut bad_entry = MessageDescriptor::map_entry("E", FieldType::Double, FieldType::Int32, None);
        bad_entry.name = "BadEntry".into();
        let bad_map = FileDescriptor::new("e.proto").message(bad_entry);
        assert!(matches!(pool.add_file(&bad_map), Err(BuildError::InvalidMapEntry { .. })));

        let p3_enum = FileDescriptor::new("en.proto")
            .syntax(Syntax::Proto3)
            .enumeration(EnumDescriptor::new("E3").value("ONE", 1));
        assert!(matches!(pool.add_file(&p3_enum), Err(BuildError::InvalidEnum { .. })));
    }

    #[test]
    fn oneof_names_share_the_field_scope() {
        let mut pool = DefPool::new();
        let twice = FileDescriptor::new("twice.proto").message(
            MessageDescriptor::new("M")
                .field(FieldDescriptor::new("a", 1, FieldType::Int32).in_oneof(0))
                .field(FieldDescriptor::new("b", 2, FieldType::Int32).in_oneof(1))
                .oneof("choice")
                .oneof("choice"),
        );
        assert_eq!(
            pool.add_file(&twice),
            Err(BuildError::DuplicateName { name: "M.choice".into() })
        );
        assert!(pool.find_message("M").is_none());
        assert_eq!(pool.file_count(), 0);

        let clash = FileDescriptor::new("clash.proto").message(
            MessageDescriptor::new("M")
                .field(FieldDescriptor::new("a", 1, FieldType::Int32).in_oneof(0))
                .oneof("a"),
        );
        assert_eq!(
            pool.add_file(&clash),
            Err(BuildError::DuplicateName { name: "M.a".into() })
        );
        assert!(pool.find_message("M").is_none());

        let fine = FileDescriptor::new("fine.proto").message(
            MessageDescriptor::new("M")
                .field(FieldDescriptor::new("a", 1, FieldType::Int32).in_oneof(0))
                .field(FieldDescriptor::new("b", 2, FieldType::Int32).in_oneof(1))
                .oneof("first")
                .oneof("second"),
        );
        pool.add_file(&fine).unwrap();
        let m = pool.find_message("M").unwrap();
        assert_eq!(m.oneof_by_name("second").unwrap().field_numbers(), [2]);
        assert_eq!(m.oneof_by_name("first").unwrap().field_numbers(), [1]);
        assert!(m.oneof_by_name("a").is_none());
    }

    #[test]
    fn dependency_visibility() {
        let mut pool = DefPool::new();
        pool.add_file(&person_file()).unwrap();
        let without_dep = FileDescriptor::new("u.proto")
            .message(MessageDescriptor::new("U").field(FieldDescriptor::message("p", 1, "acme.Person")));
        assert!(matches!(pool.add_file(&without_dep), Err(BuildError::UnresolvedType { .. })));

        let with_dep = FileDescriptor::new("u.proto")
            .dependency("person.proto")
            .message(MessageDescriptor::new("U").field(FieldDescriptor::message("p", 1, "acme.Person")));
        pool.add_file(&with_dep).unwrap();
        let u = pool.find_message("U").unwrap();
        let person = pool.find_message("acme.Person").unwrap();
        assert_eq!(u.field_by_number(1).unwrap().message_type(), Some(person.id()));
    }

    #[test]
    fn extensions_register_and_resolve() {
        let mut pool = DefPool::new();
        pool.add_file(&person_file()).unwrap();
        let ext_file = FileDescriptor::new("ext.proto")
            .package("ext")
            .dependency("person.proto")
            .extension(FieldDescriptor::new("nickname", 100, FieldType::String).extending("acme.Person"))
            .message(
                MessageDescriptor::new("Holder").extension(
                    FieldDescriptor::message("home", 101, "acme.Person.Address").extending(".acme.Person"),
                ),
            );
        pool.add_file(&ext_file).unwrap();

        let person = pool.find_message("acme.Person").unwrap();
        let nickname = pool.find_extension("ext.nickname").unwrap();
        assert!(nickname.is_extension());
        assert_eq!(nickname.containing_type(), person.id());
        let home = pool.find_extension_by_number(person.id(), 101).unwrap();
        assert_eq!(home.full_name(), "ext.Holder.home");
        let holder = pool.find_message("ext.Holder").unwrap();
        assert_eq!(home.extension_scope(), Some(holder.id()));
        assert_eq!(holder.extensions().len(), 1);
        assert!(pool.extension_registry().find(person.table(), 100).is_some());

        let clash = FileDescriptor::new("clash.proto")
            .dependency("person.proto")
            .extension(FieldDescriptor::new("again", 2, FieldType::Int32).extending("acme.Person"));
        assert!(matches!(pool.add_file(&clash), Err(BuildError::InvalidExtension { .. })));
    }

    #[test]
    fn layout_round_trips_through_second_pool() {
        let mut first = DefPool::new();
        let file = first.add_file(&person_file()).unwrap();
        let bytes = first.file_layout(file).unwrap();

        let mut second = DefPool::new();
        second.add_file_with_layout(&person_file(), &bytes).unwrap();
        for name in ["acme.Person", "acme.Person.Address", "acme.Person.AttrsEntry"] {
            let a = first.find_message(name).unwrap();
            let b = second.find_message(name).unwrap();
            assert_eq!(first.tables().get(a.table()), second.tables().get(b.table()));
        }
    }

    #[test]
    fn mismatched_layout_is_rejected() {
        let mut first = DefPool::new();
        let other = FileDescriptor::new("other.proto").message(
            MessageDescriptor::new("Point")
                .field(FieldDescriptor::new("x", 1, FieldType::Int32))
                .field(FieldDescriptor::new("y", 2, FieldType::Int32)),
        );
        let id = first.add_file(&other).unwrap();
        let bytes = first.file_layout(id).unwrap();

        let mut second = DefPool::new();
        let err = second.add_file_with_layout(&person_file(), &bytes).unwrap_err();
        assert!(matches!(err, BuildError::LayoutMismatch { .. }));
        assert_eq!(second.file_count(), 0);
        assert!(second.tables().is_empty());

        let err = second.add_file_with_layout(&person_file(), &[0xff]).unwrap_err();
        assert!(matches!(err, BuildError::Malformed(_)));
    }

    #[test]
    fn unknown_ids_are_none() {
        let pool = DefPool::new();
        assert!(pool.message(MessageId(3)).is_none());
        assert!(pool.fields(MessageId(3)).is_empty());
        assert!(matches!(
            pool.file_layout(FileId(0)),
            Err(BuildError::UnknownFile { .. })
        ));
    }
}
