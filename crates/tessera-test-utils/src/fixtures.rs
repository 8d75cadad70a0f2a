//! Reusable mini-table fixtures.
//!
//! - [`point`]: two implicit `int32` fields, the smallest useful message.
//! - [`scalars`]: one optional field of every scalar type.
//! - [`repeated`]: packed and unpacked repeated fields.
//! - [`tree`]: a self-referencing message with a `string -> int32` map.
//! - [`oneof`]: a three-member oneof next to a plain field.

use tessera_core::FieldType;
use tessera_layout::{FieldSpec, MiniTableBuilder, TableId, TableSet};

/// A table set and the table under test.
pub struct TableFixture {
    pub tables: TableSet,
    pub root: TableId,
}

impl TableFixture {
    /// Wrap a single table.
    pub fn single(specs: &[FieldSpec]) -> Self {
        let mut tables = TableSet::new();
        let root = tables.insert(build(specs, &[]));
        Self { tables, root }
    }
}

/// Build a table from field specs and oneof groups. Panics on layout errors.
pub fn build(specs: &[FieldSpec], oneofs: &[&[u32]]) -> tessera_layout::MiniTable {
    let mut b = MiniTableBuilder::new(specs.len());
    for spec in specs {
        b.add_field(*spec).expect("fixture field");
    }
    for members in oneofs {
        b.add_oneof(members).expect("fixture oneof");
    }
    b.finish().expect("fixture table")
}

/// `message Point { int32 x = 1; int32 y = 2; }`
pub fn point() -> TableFixture {
    TableFixture::single(&[
        FieldSpec::scalar(1, FieldType::Int32),
        FieldSpec::scalar(2, FieldType::Int32),
    ])
}

/// Every scalar type, field number = type code, all with presence bits.
pub const SCALAR_TYPES: [FieldType; 15] = [
    FieldType::Double,
    FieldType::Float,
    FieldType::Int64,
    FieldType::UInt64,
    FieldType::Int32,
    FieldType::Fixed64,
    FieldType::Fixed32,
    FieldType::Bool,
    FieldType::String,
    FieldType::Bytes,
    FieldType::UInt32,
    FieldType::Enum,
    FieldType::SFixed32,
    FieldType::SFixed64,
    FieldType::SInt32,
];

/// One optional field per entry of [`SCALAR_TYPES`] (plus `sint64` as 18),
/// numbered by type code.
pub fn scalars() -> TableFixture {
    let mut specs: Vec<FieldSpec> = SCALAR_TYPES
        .iter()
        .map(|&ty| FieldSpec::optional(ty as u32, ty))
        .collect();
    specs.push(FieldSpec::optional(18, FieldType::SInt64));
    TableFixture::single(&specs)
}

/// `repeated int32 packed = 1; repeated int32 unpacked = 2 [packed=false];
/// repeated string names = 3;`
pub fn repeated() -> TableFixture {
    TableFixture::single(&[
        FieldSpec::repeated(1, FieldType::Int32),
        FieldSpec::repeated(2, FieldType::Int32).with_packed(false),
        FieldSpec::repeated(3, FieldType::String),
    ])
}

/// A tree node:
///
/// ```text
/// message Node {
///   int32 value = 1;
///   Node child = 2;
///   repeated Node children = 3;
///   map<string, int32> labels = 4;
/// }
/// ```
///
/// Returns the fixture rooted at `Node`; the map entry is the other table.
pub fn tree() -> TableFixture {
    let mut tables = TableSet::new();
    let node = tables.insert(build(
        &[
            FieldSpec::scalar(1, FieldType::Int32),
            FieldSpec::scalar(2, FieldType::Message),
            FieldSpec::repeated(3, FieldType::Message),
            FieldSpec::map(4),
        ],
        &[],
    ));
    let entry = tables.insert(build(
        &[
            FieldSpec::scalar(1, FieldType::String),
            FieldSpec::scalar(2, FieldType::Int32),
        ],
        &[],
    ));
    tables.link(node, 2, node).expect("link child");
    tables.link(node, 3, node).expect("link children");
    tables.link(node, 4, entry).expect("link labels");
    TableFixture { tables, root: node }
}

/// `oneof choice { int32 a = 1; string b = 2; Point p = 3; } int64 other = 4;`
pub fn oneof() -> TableFixture {
    let mut tables = TableSet::new();
    let root = tables.insert(build(
        &[
            FieldSpec::scalar(1, FieldType::Int32),
            FieldSpec::scalar(2, FieldType::String),
            FieldSpec::scalar(3, FieldType::Message),
            FieldSpec::scalar(4, FieldType::Int64),
        ],
        &[&[1, 2, 3]],
    ));
    let point = tables.insert(build(
        &[
            FieldSpec::scalar(1, FieldType::Int32),
            FieldSpec::scalar(2, FieldType::Int32),
        ],
        &[],
    ));
    tables.link(root, 3, point).expect("link point");
    TableFixture { tables, root }
}
