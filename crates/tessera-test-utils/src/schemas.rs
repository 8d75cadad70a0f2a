//! Schema files for def pool tests.

use tessera_core::FieldType;
use tessera_defs::{EnumDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor, Syntax};

/// `geo.proto`, proto3:
///
/// ```text
/// package geo;
/// message Point { int32 x = 1; int32 y = 2; }
/// message Path { repeated Point points = 1; string label = 2; optional int32 hops = 3; }
/// ```
pub fn geo() -> FileDescriptor {
    FileDescriptor::new("geo.proto")
        .package("geo")
        .syntax(Syntax::Proto3)
        .message(
            MessageDescriptor::new("Point")
                .field(FieldDescriptor::new("x", 1, FieldType::Int32))
                .field(FieldDescriptor::new("y", 2, FieldType::Int32)),
        )
        .message(
            MessageDescriptor::new("Path")
                .field(FieldDescriptor::message("points", 1, "Point").repeated())
                .field(FieldDescriptor::new("label", 2, FieldType::String))
                .field(FieldDescriptor::new("hops", 3, FieldType::Int32).proto3_optional(0))
                .oneof("_hops"),
        )
}

/// `catalog.proto`, proto2, importing `geo.proto`:
///
/// ```text
/// package shop;
/// enum Color { RED = 0; GREEN = 1; BLUE = 2; }
/// message Product {
///   optional string name = 1;
///   optional Color color = 2 [default = GREEN];
///   optional int32 stock = 3 [default = 10];
///   map<string, int32> prices = 4;
///   optional geo.Point origin = 5;
///   oneof source { string vendor = 6; int64 batch = 7; }
/// }
/// extend Product { optional bool featured = 100; repeated int32 ratings = 101; }
/// ```
pub fn catalog() -> FileDescriptor {
    FileDescriptor::new("catalog.proto")
        .package("shop")
        .dependency("geo.proto")
        .enumeration(
            EnumDescriptor::new("Color")
                .value("RED", 0)
                .value("GREEN", 1)
                .value("BLUE", 2),
        )
        .message(
            MessageDescriptor::new("Product")
                .field(FieldDescriptor::new("name", 1, FieldType::String))
                .field(FieldDescriptor::enumeration("color", 2, "Color").with_default("GREEN"))
                .field(FieldDescriptor::new("stock", 3, FieldType::Int32).with_default("10"))
                .field(FieldDescriptor::message("prices", 4, "PricesEntry").repeated())
                .field(FieldDescriptor::message("origin", 5, ".geo.Point"))
                .field(FieldDescriptor::new("vendor", 6, FieldType::String).in_oneof(0))
                .field(FieldDescriptor::new("batch", 7, FieldType::Int64).in_oneof(0))
                .oneof("source")
                .nested(MessageDescriptor::map_entry(
                    "PricesEntry",
                    FieldType::String,
                    FieldType::Int32,
                    None,
                )),
        )
        .extension(FieldDescriptor::new("featured", 100, FieldType::Bool).extending("Product"))
        .extension(
            FieldDescriptor::new("ratings", 101, FieldType::Int32)
                .repeated()
                .extending("Product"),
        )
}
