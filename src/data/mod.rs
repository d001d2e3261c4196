/// Data layer: table types, loading and collaborator operations.
///
/// Architecture:
/// ```text
///  .parquet events      .json orders
///        │                   │
///        ▼                   ▼
///   ┌──────────────────────────┐
///   │  loader                   │  parse files → EventTable / OrderTable
///   └──────────────────────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ consistency   │  same exposure?
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  table    │  append annotated columns → new EventTable
///   └──────────┘
/// ```

pub mod consistency;
pub mod loader;
pub mod model;
pub mod table;
