//! Row sources, object storage and result sinks

pub mod object_store;
pub mod sink;
pub mod source;

pub use object_store::{validate_key, ObjectMeta, ObjectStore, StoreError};
pub use sink::{DirectoryCache, MemoryCache, ObjectStoreSink, ResultSink, SinkError};
pub use source::{read_csv_rows, LocalFileSource, RawRow, RowSource, SourceError};
