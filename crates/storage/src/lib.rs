#![forbid(unsafe_code)]

pub mod builtin;
pub mod catalogue_file;
pub mod generator;
pub mod http;
pub mod repository;
pub mod sqlite;

pub use catalogue_file::JsonCatalogueFile;
pub use generator::{
    HttpGeneratorConfig, HttpQuestionGenerator, QuestionGenerator, RotatingGenerator,
};
pub use http::{HttpResultSink, HttpSinkConfig};
pub use repository::{
    InMemoryRepository, LogSink, QuestionSource, ResultLogRepository, ResultSink,
    StaticCatalogue, Storage, StorageError, StoredResult,
};
