pub mod column_extractor;

pub use column_extractor::{
    ColumnExtractor, ColumnInfo, ConfigSnapshot, ExtractionPlan, ExtractionProgress,
    ExtractionReport, DEFAULT_CHUNK_SIZE,
};
