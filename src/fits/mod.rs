//! Minimal FITS binary-table codec: header cards, HDU layout, and
//! memory-mapped table access. Covers exactly what column extraction
//! needs; it is not a general FITS library.

pub mod card;
pub mod header;
pub mod reader;
pub mod table;
pub mod tform;
pub mod writer;

pub use card::{Card, CardError, Value};
pub use header::{Header, BLOCK_LEN};
pub use reader::{FitsReader, Hdu};
pub use table::{ColumnDesc, TableSchema};
pub use tform::ColumnFormat;
pub use writer::TableWriter;
