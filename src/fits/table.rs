use super::header::Header;
use super::tform::ColumnFormat;
use crate::error::{FitsColsError, Result};

/// One column of a binary table: name, format, and its byte placement
/// within a row.
#[derive(Debug, Clone)]
pub struct ColumnDesc {
    pub name: String,
    pub format: ColumnFormat,
    /// Byte offset of the field within a row.
    pub offset: usize,
    /// Field width in bytes.
    pub width: usize,
    /// 1-based field index in the source table.
    pub index: usize,
}

/// Row layout of a BINTABLE extension, derived from its header.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub nrows: u64,
    /// Bytes per row (NAXIS1).
    pub row_stride: usize,
    pub columns: Vec<ColumnDesc>,
}

impl TableSchema {
    pub fn from_header(header: &Header) -> Result<Self> {
        let row_stride = header.require_integer("NAXIS1")? as usize;
        let nrows = header.require_integer("NAXIS2")? as u64;
        let nfields = header.require_integer("TFIELDS")? as usize;

        let mut columns = Vec::with_capacity(nfields);
        let mut offset = 0usize;
        for index in 1..=nfields {
            let tform = header
                .get_string(&format!("TFORM{}", index))
                .ok_or_else(|| FitsColsError::Format {
                    message: format!("missing TFORM{} for declared field", index),
                })?;
            let format = ColumnFormat::parse(&tform)?;
            let width = format.byte_width();

            // Unnamed fields are legal; they just cannot be requested.
            let name = header
                .get_string(&format!("TTYPE{}", index))
                .unwrap_or_default();

            columns.push(ColumnDesc {
                name,
                format,
                offset,
                width,
                index,
            });
            offset += width;
        }

        if offset != row_stride {
            return Err(FitsColsError::Format {
                message: format!(
                    "field widths sum to {} bytes but NAXIS1 is {}",
                    offset, row_stride
                ),
            });
        }

        Ok(Self {
            nrows,
            row_stride,
            columns,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDesc> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Total size of the table's data region in bytes, before padding.
    pub fn data_len(&self) -> usize {
        self.row_stride * self.nrows as usize
    }
}
