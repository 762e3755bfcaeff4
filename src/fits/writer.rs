use super::card::{Card, Value};
use super::header::{Header, BLOCK_LEN};
use super::reader::scan_hdus;
use crate::error::{FitsColsError, Result};
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Minimal primary HDU for a file whose data lives in an extension.
pub fn primary_header() -> Header {
    let mut header = Header::new();
    header.push(Card::new("SIMPLE", Value::Logical(true), Some("conforms to FITS standard")).unwrap());
    header.push(Card::new("BITPIX", Value::Integer(8), Some("array data type")).unwrap());
    header.push(Card::new("NAXIS", Value::Integer(0), Some("number of array dimensions")).unwrap());
    header.push(Card::new("EXTEND", Value::Logical(true), None).unwrap());
    header
}

/// Write the empty destination structure to disk: primary HDU, the
/// table header, and a zero-filled data region of the declared size.
/// An existing file at the path is replaced unconditionally.
pub fn write_empty(path: &Path, table_header: &Header) -> Result<()> {
    let naxis1 = table_header.require_integer("NAXIS1")? as usize;
    let nrows = table_header.require_integer("NAXIS2")? as usize;
    let data_len = naxis1 * nrows;
    let padded = data_len.div_ceil(BLOCK_LEN) * BLOCK_LEN;

    let mut header_bytes = primary_header().to_bytes();
    header_bytes.extend_from_slice(&table_header.to_bytes());

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(&header_bytes)?;
    // Extending the file zero-fills the data region and its padding.
    file.set_len((header_bytes.len() + padded) as u64)?;
    file.sync_all()?;
    Ok(())
}

/// Mutable handle over an on-disk table, memory-mapped so chunked
/// writes land directly in the data region.
pub struct TableWriter {
    file: File,
    mmap: MmapMut,
    data_start: usize,
    data_len: usize,
}

impl TableWriter {
    /// Reopen a previously written table file in update mode.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        // Safety: this process is the sole writer for the operation's
        // duration; no other mapping of the file exists.
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };

        let hdus = scan_hdus(&mmap)?;
        let hdu = hdus
            .iter()
            .find(|h| h.is_bintable())
            .ok_or_else(|| FitsColsError::NoTableExtension {
                path: path.display().to_string(),
            })?;
        let (data_start, data_len) = (hdu.data_start, hdu.data_len);

        Ok(Self {
            file,
            mmap,
            data_start,
            data_len,
        })
    }

    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// The table's data region.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.mmap[self.data_start..self.data_start + self.data_len]
    }

    /// Flush the mapping and sync the file, ensuring buffered writes
    /// reach durable storage.
    pub fn finish(self) -> Result<()> {
        self.mmap.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}
