use super::header::{Header, BLOCK_LEN};
use super::table::TableSchema;
use crate::error::{FitsColsError, Result};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

/// One header-data unit located within a FITS file.
#[derive(Debug)]
pub struct Hdu {
    pub header: Header,
    /// Byte offset of the data region.
    pub data_start: usize,
    /// Unpadded data length in bytes.
    pub data_len: usize,
}

impl Hdu {
    pub fn is_bintable(&self) -> bool {
        self.header.get_string("XTENSION").as_deref() == Some("BINTABLE")
    }
}

/// Read-only, memory-mapped FITS file.
///
/// The whole file is mapped rather than read, so only the row ranges a
/// copy operation touches get paged in; resident memory stays bounded
/// regardless of table size.
pub struct FitsReader {
    mmap: Mmap,
    path: PathBuf,
    hdus: Vec<Hdu>,
}

impl FitsReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 || len % BLOCK_LEN as u64 != 0 {
            return Err(FitsColsError::Format {
                message: format!(
                    "{}: file length {} is not a multiple of {} bytes",
                    path.display(),
                    len,
                    BLOCK_LEN
                ),
            });
        }

        // Safety: the map is read-only and the source is treated as
        // immutable for the duration of the extraction.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let hdus = scan_hdus(&mmap)?;

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
            hdus,
        })
    }

    pub fn hdus(&self) -> &[Hdu] {
        &self.hdus
    }

    /// Locate the data table: the first BINTABLE extension, or the HDU
    /// at an explicit index when one is given.
    pub fn data_table(&self, hdu_index: Option<usize>) -> Result<&Hdu> {
        match hdu_index {
            Some(index) => {
                let hdu = self.hdus.get(index).ok_or_else(|| FitsColsError::Format {
                    message: format!(
                        "{}: HDU index {} out of range (file has {} HDUs)",
                        self.path.display(),
                        index,
                        self.hdus.len()
                    ),
                })?;
                if !hdu.is_bintable() {
                    return Err(FitsColsError::Format {
                        message: format!(
                            "{}: HDU {} is not a BINTABLE extension",
                            self.path.display(),
                            index
                        ),
                    });
                }
                Ok(hdu)
            }
            None => self
                .hdus
                .iter()
                .find(|h| h.is_bintable())
                .ok_or_else(|| FitsColsError::NoTableExtension {
                    path: self.path.display().to_string(),
                }),
        }
    }

    /// Schema of the located data table.
    pub fn table_schema(&self, hdu_index: Option<usize>) -> Result<TableSchema> {
        let hdu = self.data_table(hdu_index)?;
        TableSchema::from_header(&hdu.header)
    }

    /// Raw bytes of an HDU's data region.
    pub fn data(&self, hdu: &Hdu) -> &[u8] {
        &self.mmap[hdu.data_start..hdu.data_start + hdu.data_len]
    }
}

/// Walk the HDU sequence of a complete FITS image in memory.
pub fn scan_hdus(data: &[u8]) -> Result<Vec<Hdu>> {
    let mut hdus = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let (header, consumed) = Header::parse(&data[offset..])?;

        if hdus.is_empty() {
            if header.get_logical("SIMPLE") != Some(true) {
                return Err(FitsColsError::Format {
                    message: "primary header does not begin with SIMPLE = T".to_string(),
                });
            }
        } else if header.get_string("XTENSION").is_none() {
            return Err(FitsColsError::Format {
                message: "extension header does not begin with XTENSION".to_string(),
            });
        }

        let data_start = offset + consumed;
        let data_len = hdu_data_len(&header)?;
        let padded = data_len.div_ceil(BLOCK_LEN) * BLOCK_LEN;

        if data_start + padded > data.len() {
            return Err(FitsColsError::Format {
                message: format!(
                    "data region of HDU {} extends past end of file",
                    hdus.len()
                ),
            });
        }

        hdus.push(Hdu {
            header,
            data_start,
            data_len,
        });
        offset = data_start + padded;
    }

    Ok(hdus)
}

/// Unpadded data size: |BITPIX|/8 * GCOUNT * (PCOUNT + product of NAXISn).
fn hdu_data_len(header: &Header) -> Result<usize> {
    // BITPIX may be negative for float images, so no sign check here.
    let bitpix = header
        .get_integer("BITPIX")
        .ok_or_else(|| FitsColsError::Format {
            message: "missing required keyword BITPIX".to_string(),
        })?;
    let naxis = header.require_integer("NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }

    let mut elements = 1u64;
    for i in 1..=naxis {
        let axis = header.require_integer(&format!("NAXIS{}", i))? as u64;
        elements = elements.saturating_mul(axis);
    }

    let pcount = header.get_integer("PCOUNT").unwrap_or(0).max(0) as u64;
    let gcount = header.get_integer("GCOUNT").unwrap_or(1).max(1) as u64;

    let bytes = (bitpix.unsigned_abs() / 8).max(1) * gcount * (pcount + elements);
    Ok(bytes as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::card::{Card, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn primary_header() -> Header {
        let mut header = Header::new();
        header.push(Card::new("SIMPLE", Value::Logical(true), None).unwrap());
        header.push(Card::new("BITPIX", Value::Integer(8), None).unwrap());
        header.push(Card::new("NAXIS", Value::Integer(0), None).unwrap());
        header.push(Card::new("EXTEND", Value::Logical(true), None).unwrap());
        header
    }

    fn bintable_header(naxis1: i64, nrows: i64) -> Header {
        let mut header = Header::new();
        header.push(Card::new("XTENSION", Value::String("BINTABLE".into()), None).unwrap());
        header.push(Card::new("BITPIX", Value::Integer(8), None).unwrap());
        header.push(Card::new("NAXIS", Value::Integer(2), None).unwrap());
        header.push(Card::new("NAXIS1", Value::Integer(naxis1), None).unwrap());
        header.push(Card::new("NAXIS2", Value::Integer(nrows), None).unwrap());
        header.push(Card::new("PCOUNT", Value::Integer(0), None).unwrap());
        header.push(Card::new("GCOUNT", Value::Integer(1), None).unwrap());
        header.push(Card::new("TFIELDS", Value::Integer(1), None).unwrap());
        header.push(Card::new("TTYPE1", Value::String("ID".into()), None).unwrap());
        header.push(Card::new("TFORM1", Value::String("1J".into()), None).unwrap());
        header
    }

    fn write_fits(naxis1: i64, nrows: i64) -> NamedTempFile {
        let mut bytes = primary_header().to_bytes();
        bytes.extend_from_slice(&bintable_header(naxis1, nrows).to_bytes());

        let data_len = (naxis1 * nrows) as usize;
        let padded = data_len.div_ceil(BLOCK_LEN) * BLOCK_LEN;
        let mut data = vec![0u8; padded];
        for (i, b) in data.iter_mut().enumerate().take(data_len) {
            *b = (i % 251) as u8;
        }
        bytes.extend_from_slice(&data);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_open_and_locate_bintable() {
        let file = write_fits(4, 10);
        let reader = FitsReader::open(file.path()).unwrap();

        assert_eq!(reader.hdus().len(), 2);
        let hdu = reader.data_table(None).unwrap();
        assert!(hdu.is_bintable());
        assert_eq!(hdu.data_len, 40);

        let schema = reader.table_schema(None).unwrap();
        assert_eq!(schema.nrows, 10);
        assert_eq!(schema.row_stride, 4);

        let data = reader.data(hdu);
        assert_eq!(data.len(), 40);
        assert_eq!(data[1], 1);
    }

    #[test]
    fn test_explicit_hdu_index() {
        let file = write_fits(4, 10);
        let reader = FitsReader::open(file.path()).unwrap();

        assert!(reader.data_table(Some(1)).is_ok());
        // HDU 0 is the primary image, not a table.
        assert!(reader.data_table(Some(0)).is_err());
        assert!(reader.data_table(Some(5)).is_err());
    }

    #[test]
    fn test_no_table_extension() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&primary_header().to_bytes()).unwrap();
        file.flush().unwrap();

        let reader = FitsReader::open(file.path()).unwrap();
        let result = reader.data_table(None);
        assert!(matches!(result, Err(FitsColsError::NoTableExtension { .. })));
    }

    #[test]
    fn test_non_block_sized_file_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not a fits file").unwrap();
        file.flush().unwrap();

        let result = FitsReader::open(file.path());
        assert!(matches!(result, Err(FitsColsError::Format { .. })));
    }

    #[test]
    fn test_missing_simple_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bintable_header(4, 1).to_bytes()).unwrap();
        file.write_all(&[0u8; BLOCK_LEN]).unwrap();
        file.flush().unwrap();

        let result = FitsReader::open(file.path());
        assert!(matches!(result, Err(FitsColsError::Format { .. })));
    }

    #[test]
    fn test_truncated_data_region_rejected() {
        let mut bytes = primary_header().to_bytes();
        // Table claims one block of data but the file ends after the header.
        bytes.extend_from_slice(&bintable_header(BLOCK_LEN as i64, 1).to_bytes());

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let result = FitsReader::open(file.path());
        assert!(matches!(result, Err(FitsColsError::Format { .. })));
    }
}
