//! NumPy `.npy` output for simulated count maps.
//!
//! Writes format version 1.0: the `\x93NUMPY` magic, a little-endian header
//! length, a Python dict literal describing dtype and shape (padded so the
//! data starts on a 64-byte boundary) and the raw little-endian array body.
//! Maps are written as `<i4` in C order; a single energy bin is flattened
//! to a 1-D array so downstream array tooling sees the same shape the
//! simulation APIs expose.

use byteorder::{LittleEndian, WriteBytesExt};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const MAGIC: &[u8] = b"\x93NUMPY";

/// Write a per-bin count map as a `.npy` array.
///
/// The array shape is `(num_bins, num_pixels)`, or `(num_pixels,)` when the
/// map holds a single energy bin.
pub fn write_counts<P: AsRef<Path>>(path: P, counts: &Array2<i32>) -> std::io::Result<()> {
    let (bins, pixels) = counts.dim();
    let shape = if bins == 1 {
        format!("({},)", pixels)
    } else {
        format!("({}, {})", bins, pixels)
    };

    let mut header = format!(
        "{{'descr': '<i4', 'fortran_order': False, 'shape': {}, }}",
        shape
    );
    // Pad with spaces so the data section starts 64-byte aligned
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(MAGIC)?;
    writer.write_all(&[0x01, 0x00])?;
    writer.write_u16::<LittleEndian>(header.len() as u16)?;
    writer.write_all(header.as_bytes())?;
    for &value in counts.iter() {
        writer.write_i32::<LittleEndian>(value)?;
    }
    writer.flush()
}
