//! Chunked columnar sources for frame data.
//!
//! A source presents named datasets as rectangular row-major columns: one
//! row per frame, one or more samples per row. Cursors materialize one
//! bounded chunk at a time so that peak memory stays proportional to the
//! chunk size, not the dataset.
//!
//! Two backends ship with the crate: an in-memory mapping of dataset keys
//! to `ndarray` arrays, and an Arrow `RecordBatch` whose column names are
//! the dataset keys. On-disk formats are adapted by implementing
//! `FrameSource` outside this crate.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, FixedSizeListArray, PrimitiveArray};
use arrow::datatypes::{self as adt, DataType as ArrowDataType};
use arrow::record_batch::RecordBatch;
use ndarray::{s, Array1, Array2, Axis};

use crate::error::DlisError;
use crate::kernels::RepCode;
use crate::traits::{FrameSource, RowCursor};

//==================================================================================
// I. Element Types and Column Arrays
//==================================================================================

/// Element type of a column, restricted to what frame data can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnDtype {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl ColumnDtype {
    /// The representation code samples of this type are written with.
    pub fn rep_code(self) -> RepCode {
        match self {
            ColumnDtype::Int8 => RepCode::SShort,
            ColumnDtype::Int16 => RepCode::SNorm,
            ColumnDtype::Int32 => RepCode::SLong,
            ColumnDtype::Uint8 => RepCode::UShort,
            ColumnDtype::Uint16 => RepCode::UNorm,
            ColumnDtype::Uint32 => RepCode::ULong,
            ColumnDtype::Float32 => RepCode::FSingl,
            ColumnDtype::Float64 => RepCode::FDoubl,
        }
    }

    /// Inverse of `rep_code`, for channels with an explicitly chosen code.
    pub fn from_rep_code(code: RepCode) -> Option<Self> {
        let dt = match code {
            RepCode::SShort => ColumnDtype::Int8,
            RepCode::SNorm => ColumnDtype::Int16,
            RepCode::SLong => ColumnDtype::Int32,
            RepCode::UShort => ColumnDtype::Uint8,
            RepCode::UNorm => ColumnDtype::Uint16,
            RepCode::ULong => ColumnDtype::Uint32,
            RepCode::FSingl => ColumnDtype::Float32,
            RepCode::FDoubl => ColumnDtype::Float64,
            _ => return None,
        };
        Some(dt)
    }

    pub fn element_size(self) -> usize {
        match self {
            ColumnDtype::Int8 | ColumnDtype::Uint8 => 1,
            ColumnDtype::Int16 | ColumnDtype::Uint16 => 2,
            ColumnDtype::Int32 | ColumnDtype::Uint32 | ColumnDtype::Float32 => 4,
            ColumnDtype::Float64 => 8,
        }
    }

    pub fn from_arrow_type(t: &ArrowDataType) -> Result<Self, DlisError> {
        match t {
            ArrowDataType::Int8 => Ok(ColumnDtype::Int8),
            ArrowDataType::Int16 => Ok(ColumnDtype::Int16),
            ArrowDataType::Int32 => Ok(ColumnDtype::Int32),
            ArrowDataType::UInt8 => Ok(ColumnDtype::Uint8),
            ArrowDataType::UInt16 => Ok(ColumnDtype::Uint16),
            ArrowDataType::UInt32 => Ok(ColumnDtype::Uint32),
            ArrowDataType::Float32 => Ok(ColumnDtype::Float32),
            ArrowDataType::Float64 => Ok(ColumnDtype::Float64),
            dt => Err(DlisError::Data(format!(
                "Arrow type {dt:?} has no frame-data representation"
            ))),
        }
    }
}

/// Shape of a dataset as reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnShape {
    pub rows: usize,
    pub width: usize,
    pub dtype: ColumnDtype,
}

/// A rectangular, row-major column of samples: `rows x width`.
#[derive(Debug, Clone)]
pub enum ColumnArray {
    Int8(Array2<i8>),
    Int16(Array2<i16>),
    Int32(Array2<i32>),
    Uint8(Array2<u8>),
    Uint16(Array2<u16>),
    Uint32(Array2<u32>),
    Float32(Array2<f32>),
    Float64(Array2<f64>),
}

macro_rules! for_each_variant {
    ($self:expr, $arr:ident => $body:expr) => {
        match $self {
            ColumnArray::Int8($arr) => $body,
            ColumnArray::Int16($arr) => $body,
            ColumnArray::Int32($arr) => $body,
            ColumnArray::Uint8($arr) => $body,
            ColumnArray::Uint16($arr) => $body,
            ColumnArray::Uint32($arr) => $body,
            ColumnArray::Float32($arr) => $body,
            ColumnArray::Float64($arr) => $body,
        }
    };
}

impl ColumnArray {
    pub fn dtype(&self) -> ColumnDtype {
        match self {
            ColumnArray::Int8(_) => ColumnDtype::Int8,
            ColumnArray::Int16(_) => ColumnDtype::Int16,
            ColumnArray::Int32(_) => ColumnDtype::Int32,
            ColumnArray::Uint8(_) => ColumnDtype::Uint8,
            ColumnArray::Uint16(_) => ColumnDtype::Uint16,
            ColumnArray::Uint32(_) => ColumnDtype::Uint32,
            ColumnArray::Float32(_) => ColumnDtype::Float32,
            ColumnArray::Float64(_) => ColumnDtype::Float64,
        }
    }

    pub fn rows(&self) -> usize {
        for_each_variant!(self, a => a.nrows())
    }

    pub fn width(&self) -> usize {
        for_each_variant!(self, a => a.ncols())
    }

    pub fn shape(&self) -> ColumnShape {
        ColumnShape {
            rows: self.rows(),
            width: self.width(),
            dtype: self.dtype(),
        }
    }

    /// Copy a row range into a new column. This is the per-chunk copy; it
    /// materializes exactly the requested rows.
    pub fn slice_rows(&self, start: usize, len: usize) -> ColumnArray {
        match self {
            ColumnArray::Int8(a) => ColumnArray::Int8(a.slice(s![start..start + len, ..]).to_owned()),
            ColumnArray::Int16(a) => {
                ColumnArray::Int16(a.slice(s![start..start + len, ..]).to_owned())
            }
            ColumnArray::Int32(a) => {
                ColumnArray::Int32(a.slice(s![start..start + len, ..]).to_owned())
            }
            ColumnArray::Uint8(a) => {
                ColumnArray::Uint8(a.slice(s![start..start + len, ..]).to_owned())
            }
            ColumnArray::Uint16(a) => {
                ColumnArray::Uint16(a.slice(s![start..start + len, ..]).to_owned())
            }
            ColumnArray::Uint32(a) => {
                ColumnArray::Uint32(a.slice(s![start..start + len, ..]).to_owned())
            }
            ColumnArray::Float32(a) => {
                ColumnArray::Float32(a.slice(s![start..start + len, ..]).to_owned())
            }
            ColumnArray::Float64(a) => {
                ColumnArray::Float64(a.slice(s![start..start + len, ..]).to_owned())
            }
        }
    }

    /// Append one row, sample by sample, big-endian. Single-byte element
    /// types skip the per-element loop and copy the row wholesale.
    pub fn extend_row_be(&self, row: usize, out: &mut Vec<u8>) {
        match self {
            ColumnArray::Uint8(a) => {
                let view = a.row(row);
                match view.as_slice() {
                    Some(slice) => out.extend_from_slice(slice),
                    None => out.extend(view.iter().copied()),
                }
            }
            ColumnArray::Int8(a) => {
                let view = a.row(row);
                match view.as_slice() {
                    Some(slice) => out.extend_from_slice(bytemuck::cast_slice(slice)),
                    None => out.extend(view.iter().map(|v| *v as u8)),
                }
            }
            ColumnArray::Int16(a) => a.row(row).iter().for_each(|v| out.extend(v.to_be_bytes())),
            ColumnArray::Int32(a) => a.row(row).iter().for_each(|v| out.extend(v.to_be_bytes())),
            ColumnArray::Uint16(a) => a.row(row).iter().for_each(|v| out.extend(v.to_be_bytes())),
            ColumnArray::Uint32(a) => a.row(row).iter().for_each(|v| out.extend(v.to_be_bytes())),
            ColumnArray::Float32(a) => a.row(row).iter().for_each(|v| out.extend(v.to_be_bytes())),
            ColumnArray::Float64(a) => a.row(row).iter().for_each(|v| out.extend(v.to_be_bytes())),
        }
    }

    /// Per-row byte width under this column's representation code.
    pub fn row_byte_width(&self) -> usize {
        self.width() * self.dtype().element_size()
    }

    /// Read one sample, widened to f64. Used by the index-channel checks.
    pub fn get_f64(&self, row: usize, col: usize) -> f64 {
        for_each_variant!(self, a => a[(row, col)] as f64)
    }
}

macro_rules! impl_column_from {
    ($($t:ty => $variant:ident),*) => {$(
        impl From<Array2<$t>> for ColumnArray {
            fn from(a: Array2<$t>) -> Self {
                ColumnArray::$variant(a)
            }
        }
        impl From<Array1<$t>> for ColumnArray {
            fn from(a: Array1<$t>) -> Self {
                ColumnArray::$variant(a.insert_axis(Axis(1)))
            }
        }
        impl From<Vec<$t>> for ColumnArray {
            fn from(v: Vec<$t>) -> Self {
                ColumnArray::from(Array1::from_vec(v))
            }
        }
    )*};
}

impl_column_from!(
    i8 => Int8, i16 => Int16, i32 => Int32,
    u8 => Uint8, u16 => Uint16, u32 => Uint32,
    f32 => Float32, f64 => Float64
);

//==================================================================================
// II. Chunks
//==================================================================================

/// One materialized chunk: the same row range of every requested dataset.
#[derive(Debug)]
pub struct ColumnChunk {
    pub start_row: usize,
    pub n_rows: usize,
    columns: HashMap<String, ColumnArray>,
}

impl ColumnChunk {
    pub fn column(&self, key: &str) -> Result<&ColumnArray, DlisError> {
        self.columns
            .get(key)
            .ok_or_else(|| DlisError::Data(format!("chunk does not carry dataset '{key}'")))
    }
}

//==================================================================================
// III. In-Memory Source
//==================================================================================

/// A mapping of dataset keys to in-memory column arrays.
#[derive(Debug, Default)]
pub struct InMemorySource {
    columns: HashMap<String, ColumnArray>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, column: impl Into<ColumnArray>) {
        self.columns.insert(key.into(), column.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }
}

impl FrameSource for InMemorySource {
    fn dataset_shape(&self, key: &str) -> Option<ColumnShape> {
        self.columns.get(key).map(|c| c.shape())
    }

    fn open_cursor(
        &self,
        keys: &[String],
        chunk_rows: usize,
    ) -> Result<Box<dyn RowCursor + '_>, DlisError> {
        let total_rows = check_rectangular(keys, |k| self.dataset_shape(k))?;
        Ok(Box::new(InMemoryCursor {
            source: self,
            keys: keys.to_vec(),
            chunk_rows,
            total_rows,
            pos: 0,
        }))
    }
}

struct InMemoryCursor<'a> {
    source: &'a InMemorySource,
    keys: Vec<String>,
    chunk_rows: usize,
    total_rows: usize,
    pos: usize,
}

impl RowCursor for InMemoryCursor<'_> {
    fn next_chunk(&mut self) -> Result<Option<ColumnChunk>, DlisError> {
        if self.pos >= self.total_rows {
            return Ok(None);
        }
        let len = self.chunk_rows.min(self.total_rows - self.pos);
        let mut columns = HashMap::with_capacity(self.keys.len());
        for key in &self.keys {
            let col = &self.source.columns[key];
            columns.insert(key.clone(), col.slice_rows(self.pos, len));
        }
        let chunk = ColumnChunk {
            start_row: self.pos,
            n_rows: len,
            columns,
        };
        self.pos += len;
        Ok(Some(chunk))
    }
}

//==================================================================================
// IV. Arrow Record-Batch Source
//==================================================================================

/// A structured record array backed by an Arrow `RecordBatch`; field names
/// are the dataset keys. Primitive columns are scalar channels; fixed-size
/// lists of primitives are multi-sample channels.
#[derive(Debug, Clone)]
pub struct RecordBatchSource {
    batch: RecordBatch,
}

impl RecordBatchSource {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    fn column_by_name(&self, key: &str) -> Option<&ArrayRef> {
        let idx = self.batch.schema().index_of(key).ok()?;
        Some(self.batch.column(idx))
    }
}

impl FrameSource for RecordBatchSource {
    fn dataset_shape(&self, key: &str) -> Option<ColumnShape> {
        let array = self.column_by_name(key)?;
        arrow_shape(array.as_ref()).ok()
    }

    fn open_cursor(
        &self,
        keys: &[String],
        chunk_rows: usize,
    ) -> Result<Box<dyn RowCursor + '_>, DlisError> {
        let mut columns = Vec::with_capacity(keys.len());
        for key in keys {
            let array = self.column_by_name(key).ok_or_else(|| {
                DlisError::Data(format!("no dataset '{key}' found in the source data"))
            })?;
            if array.null_count() > 0 {
                return Err(DlisError::Data(format!(
                    "dataset '{key}' contains nulls, which frame data cannot represent"
                )));
            }
            columns.push((key.clone(), Arc::clone(array)));
        }
        let total_rows = check_rectangular(keys, |k| self.dataset_shape(k))?;
        Ok(Box::new(RecordBatchCursor {
            columns,
            chunk_rows,
            total_rows,
            pos: 0,
        }))
    }
}

struct RecordBatchCursor {
    columns: Vec<(String, ArrayRef)>,
    chunk_rows: usize,
    total_rows: usize,
    pos: usize,
}

impl RowCursor for RecordBatchCursor {
    fn next_chunk(&mut self) -> Result<Option<ColumnChunk>, DlisError> {
        if self.pos >= self.total_rows {
            return Ok(None);
        }
        let len = self.chunk_rows.min(self.total_rows - self.pos);
        let mut columns = HashMap::with_capacity(self.columns.len());
        for (key, array) in &self.columns {
            columns.insert(key.clone(), arrow_chunk(array.as_ref(), self.pos, len)?);
        }
        let chunk = ColumnChunk {
            start_row: self.pos,
            n_rows: len,
            columns,
        };
        self.pos += len;
        Ok(Some(chunk))
    }
}

fn arrow_shape(array: &dyn Array) -> Result<ColumnShape, DlisError> {
    match array.data_type() {
        ArrowDataType::FixedSizeList(field, width) => Ok(ColumnShape {
            rows: array.len(),
            width: *width as usize,
            dtype: ColumnDtype::from_arrow_type(field.data_type())?,
        }),
        dt => Ok(ColumnShape {
            rows: array.len(),
            width: 1,
            dtype: ColumnDtype::from_arrow_type(dt)?,
        }),
    }
}

macro_rules! primitive_chunk {
    ($array:expr, $start:expr, $len:expr, $width:expr, $($pat:pat => ($arrow:ty, $variant:ident)),*) => {{
        let array = $array;
        match array.data_type() {
            $(
                $pat => {
                    let typed = array
                        .as_any()
                        .downcast_ref::<PrimitiveArray<$arrow>>()
                        .ok_or_else(|| DlisError::Data("Arrow column downcast failed".into()))?;
                    let values = &typed.values()[$start * $width..($start + $len) * $width];
                    let arr = Array2::from_shape_vec(($len, $width), values.to_vec())
                        .map_err(|e| DlisError::Data(e.to_string()))?;
                    Ok(ColumnArray::$variant(arr))
                }
            )*
            dt => Err(DlisError::Data(format!(
                "Arrow type {dt:?} has no frame-data representation"
            ))),
        }
    }};
}

fn primitive_arrow_chunk(
    array: &dyn Array,
    start: usize,
    len: usize,
    width: usize,
) -> Result<ColumnArray, DlisError> {
    primitive_chunk!(
        array, start, len, width,
        ArrowDataType::Int8 => (adt::Int8Type, Int8),
        ArrowDataType::Int16 => (adt::Int16Type, Int16),
        ArrowDataType::Int32 => (adt::Int32Type, Int32),
        ArrowDataType::UInt8 => (adt::UInt8Type, Uint8),
        ArrowDataType::UInt16 => (adt::UInt16Type, Uint16),
        ArrowDataType::UInt32 => (adt::UInt32Type, Uint32),
        ArrowDataType::Float32 => (adt::Float32Type, Float32),
        ArrowDataType::Float64 => (adt::Float64Type, Float64)
    )
}

fn arrow_chunk(array: &dyn Array, start: usize, len: usize) -> Result<ColumnArray, DlisError> {
    match array.data_type() {
        ArrowDataType::FixedSizeList(_, width) => {
            let width = *width as usize;
            let list = array
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| DlisError::Data("Arrow column downcast failed".into()))?;
            primitive_arrow_chunk(list.values().as_ref(), start, len, width)
                .map_err(|e| match e {
                    DlisError::Data(msg) => DlisError::Data(format!("list values: {msg}")),
                    other => other,
                })
        }
        _ => primitive_arrow_chunk(array, start, len, 1),
    }
}

//==================================================================================
// V. Chained Source
//==================================================================================

/// Looks datasets up in a primary source first, falling back to a second
/// one. This is how channel data attached directly to the file combines
/// with an external source handed to `write`: the external source wins on
/// key conflicts.
pub struct ChainedSource<'a> {
    primary: Option<&'a dyn FrameSource>,
    fallback: &'a dyn FrameSource,
}

impl<'a> ChainedSource<'a> {
    pub fn new(primary: Option<&'a dyn FrameSource>, fallback: &'a dyn FrameSource) -> Self {
        Self { primary, fallback }
    }

    fn owner_of(&self, key: &str) -> Option<Owner> {
        if let Some(p) = self.primary {
            if p.dataset_shape(key).is_some() {
                return Some(Owner::Primary);
            }
        }
        self.fallback.dataset_shape(key).map(|_| Owner::Fallback)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Owner {
    Primary,
    Fallback,
}

impl FrameSource for ChainedSource<'_> {
    fn dataset_shape(&self, key: &str) -> Option<ColumnShape> {
        match self.owner_of(key)? {
            Owner::Primary => self.primary.and_then(|p| p.dataset_shape(key)),
            Owner::Fallback => self.fallback.dataset_shape(key),
        }
    }

    fn open_cursor(
        &self,
        keys: &[String],
        chunk_rows: usize,
    ) -> Result<Box<dyn RowCursor + '_>, DlisError> {
        let total_rows = check_rectangular(keys, |k| self.dataset_shape(k))?;

        let mut primary_keys = Vec::new();
        let mut fallback_keys = Vec::new();
        for key in keys {
            match self.owner_of(key) {
                Some(Owner::Primary) => primary_keys.push(key.clone()),
                Some(Owner::Fallback) => fallback_keys.push(key.clone()),
                None => {
                    return Err(DlisError::Data(format!(
                        "no dataset '{key}' found in the source data"
                    )))
                }
            }
        }

        let mut cursors: Vec<Box<dyn RowCursor + '_>> = Vec::new();
        if !primary_keys.is_empty() {
            let p = self.primary.expect("primary keys imply a primary source");
            cursors.push(p.open_cursor(&primary_keys, chunk_rows)?);
        }
        if !fallback_keys.is_empty() {
            cursors.push(self.fallback.open_cursor(&fallback_keys, chunk_rows)?);
        }
        Ok(Box::new(ChainedCursor {
            cursors,
            total_rows,
            pos: 0,
            chunk_rows,
        }))
    }
}

struct ChainedCursor<'a> {
    cursors: Vec<Box<dyn RowCursor + 'a>>,
    total_rows: usize,
    pos: usize,
    chunk_rows: usize,
}

impl RowCursor for ChainedCursor<'_> {
    fn next_chunk(&mut self) -> Result<Option<ColumnChunk>, DlisError> {
        if self.pos >= self.total_rows {
            return Ok(None);
        }
        let len = self.chunk_rows.min(self.total_rows - self.pos);
        let mut columns = HashMap::new();
        for cursor in &mut self.cursors {
            let part = cursor.next_chunk()?.ok_or_else(|| {
                DlisError::Data("source cursor ended before the declared row count".into())
            })?;
            if part.n_rows != len {
                return Err(DlisError::Data(format!(
                    "source cursors disagree on chunk size: expected {len} rows, got {}",
                    part.n_rows
                )));
            }
            columns.extend(part.columns);
        }
        let chunk = ColumnChunk {
            start_row: self.pos,
            n_rows: len,
            columns,
        };
        self.pos += len;
        Ok(Some(chunk))
    }
}

//==================================================================================
// VI. Shared Checks
//==================================================================================

/// Verify that every requested dataset exists and that all of them agree on
/// the row count. Returns that row count.
fn check_rectangular(
    keys: &[String],
    shape_of: impl Fn(&str) -> Option<ColumnShape>,
) -> Result<usize, DlisError> {
    let mut rows: Option<(usize, &str)> = None;
    for key in keys {
        let shape = shape_of(key).ok_or_else(|| {
            DlisError::Data(format!("no dataset '{key}' found in the source data"))
        })?;
        match rows {
            None => rows = Some((shape.rows, key)),
            Some((n, first)) if n != shape.rows => {
                return Err(DlisError::Data(format!(
                    "datasets disagree on the row count: '{first}' has {n} rows, '{key}' has {}",
                    shape.rows
                )))
            }
            Some(_) => {}
        }
    }
    Ok(rows.map(|(n, _)| n).unwrap_or(0))
}

//==================================================================================
// VII. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int32Array};
    use arrow::datatypes::{Field, Schema};

    fn mem_source() -> InMemorySource {
        let mut src = InMemorySource::new();
        src.insert("DEPTH", vec![0.0f64, 1.0, 2.0, 3.0, 4.0]);
        src.insert("GAMMA", vec![10i32, 11, 12, 13, 14]);
        src.insert(
            "AMPLITUDE",
            Array2::from_shape_vec((5, 3), (0..15).map(|v| v as f32).collect()).unwrap(),
        );
        src
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn shapes_report_rows_width_and_dtype() {
        let src = mem_source();
        let s = src.dataset_shape("AMPLITUDE").unwrap();
        assert_eq!((s.rows, s.width, s.dtype), (5, 3, ColumnDtype::Float32));
        let s = src.dataset_shape("DEPTH").unwrap();
        assert_eq!((s.rows, s.width, s.dtype), (5, 1, ColumnDtype::Float64));
        assert!(src.dataset_shape("MISSING").is_none());
    }

    #[test]
    fn cursor_chunks_cover_all_rows_with_short_tail() {
        let src = mem_source();
        let ks = keys(&["DEPTH", "GAMMA"]);
        let mut cursor = src.open_cursor(&ks, 2).unwrap();
        let mut seen = Vec::new();
        while let Some(chunk) = cursor.next_chunk().unwrap() {
            seen.push((chunk.start_row, chunk.n_rows));
            assert_eq!(chunk.column("DEPTH").unwrap().rows(), chunk.n_rows);
        }
        assert_eq!(seen, vec![(0, 2), (2, 2), (4, 1)]);
    }

    #[test]
    fn missing_dataset_is_a_data_error() {
        let src = mem_source();
        let err = src.open_cursor(&keys(&["DEPTH", "MISSING"]), 2);
        assert!(matches!(err, Err(DlisError::Data(_))));
    }

    #[test]
    fn mismatched_row_counts_are_rejected() {
        let mut src = mem_source();
        src.insert("SHORT", vec![1.0f64, 2.0]);
        let err = src.open_cursor(&keys(&["DEPTH", "SHORT"]), 2);
        assert!(matches!(err, Err(DlisError::Data(_))));
    }

    #[test]
    fn row_bytes_are_big_endian() {
        let col = ColumnArray::from(vec![1.0f64, 2.5]);
        let mut out = Vec::new();
        col.extend_row_be(1, &mut out);
        assert_eq!(out, 2.5f64.to_be_bytes().to_vec());

        let col = ColumnArray::from(vec![0x0102i16, 0x0304]);
        out.clear();
        col.extend_row_be(0, &mut out);
        assert_eq!(out, vec![0x01, 0x02]);
    }

    #[test]
    fn record_batch_source_round() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("DEPTH", ArrowDataType::Float64, false),
            Field::new("GAMMA", ArrowDataType::Int32, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![0.0, 1.0, 2.0])),
                Arc::new(Int32Array::from(vec![7, 8, 9])),
            ],
        )
        .unwrap();
        let src = RecordBatchSource::new(batch);

        let s = src.dataset_shape("GAMMA").unwrap();
        assert_eq!((s.rows, s.width, s.dtype), (3, 1, ColumnDtype::Int32));

        let ks = keys(&["DEPTH", "GAMMA"]);
        let mut cursor = src.open_cursor(&ks, 2).unwrap();
        let first = cursor.next_chunk().unwrap().unwrap();
        assert_eq!(first.n_rows, 2);
        let mut out = Vec::new();
        first.column("GAMMA").unwrap().extend_row_be(1, &mut out);
        assert_eq!(out, 8i32.to_be_bytes().to_vec());
        let second = cursor.next_chunk().unwrap().unwrap();
        assert_eq!((second.start_row, second.n_rows), (2, 1));
        assert!(cursor.next_chunk().unwrap().is_none());
    }
}
