//! Text-stream loader for sparse binary matrices.
//!
//! The input format is a plain ASCII grid of `'0'` and `'1'` characters with
//! newline-terminated rows. Rows may omit trailing zeros, so the matrix width
//! is the width of the widest row. A final row without a trailing newline is
//! still kept; a newline immediately before end of input adds no extra row.
//! Any other byte is rejected.
//!
//! [`read_csr`] parses a stream into a [`BinaryCsr`] plus the column count,
//! and [`read_matrix`] goes all the way to a linked [`DlxMatrix`].

use std::error;
use std::fmt;
use std::io::{self, BufRead};

use crate::csr::BinaryCsr;
use crate::dlx::DlxMatrix;

/// Initial capacity of the column-index staging buffer. Arbitrary; any
/// non-zero value works.
const COL_IND_INITIAL_CAPACITY: usize = 512;

/// Initial capacity of the row-pointer staging buffer.
const ROW_PTR_INITIAL_CAPACITY: usize = 256;

/// Errors surfaced while loading a matrix from a text stream or linking it
/// into a [`DlxMatrix`].
#[derive(Debug)]
pub enum LoadError {
    /// An allocation or buffer growth failed. Partial state is released
    /// before this is reported.
    MemoryExhausted,

    /// A byte other than `'0'`, `'1'`, or newline was encountered.
    MalformedInput {
        /// The offending byte.
        byte: u8,
    },

    /// The underlying stream reported an error other than end of input.
    Io(io::Error),
}

impl LoadError {
    /// Numeric code for this error kind, for callers that surface results as
    /// plain integers (success is 0 by convention).
    pub fn code(&self) -> i32 {
        match self {
            LoadError::MemoryExhausted => -1,
            LoadError::MalformedInput { .. } => -2,
            LoadError::Io(_) => -3,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::MemoryExhausted => write!(f, "memory allocation failed"),
            LoadError::MalformedInput { byte } => write!(
                f,
                "invalid byte 0x{byte:02x} in matrix input; only '0', '1', and newline are allowed"
            ),
            LoadError::Io(err) => write!(f, "I/O error while reading matrix: {err}"),
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Append-only growable buffer of indices with fallible allocation.
///
/// `Vec` on its own aborts the process when it cannot grow; the loader
/// instead reports [`LoadError::MemoryExhausted`] and lets the caller decide.
/// Growth is roughly 1.5x the current capacity, saturating at `usize::MAX`.
struct IndexBuf {
    data: Vec<usize>,
}

impl IndexBuf {
    fn with_capacity(initial: usize) -> Result<IndexBuf, LoadError> {
        let mut data = Vec::new();
        data.try_reserve_exact(initial)
            .map_err(|_| LoadError::MemoryExhausted)?;
        Ok(IndexBuf { data })
    }

    fn push(&mut self, value: usize) -> Result<(), LoadError> {
        if self.data.len() == self.data.capacity() {
            self.grow()?;
        }
        self.data.push(value);
        Ok(())
    }

    fn grow(&mut self) -> Result<(), LoadError> {
        let capacity = self.data.capacity();
        let target = capacity.saturating_add((capacity / 2).max(1));
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| LoadError::MemoryExhausted)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    /// Trims the allocation down to the used length and detaches the buffer.
    fn into_vec(mut self) -> Vec<usize> {
        self.data.shrink_to_fit();
        self.data
    }
}

/// Reads a sparse binary matrix from `reader` and returns it in CSR form
/// together with the column count (the width of the widest row).
pub fn read_csr<R: BufRead>(reader: R) -> Result<(BinaryCsr, usize), LoadError> {
    let mut col_ind = IndexBuf::with_capacity(COL_IND_INITIAL_CAPACITY)?;
    let mut row_ptr = IndexBuf::with_capacity(ROW_PTR_INITIAL_CAPACITY)?;

    // Width of the widest row so far, and of the current row.
    let mut max_cols = 0;
    let mut col = 0;
    let mut last_was_newline = true;

    // The first row always starts at offset 0.
    row_ptr.push(0)?;

    for byte in reader.bytes() {
        match byte.map_err(LoadError::Io)? {
            b'1' => {
                col_ind.push(col)?;
                col += 1;
                last_was_newline = false;
            }
            b'0' => {
                col += 1;
                last_was_newline = false;
            }
            b'\n' => {
                row_ptr.push(col_ind.len())?;
                max_cols = max_cols.max(col);
                col = 0;
                last_was_newline = true;
            }
            byte => return Err(LoadError::MalformedInput { byte }),
        }
    }

    // End of input without a trailing newline still completes the final row.
    if !last_was_newline {
        row_ptr.push(col_ind.len())?;
        max_cols = max_cols.max(col);
    }

    let csr = BinaryCsr::from_parts(col_ind.into_vec(), row_ptr.into_vec());
    log::debug!(
        "read {} rows x {} columns with {} entries",
        csr.num_rows(),
        max_cols,
        csr.num_entries()
    );
    Ok((csr, max_cols))
}

/// Reads a sparse binary matrix from `reader` and links it into a ready-to-
/// solve [`DlxMatrix`].
pub fn read_matrix<R: BufRead>(reader: R) -> Result<DlxMatrix, LoadError> {
    let (csr, num_columns) = read_csr(reader)?;
    DlxMatrix::from_csr(&csr, num_columns)
}
