//! dlx-cover
//!
//! Exact cover over binary sparse matrices using Knuth's Dancing Links
//! technique. The crate reads a textual 0/1 grid into a compressed-sparse-row
//! form ([`BinaryCsr`]), links it into a toroidal node structure
//! ([`DlxMatrix`]), and searches it with the classic cover/uncover dance,
//! including row preselection and skipping ahead to the n-th solution.
//!
//! ```
//! use dlx_cover::{read_matrix, SolutionRow};
//!
//! let input = "100\n010\n001\n";
//! let mut matrix = read_matrix(input.as_bytes()).unwrap();
//!
//! let mut solution = vec![SolutionRow::default(); matrix.num_rows()];
//! let mut remaining = 1;
//! let size = matrix.exact_cover(&mut solution, &mut remaining);
//!
//! let mut rows: Vec<usize> = solution[..size]
//!     .iter()
//!     .map(|record| matrix.row_index(record.row_node))
//!     .collect();
//! rows.sort_unstable();
//! assert_eq!(rows, vec![0, 1, 2]);
//! ```

pub mod csr;
pub mod dlx;
pub mod read;

// Re-export commonly used types
pub use csr::BinaryCsr;
pub use dlx::{DlxMatrix, Node, RowSelectError, SolutionRow};
pub use read::{read_csr, read_matrix, LoadError};
