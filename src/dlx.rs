//! Knuth's "Dancing Links" engine for the exact cover problem.
//!
//! Given a 0/1 matrix, exact cover asks for a subset of rows such that every
//! column contains a 1 in exactly one selected row. Knuth's DLX technique
//! represents the matrix as a toroidal web of doubly-linked lists and exploits
//! the self-inverse property of linked-list removal — unlinking a node leaves
//! the node's own links intact, so relinking it restores the list exactly —
//! to make backtracking nearly free.
//!
//! Rather than heap-allocated nodes and raw pointers, this implementation
//! stores the links as indices into side tables, which keeps the whole
//! structure in a handful of contiguous allocations and sidesteps the aliasing
//! questions a pointer-based translation would raise. [`DlxMatrix`] is built
//! from a [`BinaryCsr`] and solved in place with
//! [`exact_cover`](DlxMatrix::exact_cover); the matrix is always restored to
//! its exact pre-call state when the search returns.

use std::error;
use std::fmt;
use std::ops;

use crate::csr::BinaryCsr;
use crate::read::LoadError;

/// Index of a node in the link arena. Slot 0 is the root, slots `1..=C` are
/// the column headers, and data nodes follow in CSR order. Callers receive
/// `Node` values in [`SolutionRow`] records and hand them back to
/// [`DlxMatrix::row_index`] to recover row numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node(usize);

/// Anchor of the left-right list of live column headers. It belongs to no
/// column and carries no row.
const ROOT_NODE: Node = Node(0);

/// One link in a circular doubly-linked list. `previous`/`next` read as
/// left/right for the horizontal lists and up/down for the vertical ones.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Link {
    previous: Node,
    next: Node,
}

/// All links of the matrix in one orientation: one instance holds the
/// left-right lists, another the up-down lists. A node is identified by the
/// same index in both.
#[derive(Clone, Debug, PartialEq, Eq)]
struct NodeLinks {
    data: Vec<Link>,
}

impl NodeLinks {
    fn with_node_capacity(nodes: usize) -> Result<NodeLinks, LoadError> {
        let mut data = Vec::new();
        data.try_reserve_exact(nodes)
            .map_err(|_| LoadError::MemoryExhausted)?;
        Ok(NodeLinks { data })
    }

    /// Arena-allocates the next node as a list of one (both links to itself).
    fn alloc(&mut self) -> Node {
        let node = Node(self.data.len());
        self.data.push(Link {
            previous: node,
            next: node,
        });
        node
    }

    /// Inserts `b` between `a` and `a`'s successor: a<->b<->c.
    fn insert(&mut self, a: Node, b: Node) {
        let c = self[a].next;
        self[b].previous = a;
        self[b].next = c;
        self[a].next = b;
        self[c].previous = b;
    }

    /// Unlinks `b` from its list. `b`'s own links are left untouched so that
    /// [`relink`](Self::relink) can restore it later.
    fn unlink(&mut self, b: Node) {
        let Link { previous, next } = self[b];
        self[previous].next = next;
        self[next].previous = previous;
    }

    /// Restores `b` into its list using its own undisturbed links. Only valid
    /// if `b`'s neighbours have not moved since the matching
    /// [`unlink`](Self::unlink) — the discipline the whole algorithm is built
    /// around.
    fn relink(&mut self, b: Node) {
        let Link { previous, next } = self[b];
        self[previous].next = b;
        self[next].previous = b;
    }

    /// Whether `b` is currently unlinked. A node cannot be half in a list, so
    /// checking one side suffices.
    fn is_unlinked(&self, b: Node) -> bool {
        let previous = self[b].previous;
        self[previous].next != b
    }
}

impl ops::Index<Node> for NodeLinks {
    type Output = Link;
    fn index(&self, index: Node) -> &Self::Output {
        &self.data[index.0]
    }
}

impl ops::IndexMut<Node> for NodeLinks {
    fn index_mut(&mut self, index: Node) -> &mut Self::Output {
        &mut self.data[index.0]
    }
}

// Index the side tables directly by Node without unwrapping the newtype.

impl<T> ops::Index<Node> for Vec<T> {
    type Output = T;
    fn index(&self, index: Node) -> &Self::Output {
        &self[index.0]
    }
}

impl<T> ops::IndexMut<Node> for Vec<T> {
    fn index_mut(&mut self, index: Node) -> &mut Self::Output {
        &mut self[index.0]
    }
}

/// Record of one row selected into a solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolutionRow {
    /// A node of the selected row. Decode with [`DlxMatrix::row_index`].
    pub row_node: Node,
    /// Identity of the primary column — the column the search branched on
    /// when it picked this row.
    pub primary_column: usize,
    /// How many candidate rows that column had at the moment of branching.
    pub n_choices: usize,
}

/// Errors from the row preselection operations. These are local failures:
/// the matrix is untouched when one is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowSelectError {
    /// The row has already been removed from the matrix and cannot be forced.
    AlreadyRemoved,
    /// The row is still live in the matrix, so there is nothing to unselect.
    StillInMatrix,
}

impl fmt::Display for RowSelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSelectError::AlreadyRemoved => {
                write!(f, "row has already been removed from the matrix")
            }
            RowSelectError::StillInMatrix => write!(f, "row is still present in the matrix"),
        }
    }
}

impl error::Error for RowSelectError {}

/// A sparse 0/1 matrix linked for the dancing-links search.
///
/// The structure owns a fixed arena of nodes: the root, one header per
/// column, and one data node per 1-entry. Solving rearranges links in place
/// and restores them on return; nothing is allocated or freed after
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DlxMatrix {
    num_columns: usize,
    num_rows: usize,

    /// Left-right links: the header row and each matrix row's circular list.
    row_links: NodeLinks,

    /// Up-down links: each column's circular list through its header.
    column_links: NodeLinks,

    /// Live data-node count per column, indexed by header node. Slot 0 is a
    /// dummy for the root.
    column_sizes: Vec<usize>,

    /// Header node for each column number.
    column_headers: Vec<Node>,

    /// Owning column header of every node. Headers point at themselves; the
    /// root's entry is a dummy.
    header_of_node: Vec<Node>,

    /// Owning row index of every data node. Entries for the root and the
    /// headers are dummies.
    row_of_node: Vec<usize>,

    /// Caller-assigned column identities, copied into [`SolutionRow`]
    /// records. Initialised to the column numbers.
    column_ids: Vec<usize>,

    /// Offset of each row's first entry among the data nodes, plus a final
    /// entry equal to the total entry count. Mirrors the CSR row pointers.
    row_off: Vec<usize>,
}

fn try_vec<T>(capacity: usize) -> Result<Vec<T>, LoadError> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| LoadError::MemoryExhausted)?;
    Ok(v)
}

impl DlxMatrix {
    /// Links a CSR matrix into a solvable `DlxMatrix` with `num_columns`
    /// columns.
    ///
    /// `num_columns` may exceed every column index present in the CSR; the
    /// surplus columns are simply empty (and make the instance unsatisfiable,
    /// which the search reports naturally). It must be at least
    /// [`BinaryCsr::min_columns`].
    ///
    /// Every backing allocation is made up front and failures surface as
    /// [`LoadError::MemoryExhausted`]; partially built state is released.
    pub fn from_csr(csr: &BinaryCsr, num_columns: usize) -> Result<DlxMatrix, LoadError> {
        assert!(
            num_columns >= csr.min_columns(),
            "num_columns {num_columns} cannot hold every column index in the CSR"
        );

        let num_rows = csr.num_rows();
        let num_nodes = 1 + num_columns + csr.num_entries();

        let mut matrix = DlxMatrix {
            num_columns,
            num_rows,
            row_links: NodeLinks::with_node_capacity(num_nodes)?,
            column_links: NodeLinks::with_node_capacity(num_nodes)?,
            column_sizes: try_vec(1 + num_columns)?,
            column_headers: try_vec(num_columns)?,
            header_of_node: try_vec(num_nodes)?,
            row_of_node: try_vec(num_nodes)?,
            column_ids: try_vec(num_columns)?,
            row_off: try_vec(num_rows + 1)?,
        };

        // Root node.
        let root = matrix.alloc_node(ROOT_NODE, 0);
        debug_assert_eq!(root, ROOT_NODE);
        matrix.column_sizes.push(0);

        // Header row: the root and all headers form one circular left-right
        // list; each header starts out as an empty self-looped column.
        for column in 0..num_columns {
            let header = matrix.alloc_header();
            matrix.column_headers.push(header);
            matrix.column_sizes.push(0);
            matrix.column_ids.push(column);
            matrix
                .row_links
                .insert(matrix.row_links[ROOT_NODE].previous, header);
        }

        // Data nodes, row by row: link each row into its own circular
        // left-right list and append every node to the bottom of its column.
        let mut entries = 0;
        for (row, columns) in csr.rows().enumerate() {
            matrix.row_off.push(entries);
            entries += columns.len();

            let mut previous: Option<Node> = None;
            for &column in columns {
                let header = matrix.column_headers[column];
                let node = matrix.alloc_node(header, row);
                matrix.append_to_column(node, header);

                if let Some(previous) = previous {
                    matrix.row_links.insert(previous, node);
                }
                previous = Some(node);
            }
        }
        matrix.row_off.push(entries);

        log::debug!(
            "linked DLX matrix: {} rows x {} columns, {} nodes",
            num_rows,
            num_columns,
            entries
        );
        Ok(matrix)
    }

    fn alloc_node(&mut self, header: Node, row: usize) -> Node {
        let node = self.row_links.alloc();
        let same = self.column_links.alloc();
        debug_assert_eq!(node, same);
        self.header_of_node.push(header);
        self.row_of_node.push(row);
        node
    }

    /// Allocates a column header, which is its own header.
    fn alloc_header(&mut self) -> Node {
        let node = Node(self.row_links.data.len());
        let allocated = self.alloc_node(node, 0);
        debug_assert_eq!(node, allocated);
        node
    }

    /// Inserts `node` at the bottom of `header`'s column — just above the
    /// header in the circular up-down list — and bumps the column count.
    fn append_to_column(&mut self, node: Node, header: Node) {
        self.column_links
            .insert(self.column_links[header].previous, node);
        self.column_sizes[header] += 1;
    }

    /// Number of rows in the matrix.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns in the matrix.
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Current number of live rows in the given column.
    pub fn column_size(&self, column: usize) -> usize {
        self.column_sizes[self.column_headers[column]]
    }

    /// The identity currently assigned to the given column.
    pub fn column_id(&self, column: usize) -> usize {
        self.column_ids[column]
    }

    /// Replaces all column identities. The engine never interprets these
    /// values; they are only copied into [`SolutionRow::primary_column`].
    pub fn set_column_ids(&mut self, ids: &[usize]) {
        assert_eq!(
            ids.len(),
            self.num_columns,
            "expected {} column ids, got {}",
            self.num_columns,
            ids.len()
        );
        self.column_ids.clear();
        self.column_ids.extend_from_slice(ids);
    }

    /// Row offsets in CSR form: `row_off()[i]` is the data-node ordinal of
    /// row `i`'s first entry and `row_off()[num_rows()]` the total entry
    /// count.
    pub fn row_off(&self) -> &[usize] {
        &self.row_off
    }

    /// The row a data node belongs to.
    pub fn row_index(&self, node: Node) -> usize {
        assert!(self.is_data_node(node), "{node:?} is not a data node");
        self.row_of_node[node]
    }

    /// The nodes of row `index`, in column order.
    pub fn row_nodes(&self, index: usize) -> impl Iterator<Item = Node> + '_ {
        assert!(index < self.num_rows, "row index {index} out of bounds");
        let first = 1 + self.num_columns;
        (self.row_off[index]..self.row_off[index + 1]).map(move |ordinal| Node(first + ordinal))
    }

    fn is_data_node(&self, node: Node) -> bool {
        node.0 > self.num_columns && node.0 < self.header_of_node.len()
    }

    /// Removes `header`'s column from the live matrix: the header leaves the
    /// header row, and every row with an entry in the column is excised from
    /// all *other* columns. The column's own up-down list is left intact so
    /// the loop in [`search`](Self::search) can still walk its rows.
    fn cover(&mut self, header: Node) {
        self.row_links.unlink(header);

        let mut row = self.column_links[header].next;
        while row != header {
            let mut node = self.row_links[row].next;
            while node != row {
                self.column_links.unlink(node);
                self.column_sizes[self.header_of_node[node]] -= 1;
                node = self.row_links[node].next;
            }
            row = self.column_links[row].next;
        }
    }

    /// Exact inverse of [`cover`](Self::cover). Traversal runs in the
    /// opposite direction on both axes — rows bottom-up, nodes right-to-left
    /// — so every relink sees exactly the neighbours its unlink saw.
    fn uncover(&mut self, header: Node) {
        let mut row = self.column_links[header].previous;
        while row != header {
            let mut node = self.row_links[row].previous;
            while node != row {
                self.column_sizes[self.header_of_node[node]] += 1;
                self.column_links.relink(node);
                node = self.row_links[node].previous;
            }
            row = self.column_links[row].previous;
        }

        self.row_links.relink(header);
    }

    /// Covers the column of every node in `row_node`'s row except
    /// `row_node`'s own column.
    fn cover_other_columns(&mut self, row_node: Node) {
        let mut node = self.row_links[row_node].next;
        while node != row_node {
            self.cover(self.header_of_node[node]);
            node = self.row_links[node].next;
        }
    }

    /// Exact inverse of [`cover_other_columns`](Self::cover_other_columns),
    /// walking leftward.
    fn uncover_other_columns(&mut self, row_node: Node) {
        let mut node = self.row_links[row_node].previous;
        while node != row_node {
            self.uncover(self.header_of_node[node]);
            node = self.row_links[node].previous;
        }
    }

    /// Forces the row of `row_node` into the solution by covering its
    /// columns, exactly as the search would when selecting the row.
    ///
    /// Fails with [`RowSelectError::AlreadyRemoved`] if the row has been
    /// knocked out of the matrix by a previous preselection; the matrix is
    /// untouched in that case.
    ///
    /// Preselections must be undone with [`unselect_row`](Self::unselect_row)
    /// in exact reverse order — the link discipline that makes restoration
    /// work is strictly last-in, first-out. Running
    /// [`exact_cover`](Self::exact_cover) while rows are forced is fine (the
    /// search restores what it touches); any other interleaving is
    /// unsupported.
    pub fn force_row(&mut self, row_node: Node) -> Result<(), RowSelectError> {
        assert!(
            self.is_data_node(row_node),
            "{row_node:?} is not a data node"
        );
        if self.column_links.is_unlinked(row_node) {
            return Err(RowSelectError::AlreadyRemoved);
        }

        self.cover(self.header_of_node[row_node]);
        self.cover_other_columns(row_node);
        Ok(())
    }

    /// Undoes the matching [`force_row`](Self::force_row), restoring the
    /// links it rearranged. Must be called in exact reverse order of prior
    /// `force_row` calls.
    ///
    /// Fails with [`RowSelectError::StillInMatrix`] if the row's column is
    /// still live (i.e. the row was never forced); the matrix is untouched in
    /// that case.
    pub fn unselect_row(&mut self, row_node: Node) -> Result<(), RowSelectError> {
        assert!(
            self.is_data_node(row_node),
            "{row_node:?} is not a data node"
        );
        let header = self.header_of_node[row_node];
        if !self.row_links.is_unlinked(header) {
            return Err(RowSelectError::StillInMatrix);
        }

        self.uncover_other_columns(row_node);
        self.uncover(header);
        Ok(())
    }

    /// Searches for exact covers, skipping solutions according to
    /// `remaining`.
    ///
    /// `*remaining` must be positive on entry; it is decremented once per
    /// solution found, and the search stops when it reaches zero or the tree
    /// is exhausted. The return value is the size of the last solution found
    /// (its rows are in `solution[..size]`), or 0 if fewer than the requested
    /// number of solutions exist — in which case `*remaining` holds the
    /// shortfall. An empty matrix (zero columns) counts as one solution of
    /// size 0, which is indistinguishable from "no solution" by return value
    /// alone; callers can disambiguate via [`num_columns`](Self::num_columns).
    ///
    /// `solution` must be large enough for the deepest row selection;
    /// `num_rows()` records always suffice. The matrix is restored to its
    /// exact pre-call state before returning, whether or not a solution was
    /// found.
    pub fn exact_cover(&mut self, solution: &mut [SolutionRow], remaining: &mut usize) -> usize {
        assert!(*remaining > 0, "requested solution count must be positive");
        let size = self.search(solution, 0, remaining);
        // The recursion reports the last solution seen in its subtree even
        // when the tree was exhausted; only a fully satisfied request counts.
        if *remaining == 0 {
            size
        } else {
            0
        }
    }

    fn search(
        &mut self,
        solution: &mut [SolutionRow],
        depth: usize,
        remaining: &mut usize,
    ) -> usize {
        // An empty header row means every column is covered: a solution.
        if self.row_links[ROOT_NODE].next == ROOT_NODE {
            *remaining -= 1;
            return depth;
        }

        // Branch on the live column with the fewest candidate rows, leftmost
        // on ties, to keep the tree narrow.
        let header = self.min_size_column();
        self.cover(header);

        // A column with no live rows is a dead end; it contributes no record
        // and the loop below never runs.
        if self.column_sizes[header] > 0 {
            solution[depth].primary_column = self.column_ids[header.0 - 1];
            solution[depth].n_choices = self.column_sizes[header];
        }

        let mut found = 0;
        let mut row = self.column_links[header].next;
        while row != header {
            self.cover_other_columns(row);
            found = self.search(solution, depth + 1, remaining);
            self.uncover_other_columns(row);

            if found > 0 {
                solution[depth].row_node = row;
            }
            if *remaining == 0 {
                break;
            }
            row = self.column_links[row].next;
        }

        self.uncover(header);
        found
    }

    fn min_size_column(&self) -> Node {
        let mut best = ROOT_NODE;
        let mut best_size = usize::MAX;

        let mut header = self.row_links[ROOT_NODE].next;
        while header != ROOT_NODE {
            if self.column_sizes[header] < best_size {
                best = header;
                best_size = self.column_sizes[header];
            }
            header = self.row_links[header].next;
        }

        debug_assert_ne!(best, ROOT_NODE, "caller ensures the header row is non-empty");
        best
    }
}
