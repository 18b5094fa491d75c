//! Column-block access to numeric tables
//!
//! Edge lists and mapper assignments can arrive as plain numeric tables instead of files.
//! Only the block contract is needed: read columns `[start, start + len)` for every row, and
//! write such a block back.

use crate::distributed::MapperAssignment;
use crate::error::{Result, SubgraphError};
use crate::graph::Graph;
use ndarray::{s, Array2};

pub trait NumericTable {
    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    /// Copy of columns `[start, start + len)` for rows `[0, num_rows)`
    fn block_of_columns(&self, start: usize, len: usize) -> Result<Array2<f64>>;

    /// Overwrite columns `[start, start + block.ncols())`
    fn write_columns(&mut self, start: usize, block: &Array2<f64>) -> Result<()>;
}

/// In-memory table with a single element type
#[derive(Debug, Clone, PartialEq)]
pub struct HomogenTable {
    data: Array2<f64>,
}

impl HomogenTable {
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self::new(Array2::zeros((rows, columns)))
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    fn check_range(&self, start: usize, len: usize) -> Result<()> {
        if start + len > self.data.ncols() {
            return Err(SubgraphError::config(format!(
                "columns {}..{} outside a {}-column table",
                start,
                start + len,
                self.data.ncols()
            )));
        }
        Ok(())
    }
}

impl NumericTable for HomogenTable {
    fn num_rows(&self) -> usize {
        self.data.nrows()
    }

    fn num_columns(&self) -> usize {
        self.data.ncols()
    }

    fn block_of_columns(&self, start: usize, len: usize) -> Result<Array2<f64>> {
        self.check_range(start, len)?;
        Ok(self.data.slice(s![.., start..start + len]).to_owned())
    }

    fn write_columns(&mut self, start: usize, block: &Array2<f64>) -> Result<()> {
        self.check_range(start, block.ncols())?;
        if block.nrows() != self.data.nrows() {
            return Err(SubgraphError::config(format!(
                "block has {} rows, table has {}",
                block.nrows(),
                self.data.nrows()
            )));
        }
        self.data
            .slice_mut(s![.., start..start + block.ncols()])
            .assign(block);
        Ok(())
    }
}

fn as_id(value: f64) -> Result<u32> {
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(SubgraphError::config(format!("{} is not a vertex id", value)));
    }
    Ok(value as u32)
}

/// Build a graph from a two-column `src, dst` edge table
///
/// The vertex count is one past the largest id.
pub fn graph_from_table(table: &dyn NumericTable) -> Result<Graph> {
    if table.num_rows() == 0 {
        return Err(SubgraphError::config("edge table is empty"));
    }
    let block = table.block_of_columns(0, 2)?;
    let src = block.column(0).iter().map(|&x| as_id(x)).collect::<Result<Vec<_>>>()?;
    let dst = block.column(1).iter().map(|&x| as_id(x)).collect::<Result<Vec<_>>>()?;
    let vertex_count = src.iter().chain(&dst).max().map_or(0, |&m| m as usize + 1);
    Graph::from_edges(vertex_count, src.len(), &src, &dst)
}

/// Mapper owner per global id, read from one column indexed by global id
pub fn assignment_from_table(
    table: &dyn NumericTable,
    column: usize,
    mapper_num: usize,
) -> Result<MapperAssignment> {
    let block = table.block_of_columns(column, 1)?;
    let owners = block.column(0).iter().map(|&x| as_id(x)).collect::<Result<Vec<_>>>()?;
    MapperAssignment::from_table(owners, mapper_num)
}

/// Write each vertex's local index into `column`, at the row of its global id
pub fn export_vertex_ids(graph: &Graph, table: &mut dyn NumericTable, column: usize) -> Result<()> {
    let mut block = table.block_of_columns(column, 1)?;
    for (local, &global) in graph.vertex_ids().iter().enumerate() {
        let row = global as usize;
        if row >= block.nrows() {
            return Err(SubgraphError::config(format!(
                "vertex {} has no row in a {}-row table",
                global,
                block.nrows()
            )));
        }
        block[[row, 0]] = local as f64;
    }
    table.write_columns(column, &block)
}
