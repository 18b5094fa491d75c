//! Sparse per-(sub-template, vertex, color set) storage of partial counts

use crate::error::{Result, SubgraphError};
use std::sync::Arc;

/// Partial counts are expectations under random coloring, hence floating point
pub type Count = f64;

/// Allocate a zero-filled row, reporting allocation failure instead of aborting
pub fn alloc_row(width: usize) -> Result<Box<[Count]>> {
    let mut row = Vec::new();
    row.try_reserve_exact(width).map_err(|e| {
        SubgraphError::Resource(format!("cannot allocate a {}-entry count row: {}", width, e))
    })?;
    row.resize(width, 0.0);
    Ok(row.into_boxed_slice())
}

/// Rows of one sub-template, `None` until a vertex is first written
#[derive(Debug, Clone, Default)]
struct SubTable {
    rows: Vec<Option<Box<[Count]>>>,
}

impl SubTable {
    fn new(num_vertices: usize) -> Result<Self> {
        let mut rows = Vec::new();
        rows.try_reserve_exact(num_vertices).map_err(|e| {
            SubgraphError::Resource(format!("cannot allocate {} row slots: {}", num_vertices, e))
        })?;
        rows.resize_with(num_vertices, || None);
        Ok(Self { rows })
    }
}

/// Three-level table `table[sub_template][vertex][color_set]`
///
/// Sub-tables are shared handles: [`DynamicTable::set_to_table`] makes one sub-template's slot
/// point at another's storage, and a write through either slot copies first. Clearing a slot
/// only drops that slot's handle.
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    num_vertices: usize,
    num_colorsets: Vec<usize>,
    subs: Vec<Option<Arc<SubTable>>>,
    current: Option<usize>,
    active: Option<usize>,
    passive: Option<usize>,
}

impl DynamicTable {
    /// `num_colorsets[s]` is the row width of sub-template `s`
    pub fn init(num_colorsets: Vec<usize>, num_vertices: usize) -> Self {
        let subs = vec![None; num_colorsets.len()];
        Self {
            num_vertices,
            num_colorsets,
            subs,
            current: None,
            active: None,
            passive: None,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_subtemplates(&self) -> usize {
        self.subs.len()
    }

    pub fn num_colorsets(&self, s: usize) -> usize {
        self.num_colorsets[s]
    }

    pub fn is_sub_init(&self, s: usize) -> bool {
        self.subs[s].is_some()
    }

    /// Allocate the (empty) row slots of `s` and make it current
    pub fn init_sub(&mut self, s: usize) -> Result<()> {
        self.subs[s] = Some(Arc::new(SubTable::new(self.num_vertices)?));
        self.current = Some(s);
        self.active = None;
        self.passive = None;
        Ok(())
    }

    /// [`init_sub`](Self::init_sub), also pinning the children read by `get_active`/`get_passive`
    pub fn init_sub_with(&mut self, s: usize, active: usize, passive: usize) -> Result<()> {
        self.init_sub(s)?;
        self.active = Some(active);
        self.passive = Some(passive);
        Ok(())
    }

    /// Point slot `s` at the storage of `source`
    pub fn set_to_table(&mut self, s: usize, source: usize) {
        self.subs[s] = self.subs[source].clone();
    }

    pub fn row(&self, s: usize, v: usize) -> Option<&[Count]> {
        self.subs[s]
            .as_ref()
            .and_then(|sub| sub.rows.get(v))
            .and_then(|row| row.as_deref())
    }

    /// Stored count, `0.0` for anything never written
    pub fn get(&self, s: usize, v: usize, c: usize) -> Count {
        self.row(s, v).map_or(0.0, |row| row[c])
    }

    pub fn get_active(&self, v: usize, c: usize) -> Count {
        self.active.map_or(0.0, |a| self.get(a, v, c))
    }

    pub fn get_passive(&self, v: usize, c: usize) -> Count {
        self.passive.map_or(0.0, |p| self.get(p, v, c))
    }

    pub fn active_row(&self, v: usize) -> Option<&[Count]> {
        self.active.and_then(|a| self.row(a, v))
    }

    fn slot_mut(&mut self, s: usize, v: usize) -> Result<&mut [Count]> {
        if self.subs[s].is_none() {
            self.subs[s] = Some(Arc::new(SubTable::new(self.num_vertices)?));
        }
        let width = self.num_colorsets[s];
        let num_vertices = self.num_vertices;
        let missing = || {
            SubgraphError::Resource(format!(
                "vertex {} outside the {}-row table of sub-template {}",
                v, num_vertices, s
            ))
        };

        let sub = self.subs[s].as_mut().map(Arc::make_mut).ok_or_else(missing)?;
        let slot = sub.rows.get_mut(v).ok_or_else(missing)?;
        if slot.is_none() {
            *slot = Some(alloc_row(width)?);
        }
        slot.as_deref_mut().ok_or_else(missing)
    }

    pub fn set(&mut self, s: usize, v: usize, c: usize, count: Count) -> Result<()> {
        self.slot_mut(s, v)?[c] = count;
        Ok(())
    }

    /// [`set`](Self::set) on the current sub-template
    pub fn set_current(&mut self, v: usize, c: usize, count: Count) -> Result<()> {
        let s = self.require_current()?;
        self.set(s, v, c, count)
    }

    /// Accumulate into the current sub-template
    pub fn update_comm(&mut self, v: usize, c: usize, delta: Count) -> Result<()> {
        let s = self.require_current()?;
        self.slot_mut(s, v)?[c] += delta;
        Ok(())
    }

    fn require_current(&self) -> Result<usize> {
        self.current
            .ok_or_else(|| SubgraphError::config("no current sub-template selected"))
    }

    /// Install rows computed elsewhere (in parallel) for every vertex of `s`
    pub fn fill_sub(&mut self, s: usize, rows: Vec<Option<Box<[Count]>>>) -> Result<()> {
        if rows.len() != self.num_vertices {
            return Err(SubgraphError::Resource(format!(
                "{} rows supplied for a {}-vertex table",
                rows.len(),
                self.num_vertices
            )));
        }
        self.subs[s] = Some(Arc::new(SubTable { rows }));
        Ok(())
    }

    /// Sum of every stored count of `s`
    pub fn sub_total(&self, s: usize) -> Count {
        self.subs[s].as_ref().map_or(0.0, |sub| {
            sub.rows
                .iter()
                .flatten()
                .map(|row| row.iter().sum::<Count>())
                .sum()
        })
    }

    /// Per-vertex sum over color sets of `s`
    pub fn vertex_totals(&self, s: usize) -> Vec<Count> {
        (0..self.num_vertices)
            .map(|v| self.row(s, v).map_or(0.0, |row| row.iter().sum()))
            .collect()
    }

    pub fn clear_sub(&mut self, s: usize) {
        self.subs[s] = None;
        if self.current == Some(s) {
            self.current = None;
        }
    }

    pub fn clear_table(&mut self) {
        for s in 0..self.subs.len() {
            self.clear_sub(s);
        }
        self.active = None;
        self.passive = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DynamicTable {
        DynamicTable::init(vec![3, 3, 4], 5)
    }

    #[test]
    fn test_unwritten_reads_zero() {
        let mut t = table();
        assert_eq!(t.get(0, 2, 1), 0.0);
        t.init_sub(1).unwrap();
        assert_eq!(t.get(1, 4, 2), 0.0);
        assert!(t.row(1, 4).is_none());
    }

    #[test]
    fn test_set_then_update_comm() {
        let mut t = table();
        t.init_sub(2).unwrap();
        t.set(2, 3, 1, 5.0).unwrap();
        t.update_comm(3, 1, 2.0).unwrap();
        assert_eq!(t.get(2, 3, 1), 7.0);
        assert_eq!(t.row(2, 3).unwrap().len(), 4);

        t.update_comm(0, 0, 1.5).unwrap();
        assert_eq!(t.get(2, 0, 0), 1.5);
        assert_eq!(t.sub_total(2), 8.5);
    }

    #[test]
    fn test_update_comm_needs_current() {
        let mut t = table();
        assert!(t.update_comm(0, 0, 1.0).is_err());
    }

    #[test]
    fn test_alias_is_shared_until_written() {
        let mut t = table();
        t.init_sub(1).unwrap();
        t.set(1, 0, 2, 1.0).unwrap();
        t.set_to_table(0, 1);
        assert_eq!(t.get(0, 0, 2), 1.0);

        // a write through the alias leaves the source untouched
        t.set(0, 0, 2, 9.0).unwrap();
        assert_eq!(t.get(1, 0, 2), 1.0);

        t.clear_sub(1);
        assert_eq!(t.get(0, 0, 2), 9.0);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut t = table();
        t.init_sub_with(0, 1, 2).unwrap();
        t.set(1, 1, 0, 3.0).unwrap();
        assert_eq!(t.get_active(1, 0), 3.0);
        assert_eq!(t.get_passive(1, 0), 0.0);

        t.clear_sub(1);
        t.clear_sub(1);
        assert!(!t.is_sub_init(1));
        t.clear_table();
        t.clear_table();
        assert!((0..3).all(|s| !t.is_sub_init(s)));
    }

    #[test]
    fn test_fill_sub_checks_length() {
        let mut t = table();
        assert!(t.fill_sub(0, vec![None; 2]).is_err());
        let mut rows = vec![None; 5];
        rows[4] = Some(vec![1.0, 2.0, 3.0].into_boxed_slice());
        t.fill_sub(0, rows).unwrap();
        assert_eq!(t.vertex_totals(0), vec![0.0, 0.0, 0.0, 0.0, 6.0]);
    }
}
