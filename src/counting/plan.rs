//! Everything about a template that is fixed for a whole run

use crate::combinatorics::colorful_probability;
use crate::counting::colorsets::ColorSetIndex;
use crate::counting::table::{Count, DynamicTable};
use crate::error::Result;
use crate::graph::Graph;
use crate::template::{count_automorphisms, Partitioner};

/// Template, its partition tree, the color-set index tables and the normalisation constants
///
/// Built once and shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct TemplatePlan {
    template: Graph,
    partitioner: Partitioner,
    colorsets: ColorSetIndex,
    num_colors: usize,
    automorphisms: u64,
}

impl TemplatePlan {
    pub fn new(template: &Graph, num_colors: usize) -> Result<Self> {
        let partitioner = Partitioner::new(template)?;
        let colorsets = ColorSetIndex::build(&partitioner, num_colors)?;
        let automorphisms = count_automorphisms(template);

        log::info!(
            "Template plan ready: {} vertices, {} colors, {} automorphisms",
            template.num_vertices(),
            num_colors,
            automorphisms
        );

        Ok(Self {
            template: template.clone(),
            partitioner,
            colorsets,
            num_colors,
            automorphisms,
        })
    }

    pub fn template(&self) -> &Graph {
        &self.template
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    pub fn colorsets(&self) -> &ColorSetIndex {
        &self.colorsets
    }

    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    pub fn template_size(&self) -> usize {
        self.template.num_vertices()
    }

    pub fn automorphisms(&self) -> u64 {
        self.automorphisms
    }

    pub fn subtemplate_count(&self) -> usize {
        self.partitioner.subtemplate_count()
    }

    /// Probability that a fixed template embedding is colorful
    pub fn colorful_probability(&self) -> f64 {
        colorful_probability(self.num_colors, self.template_size())
    }

    /// Scale a raw root total into an estimated number of template copies
    pub fn normalize(&self, raw_total: Count, divide_automorphisms: bool) -> Count {
        let mut estimate = raw_total / self.colorful_probability();
        if divide_automorphisms {
            estimate /= self.automorphisms as f64;
        }
        estimate
    }

    /// An empty table sized for `num_vertices` rows of every sub-template
    pub fn new_table(&self, num_vertices: usize) -> DynamicTable {
        let widths = (0..self.subtemplate_count())
            .map(|s| self.colorsets.num_colorsets(s))
            .collect();
        DynamicTable::init(widths, num_vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Graph::from_edges(3, 2, &[0, 1], &[1, 2]).unwrap();
        let plan = TemplatePlan::new(&path, 3).unwrap();
        // 3! / 3^3
        assert!((plan.colorful_probability() - 6.0 / 27.0).abs() < 1e-12);
        assert!((plan.normalize(4.0, true) - 4.0 * 27.0 / 6.0 / 2.0).abs() < 1e-9);
        assert!((plan.normalize(4.0, false) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_widths() {
        let path = Graph::from_edges(3, 2, &[0, 1], &[1, 2]).unwrap();
        let plan = TemplatePlan::new(&path, 4).unwrap();
        let table = plan.new_table(10);
        assert_eq!(table.num_subtemplates(), 5);
        assert_eq!(table.num_colorsets(0), 4);
        assert_eq!(table.num_vertices(), 10);
    }
}
