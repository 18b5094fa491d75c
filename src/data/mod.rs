//! Input ingestion: text files and numeric tables

pub mod loader;
pub mod table;

pub use loader::{
    read_adjacency_files, read_assignment_file, read_edge_list_graph, read_template,
};
pub use table::{assignment_from_table, export_vertex_ids, graph_from_table, HomogenTable, NumericTable};
