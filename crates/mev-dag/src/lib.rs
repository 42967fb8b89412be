//! Operation/data-resource dependency graphs.
//!
//! A [`SimpleDag`] owns every [`DagNode`] in an arena keyed by `(id, type)`.
//! Parent links are stored as keys, nodes are created idempotently with
//! [`SimpleDag::get_or_create_node`], and edges that would close a cycle are
//! rejected.
//!
//! # Example
//! ```
//! use mev_dag::{DagNodeType, SimpleDag};
//!
//! let mut dag = SimpleDag::new();
//! let r1 = dag
//!     .get_or_create_node("r1", DagNodeType::DataResource, None, None)
//!     .key()
//!     .clone();
//! let o1 = dag
//!     .get_or_create_node("o1", DagNodeType::Operation, Some("Align"), None)
//!     .key()
//!     .clone();
//! dag.add_parent(&o1, &r1).unwrap();
//! assert_eq!(dag.serialize().len(), 2);
//! ```

pub mod graph;

pub use graph::{DagEdge, DagNode, DagNodeType, NodeKey, NodeSpec, SerializedNode, SimpleDag};
