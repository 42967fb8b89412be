//! CLI binary for validating attributes, element sets, operations, and DAGs.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::Value;

use mev_attributes::{
    resolve, AttributeOptions, ElementKind, ElementSet, FeatureKind, ObservationKind, Operation,
};
use mev_dag::{DagEdge, SimpleDag};

#[derive(Parser)]
#[command(
    name = "mev",
    version,
    about = "Validate MEV metadata, operation specs, and pipeline graphs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (overridden by MEV_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a single attribute value and print its wire form
    Attribute {
        /// Attribute type tag, e.g. BoundedInteger
        #[arg(short = 't', long = "type")]
        attribute_type: String,

        /// Value as JSON; text that is not valid JSON is taken as a string
        #[arg(long)]
        value: String,

        /// Lower bound (JSON number)
        #[arg(long, allow_hyphen_values = true)]
        min: Option<String>,

        /// Upper bound (JSON number)
        #[arg(long, allow_hyphen_values = true)]
        max: Option<String>,

        /// Allowed values for OptionString, comma separated
        #[arg(long, value_delimiter = ',')]
        options: Option<Vec<String>>,

        /// Whether a data resource takes a list of identifiers
        #[arg(long)]
        many: Option<bool>,

        /// Accept null as the value
        #[arg(long)]
        allow_null: bool,
    },

    /// Validate an element set file ({"elements": [...]})
    Elements {
        /// Path to the element set JSON file
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = SetKind::Observation)]
        kind: SetKind,
    },

    /// Combine two element set files
    SetOp {
        #[arg(value_enum)]
        op: SetOperation,

        left: PathBuf,

        right: PathBuf,

        #[arg(short, long, value_enum, default_value_t = SetKind::Observation)]
        kind: SetKind,
    },

    /// Validate an operation descriptor, and optionally a set of submitted inputs
    Operation {
        /// Path to the operation JSON file
        file: PathBuf,

        /// Path to a JSON object of submitted input values
        #[arg(short, long)]
        inputs: Option<PathBuf>,
    },

    /// Build a DAG from an edge list file and print its serialization
    Dag {
        /// Path to {"edges": [{"parent": {...}, "child": {...}}]}
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SetKind {
    Observation,
    Feature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SetOperation {
    Union,
    Intersection,
    Difference,
}

#[derive(Deserialize)]
struct EdgeList {
    edges: Vec<DagEdge>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = std::env::var("MEV_LOG").unwrap_or_else(|_| default_filter.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let output = match cli.command {
        Commands::Attribute {
            attribute_type,
            value,
            min,
            max,
            options,
            many,
            allow_null,
        } => {
            let opts = AttributeOptions {
                min: min.as_deref().map(parse_inline),
                max: max.as_deref().map(parse_inline),
                options: options.map(|o| Value::Array(o.into_iter().map(Value::String).collect())),
                many: many.map(Value::Bool),
            };
            cmd_attribute(&attribute_type, &value, &opts, allow_null)?
        }
        Commands::Elements { file, kind } => match kind {
            SetKind::Observation => cmd_elements::<ObservationKind>(&file)?,
            SetKind::Feature => cmd_elements::<FeatureKind>(&file)?,
        },
        Commands::SetOp {
            op,
            left,
            right,
            kind,
        } => match kind {
            SetKind::Observation => cmd_set_op::<ObservationKind>(op, &left, &right)?,
            SetKind::Feature => cmd_set_op::<FeatureKind>(op, &left, &right)?,
        },
        Commands::Operation { file, inputs } => cmd_operation(&file, inputs.as_deref())?,
        Commands::Dag { file } => cmd_dag(&file)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Parses `text` as JSON, falling back to a JSON string.
fn parse_inline(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&source)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(value)
}

fn cmd_attribute(
    typename: &str,
    raw: &str,
    options: &AttributeOptions,
    allow_null: bool,
) -> anyhow::Result<Value> {
    let attribute = resolve(typename, &parse_inline(raw), options, allow_null)?;
    tracing::info!(attribute_type = typename, "Attribute is valid");
    Ok(attribute.to_json())
}

fn load_set<K: ElementKind>(path: &Path) -> anyhow::Result<ElementSet<K>> {
    let raw = read_json(path)?;
    let set = ElementSet::<K>::from_json(&raw)
        .with_context(|| format!("invalid {} in {}", K::SET_TYPENAME, path.display()))?;
    Ok(set)
}

fn cmd_elements<K: ElementKind>(path: &Path) -> anyhow::Result<Value> {
    let set = load_set::<K>(path)?;
    tracing::info!(set = K::SET_TYPENAME, size = set.len(), "Element set is valid");
    Ok(set.to_json())
}

fn cmd_set_op<K: ElementKind>(
    op: SetOperation,
    left: &Path,
    right: &Path,
) -> anyhow::Result<Value> {
    let left = load_set::<K>(left)?;
    let right = load_set::<K>(right)?;
    let result = match op {
        SetOperation::Union => left.union(&right),
        SetOperation::Intersection => left.intersection(&right),
        SetOperation::Difference => left.difference(&right),
    };
    tracing::info!(op = ?op, size = result.len(), "Set operation complete");
    Ok(result.to_json())
}

fn cmd_operation(path: &Path, inputs: Option<&Path>) -> anyhow::Result<Value> {
    let operation = Operation::from_json(&read_json(path)?)
        .with_context(|| format!("invalid operation in {}", path.display()))?;
    tracing::info!(
        operation = %operation.name,
        inputs = operation.inputs.len(),
        outputs = operation.outputs.len(),
        "Operation is valid"
    );

    let Some(inputs_path) = inputs else {
        return Ok(operation.to_json());
    };
    let submitted = read_json(inputs_path)?;
    let submitted = submitted
        .as_object()
        .with_context(|| format!("{} must contain a JSON object", inputs_path.display()))?;
    let validated = operation.validate_inputs(submitted)?;
    Ok(Value::Object(
        validated
            .into_iter()
            .map(|(key, attr)| (key, attr.to_json()))
            .collect(),
    ))
}

fn cmd_dag(path: &Path) -> anyhow::Result<Value> {
    let edges: EdgeList = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("{} is not an edge list", path.display()))?;
    let dag = SimpleDag::from_edges(&edges.edges)?;
    tracing::info!(nodes = dag.len(), "DAG built");
    Ok(dag.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_json(dir: &tempfile::TempDir, name: &str, value: &Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn cli_parses_attribute_flags() {
        let cli = Cli::try_parse_from([
            "mev", "attribute", "--type", "BoundedInteger", "--value", "4", "--min", "-1",
            "--max", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Attribute { min, max, .. } => {
                assert_eq!(min.as_deref(), Some("-1"));
                assert_eq!(max.as_deref(), Some("10"));
            }
            _ => panic!("expected attribute command"),
        }
    }

    #[test]
    fn parse_inline_falls_back_to_string() {
        assert_eq!(parse_inline("3"), json!(3));
        assert_eq!(parse_inline("[1, 2]"), json!([1, 2]));
        assert_eq!(parse_inline("sample A"), json!("sample A"));
    }

    #[test]
    fn attribute_command_reports_bounds_error() {
        let opts = AttributeOptions::bounded(0, 3);
        let err = cmd_attribute("BoundedInteger", "7", &opts, false).unwrap_err();
        assert!(err.to_string().contains("not within the bounds"));
        let ok = cmd_attribute("BoundedInteger", "2", &opts, false).unwrap();
        assert_eq!(ok, json!({"attribute_type": "BoundedInteger", "value": 2}));
    }

    #[test]
    fn set_op_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let left = json!({"elements": [{"id": "id1"}, {"id": "id2"}]});
        let right = json!({"elements": [{"id": "id2"}, {"id": "id3"}]});
        let left = write_json(&dir, "a.json", &left);
        let right = write_json(&dir, "b.json", &right);
        let out = cmd_set_op::<FeatureKind>(SetOperation::Difference, &left, &right).unwrap();
        assert_eq!(out, json!({"elements": [{"id": "id1", "attributes": {}}]}));
    }

    #[test]
    fn set_op_output_is_a_valid_elements_file() {
        let dir = tempfile::tempdir().unwrap();
        let left = json!({"elements": [{"id": "s1", "attributes": {
            "score": {"attribute_type": "BoundedFloat", "value": 0.5, "min": 0, "max": 1}
        }}]});
        let right = json!({"elements": [{"id": "s2", "attributes": {
            "group": {"attribute_type": "OptionString", "value": "b", "options": ["a", "b"]}
        }}]});
        let left = write_json(&dir, "left.json", &left);
        let right = write_json(&dir, "right.json", &right);
        let merged = cmd_set_op::<ObservationKind>(SetOperation::Union, &left, &right).unwrap();

        let merged_path = write_json(&dir, "merged.json", &merged);
        let reread = cmd_elements::<ObservationKind>(&merged_path).unwrap();
        assert_eq!(reread, merged);
    }

    #[test]
    fn elements_command_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(&dir, "dup.json", &json!({"elements": [{"id": "x"}, {"id": "x"}]}));
        let err = cmd_elements::<ObservationKind>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate"));
    }

    #[test]
    fn dag_command_serializes_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(
            &dir,
            "edges.json",
            &json!({"edges": [
                {"parent": {"id": "o1", "node_type": "op_node"},
                 "child": {"id": "o2", "node_type": "op_node"}}
            ]}),
        );
        let out = cmd_dag(&path).unwrap();
        let nodes = out.as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        let o2 = nodes.iter().find(|n| n["id"] == "o2").unwrap();
        assert_eq!(o2["parentIds"], json!(["o1"]));
    }

    #[test]
    fn operation_command_validates_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let op = write_json(
            &dir,
            "op.json",
            &json!({
                "id": "op-1",
                "name": "Clustering",
                "description": "k-means",
                "mode": "local_docker",
                "inputs": {
                    "k": {
                        "description": "Number of clusters",
                        "name": "k",
                        "required": false,
                        "converter": "IntegerConverter",
                        "spec": {"attribute_type": "PositiveInteger", "default": 3}
                    }
                },
                "outputs": {}
            }),
        );
        let inputs = write_json(&dir, "inputs.json", &json!({}));
        let out = cmd_operation(&op, Some(&inputs)).unwrap();
        assert_eq!(out, json!({"k": {"attribute_type": "PositiveInteger", "value": 3}}));

        let missing = dir.path().join("nope.json");
        assert!(cmd_operation(&missing, None).is_err());
    }
}
