use crate::engine::*;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use itertools::Itertools;
use log::debug;
use std::path::Path;

/// Renders the subgraph reachable from `root` as a Graphviz digraph.
///
/// Every node gets a record box with its label, data and grad; every
/// non-leaf additionally gets an op node sitting between its operands and
/// itself. Edges follow the data flow, operand towards consumer.
pub fn render_dot(graph: &Graph, root: NodeId) -> String {
    // consumers first, root on top
    let node_ids = graph.topological_order(root).into_iter().rev().collect_vec();

    let mut nodes_str = String::new();
    let mut edges_str = String::new();
    for &node_id in &node_ids {
        let node = graph.node(node_id);
        let id_str = dot_id(node_id);
        nodes_str += &format!(
            "        {} [label=\"{}|data:{:.4}|grad:{:.4}\", shape=\"record\"];\n",
            id_str,
            escape_record(node.label()),
            node.value(),
            node.gradient(),
        );
        if let Some(op_name) = node.op().symbol() {
            nodes_str += &format!("        {}_Op [label=\"{}\"];\n", id_str, op_name);
        }
    }

    for &node_id in &node_ids {
        let node = graph.node(node_id);
        let id_str = dot_id(node_id);
        let target = match node.op().symbol() {
            Some(_) => format!("{}_Op", id_str),
            None => id_str.clone(),
        };

        for &operand in node.operands().iter().unique() {
            edges_str += &format!("        {} -> {}\n", dot_id(operand), target);
        }
        if node.op().symbol().is_some() {
            edges_str += &format!("        {}_Op -> {}\n", id_str, id_str);
        }
        if !node.is_leaf() {
            edges_str += "\n";
        }
    }

    format!(
        "digraph G {{\n        rankdir=LR;\n{}\n{}}}\n",
        nodes_str, edges_str
    )
}

pub fn write_dot(graph: &Graph, root: NodeId, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dot = render_dot(graph, root);
    std::fs::write(path, dot)
        .wrap_err_with(|| format!("could not write graph to {}", path.display()))?;
    debug!("wrote graph of node {} to {}", root, path.display());
    Ok(())
}

fn dot_id(id: NodeId) -> String {
    format!("Node{}", id)
}

fn escape_record(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        if matches!(c, '"' | '{' | '}' | '<' | '>' | '|' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
