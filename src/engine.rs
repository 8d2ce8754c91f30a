use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use itertools::Itertools;
use log::{debug, trace};
use std::collections::HashSet;

pub type ValueType = f64;

/// Stable handle to a node inside the [`Graph`] that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation that produced a node, carrying the constants its derivative needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Leaf,
    Add,
    AddScalar(ValueType),
    Mul,
    MulScalar(ValueType),
    /// `base` is the operand value at construction time.
    Pow {
        exponent: ValueType,
        base: ValueType,
    },
    Tanh,
    Exp,
}

impl Op {
    /// Number of graph operands the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            Op::Leaf => 0,
            Op::Add | Op::Mul => 2,
            Op::AddScalar(_) | Op::MulScalar(_) | Op::Pow { .. } | Op::Tanh | Op::Exp => 1,
        }
    }

    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Op::Leaf => None,
            Op::Add | Op::AddScalar(_) => Some("+"),
            Op::Mul | Op::MulScalar(_) => Some("*"),
            Op::Pow { .. } => Some("pow"),
            Op::Tanh => Some("tanh"),
            Op::Exp => Some("exp"),
        }
    }
}

/// Gradient contributions of a node to each of its operands, in operand order.
///
/// `operand_values` must line up with the operands the node was built from.
pub fn local_gradient(
    op: Op,
    operand_values: &[ValueType],
    out_value: ValueType,
    out_grad: ValueType,
) -> Result<Vec<ValueType>> {
    let expected = op.arity();
    if operand_values.len() < expected {
        bail!(
            "corrupt graph: {:?} node missing required operand (expected {}, found {})",
            op,
            expected,
            operand_values.len()
        );
    }
    if operand_values.len() > expected {
        bail!(
            "corrupt graph: {:?} node has unexpected operands (expected {}, found {})",
            op,
            expected,
            operand_values.len()
        );
    }

    let contributions = match op {
        Op::Leaf => vec![],
        Op::Add => vec![out_grad, out_grad],
        Op::AddScalar(_) => vec![out_grad],
        Op::Mul => vec![operand_values[1] * out_grad, operand_values[0] * out_grad],
        Op::MulScalar(factor) => vec![factor * out_grad],
        Op::Pow { exponent, base } => vec![exponent * base.powf(exponent - 1.) * out_grad],
        Op::Tanh => vec![(1. - out_value * out_value) * out_grad],
        Op::Exp => vec![out_value * out_grad],
    };

    Ok(contributions)
}

#[derive(Clone, Debug)]
pub struct Node {
    value: ValueType,
    gradient: ValueType,
    operands: Vec<NodeId>,
    op: Op,
    label: String,
}

impl Node {
    pub fn value(&self) -> ValueType {
        self.value
    }

    pub fn gradient(&self) -> ValueType {
        self.gradient
    }

    pub fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_leaf(&self) -> bool {
        self.operands.is_empty()
    }
}

/// How [`Graph::backpropagate_with`] orders the backward pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Traversal {
    /// Each node runs its rule once, after every consumer has contributed.
    #[default]
    Topological,
    /// Pre-order descent along every path, one rule invocation per path.
    ///
    /// Matches the topological order on trees. When a shared node is reached
    /// through paths of different lengths its operands receive its rule once
    /// per path, with whatever partial gradient it held at the time.
    Recursive,
}

/// Append-only arena owning every node of a computation.
///
/// Operands always have a smaller id than their consumers, so the graph is
/// acyclic by construction.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id.0).unwrap_or_else(|| {
            panic!(
                "node {} is not part of this graph ({} nodes)",
                id,
                self.nodes.len()
            )
        })
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        let len = self.nodes.len();
        self.nodes
            .get_mut(id.0)
            .unwrap_or_else(|| panic!("node {} is not part of this graph ({} nodes)", id, len))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn value(&self, id: NodeId) -> ValueType {
        self.node(id).value
    }

    pub fn gradient(&self, id: NodeId) -> ValueType {
        self.node(id).gradient
    }

    pub fn operands(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).operands
    }

    pub fn op(&self, id: NodeId) -> Op {
        self.node(id).op
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.node(id).label
    }

    /// Overrides a node's value. Consumers are not recomputed.
    pub fn set_value(&mut self, id: NodeId, value: ValueType) {
        self.node_mut(id).value = value;
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) {
        self.node_mut(id).label = label.into();
    }

    pub fn zero_grad(&mut self, id: NodeId) {
        self.node_mut(id).gradient = Default::default();
    }

    pub fn leaf(&mut self, value: ValueType) -> NodeId {
        self.push(value, vec![], Op::Leaf, String::new())
    }

    pub fn leaf_labeled(&mut self, value: ValueType, label: impl Into<String>) -> NodeId {
        self.push(value, vec![], Op::Leaf, label.into())
    }

    fn push(&mut self, value: ValueType, operands: Vec<NodeId>, op: Op, label: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            gradient: 0.,
            operands,
            op,
            label,
        });
        id
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let value = self.value(a) + self.value(b);
        let label = format!("{}+{}", self.label(a), self.label(b));
        self.push(value, vec![a, b], Op::Add, label)
    }

    pub fn add_scalar(&mut self, a: NodeId, rhs: ValueType) -> NodeId {
        let value = self.value(a) + rhs;
        let label = format!("{}+{}", self.label(a), rhs);
        self.push(value, vec![a], Op::AddScalar(rhs), label)
    }

    pub fn mul(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let value = self.value(a) * self.value(b);
        let label = format!("{}*{}", self.label(a), self.label(b));
        self.push(value, vec![a, b], Op::Mul, label)
    }

    pub fn mul_scalar(&mut self, a: NodeId, rhs: ValueType) -> NodeId {
        let value = self.value(a) * rhs;
        let label = format!("{}*{}", self.label(a), rhs);
        self.push(value, vec![a], Op::MulScalar(rhs), label)
    }

    pub fn pow(&mut self, a: NodeId, exponent: ValueType) -> NodeId {
        let base = self.value(a);
        let label = format!("pow({},{})", self.label(a), exponent);
        self.push(
            base.powf(exponent),
            vec![a],
            Op::Pow { exponent, base },
            label,
        )
    }

    pub fn tanh(&mut self, a: NodeId) -> NodeId {
        let value = self.value(a).tanh();
        let label = format!("tanh({})", self.label(a));
        self.push(value, vec![a], Op::Tanh, label)
    }

    pub fn exp(&mut self, a: NodeId) -> NodeId {
        let value = self.value(a).exp();
        let label = format!("exp({})", self.label(a));
        self.push(value, vec![a], Op::Exp, label)
    }

    pub fn neg(&mut self, a: NodeId) -> NodeId {
        self.mul_scalar(a, -1.)
    }

    pub fn sub(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let neg_b = self.neg(b);
        self.add(a, neg_b)
    }

    pub fn div(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let inv_b = self.pow(b, -1.);
        self.mul(a, inv_b)
    }

    /// Nodes reachable from `root`, every operand listed before its consumers.
    pub fn topological_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut topo = vec![];
        let mut visited = HashSet::<NodeId>::new();
        let mut stack = vec![(root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                topo.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            for &operand in self.node(id).operands.iter().rev() {
                if !visited.contains(&operand) {
                    stack.push((operand, false));
                }
            }
        }

        topo
    }

    /// Sets the gradient of every node reachable from `root` to ∂root/∂node.
    pub fn backpropagate(&mut self, root: NodeId) -> Result<()> {
        self.backpropagate_with(root, Traversal::default())
    }

    pub fn backpropagate_with(&mut self, root: NodeId, traversal: Traversal) -> Result<()> {
        debug!("backpropagating from node {} ({:?})", root, traversal);
        match traversal {
            Traversal::Topological => {
                let topo = self.topological_order(root);
                for &id in &topo {
                    self.node_mut(id).gradient = 0.;
                }
                self.node_mut(root).gradient = 1.;
                for &id in topo.iter().rev() {
                    self.propagate(id)?;
                }
                debug!("backward pass visited {} nodes", topo.len());
            }
            Traversal::Recursive => {
                self.reset_recursive(root);
                self.node_mut(root).gradient = 1.;
                self.backward_recursive(root)?;
            }
        }
        Ok(())
    }

    /// Zeroes every node once per path reaching it, in pre-order.
    fn reset_recursive(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            self.node_mut(id).gradient = 0.;
            stack.extend(self.node(id).operands.iter().rev());
        }
    }

    /// Runs each node's rule once per path reaching it, in pre-order.
    fn backward_recursive(&mut self, root: NodeId) -> Result<()> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            self.propagate(id)?;
            stack.extend(self.node(id).operands.iter().rev());
        }
        Ok(())
    }

    /// Pushes a node's gradient onto its operands.
    fn propagate(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id);
        let operand_values = node.operands.iter().map(|&o| self.value(o)).collect_vec();
        let contributions = local_gradient(node.op, &operand_values, node.value, node.gradient)
            .wrap_err_with(|| format!("backward rule of node {} ({:?}) failed", id, node.label))?;
        trace!("node {} grad={} -> {:?}", id, node.gradient, contributions);

        let operands = node.operands.clone();
        for (operand, delta) in operands.into_iter().zip_eq(contributions) {
            self.node_mut(operand).gradient += delta;
        }
        Ok(())
    }

    pub fn display(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { graph: self, id }
    }
}

/// Renders a node as `Value(label|data|op|operand labels)`.
pub struct NodeDisplay<'a> {
    graph: &'a Graph,
    id: NodeId,
}

impl std::fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let node = self.graph.node(self.id);
        fmt.write_fmt(format_args!("Value({}|{:.5}", node.label, node.value))?;
        if let Some(symbol) = node.op.symbol() {
            fmt.write_fmt(format_args!("|{}", symbol))?;
        }
        if !node.operands.is_empty() {
            let operands = node
                .operands
                .iter()
                .map(|&o| self.graph.label(o))
                .join(" ");
            fmt.write_fmt(format_args!("|{}", operands))?;
        }
        fmt.write_str(")")
    }
}
