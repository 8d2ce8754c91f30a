//! Small fixed graphs used by the binary and the tests.

use crate::engine::*;
use crate::nn::Neuron;
use color_eyre::Result;

/// `L = (a*b + c) * f`, every node labelled.
pub struct Expression {
    pub graph: Graph,
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub e: NodeId,
    pub d: NodeId,
    pub f: NodeId,
    pub l: NodeId,
}

pub fn expression(a: ValueType, b: ValueType, c: ValueType, f: ValueType) -> Expression {
    let mut graph = Graph::new();
    let a = graph.leaf_labeled(a, "a");
    let b = graph.leaf_labeled(b, "b");
    let c = graph.leaf_labeled(c, "c");
    let e = graph.mul(a, b);
    graph.set_label(e, "e");
    let d = graph.add(e, c);
    graph.set_label(d, "d");
    let f = graph.leaf_labeled(f, "f");
    let l = graph.mul(d, f);
    graph.set_label(l, "L");

    Expression {
        graph,
        a,
        b,
        c,
        e,
        d,
        f,
        l,
    }
}

pub struct NeuronDemo {
    pub graph: Graph,
    pub neuron: Neuron,
    pub inputs: Vec<NodeId>,
    pub output: NodeId,
}

/// A zero-weight neuron fed with inputs labelled `x0`, `x1`, ...; output labelled `o`.
pub fn neuron(inputs: &[ValueType], bias: ValueType) -> Result<NeuronDemo> {
    let mut graph = Graph::new();
    let inputs = inputs
        .iter()
        .enumerate()
        .map(|(i, &x)| graph.leaf_labeled(x, format!("x{}", i)))
        .collect::<Vec<_>>();
    let neuron = Neuron::new(&mut graph, inputs.len(), bias);
    let output = neuron.forward(&mut graph, &inputs)?;
    graph.set_label(output, "o");

    Ok(NeuronDemo {
        graph,
        neuron,
        inputs,
        output,
    })
}
