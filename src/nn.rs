use crate::engine::*;
use color_eyre::eyre::ensure;
use color_eyre::Result;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::iter::zip;

pub trait Module {
    fn zero_grad(&self, graph: &mut Graph) {
        self.parameters()
            .into_iter()
            .for_each(|p| graph.zero_grad(p))
    }

    fn parameters(&self) -> Vec<NodeId>;
}

/// Fixed-arity neuron computing `tanh(b + Σ wᵢ·xᵢ)`.
pub struct Neuron {
    w: Vec<NodeId>,
    b: NodeId,
}

impl Neuron {
    /// Zero weights and the given bias.
    pub fn new(graph: &mut Graph, nin: usize, bias: ValueType) -> Self {
        let w = (0..nin)
            .map(|i| graph.leaf_labeled(0., format!("w[{}]", i)))
            .collect();
        let b = graph.leaf_labeled(bias, "bias");
        Self { w, b }
    }

    /// Weights drawn uniformly from `[-1, 1)` and a zero bias.
    pub fn random(graph: &mut Graph, rng: &mut StdRng, nin: usize) -> Self {
        let w = (0..nin)
            .map(|i| {
                let weight = rng.gen_range(-1.0..1.0);
                graph.leaf_labeled(weight, format!("w[{}]", i))
            })
            .collect();
        let b = graph.leaf_labeled(Default::default(), "bias");
        Self { w, b }
    }

    pub fn weights(&self) -> &[NodeId] {
        &self.w
    }

    pub fn bias(&self) -> NodeId {
        self.b
    }

    pub fn forward(&self, graph: &mut Graph, x: &[NodeId]) -> Result<NodeId> {
        ensure!(
            x.len() == self.w.len(),
            "mismatched input dimensions: neuron takes {} inputs, got {}",
            self.w.len(),
            x.len()
        );

        let mut sum = self.b;
        for (i, (&wi, &xi)) in zip(&self.w, x).enumerate() {
            let product = graph.mul(wi, xi);
            graph.set_label(product, format!("products[{}]", i));
            sum = graph.add(product, sum);
            graph.set_label(sum, format!("sums[{}]", i));
        }

        Ok(graph.tanh(sum))
    }
}

impl Module for Neuron {
    fn parameters(&self) -> Vec<NodeId> {
        let mut params = self.w.clone();
        params.push(self.b);

        params
    }
}

impl std::fmt::Display for Neuron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("TanhNeuron({})", self.w.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;

    #[test]
    fn forward_chains_products_onto_bias() {
        let mut g = Graph::new();
        let n = Neuron::new(&mut g, 2, 0.5);
        g.set_value(n.weights()[0], 2.0);
        g.set_value(n.weights()[1], -1.0);
        let x0 = g.leaf_labeled(1.0, "x0");
        let x1 = g.leaf_labeled(3.0, "x1");

        let out = n.forward(&mut g, &[x0, x1]).unwrap();
        let sum = g.operands(out)[0];

        assert_eq!(g.label(sum), "sums[1]");
        assert_float_eq!(g.value(sum), -0.5, abs <= 1e-10);
        assert_float_eq!(g.value(out), (-0.5f64).tanh(), abs <= 1e-10);
        assert_eq!(g.op(out), Op::Tanh);
    }

    #[test]
    fn rejects_wrong_input_count() {
        let mut g = Graph::new();
        let n = Neuron::new(&mut g, 2, 0.);
        let x0 = g.leaf(1.0);

        assert!(n.forward(&mut g, &[x0]).is_err());
    }

    #[test]
    fn zero_grad_clears_parameters() {
        let mut g = Graph::new();
        let mut rng = StdRng::seed_from_u64(42);
        let n = Neuron::random(&mut g, &mut rng, 3);
        let x = (0..3).map(|i| g.leaf(i as f64)).collect::<Vec<_>>();
        let out = n.forward(&mut g, &x).unwrap();
        g.backpropagate(out).unwrap();

        assert_float_eq!(g.gradient(n.bias()), 1. - g.value(out).powi(2), abs <= 1e-10);

        n.zero_grad(&mut g);
        for p in n.parameters() {
            assert_float_eq!(g.gradient(p), 0., abs <= 1e-10);
        }
    }

    #[test]
    fn random_weights_in_range() {
        let mut g = Graph::new();
        let mut rng = StdRng::seed_from_u64(7);
        let n = Neuron::random(&mut g, &mut rng, 16);

        assert_eq!(n.parameters().len(), 17);
        assert!(n
            .weights()
            .iter()
            .all(|&w| (-1.0..1.0).contains(&g.value(w))));
        assert_eq!(n.to_string(), "TanhNeuron(16)");
    }
}
