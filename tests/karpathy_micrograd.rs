extern crate scalargrad;

use float_eq::*;
use scalargrad::engine::*;

struct Inputs {
    x1: NodeId,
    x2: NodeId,
    w1: NodeId,
    w2: NodeId,
}

fn neuron_input(g: &mut Graph) -> (Inputs, NodeId) {
    let x1 = g.leaf_labeled(2.0, "x1");
    let x2 = g.leaf_labeled(0.0, "x2");
    let w1 = g.leaf_labeled(-3.0, "w1");
    let w2 = g.leaf_labeled(1.0, "w2");
    let b = g.leaf_labeled(6.881_373_587_019_543, "b");
    let x1w1 = g.mul(x1, w1);
    let x2w2 = g.mul(x2, w2);
    let sum = g.add(x1w1, x2w2);
    let n = g.add(sum, b);
    (Inputs { x1, x2, w1, w2 }, n)
}

fn check_neuron_grads(g: &Graph, inputs: &Inputs, o: NodeId) {
    let tol = 1e-6;
    // forward pass went well
    assert_float_eq!(g.value(o), 0.707_106_781_186_547_6, abs <= tol);
    // backward pass went well
    assert_float_eq!(g.gradient(inputs.x1), -1.5, abs <= tol);
    assert_float_eq!(g.gradient(inputs.w1), 1.0, abs <= tol);
    assert_float_eq!(g.gradient(inputs.x2), 0.5, abs <= tol);
    assert_float_eq!(g.gradient(inputs.w2), 0.0, abs <= tol);
}

#[test]
fn karpathy_neuron_tanh() {
    let mut g = Graph::new();
    let (inputs, n) = neuron_input(&mut g);
    let o = g.tanh(n);
    g.backpropagate(o).unwrap();

    check_neuron_grads(&g, &inputs, o);
}

#[test]
fn karpathy_neuron_exp_form() {
    let mut g = Graph::new();
    let (inputs, n) = neuron_input(&mut g);
    let two_n = g.mul_scalar(n, 2.);
    let e = g.exp(two_n);
    let num = g.add_scalar(e, -1.);
    let den = g.add_scalar(e, 1.);
    let o = g.div(num, den);
    g.backpropagate(o).unwrap();

    check_neuron_grads(&g, &inputs, o);
}

#[test]
fn karpathy_more_ops() {
    let mut g = Graph::new();
    let a = g.leaf(-4.0);
    let b = g.leaf(2.0);
    let mut c = g.add(a, b);
    let ab = g.mul(a, b);
    let b3 = g.pow(b, 3.);
    let mut d = g.add(ab, b3);
    let c1 = g.add_scalar(c, 1.);
    c = g.add(c, c1);
    let c2 = g.add_scalar(c, 1.);
    let c3 = g.add(c2, c);
    let neg_a = g.neg(a);
    c = g.add(c3, neg_a);
    let d2 = g.mul_scalar(d, 2.);
    d = g.add(d, d2);
    let e = g.sub(c, d);
    let f = g.pow(e, 2.);
    let half = g.mul_scalar(f, 0.5);
    let ten = g.leaf(10.0);
    let ten_over_f = g.div(ten, f);
    let out = g.add(half, ten_over_f);
    g.backpropagate(out).unwrap();

    // c = 3a + 4b + 3, d = 3(ab + b^3), out = e^2/2 + 10/e^2 with e = c - d
    assert_float_eq!(g.value(c), -1.0, abs <= 1e-10);
    assert_float_eq!(g.value(d), 0.0, abs <= 1e-10);
    assert_float_eq!(g.value(out), 10.5, abs <= 1e-10);
    // dout/de = (e - 20/e^3) = 19
    assert_float_eq!(g.gradient(e), 19.0, abs <= 1e-10);
    assert_float_eq!(g.gradient(a), 19.0 * 3.0 - 19.0 * 6.0, abs <= 1e-10);
    assert_float_eq!(g.gradient(b), 19.0 * 4.0 - 19.0 * 24.0, abs <= 1e-10);
}
