extern crate scalargrad;

use scalargrad::engine::*;
use scalargrad::viz::render_dot;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let mut g = Graph::new();
    let x1 = g.leaf_labeled(2.0, "x1");
    let x2 = g.leaf_labeled(0.0, "x2");
    let w1 = g.leaf_labeled(-3.0, "w1");
    let w2 = g.leaf_labeled(1.0, "w2");
    let b = g.leaf_labeled(6.881_373_587_019_543, "b");

    let x1w1 = g.mul(x1, w1);
    let x2w2 = g.mul(x2, w2);
    let sum = g.add(x1w1, x2w2);
    let n = g.add(sum, b);
    g.set_label(n, "n");

    // tanh(n) = (e^2n - 1) / (e^2n + 1)
    let two_n = g.mul_scalar(n, 2.);
    let e = g.exp(two_n);
    g.set_label(e, "e");
    let num = g.add_scalar(e, -1.);
    let den = g.add_scalar(e, 1.);
    let o = g.div(num, den);
    g.set_label(o, "o");
    g.backpropagate(o)?;

    println!("{}", render_dot(&g, o));
    Ok(())
}
