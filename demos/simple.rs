extern crate scalargrad;

use scalargrad::demo;
use scalargrad::viz::render_dot;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let mut ex = demo::expression(2.0, -3.0, 10.0, -2.0);
    ex.graph.backpropagate(ex.l)?;

    let dot = render_dot(&ex.graph, ex.l);
    println!("{dot}");
    Ok(())
}
