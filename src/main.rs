use color_eyre::Result;
use log::info;
use scalargrad::{demo, viz};

const OUTPUT_PATH: &str = "neuron_graph.dot";

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let mut neuron_demo = demo::neuron(&[2.0], 5.0)?;
    neuron_demo.graph.backpropagate(neuron_demo.output)?;
    println!("{}", neuron_demo.graph.display(neuron_demo.output));

    viz::write_dot(&neuron_demo.graph, neuron_demo.output, OUTPUT_PATH)?;
    info!("wrote {}", OUTPUT_PATH);

    Ok(())
}
