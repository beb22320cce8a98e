// Runs one simulation and writes the trajectory as CSV and as an HTML chart.
//
// Parameters are given as key=value arguments, e.g.
//
//     cargo run --example simulate -- rC=0.2 K=1500

use std::{error::Error, fs::File, path::Path};

use log::info;

use tumour_immune::{chart, Compartment, ParameterForm, Simulator};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let pairs: Vec<(String, String)> = std::env::args()
        .skip(1)
        .filter_map(|arg| {
            let (key, value) = arg.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect();
    let params = ParameterForm::from_pairs(pairs)?.into_parameters()?;

    let trajectory = Simulator::default().run(&params)?;
    let stats = trajectory.stats();
    info!(
        "{} function evaluations, {} accepted and {} rejected steps",
        stats.num_eval, stats.accepted_steps, stats.rejected_steps
    );
    println!("{}", stats);

    if let Some(last) = trajectory.last() {
        for compartment in Compartment::ALL.iter() {
            println!("{} at t = 100: {}", compartment, last[compartment.index()]);
        }
    }

    let csv_path = Path::new("./trajectory.csv");
    trajectory.write_csv(File::create(csv_path)?)?;
    println!("Saved in: '{:?}'", csv_path);

    let html_path = Path::new("./plot.html");
    chart::write_html(&trajectory, html_path)?;
    println!("Saved in: '{:?}'", html_path);

    Ok(())
}
