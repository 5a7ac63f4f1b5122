use std::{process::ExitCode, time::Instant};

use log::info;

use pen_route_core::{
    Result, RouterOptions,
    io::{input, output},
    logging, pipeline,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let now = Instant::now();
    let options = RouterOptions::from_args()?;
    logging::init_logger(&options)?;

    info!("options: {options}");

    let paths = input::read_paths(options.input_path())?;
    info!("input: paths={}", paths.len());

    let report = pipeline::run(paths, &options)?;
    output::write_route(&report.route, options.output_path())?;

    info!("report: {report}");
    info!(
        "output: paths={} time={:.2}s",
        report.route.len(),
        now.elapsed().as_secs_f32()
    );

    Ok(())
}
