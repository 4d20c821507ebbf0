use clap::Parser;
use dlx_cover::{read_matrix, SolutionRow};
use std::io;
use std::process;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    if cli.nth == 0 {
        return Err("--nth must be greater than zero".to_string());
    }

    let stdin = io::stdin();
    let mut matrix = read_matrix(stdin.lock()).map_err(|err| err.to_string())?;

    println!(
        "Dimensions: [{}, {}]",
        matrix.num_rows(),
        matrix.num_columns()
    );

    let mut solution = vec![SolutionRow::default(); matrix.num_rows()];
    let mut remaining = cli.nth;
    let size = matrix.exact_cover(&mut solution, &mut remaining);

    // A size-0 result on a matrix with columns means the search came up
    // short; with no columns it is the vacuous solution and prints as an
    // empty row list.
    if size == 0 && matrix.num_columns() != 0 {
        return Err("no solution found".to_string());
    }

    let rows: Vec<String> = solution[..size]
        .iter()
        .map(|record| matrix.row_index(record.row_node).to_string())
        .collect();
    println!("{}", rows.join(","));

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "dlx-cli",
    version,
    about = "Solve exact cover over a 0/1 matrix read from stdin"
)]
struct Cli {
    /// Which solution to report, counting from 1 in search order.
    #[arg(long, default_value_t = 1)]
    nth: usize,
}
