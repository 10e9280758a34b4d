fn main() {
    if let Err(err) = cashflow_sankey::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
