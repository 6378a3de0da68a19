use clap::Parser;

fn main() {
    let args = p2bin::cli::Args::parse();
    if let Err(err) = p2bin::run(args) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
