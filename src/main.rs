fn main() {
    if let Err(err) = survey_normalize::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
