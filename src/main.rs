use repofed::ui::output;

fn main() {
    if let Err(err) = repofed::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
