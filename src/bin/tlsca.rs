extern crate tlsca;

use tlsca::cli::options::Options;
use tlsca::config::Config;

fn main() {
    let options = Options::from_args();
    let format = options.general.format;

    let config = match Config::load(options.general.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            ::std::process::exit(1);
        }
    };

    if let Err(e) = config.init_logging() {
        eprintln!("{}", e);
        ::std::process::exit(1);
    }

    let status = options.run(&config).write(format);
    ::std::process::exit(status);
}
