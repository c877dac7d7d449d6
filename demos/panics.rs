use airbrake::prelude::*;
use clap::Parser;

fn f() -> Result<(), std::io::Error> {
    g()
}

fn g() -> Result<(), std::io::Error> {
    h()
}

fn h() -> Result<(), std::io::Error> {
    std::fs::read("/etc/definitely-missing.conf").map(drop)
}

#[derive(Parser)]
struct Opts {
    #[clap(long)]
    api_key: String,

    #[clap(long)]
    endpoint: Option<String>,

    #[clap(long, default_value = "development")]
    environment: String,

    #[clap(long)]
    verbose: bool,
}

fn main() {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();

    let config = airbrake::Config::builder()
        .api_key(opts.api_key)
        .environment(opts.environment)
        .verbose(opts.verbose);
    let config = match opts.endpoint {
        Some(endpoint) => config.endpoint(endpoint).build(),
        None => config.build(),
    };
    let _guard = airbrake::configure(airbrake::Notifier::new(config));

    f().airbrake_drop();

    airbrake::capture_panic(None, || f().expect("Panicking!"));
}
