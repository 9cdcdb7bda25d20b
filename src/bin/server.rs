use clap::Parser;
use redlite::config::Settings;
use redlite::{server, Error};

const PORT: u16 = 6379;

#[derive(Parser, Debug)]
struct Args {
    /// The port to listen on
    #[arg(short, long, default_value_t = PORT)]
    port: u16,

    /// Directory reported by CONFIG GET dir
    #[arg(long, default_value = ".")]
    dir: String,

    /// Database filename reported by CONFIG GET dbfilename
    #[arg(long, default_value = "dump.rdb")]
    dbfilename: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    let settings = Settings::new(args.dir, args.dbfilename);

    server::run(args.port, settings).await
}
