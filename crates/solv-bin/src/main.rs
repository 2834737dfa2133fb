use clap::Parser;
use solv::{Command, Driver, DriverConfig, RpmExec};
use solv_pool::mem::MemPool;
use solv_pool::Pool;
use tracing_subscriber::{filter::LevelFilter, util::SubscriberInitExt, EnvFilter};

/// Command line options available through the `solv` cli.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Opt {
    /// The subcommand to execute
    #[clap(subcommand)]
    command: Subcommand,

    /// Log verbose
    #[clap(short, long, global = true)]
    verbose: bool,
}

/// The request verbs, with the short aliases of the original tool.
#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Search package names
    #[clap(visible_alias = "se")]
    Search { args: Vec<String> },
    /// List matching packages
    #[clap(visible_alias = "li")]
    List { args: Vec<String> },
    /// Show details of matching packages
    Info { args: Vec<String> },
    /// Install packages
    #[clap(visible_alias = "in")]
    Install { args: Vec<String> },
    /// Erase installed packages
    #[clap(visible_alias = "rm")]
    Erase { args: Vec<String> },
    /// Update packages, or the whole system
    #[clap(name = "up")]
    Update { args: Vec<String> },
}

/// The backend the driver runs against. The in-memory backend ships with
/// the workspace; a binding against the native solver library implements
/// the same [`Pool`] contract and slots in here.
fn default_pool() -> Box<dyn Pool> {
    Box::new(MemPool::new())
}

fn main() {
    let opt = Opt::parse();

    let default_filter = if opt.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_filter.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish()
        .try_init();

    let (command, args) = match opt.command {
        Subcommand::Search { args } => (Command::Search, args),
        Subcommand::List { args } => (Command::List, args),
        Subcommand::Info { args } => (Command::Info, args),
        Subcommand::Install { args } => (Command::Install, args),
        Subcommand::Erase { args } => (Command::Erase, args),
        Subcommand::Update { args } => (Command::Update, args),
    };

    std::process::exit(match run(command, &args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    });
}

fn run(command: Command, args: &[String]) -> anyhow::Result<i32> {
    let mut driver = Driver::new(default_pool(), DriverConfig::default())?;
    let mut rpm = RpmExec::default();
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let stdout = std::io::stdout();
    let mut output = stdout.lock();
    Ok(driver.run(command, args, &mut rpm, &mut input, &mut output)?)
}
