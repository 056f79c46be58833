extern crate pretty_env_logger;
#[macro_use]
extern crate log;

use eyre::WrapErr;
use structopt::StructOpt;
use termo_home::channel::{self, LinkEvent, PushChannel, ReconnectPolicy};
use termo_home::control::ControlClient;
use termo_home::panel::Panel;
use termo_home::state::StateStore;
use termo_home::view::{self, ConsoleView, ViewSink};
use tokio::io::AsyncBufReadExt;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

#[derive(StructOpt, Debug)]
struct Opt {
    /// Address of the thermostat controller
    #[structopt(short, long, default_value = "localhost:80")]
    addr: String,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Live panel with line commands: + / up, - / down, ac, q
    Panel,
    /// Print pushed snapshots
    Watch {
        /// Number of snapshots
        #[structopt(short, long, default_value = "1")]
        times: usize,
    },
    /// Fetch and print the current state once
    Status,
    /// Nudge the desired temperature
    Temp {
        /// Degrees to add to the current setpoint
        #[structopt(short, long, allow_hyphen_values = true)]
        delta: f32,
    },
    /// Toggle the AC unit
    Ac,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    color_eyre::install()?;

    let opts = Opt::from_args();

    debug!("opts: {:?}", opts);

    match opts.command {
        Command::Panel => run_panel(&opts.addr).await,
        Command::Watch { times } => run_watch(&opts.addr, times).await,
        Command::Status => {
            let snapshot = ControlClient::new(&opts.addr)
                .fetch_data()
                .await
                .wrap_err("Could not fetch thermostat state")?;
            let mut store = StateStore::new();
            store.apply_snapshot(&snapshot);
            ConsoleView.render(&view::project(store.state()));
        }
        Command::Temp { delta } => {
            let control = ControlClient::new(&opts.addr);
            let snapshot = control
                .fetch_data()
                .await
                .wrap_err("Could not fetch thermostat state")?;
            let mut panel = Panel::new(control, ConsoleView);
            panel.apply_snapshot(&snapshot);
            panel.request_setpoint_change(delta).await;
        }
        Command::Ac => {
            let mut panel = Panel::new(ControlClient::new(&opts.addr), ConsoleView);
            panel.request_ac_toggle().await;
        }
    }

    Ok(())
}

async fn run_panel(addr: &str) {
    let (push, mut events) = PushChannel::start(channel::endpoint(addr), ReconnectPolicy::default());
    let mut panel = Panel::new(ControlClient::new(addr), ConsoleView);

    println!("commands: + / up, - / down, ac, q");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = LinesStream::new(stdin.lines());
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => panel.handle_event(event),
                None => break,
            },
            line = lines.next() => match line {
                Some(Ok(line)) => match line.trim() {
                    "+" | "up" => panel.request_setpoint_change(1.0).await,
                    "-" | "down" => panel.request_setpoint_change(-1.0).await,
                    "ac" => panel.request_ac_toggle().await,
                    "q" | "quit" => break,
                    "" => {}
                    other => println!("unknown command: {}", other),
                },
                Some(Err(e)) => {
                    error!("Could not read input: {}", e);
                    break;
                }
                None => break,
            },
        }
    }

    push.stop();
}

async fn run_watch(addr: &str, times: usize) {
    let (push, mut events) = PushChannel::start(channel::endpoint(addr), ReconnectPolicy::default());
    let mut store = StateStore::new();
    let mut view = ConsoleView;

    let mut seen = 0;
    while seen < times {
        match events.recv().await {
            Some(LinkEvent::Snapshot(snapshot)) => {
                store.apply_snapshot(&snapshot);
                view.render(&view::project(store.state()));
                seen += 1;
            }
            Some(_) => {}
            None => break,
        }
    }

    push.stop();
}
