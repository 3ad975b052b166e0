//! BugComm link simulator
//!
//! Pairs a controller and a receiver over a simulated radio medium, drives a
//! stream of random commands, then halts the rover and prints what it saw.

use std::time::Duration;

use bugcomm_core::transport::Air;
use bugcomm_core::{
    Actuator, CommandPacket, Controller, HaltSwitch, LinkBuilder, PeerAddress, Receiver, Rgb,
    SimulatedRover, MAX_SPEED,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const CONTROLLER: PeerAddress = PeerAddress::new([0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01]);
const RECEIVER: PeerAddress = PeerAddress::new([0x24, 0x0A, 0xC4, 0x00, 0x00, 0x02]);

#[derive(Parser, Debug)]
#[command(name = "bugcomm-sim")]
#[command(about = "Simulated controller/receiver pairing and command session")]
#[command(version)]
struct Args {
    /// Radio channel shared by both peers (1-14)
    #[arg(short, long, default_value = "5")]
    channel: u8,

    /// Number of commands to send after pairing
    #[arg(short = 'n', long, default_value = "10")]
    commands: u32,

    /// Probability that a frame is lost in the air (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    loss: f64,

    /// Seed for frame loss and command generation
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Discovery re-broadcast interval in milliseconds
    #[arg(long, default_value = "500")]
    poll_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn random_command(rng: &mut StdRng) -> CommandPacket {
    let mut speeds = [0i8; 4];
    for speed in speeds.iter_mut() {
        *speed = rng.gen_range(-MAX_SPEED..=MAX_SPEED);
    }
    let colors = [
        Rgb::from_u32(rng.gen::<u32>()),
        Rgb::from_u32(rng.gen::<u32>()),
    ];
    CommandPacket::new(speeds, colors, rng.gen_bool(0.5))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = LinkBuilder::new()
        .with_channel(args.channel)
        .with_poll_interval_ms(args.poll_interval_ms)
        .build()?;

    let air = if args.loss > 0.0 {
        Air::with_loss(args.loss.min(1.0), args.seed)
    } else {
        Air::new()
    };

    info!(
        channel = %config.channel(),
        commands = args.commands,
        loss = args.loss,
        "starting bugcomm simulation"
    );

    let mut receiver = Receiver::open(config, air.attach(RECEIVER), SimulatedRover::new())?;
    let mut controller = Controller::open(config, air.attach(CONTROLLER))?;
    let done = HaltSwitch::new();
    let drain_interval = (config.poll_interval() / 10).max(Duration::from_millis(1));

    let receiver_side = async {
        let peer = receiver.run_pairing(&done).await?;
        info!(%peer, "receiver paired");
        while !done.is_triggered() {
            receiver.handle_inbound();
            tokio::time::sleep(drain_interval).await;
        }
        Ok::<_, bugcomm_core::BugCommError>(())
    };

    let controller_side = async {
        let result = async {
            let peer = controller.run_pairing(&HaltSwitch::new()).await?;
            info!(%peer, "controller paired");

            let mut rng = StdRng::seed_from_u64(args.seed);
            for _ in 0..args.commands {
                let command = random_command(&mut rng);
                if let Err(err) = controller.send_command(&command) {
                    warn!(error = %err, "command not sent");
                }
                tokio::time::sleep(config.poll_interval()).await;
                while controller.handle_inbound().is_some() {}
            }

            controller.send_halt()?;
            tokio::time::sleep(config.poll_interval()).await;
            while controller.handle_inbound().is_some() {}
            Ok::<_, bugcomm_core::BugCommError>(())
        }
        .await;
        done.trigger();
        result
    };

    let (controller_result, receiver_result) = tokio::join!(controller_side, receiver_side);
    controller_result?;
    receiver_result?;
    receiver.actuator_mut().halt_all();

    let tally = controller.tally();
    info!(
        sent = controller.commands_sent(),
        ok = tally.ok,
        error = tally.error,
        invalid = tally.invalid,
        "controller responses"
    );

    let mailbox = receiver.link().mailbox();
    info!(
        applied = receiver.session().applied(),
        rejected = receiver.session().rejected(),
        dropped = mailbox.dropped(),
        "receiver session"
    );

    let rover = receiver.actuator().state();
    info!(
        speeds = ?rover.speeds,
        left = %rover.lights[0],
        right = %rover.lights[1],
        output = rover.digital_output,
        "final rover state"
    );

    Ok(())
}
