//! Scripted fan-out against the broker simulator.
//!
//! Declares one queue per `--queue`, binds each to `--exchange`, attaches a
//! reader to every queue and publishes `--messages` seeded payloads. Useful
//! for eyeballing the simulator's routing and blocking behavior with logs on.
//!
//! # Usage
//!
//! ```bash
//! # Three queues on one exchange, trace-level logs
//! relay-sim --queue events --queue alerts --queue audit --messages 5 --log-level trace
//! ```

use clap::Parser;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relay_broker::{
    BasicConsumeOptions, BasicPublishOptions, Channel, Connection, Dialer, FieldTable, Publishing,
    Topology,
};
use relay_harness::{DEFAULT_URL, SimDialer};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Relay broker simulator
#[derive(Parser, Debug)]
#[command(name = "relay-sim")]
#[command(about = "Publish seeded messages through the in-process broker simulator")]
#[command(version)]
struct Args {
    /// Broker address reported by the simulated connection
    #[arg(long, default_value = DEFAULT_URL)]
    url: String,

    /// Exchange every queue is bound to
    #[arg(short, long, default_value = "ingress")]
    exchange: String,

    /// Queue to declare (repeatable)
    #[arg(short, long = "queue", default_value = "events")]
    queues: Vec<String>,

    /// Routing key used for bindings and publishes
    #[arg(short, long, default_value = "#")]
    routing_key: String,

    /// Number of messages to publish
    #[arg(short, long, default_value = "10")]
    messages: usize,

    /// Seed for payload generation
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    // A duplicate name would declare a second queue no reader can reach,
    // stalling the first publish forever.
    let mut queues: Vec<String> = Vec::with_capacity(args.queues.len());
    for name in &args.queues {
        if queues.contains(name) {
            tracing::warn!("Ignoring duplicate queue {}", name);
        } else {
            queues.push(name.clone());
        }
    }

    let dialer = SimDialer::new(&args.url);
    let connection = dialer.dial(&args.url).await?;
    let channel = connection.channel().await?;

    let topology = queues.iter().fold(Topology::new(), |topology, name| {
        topology.queue(name).bind(name, &args.exchange, &args.routing_key)
    });
    topology.install(&*channel).await?;

    let mut readers = Vec::with_capacity(queues.len());
    for name in &queues {
        let deliveries = channel
            .basic_consume(
                name,
                &format!("relay-sim-{name}"),
                BasicConsumeOptions::default(),
                FieldTable::new(),
            )
            .await?;

        let name = name.clone();
        let expected = args.messages;
        readers.push(tokio::spawn(async move {
            let mut count = 0usize;
            let mut bytes = 0usize;
            while count < expected {
                let Some(delivery) = deliveries.recv().await else { break };
                tracing::trace!("{} received {} bytes", name, delivery.body().len());
                count += 1;
                bytes += delivery.body().len();
            }
            (name, count, bytes)
        }));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    tracing::info!("Publishing {} messages to {} (seed {})", args.messages, args.exchange, args.seed);

    for _ in 0..args.messages {
        let mut body = vec![0u8; rng.gen_range(16..64)];
        rng.fill_bytes(&mut body);

        channel
            .basic_publish(
                &args.exchange,
                &args.routing_key,
                BasicPublishOptions::default(),
                Publishing::new(body).with_content_type("application/octet-stream"),
            )
            .await?;
    }

    for reader in readers {
        let (name, count, bytes) = reader.await?;
        tracing::info!("Queue {} received {} messages ({} bytes)", name, count, bytes);
    }

    connection.close().await?;

    Ok(())
}
