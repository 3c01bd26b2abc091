//! he-session: two-process demo of an HE session
//!
//! Run ALICE (Receiver) and BOB (Generator) in two terminals:
//! ```text
//! he-session --role 1 --port 32000
//! he-session --role 2 --port 32000 --ip 127.0.0.1
//! ```
//! BOB encrypts [1, 2, 3, ...] and sends it. ALICE adds the zero ciphertext
//! from the handshake and floods the sum before returning it to BOB for
//! decryption.

use std::time::Instant;

use clap::Parser;
use eyre::{bail, Result, WrapErr};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use he_bootstrap::net::{recv_ciphertext, send_ciphertext};
use he_bootstrap::params::DEFAULT_RING_DIM;
use he_bootstrap::{bootstrap, flood, teardown_session, Channel, NetIo, Role, SessionConfig, PRIME_MOD};

#[derive(Parser)]
#[command(name = "he-session")]
#[command(about = "Bootstrap a two-party BFV session and run a flooded round trip")]
#[command(version)]
struct Args {
    /// Party: 1 = ALICE (listens, Receiver), 2 = BOB (connects, Generator)
    #[arg(long, short = 'r')]
    role: u8,

    /// TCP port
    #[arg(long, short = 'p', default_value = "32000")]
    port: u16,

    /// Address of ALICE (used by BOB)
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,

    /// Ring dimension (power of two, 1024..=32768)
    #[arg(long, default_value_t = DEFAULT_RING_DIM)]
    ring_dim: usize,

    /// Flooding width in bits (1..=127)
    #[arg(long, default_value = "40")]
    noise_bits: u32,

    /// Debug-level logging and key-generation summary
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let role = Role::from_party(args.role)?;
    info!("he-session: {:?} (party {})", role, args.role);

    let mut io = match role {
        Role::Receiver => NetIo::listen(args.port).wrap_err("failed to accept peer")?,
        Role::Generator => NetIo::connect(&args.ip, args.port).wrap_err("failed to connect")?,
    };

    let config = SessionConfig::new(args.ring_dim).verbose(args.verbose);
    let start = Instant::now();
    let mut session = bootstrap(role, &mut io, &config).wrap_err("bootstrap failed")?;
    info!("Bootstrap: {:.2?}", start.elapsed());

    let ctx = session.context().clone();
    let slots = session.slot_count();
    let expected: Vec<u64> = (1..=slots as u64).map(|i| i % PRIME_MOD).collect();

    match role {
        Role::Generator => {
            let encoder = session.encoder()?;
            let ct = session.encryptor()?.encrypt(&encoder.encode(&expected)?)?;
            send_ciphertext(&mut io, &ct)?;

            let result = recv_ciphertext(&mut io, &ctx)?;
            let decryptor = session.decryptor()?;
            info!(
                "Noise budget after flooding: {} bits",
                decryptor.invariant_noise_budget(&result)?
            );
            let decoded = encoder.decode(&decryptor.decrypt(&result)?)?;
            if decoded != expected {
                let first_bad = decoded.iter().zip(&expected).position(|(a, b)| a != b);
                bail!("decrypted result does not match, first mismatch at slot {:?}", first_bad);
            }
            info!("Round trip verified ({} slots)", slots);
        }
        Role::Receiver => {
            let received = recv_ciphertext(&mut io, &ctx)?;
            let mut result = session
                .evaluator()?
                .add(&received, session.zero_ciphertext()?)?;
            flood(&mut result, &ctx, args.noise_bits)?;
            send_ciphertext(&mut io, &result)?;
            io.flush()?;
            info!("Flooded result sent ({} noise bits)", args.noise_bits);
        }
    }

    teardown_session(&mut session);
    info!(
        "Done in {:.2?}, {:.2} MB sent",
        start.elapsed(),
        io.counter() as f64 / (1 << 20) as f64
    );
    Ok(())
}
