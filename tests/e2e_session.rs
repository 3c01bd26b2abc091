//! End-to-end session tests
//!
//! Bootstrap → Encrypt → Send → Add zero → Flood → Return → Decrypt = Original

use std::thread;

use he_bootstrap::net::{recv_ciphertext, send_ciphertext};
use he_bootstrap::{
    bootstrap, flood, Channel, Ciphertext, HeError, NetIo, Role, SessionConfig, SessionHandles,
    PRIME_MOD,
};

fn run_pair<G, R, T, U>(ring_dim: usize, generator: G, receiver: R) -> (T, U)
where
    G: FnOnce(SessionHandles, NetIo) -> T + Send + 'static,
    R: FnOnce(SessionHandles, NetIo) -> U,
    T: Send + 'static,
{
    let (mut alice_io, mut bob_io) = NetIo::loopback_pair().unwrap();
    let config = SessionConfig::new(ring_dim);
    let bob_config = config.clone();

    let bob = thread::spawn(move || {
        let session = bootstrap(Role::Generator, &mut bob_io, &bob_config).unwrap();
        generator(session, bob_io)
    });
    let session = bootstrap(Role::Receiver, &mut alice_io, &config).unwrap();
    let u = receiver(session, alice_io);
    (bob.join().unwrap(), u)
}

#[test]
fn test_e2e_flooded_round_trip_d8192() {
    let ring_dim = 8192;
    let expected: Vec<u64> = (1..=ring_dim as u64).map(|i| i % PRIME_MOD).collect();
    let sent = expected.clone();

    let (decoded, _) = run_pair(
        ring_dim,
        move |session, mut io| {
            let encoder = session.encoder().unwrap();
            let plain = encoder.encode(&sent).unwrap();
            let ct = session.encryptor().unwrap().encrypt(&plain).unwrap();
            send_ciphertext(&mut io, &ct).unwrap();

            let result = recv_ciphertext(&mut io, session.context()).unwrap();
            let decryptor = session.decryptor().unwrap();
            assert!(decryptor.invariant_noise_budget(&result).unwrap() > 0);
            encoder.decode(&decryptor.decrypt(&result).unwrap()).unwrap()
        },
        |session, mut io| {
            let ctx = session.context().clone();
            let received = recv_ciphertext(&mut io, &ctx).unwrap();
            let mut result = session
                .evaluator()
                .unwrap()
                .add(&received, session.zero_ciphertext().unwrap())
                .unwrap();
            flood(&mut result, &ctx, 40).unwrap();
            send_ciphertext(&mut io, &result).unwrap();
            io.flush().unwrap();
        },
    );

    assert_eq!(decoded, expected);
}

#[test]
fn test_receiver_zeros_decrypt_to_zero() {
    let (decoded, _) = run_pair(
        1024,
        |session, mut io| {
            let decryptor = session.decryptor().unwrap();
            let encoder = session.encoder().unwrap();
            (0..2)
                .map(|_| {
                    let zero = recv_ciphertext(&mut io, session.context()).unwrap();
                    encoder.decode(&decryptor.decrypt(&zero).unwrap()).unwrap()
                })
                .collect::<Vec<_>>()
        },
        |session, mut io| {
            // The bootstrap zero and a fresh one from the received public key
            send_ciphertext(&mut io, session.zero_ciphertext().unwrap()).unwrap();
            let fresh = session.encryptor().unwrap().encrypt_zero().unwrap();
            send_ciphertext(&mut io, &fresh).unwrap();
            io.flush().unwrap();
        },
    );
    for slots in decoded {
        assert!(slots.iter().all(|&v| v == 0));
    }
}

#[test]
fn test_flooding_preserves_plaintext_across_widths() {
    let (_, _) = run_pair(
        1024,
        |session, _io| {
            let encoder = session.encoder().unwrap();
            let decryptor = session.decryptor().unwrap();
            let values: Vec<u64> = (0..1024u64).map(|i| (i * 7 + 1) % PRIME_MOD).collect();
            let ct = session
                .encryptor()
                .unwrap()
                .encrypt(&encoder.encode(&values).unwrap())
                .unwrap();

            for bits in [1u32, 20, 63, 64, 65, 100] {
                let mut flooded = ct.clone();
                flood(&mut flooded, session.context(), bits).unwrap();
                let decoded = encoder
                    .decode(&decryptor.decrypt(&flooded).unwrap())
                    .unwrap();
                assert_eq!(decoded, values, "flooding with {} bits broke decryption", bits);
            }
        },
        |_session, _io| {},
    );
}

#[test]
fn test_flooding_is_not_deterministic() {
    let (_, _) = run_pair(
        1024,
        |_session, _io| {},
        |session, _io| {
            let ctx = session.context();
            let zero = session.zero_ciphertext().unwrap();
            let mut a = zero.clone();
            let mut b = zero.clone();
            flood(&mut a, ctx, 40).unwrap();
            flood(&mut b, ctx, 40).unwrap();
            assert_ne!(a.save().unwrap(), b.save().unwrap());
            assert_ne!(&a, zero);
        },
    );
}

#[test]
fn test_flooding_boundaries() {
    let (_, _) = run_pair(
        1024,
        |_session, _io| {},
        |session, _io| {
            let ctx = session.context();
            let mut ct: Ciphertext = session.zero_ciphertext().unwrap().clone();
            let before = ct.clone();
            for bits in [0u32, 128] {
                let err = flood(&mut ct, ctx, bits).unwrap_err();
                assert!(matches!(err, HeError::ProtocolViolation(_)));
            }
            assert_eq!(ct, before);
            flood(&mut ct, ctx, 127).unwrap();
        },
    );
}

#[test]
fn test_generator_has_no_galois_keys() {
    let (missing, present) = run_pair(
        1024,
        |session, _io| session.galois_keys().is_err() && session.zero_ciphertext().is_err(),
        |session, _io| session.galois_keys().is_ok() && session.decryptor().is_err(),
    );
    assert!(missing);
    assert!(present);
}

#[cfg(feature = "insecure-debug")]
#[test]
fn test_insecure_debug_session() {
    let (mut alice_io, mut bob_io) = NetIo::loopback_pair().unwrap();
    let config = SessionConfig::new(1024).with_insecure_debug().unwrap();
    let bob_config = config.clone();
    let bob = thread::spawn(move || bootstrap(Role::Generator, &mut bob_io, &bob_config).unwrap());
    let receiver = bootstrap(Role::Receiver, &mut alice_io, &config).unwrap();
    let generator = bob.join().unwrap();

    let zero = receiver.zero_ciphertext().unwrap();
    let plain = receiver.decryptor().unwrap().decrypt(zero).unwrap();
    assert!(plain.is_zero());
    drop(generator);
}

#[cfg(not(feature = "insecure-debug"))]
#[test]
fn test_insecure_debug_rejected() {
    let err = SessionConfig::new(1024).with_insecure_debug().unwrap_err();
    assert!(matches!(err, HeError::ProtocolViolation(_)));
}
