use bugcomm_core::codec;
use bugcomm_core::transport::{Air, AirTransport, RadioTransport};
use bugcomm_core::{
    CommandPacket, ConnectionState, Controller, DiscoveryPacket, HaltSwitch, LinkBuilder,
    LinkConfig, Outcome, PacketKind, PeerAddress, Receiver, ResponsePacket, ResponseStatus, Rgb,
    SimulatedRover, ValidationError, BROADCAST_ADDRESS,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const CONTROLLER: PeerAddress = PeerAddress::new([0x24, 0x0A, 0xC4, 0x11, 0x22, 0x01]);
const RECEIVER: PeerAddress = PeerAddress::new([0x24, 0x0A, 0xC4, 0x11, 0x22, 0x02]);

fn config(channel: u8) -> LinkConfig {
    LinkBuilder::new()
        .with_channel(channel)
        .with_poll_interval_ms(1)
        .build()
        .unwrap()
}

fn pair(
    air: &Air,
    channel: u8,
) -> (Controller<AirTransport>, Receiver<AirTransport, SimulatedRover>) {
    let mut receiver =
        Receiver::open(config(channel), air.attach(RECEIVER), SimulatedRover::new()).unwrap();
    let mut controller = Controller::open(config(channel), air.attach(CONTROLLER)).unwrap();

    assert_eq!(controller.poll_pairing(), None);
    assert_eq!(receiver.poll_pairing(), Some(CONTROLLER));
    assert_eq!(controller.poll_pairing(), Some(RECEIVER));
    (controller, receiver)
}

fn responses_from(air: &Air, sender: &PeerAddress) -> Vec<(PeerAddress, ResponseStatus)> {
    air.frames_from(sender)
        .into_iter()
        .filter_map(|frame| {
            ResponsePacket::decode(&frame.bytes)
                .ok()
                .map(|response| (frame.to, response.status))
        })
        .collect()
}

#[test]
fn test_pairing_after_bad_datagrams() {
    let air = Air::new();
    let mut receiver =
        Receiver::open(config(5), air.attach(RECEIVER), SimulatedRover::new()).unwrap();
    let channel = receiver.link().config().channel();
    let stranger = PeerAddress::new([0x02, 0, 0, 0, 0, 0x99]);

    let mut wrong_signature = DiscoveryPacket::new();
    wrong_signature.signature = 0x1234_5678;
    air.inject(stranger, BROADCAST_ADDRESS, channel, &wrong_signature.encode());
    assert_eq!(
        receiver.handle_inbound(),
        Some(Outcome::Discarded(ValidationError::SignatureMismatch {
            expected: bugcomm_core::SIGNATURE,
            actual: 0x1234_5678,
        }))
    );
    assert_eq!(receiver.state(), ConnectionState::Discovering);

    air.inject(stranger, BROADCAST_ADDRESS, channel, &[0x43, 0x47, 0x55]);
    assert!(matches!(
        receiver.handle_inbound(),
        Some(Outcome::Discarded(ValidationError::SizeMismatch { .. }))
    ));
    assert_eq!(receiver.state(), ConnectionState::Discovering);

    air.inject(CONTROLLER, BROADCAST_ADDRESS, channel, &DiscoveryPacket::new().encode());
    assert_eq!(receiver.handle_inbound(), Some(Outcome::Paired(CONTROLLER)));
    assert_eq!(receiver.state(), ConnectionState::Paired);
    assert_eq!(receiver.peer_address(), Some(CONTROLLER));

    assert_eq!(
        responses_from(&air, &RECEIVER),
        vec![(BROADCAST_ADDRESS, ResponseStatus::Ok)]
    );
}

#[test]
fn test_invalid_command_never_moves_actuators() {
    let air = Air::new();
    let (mut controller, mut receiver) = pair(&air, 3);
    air.clear_frames();

    let good = CommandPacket::new([30, 30, -30, -30], [Rgb::new(0, 0, 255); 2], false);
    controller.send_command(&good).unwrap();
    assert_eq!(receiver.handle_inbound(), Some(Outcome::Applied(good)));
    let known_good = receiver.actuator().state();

    // Corrupt signature on an otherwise well-formed command.
    let mut corrupted = CommandPacket::new([100, 100, 100, 100], [Rgb::new(255, 0, 0); 2], true)
        .encode();
    corrupted[1] ^= 0x01;
    air.inject(CONTROLLER, RECEIVER, receiver.link().config().channel(), &corrupted);

    assert!(matches!(
        receiver.handle_inbound(),
        Some(Outcome::Rejected(ValidationError::SignatureMismatch { .. }))
    ));
    assert_eq!(receiver.actuator().state(), known_good);

    assert_eq!(
        responses_from(&air, &RECEIVER),
        vec![
            (CONTROLLER, ResponseStatus::Ok),
            (CONTROLLER, ResponseStatus::Error)
        ]
    );

    controller.handle_inbound();
    assert_eq!(controller.tally().error, 1);
    assert_eq!(receiver.session().rejected(), 1);
}

#[test]
fn test_mailbox_keeps_only_latest() {
    let air = Air::new();
    let (mut controller, mut receiver) = pair(&air, 7);

    let first = CommandPacket::new([10, 0, 0, 0], [Rgb::OFF; 2], false);
    let second = CommandPacket::new([0, 0, 0, 90], [Rgb::OFF; 2], true);
    controller.send_command(&first).unwrap();
    controller.send_command(&second).unwrap();

    assert_eq!(receiver.handle_inbound(), Some(Outcome::Applied(second)));
    assert_eq!(receiver.handle_inbound(), None);
    assert_eq!(receiver.actuator().state().speeds, [0, 0, 0, 90]);
    assert_eq!(receiver.link().mailbox().dropped(), 1);
    assert_eq!(receiver.session().applied(), 1);
}

#[test]
fn test_end_to_end_channel_five() {
    let air = Air::new();
    let mut receiver =
        Receiver::open(config(5), air.attach(RECEIVER), SimulatedRover::new()).unwrap();
    let mut controller = Controller::open(config(5), air.attach(CONTROLLER)).unwrap();

    // Controller broadcasts; receiver hears it on its next poll.
    assert_eq!(controller.poll_pairing(), None);
    assert_eq!(controller.state(), ConnectionState::AwaitingPeerAck);
    assert_eq!(receiver.poll_pairing(), Some(CONTROLLER));

    let channel = receiver.link().config().channel();
    assert_eq!(receiver.link().transport().peers(), vec![(CONTROLLER, channel)]);
    assert_eq!(responses_from(&air, &RECEIVER), vec![(BROADCAST_ADDRESS, ResponseStatus::Ok)]);

    assert_eq!(controller.poll_pairing(), Some(RECEIVER));
    assert_eq!(controller.link().transport().peers(), vec![(RECEIVER, channel)]);

    let command = CommandPacket::new(
        [50, -50, 0, 100],
        [Rgb::from_u32(0xFF0000), Rgb::from_u32(0x00FF00)],
        true,
    );
    controller.send_command(&command).unwrap();
    assert_eq!(receiver.handle_inbound(), Some(Outcome::Applied(command)));

    let rover = receiver.actuator();
    assert_eq!(rover.state().speeds, [50, -50, 0, 100]);
    assert_eq!(rover.color(0), Rgb::from_u32(0xFF0000));
    assert_eq!(rover.color(1), Rgb::from_u32(0x00FF00));
    assert!(rover.digital_output());

    assert_eq!(
        controller.handle_inbound(),
        Some(Outcome::Acknowledged(ResponseStatus::Ok))
    );
    assert_eq!(controller.tally().ok, 1);
    assert!(controller.link().delivery().delivered() >= 2);
}

#[test]
fn test_unpaired_stranger_cannot_command() {
    let air = Air::new();
    let (_controller, mut receiver) = pair(&air, 2);
    let mut stranger = air.attach(PeerAddress::new([0x66; 6]));
    stranger
        .initialize(receiver.link().config().channel(), RECEIVER)
        .unwrap();

    let command = CommandPacket::new([100; 4], [Rgb::OFF; 2], false);
    stranger.send(&RECEIVER, &command.encode()).unwrap();

    assert_eq!(receiver.handle_inbound(), None);
    assert_eq!(receiver.actuator().state().speeds, [0; 4]);
}

#[test]
fn test_other_channel_never_pairs() {
    let air = Air::new();
    let mut receiver =
        Receiver::open(config(5), air.attach(RECEIVER), SimulatedRover::new()).unwrap();
    let mut controller = Controller::open(config(6), air.attach(CONTROLLER)).unwrap();

    for _ in 0..5 {
        assert_eq!(controller.poll_pairing(), None);
        assert_eq!(receiver.poll_pairing(), None);
    }
    assert_eq!(receiver.state(), ConnectionState::Discovering);
}

#[test]
fn test_random_garbage_never_applied() {
    let air = Air::new().with_frame_log(8192);
    let (_controller, mut receiver) = pair(&air, 11);
    let channel = receiver.link().config().channel();
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for _ in 0..2000 {
        let len = rng.gen_range(0..=32);
        let mut bytes = vec![0u8; len];
        rng.fill(&mut bytes[..]);
        air.inject(CONTROLLER, RECEIVER, channel, &bytes);

        let expected_valid = codec::validate(&bytes, PacketKind::Command);
        match receiver.handle_inbound() {
            Some(Outcome::Applied(_)) => assert!(expected_valid),
            Some(Outcome::Rejected(_)) => assert!(!expected_valid),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(receiver.actuator().state().speeds, [0; 4]);
    let replies = responses_from(&air, &RECEIVER);
    assert_eq!(replies.len(), 2001);
}

#[tokio::test]
async fn test_async_pairing_over_lossy_air() {
    let air = Air::with_loss(0.3, 42);
    let mut receiver =
        Receiver::open(config(9), air.attach(RECEIVER), SimulatedRover::new()).unwrap();
    let mut controller = Controller::open(config(9), air.attach(CONTROLLER)).unwrap();
    let done = HaltSwitch::new();

    // A lost acknowledgment is recovered by the receiver answering the next
    // Discovery with an Error response, so it keeps draining after pairing.
    let receiver_side = async {
        let peer = receiver.run_pairing(&done).await;
        while !done.is_triggered() {
            receiver.handle_inbound();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        peer
    };
    let controller_side = async {
        let peer = controller.run_pairing(&HaltSwitch::new()).await;
        done.trigger();
        peer
    };

    let (controller_peer, receiver_peer) = tokio::join!(controller_side, receiver_side);

    assert_eq!(receiver_peer, Ok(CONTROLLER));
    assert_eq!(controller_peer, Ok(RECEIVER));
    assert_eq!(receiver.state(), ConnectionState::Paired);
    assert_eq!(controller.state(), ConnectionState::Paired);
}
