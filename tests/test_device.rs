// tests/test_device.rs — Control-plane tests against a scripted mock
// transport: power-up state machine, interrupt handling, capture
// framing, AES keep-alive.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use dpfp::device::{irq_type, Device, Mode, IRQ_FINGER_ON, IRQ_LENGTH, IRQ_SCANPWR_ON};
use dpfp::error::Error;
use dpfp::registry::{self, Entry};
use dpfp::transport::{
    Transport, AUTH_CHALLENGE, AUTH_RESPONSE, DATABLK1_RQSIZE, HWSTAT_CONTROL, MODE_CONTROL,
    USB_RQ_REG_READ,
};
use dpfp::Frame;

/// Reference ciphertext: AES-128 of an all-zero challenge under the
/// fixed vendor key.
const ZERO_CHALLENGE_RESPONSE: [u8; 16] = [
    0xa9, 0xd4, 0x2a, 0x98, 0xc2, 0x0c, 0xea, 0x8f, //
    0x0e, 0xb6, 0x1f, 0x17, 0xf8, 0xf6, 0xc0, 0x01,
];

/// One scripted interrupt delivery: a packet or a timeout.
enum IrqEvent {
    Packet(Vec<u8>),
    Timeout,
}

#[derive(Default)]
struct MockState {
    firmware_byte: u8,
    firmware_writes: Vec<u8>,
    hwstat_reads: VecDeque<u8>,
    hwstat_writes: Vec<u8>,
    mode_writes: Vec<u8>,
    irqs: VecDeque<IrqEvent>,
    bulk_blocks: VecDeque<Vec<u8>>,
    auth_responses: Vec<Vec<u8>>,
}

struct MockTransport {
    state: RefCell<MockState>,
}

impl MockTransport {
    fn new(state: MockState) -> Self {
        MockTransport {
            state: RefCell::new(state),
        }
    }
}

impl Transport for MockTransport {
    fn control_in(&self, request: u8, value: u16, buf: &mut [u8]) -> dpfp::Result<usize> {
        let mut st = self.state.borrow_mut();
        if request == USB_RQ_REG_READ {
            buf[0] = st.firmware_byte;
            return Ok(1);
        }
        match value {
            HWSTAT_CONTROL => {
                buf[0] = st
                    .hwstat_reads
                    .pop_front()
                    .expect("mock ran out of hwstat reads");
                Ok(1)
            }
            AUTH_CHALLENGE => {
                buf.fill(0);
                Ok(buf.len())
            }
            _ => panic!("unexpected control-in value {value:#x}"),
        }
    }

    fn control_out(&self, _request: u8, value: u16, buf: &[u8]) -> dpfp::Result<usize> {
        let mut st = self.state.borrow_mut();
        match value {
            HWSTAT_CONTROL => st.hwstat_writes.push(buf[0]),
            MODE_CONTROL => st.mode_writes.push(buf[0]),
            AUTH_RESPONSE => st.auth_responses.push(buf.to_vec()),
            _ => st.firmware_writes.push(buf[0]),
        }
        Ok(buf.len())
    }

    fn bulk_in(&self, buf: &mut [u8]) -> dpfp::Result<usize> {
        let mut st = self.state.borrow_mut();
        let block = st
            .bulk_blocks
            .pop_front()
            .expect("mock ran out of bulk blocks");
        buf[..block.len()].copy_from_slice(&block);
        Ok(block.len())
    }

    fn interrupt_in(&self, buf: &mut [u8], _timeout: Duration) -> dpfp::Result<usize> {
        let mut st = self.state.borrow_mut();
        match st.irqs.pop_front().expect("mock ran out of interrupts") {
            IrqEvent::Packet(p) => {
                buf[..p.len()].copy_from_slice(&p);
                Ok(p.len())
            }
            IrqEvent::Timeout => Err(Error::Usb(rusb::Error::Timeout)),
        }
    }
}

fn irq_packet(ty: u16) -> IrqEvent {
    let mut p = vec![0u8; IRQ_LENGTH];
    p[..2].copy_from_slice(&ty.to_be_bytes());
    IrqEvent::Packet(p)
}

fn uru4000_entry() -> &'static Entry {
    registry::lookup(0x05ba, 0x0007).unwrap()
}

fn bg2_entry() -> &'static Entry {
    registry::lookup(0x045e, 0x00ca).unwrap()
}

/// Script that takes a non-Bg2 device through a clean power-up.
fn clean_powerup_state() -> MockState {
    MockState {
        firmware_byte: 0x07, // encryption bit already clear
        hwstat_reads: VecDeque::from(vec![0x80, 0x00]),
        irqs: VecDeque::from(vec![irq_packet(IRQ_SCANPWR_ON)]),
        ..Default::default()
    }
}

// ===== Power-up protocol =====

#[test]
fn stuck_device_is_recovered() {
    // Device reports the confused post-close state 0x85 three times,
    // then wakes up with 0x01.
    let state = MockState {
        firmware_byte: 0x07,
        hwstat_reads: VecDeque::from(vec![0x85, 0x85, 0x85, 0x01]),
        irqs: VecDeque::from(vec![irq_packet(IRQ_SCANPWR_ON)]),
        ..Default::default()
    };

    let mut dev = Device::attach(MockTransport::new(state), uru4000_entry()).unwrap();

    dev.set_mode(Mode::SendFinger).unwrap();
    let st = dev.close(); // parks with INIT + hwstat 0x80
    assert!(st.is_ok());
}

#[test]
fn powerup_writes_expected_hwstat_sequence() {
    let state = MockState {
        firmware_byte: 0x07,
        hwstat_reads: VecDeque::from(vec![0x85, 0x85, 0x85, 0x01]),
        irqs: VecDeque::from(vec![irq_packet(IRQ_SCANPWR_ON)]),
        ..Default::default()
    };
    let transport = MockTransport::new(state);
    let dev = Device::attach(transport, uru4000_entry()).unwrap();

    let st = dev_into_state(dev);
    // One recovery write plus two power-loop writes, all low-nibble.
    assert_eq!(st.hwstat_writes, vec![0x05, 0x05, 0x05]);
    // Mode was never set during open.
    assert!(st.mode_writes.is_empty());
}

#[test]
fn scanpwr_never_clears_is_an_error() {
    // SCANPWR_OFF stays set through the whole budget.
    let state = MockState {
        firmware_byte: 0x07,
        hwstat_reads: VecDeque::from(vec![0x81; 101]),
        ..Default::default()
    };
    let err = Device::attach(MockTransport::new(state), uru4000_entry())
        .err()
        .expect("power-up must fail");
    assert!(matches!(err, Error::PowerUp));
}

#[test]
fn encryption_bit_is_patched() {
    let state = MockState {
        firmware_byte: 0x17, // bit 0x10 set: on-wire encryption enabled
        hwstat_reads: VecDeque::from(vec![0x80, 0x00]),
        irqs: VecDeque::from(vec![irq_packet(IRQ_SCANPWR_ON)]),
        ..Default::default()
    };
    let dev = Device::attach(MockTransport::new(state), uru4000_entry()).unwrap();
    let st = dev_into_state(dev);
    assert_eq!(st.firmware_writes, vec![0x07]);
}

#[test]
fn stale_interrupts_are_discarded_during_powerup() {
    let mut state = clean_powerup_state();
    state.irqs = VecDeque::from(vec![
        irq_packet(IRQ_FINGER_ON), // stale, from a previous session
        irq_packet(IRQ_FINGER_ON),
        irq_packet(IRQ_SCANPWR_ON),
    ]);
    assert!(Device::attach(MockTransport::new(state), uru4000_entry()).is_ok());
}

// ===== Keep-alive =====

#[test]
fn bg2_authenticates_during_power_loop() {
    // First power-loop read leaves SCANPWR_OFF set, forcing one
    // challenge-response round before the second read succeeds.
    let state = MockState {
        firmware_byte: 0x07,
        hwstat_reads: VecDeque::from(vec![0x81, 0x81, 0x01]),
        irqs: VecDeque::from(vec![irq_packet(IRQ_SCANPWR_ON)]),
        ..Default::default()
    };
    let dev = Device::attach(MockTransport::new(state), bg2_entry()).unwrap();
    let st = dev_into_state(dev);

    assert_eq!(st.auth_responses.len(), 1);
    assert_eq!(st.auth_responses[0], ZERO_CHALLENGE_RESPONSE);
}

// ===== Interrupts =====

#[test]
fn short_interrupt_packet_is_fatal() {
    let mut state = clean_powerup_state();
    state
        .irqs
        .extend([IrqEvent::Packet(vec![0x01, 0x01, 0x00])]);
    let mut dev = Device::attach(MockTransport::new(state), uru4000_entry()).unwrap();

    let err = dev.get_irq(1).unwrap_err();
    assert!(matches!(err, Error::ShortIrq(3)));
}

#[test]
fn irq_timeouts_are_retried_within_budget() {
    let mut state = clean_powerup_state();
    state.irqs.extend([
        IrqEvent::Timeout,
        IrqEvent::Timeout,
        irq_packet(IRQ_FINGER_ON),
    ]);
    let mut dev = Device::attach(MockTransport::new(state), uru4000_entry()).unwrap();

    let buf = dev.get_irq(3).unwrap();
    assert_eq!(irq_type(&buf), IRQ_FINGER_ON);
}

#[test]
fn irq_timeout_budget_exhaustion_propagates() {
    let mut state = clean_powerup_state();
    state.irqs.extend([IrqEvent::Timeout, IrqEvent::Timeout]);
    let mut dev = Device::attach(MockTransport::new(state), uru4000_entry()).unwrap();

    let err = dev.get_irq(1).unwrap_err();
    assert!(err.is_timeout());
}

// ===== Capture framing =====

#[test]
fn capture_concatenates_both_blocks() {
    let mut state = clean_powerup_state();
    // Full first block; second block one scanline short of nominal, so
    // the pixel count comes to exactly 384 * 289.
    let mut blk1 = vec![0x20u8; DATABLK1_RQSIZE];
    blk1[0] = 0xab; // header byte
    let blk2 = vec![0x21u8; 0xb340 - 384];
    state.bulk_blocks = VecDeque::from(vec![blk1, blk2]);

    let mut dev = Device::attach(MockTransport::new(state), uru4000_entry()).unwrap();
    let mut fp = Frame::new();
    dev.capture(&mut fp).unwrap();

    assert_eq!(fp.header_size(), 64);
    assert_eq!(fp.data_size(), 384 * 289);
    assert_eq!(fp.header()[0], 0xab);
    assert_eq!(fp.data()[0], 0x20);
    // Pixel data crosses the block boundary seamlessly.
    assert_eq!(fp.data()[DATABLK1_RQSIZE - 64], 0x21);
}

#[test]
fn short_first_block_is_fatal() {
    let mut state = clean_powerup_state();
    state.bulk_blocks = VecDeque::from(vec![vec![0u8; 1000]]);

    let mut dev = Device::attach(MockTransport::new(state), uru4000_entry()).unwrap();
    let err = dev.capture(&mut Frame::new()).unwrap_err();
    assert!(matches!(err, Error::ShortRead { got: 1000, .. }));
}

// ===== Edge light =====

#[test]
fn edge_light_requires_capability() {
    let mut dev =
        Device::attach(MockTransport::new(clean_powerup_state()), uru4000_entry()).unwrap();
    // The plain U.are.U 4000 has no edge light.
    assert!(dev.set_edge_light(128).is_err());
}

/// Tear a device down and recover the mock state for assertions.
fn dev_into_state(dev: Device<MockTransport>) -> MockState {
    // Dropping the device does not consume the transport, so park it
    // explicitly and then inspect what the mock recorded.
    let transport = dev.into_transport();
    transport.state.into_inner()
}
