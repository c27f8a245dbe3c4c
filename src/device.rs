// device.rs — Control plane: open/power-up state machine, mode changes,
// interrupt waiting, frame capture, challenge-response keep-alive.
//
// Power-up is the delicate part. The sequence that works across all
// three hardware variants is:
//
//   1. patch the firmware encryption byte (clear bit 0x10) so frames
//      arrive unencrypted
//   2. recover from the stuck 0x8x hwstat state some devices enter when
//      the previous session parked them
//   3. raise the SCANPWR_OFF bit if it is somehow clear
//   4. repeatedly write the low hwstat nibble until SCANPWR_OFF clears,
//      authenticating between iterations on Bg2 hardware
//   5. wait for the 0x56aa power-on interrupt
//
// Each stage has a bounded retry budget; exhausting it is a hard error.

use std::thread;
use std::time::Duration;

use crate::crypto::{KeepAlive, AUTH_CR_LENGTH};
use crate::error::{Error, Result};
use crate::fprint::Frame;
use crate::registry::{self, Entry, Variant};
use crate::transport::{
    Transport, UsbTransport, AUTH_CHALLENGE, AUTH_RESPONSE, CHALLENGE_CONTROL, DATABLK1_RQSIZE,
    DATABLK2_RQSIZE, EDGE_LIGHT_CONTROL, EP_DATA, EP_INTR, HWSTAT_CONTROL, MODE_CONTROL,
    RESPONSE_CONTROL, USB_RQ, USB_RQ_REG_READ,
};

/// Scanner operating modes, written as a single byte to value 0x4e.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Init = 0x00,
    AwaitFingerOn = 0x10,
    AwaitFingerOff = 0x12,
    SendFinger = 0x20,
    ShutUp = 0x30,
    Ready = 0x80,
}

/// Size of every interrupt packet. Shorter packets are a wire error.
pub const IRQ_LENGTH: usize = 64;

/// Interrupt types, taken from the first two bytes (big-endian).
pub const IRQ_SCANPWR_ON: u16 = 0x56aa;
pub const IRQ_FINGER_ON: u16 = 0x0101;
pub const IRQ_FINGER_OFF: u16 = 0x0200;

/// Length of the short challenge written to value 0x33.
pub const CHALLENGE_LENGTH: usize = 5;

/// Length of the response read from value 0x34.
pub const RESPONSE_LENGTH: usize = 4;

// hwstat bits.
const HWSTAT_ACTIVE: u8 = 0x01;
const HWSTAT_SCANPWR_OFF: u8 = 0x80;

/// Extract the type tag of an interrupt packet.
pub fn irq_type(buf: &[u8; IRQ_LENGTH]) -> u16 {
    u16::from_be_bytes([buf[0], buf[1]])
}

/// An open, powered-up fingerprint reader.
///
/// Generic over the transport so the power-up protocol and capture path
/// can be exercised against a scripted mock.
pub struct Device<T: Transport = UsbTransport> {
    transport: T,
    entry: &'static Entry,
    keepalive: KeepAlive,
}

impl Device<UsbTransport> {
    /// Open the first supported reader on the bus.
    pub fn open() -> Result<Self> {
        Self::open_idx(0)
    }

    /// Open the `idx`-th supported reader on the bus.
    pub fn open_idx(idx: usize) -> Result<Self> {
        let devices = rusb::devices().map_err(Error::Usb)?;
        let mut count = 0;

        for dev in devices.iter() {
            let desc = match dev.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };
            let entry = match registry::lookup(desc.vendor_id(), desc.product_id()) {
                Some(e) => e,
                None => continue,
            };
            if count < idx {
                count += 1;
                continue;
            }

            log::info!("found {}", entry.name);
            let transport = claim_vendor_interface(&dev)?;
            return Device::attach(transport, entry);
        }

        Err(Error::NoDevice)
    }
}

impl<T: Transport> Device<T> {
    /// Run the power-up handshake over an already-claimed transport.
    pub fn attach(transport: T, entry: &'static Entry) -> Result<Self> {
        let mut dev = Device {
            transport,
            entry,
            keepalive: KeepAlive::new(),
        };
        dev.power_up()?;
        Ok(dev)
    }

    pub fn entry(&self) -> &'static Entry {
        self.entry
    }

    /// Tear down without parking the hardware, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn power_up(&mut self) -> Result<()> {
        self.fix_firmware()?;

        let mut status = self.get_hwstat()?;

        // After a previous session parks the device with hwstat 0x80,
        // some units come back reporting 0x85 and never deliver the
        // power-on interrupt. Poking the low nibble until the ACTIVE
        // bit reads back is the only recovery that works.
        if status & 0x84 == 0x84 {
            log::info!("rebooting device power");
            self.set_hwstat(status & 0x0f)?;

            let mut recovered = false;
            for _ in 0..100 {
                status = self.get_hwstat()?;
                if status & HWSTAT_ACTIVE != 0 {
                    recovered = true;
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
            if !recovered {
                log::warn!("could not reboot device power");
                return Err(Error::PowerUp);
            }
        }

        if status & HWSTAT_SCANPWR_OFF == 0 {
            status |= HWSTAT_SCANPWR_OFF;
            self.set_hwstat(status)?;
        }

        // Power loop: keep writing the low nibble until SCANPWR_OFF
        // clears. The Bg2 refuses to wake unless each attempt is
        // accompanied by a challenge-response authentication.
        let park = status & 0x0f;
        let mut powered = false;
        for _ in 0..100 {
            self.set_hwstat(park)?;

            status = self.get_hwstat()?;
            if status & HWSTAT_SCANPWR_OFF == 0 {
                powered = true;
                break;
            }

            thread::sleep(Duration::from_millis(10));

            if self.entry.variant == Variant::Uru4000Bg2 {
                self.auth_cr()?;
            }
        }
        if !powered {
            log::warn!("could not power up device");
            return Err(Error::PowerUp);
        }

        self.irq_with_type(IRQ_SCANPWR_ON, 5)?;
        Ok(())
    }

    /// Clear the on-wire encryption enable bit in device firmware.
    ///
    /// The rest of the pipeline assumes plaintext frames; if the device
    /// ships with encryption on, captures would otherwise be garbage.
    fn fix_firmware(&mut self) -> Result<()> {
        let params = self.entry.variant.firmware_params();
        let addr = params.enc_addr() as u16;

        let mut val = [0u8];
        self.transport.control_in(USB_RQ_REG_READ, addr, &mut val)?;
        log::debug!(
            "encryption byte at {:#x} reads {:#04x}",
            params.fw_enc_offset,
            val[0]
        );

        let patched = val[0] & !0x10;
        if patched == val[0] {
            return Ok(());
        }

        self.transport.control_out(USB_RQ, addr, &[patched])?;
        log::debug!("fixed encryption byte to {patched:#04x}");
        Ok(())
    }

    /// Park the device (mode INIT, hwstat 0x80) and tear down the
    /// handle. Best-effort: the handle is consumed even if a write
    /// fails on the way out.
    pub fn close(mut self) -> Result<()> {
        let r1 = self.set_mode(Mode::Init);
        let r2 = self.set_hwstat(HWSTAT_SCANPWR_OFF);
        r1.and(r2)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        log::debug!("set mode {:#04x}", mode as u8);
        self.transport
            .control_out(USB_RQ, MODE_CONTROL, &[mode as u8])?;
        Ok(())
    }

    pub fn get_hwstat(&mut self) -> Result<u8> {
        let mut buf = [0u8];
        self.transport
            .control_in(USB_RQ, HWSTAT_CONTROL, &mut buf)?;
        log::debug!("hwstat reads {:#04x}", buf[0]);
        Ok(buf[0])
    }

    pub fn set_hwstat(&mut self, val: u8) -> Result<()> {
        log::debug!("set hwstat {val:#04x}");
        self.transport
            .control_out(USB_RQ, HWSTAT_CONTROL, &[val])?;
        Ok(())
    }

    /// Set the brightness of the decorative edge light (0 = off,
    /// 255 = bright). Only present on some models.
    pub fn set_edge_light(&mut self, brightness: u8) -> Result<()> {
        if !self.entry.has_edge_light() {
            return Err(Error::InvalidInput("device has no edge light"));
        }
        self.transport
            .control_out(USB_RQ, EDGE_LIGHT_CONTROL, &[brightness])?;
        Ok(())
    }

    /// Write a short challenge to the device (purpose not fully
    /// understood; kept for protocol exploration).
    pub fn challenge(&mut self, param: &[u8; CHALLENGE_LENGTH]) -> Result<()> {
        self.transport
            .control_out(USB_RQ, CHALLENGE_CONTROL, param)?;
        Ok(())
    }

    /// Read back the response to a previous challenge.
    pub fn read_response(&mut self) -> Result<[u8; RESPONSE_LENGTH]> {
        let mut buf = [0u8; RESPONSE_LENGTH];
        self.transport
            .control_in(USB_RQ, RESPONSE_CONTROL, &mut buf)?;
        Ok(buf)
    }

    /// One round of the AES keep-alive: read a 16-byte challenge,
    /// return its encryption under the fixed vendor key.
    pub fn auth_cr(&mut self) -> Result<()> {
        let mut challenge = [0u8; AUTH_CR_LENGTH];
        let n = self
            .transport
            .control_in(USB_RQ, AUTH_CHALLENGE, &mut challenge)?;
        if n < AUTH_CR_LENGTH {
            return Err(Error::Protocol("short auth challenge"));
        }

        let response = self.keepalive.respond(&challenge);

        let n = self
            .transport
            .control_out(USB_RQ, AUTH_RESPONSE, &response)?;
        if n < AUTH_CR_LENGTH {
            return Err(Error::Protocol("short auth response write"));
        }
        Ok(())
    }

    /// Read one interrupt packet. `timeout_s` bounds the wait in whole
    /// seconds; 0 means wait forever.
    ///
    /// Each attempt uses a one-second transfer timeout and timeouts are
    /// retried, because libusb backends disagree on what an infinite
    /// timeout means. A packet shorter than 64 bytes is a wire error.
    pub fn get_irq(&mut self, timeout_s: u32) -> Result<[u8; IRQ_LENGTH]> {
        let infinite = timeout_s == 0;
        let mut remaining = timeout_s;
        let mut buf = [0u8; IRQ_LENGTH];

        loop {
            match self
                .transport
                .interrupt_in(&mut buf, Duration::from_secs(1))
            {
                Ok(n) if n < IRQ_LENGTH => return Err(Error::ShortIrq(n)),
                Ok(_) => {
                    log::debug!("irq type {:#06x}", irq_type(&buf));
                    return Ok(buf);
                }
                Err(e) if e.is_timeout() && (infinite || remaining > 0) => {
                    log::debug!("irq timeout, retry");
                    remaining = remaining.saturating_sub(1);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait for an interrupt of the given type, silently discarding
    /// others. Stale finger events from a previous session routinely
    /// show up here.
    pub fn irq_with_type(&mut self, expected: u16, timeout_s: u32) -> Result<[u8; IRQ_LENGTH]> {
        let mut discarded = 0u32;
        loop {
            let buf = self.get_irq(timeout_s)?;
            if irq_type(&buf) == expected {
                if discarded > 0 {
                    log::debug!("discarded {discarded} interrupts");
                }
                return Ok(buf);
            }
            discarded += 1;
        }
    }

    /// Enter finger-detection mode and block until a finger arrives.
    pub fn await_finger_on(&mut self) -> Result<()> {
        self.set_mode(Mode::AwaitFingerOn)?;
        self.irq_with_type(IRQ_FINGER_ON, 0)?;
        Ok(())
    }

    /// Block until the finger leaves the sensor.
    pub fn await_finger_off(&mut self) -> Result<()> {
        self.set_mode(Mode::AwaitFingerOff)?;
        self.irq_with_type(IRQ_FINGER_OFF, 0)?;
        Ok(())
    }

    /// Read one full frame into `fp`: a 0x10000-byte block followed by
    /// a 0xb340-byte block, concatenated. The first 64 bytes are the
    /// device header; everything after is pixel data.
    ///
    /// The first block must arrive complete. The second may come up
    /// short, which is how partial frames (`data_size < W*H`) arise.
    pub fn capture(&mut self, fp: &mut Frame) -> Result<()> {
        let buf = fp.raw_mut();

        let trf1 = self.transport.bulk_in(&mut buf[..DATABLK1_RQSIZE])?;
        if trf1 < DATABLK1_RQSIZE {
            return Err(Error::ShortRead {
                got: trf1,
                want: DATABLK1_RQSIZE,
            });
        }

        let trf2 = self
            .transport
            .bulk_in(&mut buf[trf1..trf1 + DATABLK2_RQSIZE])?;

        fp.set_capture_sizes(trf1 + trf2);
        if looks_encrypted(fp.data()) {
            log::warn!("captured frame looks like noise; the firmware encryption patch may not have taken");
        }
        log::debug!("captured frame, {} pixel bytes", fp.data_size());
        Ok(())
    }
}

/// Heuristic for frames that are still encrypted on the wire: optical
/// captures are locally smooth, ciphertext is not. Compares the mean
/// adjacent-pixel difference of a sample against the white-noise range.
fn looks_encrypted(data: &[u8]) -> bool {
    let mut sum = 0u32;
    let mut n = 0u32;
    for w in data.windows(2).take(8192) {
        sum += w[0].abs_diff(w[1]) as u32;
        n += 1;
    }
    n > 0 && sum / n > 64
}

/// Find and claim the vendor-specific interface (class, subclass and
/// protocol all 0xff). It must expose exactly the interrupt endpoint
/// 0x81 and the bulk endpoint 0x82.
fn claim_vendor_interface(
    dev: &rusb::Device<rusb::GlobalContext>,
) -> Result<UsbTransport> {
    let config = dev.active_config_descriptor().map_err(Error::Usb)?;
    let handle = dev.open().map_err(Error::Usb)?;

    for iface in config.interfaces() {
        let desc = match iface.descriptors().next() {
            Some(d) => d,
            None => continue,
        };
        if desc.class_code() != 0xff
            || desc.sub_class_code() != 0xff
            || desc.protocol_code() != 0xff
        {
            continue;
        }

        if desc.num_endpoints() != 2 {
            log::warn!("found {} endpoints!?", desc.num_endpoints());
            return Err(Error::BadEndpoints);
        }

        let mut eps = desc.endpoint_descriptors();
        let intr = eps.next().ok_or(Error::BadEndpoints)?;
        let data = eps.next().ok_or(Error::BadEndpoints)?;

        if intr.address() != EP_INTR || intr.transfer_type() != rusb::TransferType::Interrupt {
            return Err(Error::BadEndpoints);
        }
        if data.address() != EP_DATA || data.transfer_type() != rusb::TransferType::Bulk {
            return Err(Error::BadEndpoints);
        }

        handle
            .claim_interface(desc.interface_number())
            .map_err(Error::Usb)?;
        return Ok(UsbTransport::new(handle, desc.interface_number()));
    }

    Err(Error::Protocol("no vendor interface"))
}
