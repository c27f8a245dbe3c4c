// transport.rs — Typed wrapper over the four USB transfer kinds the
// reader uses: control-in, control-out, bulk-in, interrupt-in.
//
// The `Transport` trait is the seam between the control plane and
// libusb: `UsbTransport` implements it over a claimed rusb handle, and
// the test suite substitutes a scripted mock to drive the power-up
// state machine without hardware.

use std::time::Duration;

use crate::error::Result;

/// Control transfer timeout.
pub const CTRL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Bulk transfer timeout. Frame data takes a while to clock out.
pub const BULK_TIMEOUT: Duration = Duration::from_millis(5000);

/// Interrupt endpoint address.
pub const EP_INTR: u8 = 0x81;

/// Bulk data endpoint address.
pub const EP_DATA: u8 = 0x82;

/// Request type for device-to-host vendor control transfers.
pub const USB_IN: u8 = 0xc0;

/// Request type for host-to-device vendor control transfers.
pub const USB_OUT: u8 = 0x40;

/// Request field shared by every command we know about.
pub const USB_RQ: u8 = 0x04;

/// Request field used only for the firmware register read. The Windows
/// driver uses 0x0c for reads; writes still go through 0x04.
pub const USB_RQ_REG_READ: u8 = 0x0c;

// Value field of control messages.
pub const HWSTAT_CONTROL: u16 = 0x07;
pub const EDGE_LIGHT_CONTROL: u16 = 0x20;
pub const MODE_CONTROL: u16 = 0x4e;
pub const CHALLENGE_CONTROL: u16 = 0x33;
pub const RESPONSE_CONTROL: u16 = 0x34;
pub const AUTH_CHALLENGE: u16 = 0x2010;
pub const AUTH_RESPONSE: u16 = 0x2000;

/// Byte counts of the two bulk blocks that make up one frame.
pub const DATABLK1_RQSIZE: usize = 0x10000;
pub const DATABLK2_RQSIZE: usize = 0xb340;

/// Blocking transfer primitives against one claimed vendor interface.
///
/// Every method returns the number of bytes actually transferred;
/// failures propagate the underlying transport error.
pub trait Transport {
    /// Vendor control transfer, device to host.
    fn control_in(&self, request: u8, value: u16, buf: &mut [u8]) -> Result<usize>;

    /// Vendor control transfer, host to device.
    fn control_out(&self, request: u8, value: u16, buf: &[u8]) -> Result<usize>;

    /// Bulk read from the data endpoint.
    fn bulk_in(&self, buf: &mut [u8]) -> Result<usize>;

    /// Interrupt read with the given per-attempt timeout.
    fn interrupt_in(&self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

/// `Transport` over a claimed rusb device handle.
pub struct UsbTransport {
    handle: rusb::DeviceHandle<rusb::GlobalContext>,
    iface: u8,
}

impl UsbTransport {
    pub fn new(handle: rusb::DeviceHandle<rusb::GlobalContext>, iface: u8) -> Self {
        UsbTransport { handle, iface }
    }
}

impl Drop for UsbTransport {
    /// Best-effort interface release: callers tearing the device down
    /// cannot do anything useful with a failure here.
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.iface) {
            log::warn!("interface release failed: {e}");
        }
    }
}

impl Transport for UsbTransport {
    fn control_in(&self, request: u8, value: u16, buf: &mut [u8]) -> Result<usize> {
        Ok(self
            .handle
            .read_control(USB_IN, request, value, 0, buf, CTRL_TIMEOUT)?)
    }

    fn control_out(&self, request: u8, value: u16, buf: &[u8]) -> Result<usize> {
        Ok(self
            .handle
            .write_control(USB_OUT, request, value, 0, buf, CTRL_TIMEOUT)?)
    }

    fn bulk_in(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.handle.read_bulk(EP_DATA, buf, BULK_TIMEOUT)?)
    }

    fn interrupt_in(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        Ok(self.handle.read_interrupt(EP_INTR, buf, timeout)?)
    }
}
