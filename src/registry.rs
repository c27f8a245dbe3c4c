// registry.rs — Table of supported readers keyed by (VID, PID).
//
// Each entry names the hardware variant and its capability flags. The
// variant selects the firmware parameters used by the encryption-byte
// patch at open time.

/// Hardware variant. Selects firmware layout and open-time quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Uru4000,
    Uru4000B,
    /// Second-generation 4000B. Requires the AES challenge-response
    /// keep-alive during power-up.
    Uru4000Bg2,
}

impl Variant {
    /// Firmware parameters: (firmware_start, fw_enc_offset). Their sum
    /// is the address of the byte whose 0x10 bit enables on-wire image
    /// encryption.
    pub fn firmware_params(self) -> FirmwareParams {
        match self {
            Variant::Uru4000 => FirmwareParams {
                firmware_start: 0x400,
                fw_enc_offset: 0x3f7,
            },
            Variant::Uru4000B => FirmwareParams {
                firmware_start: 0x100,
                fw_enc_offset: 0x42b,
            },
            Variant::Uru4000Bg2 => FirmwareParams {
                firmware_start: 0x100,
                fw_enc_offset: 0x52e,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FirmwareParams {
    pub firmware_start: u32,
    pub fw_enc_offset: u32,
}

impl FirmwareParams {
    /// Address of the encryption enable byte.
    pub fn enc_addr(&self) -> u32 {
        self.firmware_start + self.fw_enc_offset
    }
}

/// Device has the decorative oval edge light.
pub const CAP_EDGE_LIGHT: u8 = 1 << 0;

/// One supported reader model.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub vid: u16,
    pub pid: u16,
    pub variant: Variant,
    pub caps: u8,
    pub name: &'static str,
}

impl Entry {
    pub fn has_edge_light(&self) -> bool {
        self.caps & CAP_EDGE_LIGHT != 0
    }
}

pub static DEVICE_TABLE: &[Entry] = &[
    Entry {
        vid: 0x045e,
        pid: 0x00bb,
        variant: Variant::Uru4000B,
        caps: CAP_EDGE_LIGHT,
        name: "Microsoft Keyboard with Fingerprint reader",
    },
    Entry {
        vid: 0x045e,
        pid: 0x00bc,
        variant: Variant::Uru4000B,
        caps: CAP_EDGE_LIGHT,
        name: "Microsoft Wireless IntelliMouse with Fingerprint reader",
    },
    Entry {
        vid: 0x045e,
        pid: 0x00bd,
        variant: Variant::Uru4000B,
        caps: CAP_EDGE_LIGHT,
        name: "Microsoft Fingerprint reader (standalone)",
    },
    Entry {
        vid: 0x045e,
        pid: 0x00ca,
        variant: Variant::Uru4000Bg2,
        caps: CAP_EDGE_LIGHT,
        name: "Microsoft Fingerprint reader v2 (standalone)",
    },
    Entry {
        vid: 0x05ba,
        pid: 0x0007,
        variant: Variant::Uru4000,
        caps: 0,
        name: "Digital Persona U.are.U 4000",
    },
    Entry {
        vid: 0x05ba,
        pid: 0x000a,
        variant: Variant::Uru4000B,
        caps: 0,
        name: "Digital Persona U.are.U 4000B",
    },
];

/// Look up a reader model by USB IDs.
pub fn lookup(vid: u16, pid: u16) -> Option<&'static Entry> {
    DEVICE_TABLE.iter().find(|e| e.vid == vid && e.pid == pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_device_found() {
        let e = lookup(0x05ba, 0x0007).unwrap();
        assert_eq!(e.variant, Variant::Uru4000);
        assert!(!e.has_edge_light());
    }

    #[test]
    fn unknown_device_rejected() {
        assert!(lookup(0xdead, 0xbeef).is_none());
    }

    #[test]
    fn g2_firmware_params() {
        let p = Variant::Uru4000Bg2.firmware_params();
        assert_eq!(p.enc_addr(), 0x100 + 0x52e);
    }
}
