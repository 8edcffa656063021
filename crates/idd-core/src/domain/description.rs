//! Monitor description parsing and synthesis.
//!
//! When a monitor arrives, the host hands the driver an opaque blob of
//! *description bytes*.  This driver uses the EDID 1.x base block for that
//! blob: the same 128-byte structure real monitors expose over DDC.
//!
//! # EDID in one paragraph (for beginners)
//!
//! An EDID block starts with a fixed 8-byte header, carries the vendor and
//! product identity, the physical screen size, and several lists of timings
//! the monitor accepts.  The last byte is a checksum chosen so that all 128
//! bytes sum to zero (mod 256).  The timing lists, in the order this parser
//! reads them, are:
//!
//! | Offset  | List                   | Notes                                |
//! |---------|------------------------|--------------------------------------|
//! | 54..126 | Detailed timings (4×18)| First one is the preferred mode      |
//! | 38..54  | Standard timings (8×2) | Width + aspect ratio + refresh       |
//! | 35..37  | Established timings    | One bit per legacy VESA mode         |
//!
//! Modes are reported in exactly that order with duplicate timings removed.
//!
//! [`EdidBuilder`] does the reverse: it synthesises a valid base block from a
//! mode list so configured virtual monitors get a description that
//! round-trips through [`parse_description`].

use thiserror::Error;
use tracing::trace;

use crate::domain::mode::{Mode, ModeList, ModeListError};

/// Length of an EDID base block.
pub const EDID_BLOCK_LEN: usize = 128;

const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

const DTD_LEN: usize = 18;
const DTD_OFFSETS: [usize; 4] = [54, 72, 90, 108];

const STANDARD_TIMING_OFFSET: usize = 38;
const STANDARD_TIMING_SLOTS: usize = 8;
const STANDARD_TIMING_UNUSED: [u8; 2] = [0x01, 0x01];

const DESCRIPTOR_MONITOR_NAME: u8 = 0xFC;
const DESCRIPTOR_DUMMY: u8 = 0x10;
const MONITOR_NAME_MAX: usize = 13;

/// Largest width or height a detailed timing descriptor can carry (12 bits).
pub const MAX_ENCODABLE_DIMENSION: u32 = 0xFFF;

/// Established timing bits: (byte offset, bit, mode).
///
/// 1024x768@87 interlaced (byte 36, bit 4) is deliberately absent.
const ESTABLISHED_TIMINGS: [(usize, u8, Mode); 15] = [
    (35, 7, Mode::new(720, 400, 70)),
    (35, 6, Mode::new(720, 400, 88)),
    (35, 5, Mode::new(640, 480, 60)),
    (35, 4, Mode::new(640, 480, 67)),
    (35, 3, Mode::new(640, 480, 72)),
    (35, 2, Mode::new(640, 480, 75)),
    (35, 1, Mode::new(800, 600, 56)),
    (35, 0, Mode::new(800, 600, 60)),
    (36, 7, Mode::new(800, 600, 72)),
    (36, 6, Mode::new(800, 600, 75)),
    (36, 5, Mode::new(832, 624, 75)),
    (36, 3, Mode::new(1024, 768, 60)),
    (36, 2, Mode::new(1024, 768, 70)),
    (36, 1, Mode::new(1024, 768, 75)),
    (36, 0, Mode::new(1280, 1024, 75)),
];

// Blanking used for synthesised detailed timings (CVT reduced-blanking style).
const SYNTH_H_BLANK: u32 = 160;
const SYNTH_H_FRONT: u32 = 48;
const SYNTH_H_SYNC: u32 = 32;
const SYNTH_V_BLANK: u32 = 45;
const SYNTH_V_FRONT: u32 = 3;
const SYNTH_V_SYNC: u32 = 5;

/// Errors produced when a description cannot be turned into a mode list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptionParseError {
    #[error("description too short: {len} bytes, need at least {EDID_BLOCK_LEN}")]
    TooShort { len: usize },

    #[error("description does not start with the EDID header")]
    BadHeader,

    #[error("EDID checksum mismatch: block sums to {sum:#04x}")]
    BadChecksum { sum: u8 },

    #[error("unsupported EDID version {version}.{revision}")]
    UnsupportedVersion { version: u8, revision: u8 },

    #[error("description contains no usable timing")]
    NoModes,
}

/// The parsed form of a monitor description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorDescription {
    /// Supported modes in descending preference order.
    pub modes: ModeList,
    /// Physical image size in millimetres, when the description carries one.
    pub physical_size_mm: Option<(u32, u32)>,
    /// Three-letter PNP manufacturer id, e.g. `"IDD"`.
    pub manufacturer: String,
    pub product_code: u16,
    /// Monitor name descriptor text, if present.
    pub name: Option<String>,
}

/// Parses raw description bytes (an EDID 1.x base block) into a
/// [`MonitorDescription`].
///
/// Bytes past the first 128 (extension blocks) are ignored.
///
/// # Errors
///
/// Returns a [`DescriptionParseError`] if the block is truncated, has a bad
/// header or checksum, is not EDID version 1, or yields no usable mode.
pub fn parse_description(bytes: &[u8]) -> Result<MonitorDescription, DescriptionParseError> {
    if bytes.len() < EDID_BLOCK_LEN {
        return Err(DescriptionParseError::TooShort { len: bytes.len() });
    }
    let block = &bytes[..EDID_BLOCK_LEN];

    if block[..EDID_HEADER.len()] != EDID_HEADER {
        return Err(DescriptionParseError::BadHeader);
    }

    let sum = block.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != 0 {
        return Err(DescriptionParseError::BadChecksum { sum });
    }

    let (version, revision) = (block[18], block[19]);
    if version != 1 {
        return Err(DescriptionParseError::UnsupportedVersion { version, revision });
    }

    let mut modes = Vec::new();
    let mut image_size_mm = None;
    let mut name = None;

    for &offset in &DTD_OFFSETS {
        match parse_detailed_slot(&block[offset..offset + DTD_LEN]) {
            DetailedSlot::Timing { mode, image_size_mm: size } => {
                modes.push(mode);
                if image_size_mm.is_none() {
                    image_size_mm = size;
                }
            }
            DetailedSlot::MonitorName(text) => name = Some(text),
            DetailedSlot::Other => {}
        }
    }

    for slot in 0..STANDARD_TIMING_SLOTS {
        let at = STANDARD_TIMING_OFFSET + slot * 2;
        if let Some(mode) = parse_standard_timing(block[at], block[at + 1], revision) {
            modes.push(mode);
        }
    }

    for (byte, bit, mode) in ESTABLISHED_TIMINGS {
        if block[byte] & (1 << bit) != 0 {
            modes.push(mode);
        }
    }

    let modes = ModeList::new(modes).map_err(|_| DescriptionParseError::NoModes)?;

    let physical_size_mm = image_size_mm.or_else(|| {
        let (w_cm, h_cm) = (u32::from(block[21]), u32::from(block[22]));
        (w_cm > 0 && h_cm > 0).then_some((w_cm * 10, h_cm * 10))
    });

    Ok(MonitorDescription {
        modes,
        physical_size_mm,
        manufacturer: decode_manufacturer(block[8], block[9]),
        product_code: u16::from_le_bytes([block[10], block[11]]),
        name,
    })
}

enum DetailedSlot {
    Timing {
        mode: Mode,
        image_size_mm: Option<(u32, u32)>,
    },
    MonitorName(String),
    Other,
}

fn parse_detailed_slot(slot: &[u8]) -> DetailedSlot {
    let clock_10khz = u16::from_le_bytes([slot[0], slot[1]]);
    if clock_10khz == 0 {
        // Display descriptor rather than a timing.
        if slot[3] == DESCRIPTOR_MONITOR_NAME {
            return DetailedSlot::MonitorName(decode_descriptor_text(&slot[5..DTD_LEN]));
        }
        return DetailedSlot::Other;
    }

    // Interlaced timings are not offered to the host.
    if slot[17] & 0x80 != 0 {
        trace!("skipping interlaced detailed timing");
        return DetailedSlot::Other;
    }

    let h_active = u32::from(slot[2]) | (u32::from(slot[4] & 0xF0) << 4);
    let h_blank = u32::from(slot[3]) | (u32::from(slot[4] & 0x0F) << 8);
    let v_active = u32::from(slot[5]) | (u32::from(slot[7] & 0xF0) << 4);
    let v_blank = u32::from(slot[6]) | (u32::from(slot[7] & 0x0F) << 8);

    let total = u64::from(h_active + h_blank) * u64::from(v_active + v_blank);
    if h_active == 0 || v_active == 0 || total == 0 {
        return DetailedSlot::Other;
    }

    let clock_hz = u64::from(clock_10khz) * 10_000;
    let refresh_hz = ((clock_hz + total / 2) / total) as u32;
    let mode = Mode::new(h_active, v_active, refresh_hz);
    if !mode.is_valid() {
        return DetailedSlot::Other;
    }

    let width_mm = u32::from(slot[12]) | (u32::from(slot[14] & 0xF0) << 4);
    let height_mm = u32::from(slot[13]) | (u32::from(slot[14] & 0x0F) << 8);
    let image_size_mm = (width_mm > 0 && height_mm > 0).then_some((width_mm, height_mm));

    DetailedSlot::Timing {
        mode,
        image_size_mm,
    }
}

fn parse_standard_timing(b0: u8, b1: u8, revision: u8) -> Option<Mode> {
    if [b0, b1] == STANDARD_TIMING_UNUSED || (b0 == 0 && b1 == 0) {
        return None;
    }

    let width = (u32::from(b0) + 31) * 8;
    let height = match b1 >> 6 {
        // 16:10 from EDID 1.3 on; 1:1 before that.
        0 if revision >= 3 => width * 10 / 16,
        0 => width,
        1 => width * 3 / 4,
        2 => width * 4 / 5,
        _ => width * 9 / 16,
    };
    let refresh_hz = u32::from(b1 & 0x3F) + 60;

    Some(Mode::new(width, height, refresh_hz))
}

fn decode_descriptor_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0x0A).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

fn decode_manufacturer(hi: u8, lo: u8) -> String {
    let id = u16::from_be_bytes([hi, lo]);
    [(id >> 10) & 0x1F, (id >> 5) & 0x1F, id & 0x1F]
        .iter()
        .map(|&c| if (1..=26).contains(&c) { char::from(b'A' + c as u8 - 1) } else { '?' })
        .collect()
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Errors produced by [`EdidBuilder::build`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EdidBuildError {
    #[error("at least one mode is required")]
    NoModes,

    #[error("mode {0} cannot be encoded in an EDID base block")]
    ModeNotEncodable(Mode),

    #[error("too many modes for one EDID base block")]
    TooManyModes,

    #[error("manufacturer id must be three ASCII letters A-Z, got {0:?}")]
    InvalidManufacturer(String),
}

/// Synthesises an EDID base block from a mode list.
///
/// Modes fill the detailed timing slots first (the first mode becomes the
/// preferred timing) and overflow into the standard timing slots, so the
/// order reported by [`parse_description`] matches the order given here.
///
/// # Example
///
/// ```rust
/// use idd_core::{parse_description, EdidBuilder, Mode};
///
/// let bytes = EdidBuilder::new([Mode::new(1920, 1080, 60), Mode::new(1280, 720, 60)])
///     .build()
///     .unwrap();
/// let parsed = parse_description(&bytes).unwrap();
/// assert_eq!(parsed.modes.default_mode(), Mode::preferred(1920, 1080, 60));
/// ```
#[derive(Debug, Clone)]
pub struct EdidBuilder {
    modes: Vec<Mode>,
    manufacturer: String,
    product_code: u16,
    serial: u32,
    physical_size_mm: Option<(u32, u32)>,
    monitor_name: Option<String>,
}

impl EdidBuilder {
    pub fn new(modes: impl IntoIterator<Item = Mode>) -> Self {
        Self {
            modes: modes.into_iter().collect(),
            manufacturer: "IDD".to_string(),
            product_code: 0x0001,
            serial: 0,
            physical_size_mm: None,
            monitor_name: None,
        }
    }

    pub fn manufacturer(mut self, id: impl Into<String>) -> Self {
        self.manufacturer = id.into();
        self
    }

    pub fn product_code(mut self, code: u16) -> Self {
        self.product_code = code;
        self
    }

    pub fn serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    pub fn physical_size_mm(mut self, width_mm: u32, height_mm: u32) -> Self {
        self.physical_size_mm = Some((width_mm, height_mm));
        self
    }

    /// Sets the monitor name descriptor (truncated to 13 bytes).
    ///
    /// The descriptor occupies one detailed slot, leaving three for timings.
    pub fn monitor_name(mut self, name: impl Into<String>) -> Self {
        self.monitor_name = Some(name.into());
        self
    }

    /// Produces the 128-byte base block.
    ///
    /// # Errors
    ///
    /// See [`EdidBuildError`].
    pub fn build(&self) -> Result<Vec<u8>, EdidBuildError> {
        let modes = ModeList::new(self.modes.iter().copied()).map_err(|e| match e {
            ModeListError::Empty => EdidBuildError::NoModes,
            ModeListError::InvalidMode(m) => EdidBuildError::ModeNotEncodable(m),
        })?;

        let mut block = [0u8; EDID_BLOCK_LEN];
        block[..EDID_HEADER.len()].copy_from_slice(&EDID_HEADER);
        block[8..10].copy_from_slice(&encode_manufacturer(&self.manufacturer)?);
        block[10..12].copy_from_slice(&self.product_code.to_le_bytes());
        block[12..16].copy_from_slice(&self.serial.to_le_bytes());
        block[17] = 34; // manufacture year 2024 (offset from 1990)
        block[18] = 1;
        block[19] = 4;
        block[20] = 0xA5; // digital input, 8 bits per colour
        let (width_mm, height_mm) = self.physical_size_mm.unwrap_or((0, 0));
        block[21] = (width_mm / 10).min(255) as u8;
        block[22] = (height_mm / 10).min(255) as u8;
        block[23] = 0x78; // gamma 2.2
        block[24] = 0x06;
        for slot in 0..STANDARD_TIMING_SLOTS {
            let at = STANDARD_TIMING_OFFSET + slot * 2;
            block[at..at + 2].copy_from_slice(&STANDARD_TIMING_UNUSED);
        }

        let timing_slots = if self.monitor_name.is_some() {
            DTD_OFFSETS.len() - 1
        } else {
            DTD_OFFSETS.len()
        };
        let (detailed, standard) = modes
            .as_slice()
            .split_at(modes.len().min(timing_slots));

        if standard.len() > STANDARD_TIMING_SLOTS {
            return Err(EdidBuildError::TooManyModes);
        }

        let mut slots = DTD_OFFSETS.iter();
        for mode in detailed {
            let at = *slots.next().ok_or(EdidBuildError::TooManyModes)?;
            let encoded = encode_detailed_timing(mode, (width_mm, height_mm))?;
            block[at..at + DTD_LEN].copy_from_slice(&encoded);
        }
        if let Some(name) = &self.monitor_name {
            if let Some(&at) = slots.next() {
                block[at..at + DTD_LEN].copy_from_slice(&encode_name_descriptor(name));
            }
        }
        for &at in slots {
            block[at + 3] = DESCRIPTOR_DUMMY;
        }

        for (slot, mode) in standard.iter().enumerate() {
            let at = STANDARD_TIMING_OFFSET + slot * 2;
            let encoded = encode_standard_timing(mode).ok_or(EdidBuildError::ModeNotEncodable(*mode))?;
            block[at..at + 2].copy_from_slice(&encoded);
        }

        let sum = block[..EDID_BLOCK_LEN - 1]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        block[EDID_BLOCK_LEN - 1] = 0u8.wrapping_sub(sum);

        Ok(block.to_vec())
    }
}

fn encode_manufacturer(id: &str) -> Result<[u8; 2], EdidBuildError> {
    let letters = id.as_bytes();
    if letters.len() != 3 || !letters.iter().all(u8::is_ascii_uppercase) {
        return Err(EdidBuildError::InvalidManufacturer(id.to_string()));
    }
    let code = letters
        .iter()
        .fold(0u16, |acc, &c| (acc << 5) | u16::from(c - b'A' + 1));
    Ok(code.to_be_bytes())
}

fn encode_detailed_timing(mode: &Mode, image_mm: (u32, u32)) -> Result<[u8; DTD_LEN], EdidBuildError> {
    let not_encodable = || EdidBuildError::ModeNotEncodable(*mode);

    if mode.width > MAX_ENCODABLE_DIMENSION || mode.height > MAX_ENCODABLE_DIMENSION {
        return Err(not_encodable());
    }

    let total = u64::from(mode.width + SYNTH_H_BLANK) * u64::from(mode.height + SYNTH_V_BLANK);
    let clock_10khz = (total * u64::from(mode.refresh_hz) + 5_000) / 10_000;
    let clock_10khz = u16::try_from(clock_10khz).map_err(|_| not_encodable())?;
    if clock_10khz == 0 {
        return Err(not_encodable());
    }

    // Rounding the pixel clock must not move the refresh rate.
    let recovered = (u64::from(clock_10khz) * 10_000 + total / 2) / total;
    if recovered != u64::from(mode.refresh_hz) {
        return Err(not_encodable());
    }

    let (w, h) = (mode.width, mode.height);
    let (w_mm, h_mm) = (image_mm.0.min(0xFFF), image_mm.1.min(0xFFF));

    let mut dtd = [0u8; DTD_LEN];
    dtd[0..2].copy_from_slice(&clock_10khz.to_le_bytes());
    dtd[2] = (w & 0xFF) as u8;
    dtd[3] = (SYNTH_H_BLANK & 0xFF) as u8;
    dtd[4] = (((w >> 8) & 0x0F) << 4 | ((SYNTH_H_BLANK >> 8) & 0x0F)) as u8;
    dtd[5] = (h & 0xFF) as u8;
    dtd[6] = (SYNTH_V_BLANK & 0xFF) as u8;
    dtd[7] = (((h >> 8) & 0x0F) << 4 | ((SYNTH_V_BLANK >> 8) & 0x0F)) as u8;
    dtd[8] = SYNTH_H_FRONT as u8;
    dtd[9] = SYNTH_H_SYNC as u8;
    dtd[10] = ((SYNTH_V_FRONT << 4) | SYNTH_V_SYNC) as u8;
    dtd[11] = 0;
    dtd[12] = (w_mm & 0xFF) as u8;
    dtd[13] = (h_mm & 0xFF) as u8;
    dtd[14] = (((w_mm >> 8) & 0x0F) << 4 | ((h_mm >> 8) & 0x0F)) as u8;
    dtd[17] = 0x1E; // digital separate sync, +hsync +vsync
    Ok(dtd)
}

fn encode_standard_timing(mode: &Mode) -> Option<[u8; 2]> {
    let (w, h) = (mode.width, mode.height);
    if w % 8 != 0 || w / 8 <= 31 || w / 8 - 31 > 255 {
        return None;
    }
    if !(60..=123).contains(&mode.refresh_hz) {
        return None;
    }

    // Widened: the height is unbounded here.
    let (wide_w, wide_h) = (u64::from(w), u64::from(h));
    let aspect: u8 = if wide_h * 16 == wide_w * 10 {
        0
    } else if wide_h * 4 == wide_w * 3 {
        1
    } else if wide_h * 5 == wide_w * 4 {
        2
    } else if wide_h * 16 == wide_w * 9 {
        3
    } else {
        return None;
    };

    let encoded = [(w / 8 - 31) as u8, (aspect << 6) | (mode.refresh_hz - 60) as u8];
    (encoded != STANDARD_TIMING_UNUSED).then_some(encoded)
}

fn encode_name_descriptor(name: &str) -> [u8; DTD_LEN] {
    let mut slot = [0u8; DTD_LEN];
    slot[3] = DESCRIPTOR_MONITOR_NAME;
    let text = &name.as_bytes()[..name.len().min(MONITOR_NAME_MAX)];
    slot[5..5 + text.len()].copy_from_slice(text);
    if text.len() < MONITOR_NAME_MAX {
        slot[5 + text.len()] = 0x0A;
        for b in &mut slot[6 + text.len()..] {
            *b = 0x20;
        }
    }
    slot
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_checksum(block: &mut [u8]) {
        let sum = block[..EDID_BLOCK_LEN - 1]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        block[EDID_BLOCK_LEN - 1] = 0u8.wrapping_sub(sum);
    }

    /// A hand-assembled block: CEA 1080p60 detailed timing plus a 720p60
    /// standard timing, 53x30 cm.
    fn hand_built_block() -> Vec<u8> {
        let mut block = vec![0u8; EDID_BLOCK_LEN];
        block[..8].copy_from_slice(&EDID_HEADER);
        block[18] = 1;
        block[19] = 3;
        block[21] = 53;
        block[22] = 30;
        for slot in 0..STANDARD_TIMING_SLOTS {
            let at = STANDARD_TIMING_OFFSET + slot * 2;
            block[at..at + 2].copy_from_slice(&STANDARD_TIMING_UNUSED);
        }
        // 1280x720@60: (1280/8 - 31) = 129, aspect 16:9 (0b11), refresh 60 - 60 = 0
        block[38] = 129;
        block[39] = 0b1100_0000;
        // 148.5 MHz, 1920 + 280 blank, 1080 + 45 blank
        block[54..62].copy_from_slice(&[0x02, 0x3A, 0x80, 0x18, 0x71, 0x38, 0x2D, 0x40]);
        fix_checksum(&mut block);
        block
    }

    #[test]
    fn test_parse_hand_built_block_reports_detailed_then_standard_timings() {
        // Arrange
        let block = hand_built_block();

        // Act
        let parsed = parse_description(&block).expect("valid block");

        // Assert
        assert_eq!(
            parsed.modes.as_slice(),
            &[Mode::preferred(1920, 1080, 60), Mode::new(1280, 720, 60)]
        );
        assert_eq!(parsed.physical_size_mm, Some((530, 300)));
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert_eq!(
            parse_description(&[0u8; 64]),
            Err(DescriptionParseError::TooShort { len: 64 })
        );
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        let mut block = hand_built_block();
        block[0] = 0x42;
        fix_checksum(&mut block);
        assert_eq!(parse_description(&block), Err(DescriptionParseError::BadHeader));
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let mut block = hand_built_block();
        block[127] = block[127].wrapping_add(1);
        assert_eq!(
            parse_description(&block),
            Err(DescriptionParseError::BadChecksum { sum: 1 })
        );
    }

    #[test]
    fn test_parse_rejects_edid_version_two() {
        let mut block = hand_built_block();
        block[18] = 2;
        fix_checksum(&mut block);
        assert!(matches!(
            parse_description(&block),
            Err(DescriptionParseError::UnsupportedVersion { version: 2, .. })
        ));
    }

    #[test]
    fn test_parse_block_without_timings_is_no_modes() {
        let mut block = vec![0u8; EDID_BLOCK_LEN];
        block[..8].copy_from_slice(&EDID_HEADER);
        block[18] = 1;
        fix_checksum(&mut block);
        assert_eq!(parse_description(&block), Err(DescriptionParseError::NoModes));
    }

    #[test]
    fn test_parse_reads_established_timings_after_other_lists() {
        let mut block = hand_built_block();
        block[35] = 0b0010_0000; // 640x480@60
        block[36] = 0b0000_1000; // 1024x768@60
        fix_checksum(&mut block);

        let parsed = parse_description(&block).unwrap();

        assert_eq!(
            parsed.modes.as_slice()[2..],
            [Mode::new(640, 480, 60), Mode::new(1024, 768, 60)]
        );
    }

    #[test]
    fn test_parse_skips_interlaced_detailed_timing() {
        let mut block = hand_built_block();
        block[54 + 17] = 0x80;
        fix_checksum(&mut block);

        let parsed = parse_description(&block).unwrap();

        assert_eq!(parsed.modes.default_mode(), Mode::preferred(1280, 720, 60));
    }

    #[test]
    fn test_builder_round_trips_mode_order() {
        // Arrange
        let modes = [
            Mode::new(1920, 1080, 60),
            Mode::new(1280, 720, 60),
            Mode::new(2560, 1440, 144),
        ];

        // Act
        let bytes = EdidBuilder::new(modes).build().expect("build");
        let parsed = parse_description(&bytes).expect("parse");

        // Assert
        assert_eq!(bytes.len(), EDID_BLOCK_LEN);
        assert_eq!(
            parsed.modes.as_slice(),
            &[
                Mode::preferred(1920, 1080, 60),
                Mode::new(1280, 720, 60),
                Mode::new(2560, 1440, 144),
            ]
        );
    }

    #[test]
    fn test_builder_overflows_into_standard_timings() {
        // Arrange – five modes, four detailed slots
        let modes = [
            Mode::new(3840, 2160, 60),
            Mode::new(2560, 1440, 60),
            Mode::new(1920, 1080, 60),
            Mode::new(1680, 1050, 60),
            Mode::new(1280, 720, 60),
        ];

        // Act
        let bytes = EdidBuilder::new(modes).build().expect("build");
        let parsed = parse_description(&bytes).expect("parse");

        // Assert
        assert_eq!(parsed.modes.len(), 5);
        assert_eq!(parsed.modes.as_slice()[4], Mode::new(1280, 720, 60));
        assert_eq!(&bytes[38..40], &[129, 0b1100_0000]);
    }

    #[test]
    fn test_builder_rejects_overflow_mode_without_standard_encoding() {
        let modes = [
            Mode::new(3840, 2160, 60),
            Mode::new(2560, 1440, 60),
            Mode::new(1920, 1080, 60),
            Mode::new(1680, 1050, 60),
            Mode::new(1366, 768, 60),
        ];

        let result = EdidBuilder::new(modes).build();

        assert_eq!(result, Err(EdidBuildError::ModeNotEncodable(Mode::new(1366, 768, 60))));
    }

    #[test]
    fn test_builder_rejects_overflow_mode_with_huge_height() {
        // Arrange – the fifth mode lands in the standard timing area
        let huge = Mode::new(1280, 0x1000_0000, 60);
        let modes = [
            Mode::new(3840, 2160, 60),
            Mode::new(2560, 1440, 60),
            Mode::new(1920, 1080, 60),
            Mode::new(1680, 1050, 60),
            huge,
        ];

        // Act
        let result = EdidBuilder::new(modes).build();

        // Assert
        assert_eq!(result, Err(EdidBuildError::ModeNotEncodable(huge)));
    }

    #[test]
    fn test_builder_carries_identity_name_and_physical_size() {
        let bytes = EdidBuilder::new([Mode::new(1920, 1080, 60)])
            .manufacturer("ABC")
            .product_code(0x1234)
            .physical_size_mm(527, 296)
            .monitor_name("Virtual 1")
            .build()
            .unwrap();

        let parsed = parse_description(&bytes).unwrap();

        assert_eq!(parsed.manufacturer, "ABC");
        assert_eq!(parsed.product_code, 0x1234);
        assert_eq!(parsed.name.as_deref(), Some("Virtual 1"));
        assert_eq!(parsed.physical_size_mm, Some((527, 296)));
    }

    #[test]
    fn test_builder_rejects_lowercase_manufacturer() {
        let result = EdidBuilder::new([Mode::new(800, 600, 60)])
            .manufacturer("abc")
            .build();
        assert_eq!(result, Err(EdidBuildError::InvalidManufacturer("abc".into())));
    }

    #[test]
    fn test_builder_rejects_width_beyond_twelve_bits() {
        let mode = Mode::new(7680, 4320, 60);
        assert_eq!(
            EdidBuilder::new([mode]).build(),
            Err(EdidBuildError::ModeNotEncodable(mode))
        );
    }

    #[test]
    fn test_builder_without_modes_fails() {
        assert_eq!(EdidBuilder::new([]).build(), Err(EdidBuildError::NoModes));
    }
}
