//! Segment e-paper frame
//!
//! Builds the 15-byte segment image for a 1.9" segment e-paper panel that
//! shows a temperature (three digits and a tenths digit) and a humidity
//! (two digits, a tenths digit and a percent sign).
//!
//! Each digit is two bytes of segment bits. The image only changes when a
//! reading moves by more than a tenth, so a panel refresh can be skipped
//! for jitter.

/// Bytes in one panel image
pub const FRAME_LEN: usize = 15;

/// Segment bits for digits 0-9, two bytes per digit
pub const DIGIT_CODES: [[u8; 2]; 10] = [
    [0xbf, 0x1f], // 0
    [0x00, 0x1f], // 1
    [0xfd, 0x17], // 2
    [0xf5, 0x1f], // 3
    [0x47, 0x1f], // 4
    [0xf7, 0x1d], // 5
    [0xff, 0x1d], // 6
    [0x21, 0x1f], // 7
    [0xff, 0x1f], // 8
    [0xf7, 0x1f], // 9
];

/// Decimal point bit in a digit's second byte
pub const DECIMAL_POINT: u8 = 0b0010_0000;
/// Percent sign bit in the last humidity byte
pub const PERCENT_SIGN: u8 = 0b0010_0000;

/// Largest value the panel can show
pub const MAX_VALUE: f32 = 199.9;

/// Readings move the frame only beyond this many hundredths
const CHANGE_THRESHOLD: i32 = 10;

/// Reading outside what the panel can show
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SegmentError {
    OutOfRange(f32),
}

/// Split `value` into `[tenths, ones, tens, hundreds]`
///
/// Digits are truncated, not rounded.
pub fn extract_digits(value: f32) -> Result<[u8; 4], SegmentError> {
    if !(0.0..=MAX_VALUE).contains(&value) {
        return Err(SegmentError::OutOfRange(value));
    }

    // Bias absorbs f32 representation error, e.g. 23.4 * 10 = 233.99998
    let scaled = (value * 10.0 + 0.001) as u32;
    Ok([
        (scaled % 10) as u8,
        ((scaled / 10) % 10) as u8,
        ((scaled / 100) % 10) as u8,
        (scaled / 1000) as u8,
    ])
}

/// Panel image plus the readings it shows
#[derive(Debug, Clone, Default)]
pub struct SegmentFrame {
    bytes: [u8; FRAME_LEN],
    temperature: Option<i32>,
    humidity: Option<i32>,
}

impl SegmentFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current image
    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Show a temperature in degrees
    ///
    /// Returns whether the image changed.
    pub fn set_temperature(&mut self, celsius: f32) -> Result<bool, SegmentError> {
        let digits = extract_digits(celsius)?;
        if !moved(&mut self.temperature, celsius) {
            return Ok(false);
        }

        let [tenths, ones, tens, hundreds] = digits.map(code);
        self.bytes[0] = hundreds[1];
        self.bytes[1] = tens[0];
        self.bytes[2] = tens[1];
        self.bytes[3] = ones[0];
        self.bytes[4] = ones[1] | DECIMAL_POINT;
        self.bytes[11] = tenths[0];
        self.bytes[12] = tenths[1];
        Ok(true)
    }

    /// Show a relative humidity in percent
    ///
    /// Returns whether the image changed.
    pub fn set_humidity(&mut self, percent: f32) -> Result<bool, SegmentError> {
        let digits = extract_digits(percent)?;
        if !moved(&mut self.humidity, percent) {
            return Ok(false);
        }

        let [tenths, ones, tens, _] = digits.map(code);
        self.bytes[5] = tens[0];
        self.bytes[6] = tens[1];
        self.bytes[7] = ones[0];
        self.bytes[8] = ones[1] | DECIMAL_POINT;
        self.bytes[9] = tenths[0];
        self.bytes[10] = tenths[1] | PERCENT_SIGN;
        Ok(true)
    }
}

fn code(digit: u8) -> [u8; 2] {
    DIGIT_CODES[usize::from(digit) % DIGIT_CODES.len()]
}

/// Record `value` if it differs from `last` by more than the threshold
fn moved(last: &mut Option<i32>, value: f32) -> bool {
    let hundredths = (value * 100.0) as i32;
    match *last {
        Some(previous) if (hundredths - previous).abs() <= CHANGE_THRESHOLD => false,
        _ => {
            *last = Some(hundredths);
            true
        }
    }
}
