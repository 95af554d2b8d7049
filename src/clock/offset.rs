/// A signed `HH:MM` UTC offset, parsed once into signed total minutes.
///
/// Offsets come from the lookup response, never from a timezone database.
/// The grammar is purely syntactic: a sign, two digits, a colon, two digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcOffset {
    minutes: i32,
}

impl UtcOffset {
    /// Parse a signed `HH:MM` string. Returns `None` for anything that does
    /// not match the grammar; the clock treats that as "no offset".
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 6 || bytes[3] != b':' {
            return None;
        }
        let sign: i32 = match bytes[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        let digit = |b: u8| (b as char).to_digit(10);
        let hours = digit(bytes[1])? * 10 + digit(bytes[2])?;
        let minutes = digit(bytes[4])? * 10 + digit(bytes[5])?;
        Some(Self {
            minutes: sign * (hours * 60 + minutes) as i32,
        })
    }

    /// Signed minutes from UTC.
    pub fn minutes(self) -> i32 {
        self.minutes
    }
}
