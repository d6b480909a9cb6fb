//! DTMF tone definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single touch-tone key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DtmfTone {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Asterisk,
    Pound,
}

impl DtmfTone {
    /// Every tone, in keypad order
    pub const ALL: [DtmfTone; 12] = [
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Asterisk,
        Self::Zero,
        Self::Pound,
    ];

    pub fn to_char(self) -> char {
        match self {
            Self::Zero => '0',
            Self::One => '1',
            Self::Two => '2',
            Self::Three => '3',
            Self::Four => '4',
            Self::Five => '5',
            Self::Six => '6',
            Self::Seven => '7',
            Self::Eight => '8',
            Self::Nine => '9',
            Self::Asterisk => '*',
            Self::Pound => '#',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Zero),
            '1' => Some(Self::One),
            '2' => Some(Self::Two),
            '3' => Some(Self::Three),
            '4' => Some(Self::Four),
            '5' => Some(Self::Five),
            '6' => Some(Self::Six),
            '7' => Some(Self::Seven),
            '8' => Some(Self::Eight),
            '9' => Some(Self::Nine),
            '*' => Some(Self::Asterisk),
            '#' => Some(Self::Pound),
            _ => None,
        }
    }

    /// Tone name as used in call-automation payloads
    pub fn name(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Three => "three",
            Self::Four => "four",
            Self::Five => "five",
            Self::Six => "six",
            Self::Seven => "seven",
            Self::Eight => "eight",
            Self::Nine => "nine",
            Self::Asterisk => "asterisk",
            Self::Pound => "pound",
        }
    }

    /// Whether this is one of the ten digit keys
    pub fn is_digit(self) -> bool {
        !matches!(self, Self::Asterisk | Self::Pound)
    }
}

impl fmt::Display for DtmfTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Error returned when text does not name a DTMF tone
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown DTMF tone '{0}'")]
pub struct ParseToneError(pub String);

impl FromStr for DtmfTone {
    type Err = ParseToneError;

    /// Accepts a keypad character (`"7"`, `"#"`) or a tone name (`"seven"`, `"Pound"`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(tone) = Self::from_char(c) {
                return Ok(tone);
            }
        }

        let lowered = trimmed.to_ascii_lowercase();
        // calling-server payloads spell digits as "tone0".."tone9"
        let numbered = lowered
            .strip_prefix("tone")
            .and_then(|digit| digit.parse::<char>().ok())
            .filter(char::is_ascii_digit)
            .and_then(Self::from_char);
        if let Some(tone) = numbered {
            return Ok(tone);
        }
        if lowered == "star" {
            return Ok(Self::Asterisk);
        }
        if lowered == "hash" {
            return Ok(Self::Pound);
        }
        Self::ALL
            .into_iter()
            .find(|tone| tone.name() == lowered)
            .ok_or_else(|| ParseToneError(s.to_string()))
    }
}

impl TryFrom<String> for DtmfTone {
    type Error = ParseToneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Render collected tones as the digit string a caller typed
pub fn tones_to_digits(tones: &[DtmfTone]) -> String {
    tones.iter().map(|tone| tone.to_char()).collect()
}

/// Parse a keypad string such as `"12#"`, skipping characters that are not tones
pub fn parse_tone_sequence(sequence: &str) -> Vec<DtmfTone> {
    sequence.chars().filter_map(DtmfTone::from_char).collect()
}
