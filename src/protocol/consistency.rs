use std::{fmt, str::FromStr};

use super::error::CodecError;

/// Number of replica acknowledgements a query waits for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Consistency {
    Any,
    #[default]
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

const ALL_LEVELS: [Consistency; 11] = [
    Consistency::Any,
    Consistency::One,
    Consistency::Two,
    Consistency::Three,
    Consistency::Quorum,
    Consistency::All,
    Consistency::LocalQuorum,
    Consistency::EachQuorum,
    Consistency::Serial,
    Consistency::LocalSerial,
    Consistency::LocalOne,
];

impl Consistency {
    pub fn name(&self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
            Consistency::LocalOne => "LOCAL_ONE",
        }
    }
}

impl From<Consistency> for u16 {
    fn from(value: Consistency) -> Self {
        match value {
            Consistency::Any => 0x0000,
            Consistency::One => 0x0001,
            Consistency::Two => 0x0002,
            Consistency::Three => 0x0003,
            Consistency::Quorum => 0x0004,
            Consistency::All => 0x0005,
            Consistency::LocalQuorum => 0x0006,
            Consistency::EachQuorum => 0x0007,
            Consistency::Serial => 0x0008,
            Consistency::LocalSerial => 0x0009,
            Consistency::LocalOne => 0x000A,
        }
    }
}

impl TryFrom<u16> for Consistency {
    type Error = CodecError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ALL_LEVELS
            .into_iter()
            .find(|level| u16::from(*level) == value)
            .ok_or(CodecError::UnknownConsistency(value))
    }
}

impl FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        ALL_LEVELS
            .into_iter()
            .find(|level| level.name() == wanted)
            .ok_or_else(|| format!("unrecognized consistency level '{s}'"))
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        assert_eq!(u16::from(Consistency::Any), 0);
        assert_eq!(u16::from(Consistency::Quorum), 4);
        assert_eq!(Consistency::try_from(0x0006).unwrap(), Consistency::LocalQuorum);
        assert_eq!(Consistency::try_from(0x000A).unwrap(), Consistency::LocalOne);
    }

    #[test]
    fn unknown_code() {
        assert_eq!(
            Consistency::try_from(0x00FF).unwrap_err(),
            CodecError::UnknownConsistency(0x00FF)
        );
    }

    #[test]
    fn parse_names_case_insensitive() {
        assert_eq!("quorum".parse::<Consistency>().unwrap(), Consistency::Quorum);
        assert_eq!(
            "LOCAL_QUORUM".parse::<Consistency>().unwrap(),
            Consistency::LocalQuorum
        );
        assert!("most".parse::<Consistency>().is_err());
    }

    #[test]
    fn default_is_one() {
        assert_eq!(Consistency::default(), Consistency::One);
    }
}
