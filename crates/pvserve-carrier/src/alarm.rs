/// Alarm severity attached to a channel's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    NoAlarm,
    Minor,
    Major,
    Invalid,
}

impl Severity {
    /// Numeric code as carried on the wire.
    pub fn code(self) -> u16 {
        match self {
            Severity::NoAlarm => 0,
            Severity::Minor => 1,
            Severity::Major => 2,
            Severity::Invalid => 3,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Severity::NoAlarm),
            1 => Some(Severity::Minor),
            2 => Some(Severity::Major),
            3 => Some(Severity::Invalid),
            _ => None,
        }
    }
}

/// Alarm status attached to a channel's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    NoAlarm,
    Read,
    Write,
    HiHi,
    High,
    LoLo,
    Low,
    State,
    Comm,
}

impl Status {
    /// Numeric code as carried on the wire.
    pub fn code(self) -> u16 {
        match self {
            Status::NoAlarm => 0,
            Status::Read => 1,
            Status::Write => 2,
            Status::HiHi => 3,
            Status::High => 4,
            Status::LoLo => 5,
            Status::Low => 6,
            Status::State => 7,
            Status::Comm => 8,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Status::NoAlarm),
            1 => Some(Status::Read),
            2 => Some(Status::Write),
            3 => Some(Status::HiHi),
            4 => Some(Status::High),
            5 => Some(Status::LoLo),
            6 => Some(Status::Low),
            7 => Some(Status::State),
            8 => Some(Status::Comm),
            _ => None,
        }
    }
}
