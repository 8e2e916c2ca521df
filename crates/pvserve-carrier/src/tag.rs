/// Application tags describing what a leaf carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTag {
    /// The channel's current value plus quality metadata.
    Value,
    /// The maximum representable value of the channel's element type.
    HighLimit,
    /// The minimum representable value of the channel's element type.
    LowLimit,
    /// A tag the channel does not understand. Reads leave it untouched.
    Other(u16),
}

impl AppTag {
    /// Human-readable tag name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            AppTag::Value => "value",
            AppTag::HighLimit => "high-limit",
            AppTag::LowLimit => "low-limit",
            AppTag::Other(_) => "other",
        }
    }
}
