//! Segment registers.

/// One of the six IA-32 segment registers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    Es,
    Cs,
    Ss,
    Ds,
    Fs,
    Gs,
}

impl Segment {
    /// Decodes the three-bit `Sw` field used by `MOV Sw` and segment-load
    /// instructions.
    ///
    /// Only six of the eight possible values are valid; `6` and `7` raise
    /// `invalid segment register`.
    pub(crate) fn from_sw(value: u8) -> Option<Segment> {
        match value {
            0 => Some(Segment::Es),
            1 => Some(Segment::Cs),
            2 => Some(Segment::Ss),
            3 => Some(Segment::Ds),
            4 => Some(Segment::Fs),
            5 => Some(Segment::Gs),
            _ => None,
        }
    }
}
