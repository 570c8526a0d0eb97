//! Value resolutions and the unit scales applied to integer encodings.

/// Encoded width of a single register value.
///
/// `Ignore` registers are never put on the wire: combiners skip them and
/// parsers never yield them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Resolution {
    #[default]
    Ignore,
    Int8,
    Int16,
    Int32,
    Float,
}

impl Resolution {
    /// Number of value bytes this resolution occupies on the wire.
    pub const fn size(self) -> usize {
        match self {
            Resolution::Ignore => 0,
            Resolution::Int8 => 1,
            Resolution::Int16 => 2,
            Resolution::Int32 | Resolution::Float => 4,
        }
    }

    pub const fn is_ignore(self) -> bool {
        matches!(self, Resolution::Ignore)
    }

    /// Opcode selector bits (before shifting into place).
    ///
    /// # Panics
    ///
    /// `Ignore` has no wire encoding.
    pub(crate) fn selector(self) -> u8 {
        match self {
            Resolution::Int8 => 0,
            Resolution::Int16 => 1,
            Resolution::Int32 => 2,
            Resolution::Float => 3,
            Resolution::Ignore => unreachable!("ignored registers have no wire encoding"),
        }
    }

    pub(crate) fn from_selector(selector: u8) -> Self {
        match selector & 0x03 {
            0 => Resolution::Int8,
            1 => Resolution::Int16,
            2 => Resolution::Int32,
            _ => Resolution::Float,
        }
    }
}

/// Physical value of one integer LSB at each integer resolution.
///
/// `Float` values are always the physical value itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub int8: f64,
    pub int16: f64,
    pub int32: f64,
}

impl Scale {
    /// Raw integers, no scaling.
    pub const UNIT: Scale = Scale::new(1.0, 1.0, 1.0);
    /// Volts.
    pub const VOLTAGE: Scale = Scale::new(0.5, 0.1, 0.001);
    /// Amperes.
    pub const CURRENT: Scale = Scale::new(1.0, 0.1, 0.001);
    /// Degrees Celsius.
    pub const TEMPERATURE: Scale = Scale::new(1.0, 0.1, 0.001);
    /// Seconds.
    pub const TIME: Scale = Scale::new(0.01, 0.001, 0.000_001);
    /// Watt-hours.
    pub const ENERGY: Scale = Scale::new(1.0, 0.1, 0.001);

    pub const fn new(int8: f64, int16: f64, int32: f64) -> Self {
        Self { int8, int16, int32 }
    }

    /// LSB size for an integer resolution, `None` for `Float`.
    ///
    /// # Panics
    ///
    /// Panics on `Ignore`.
    pub fn lsb(&self, resolution: Resolution) -> Option<f64> {
        match resolution {
            Resolution::Int8 => Some(self.int8),
            Resolution::Int16 => Some(self.int16),
            Resolution::Int32 => Some(self.int32),
            Resolution::Float => None,
            Resolution::Ignore => unreachable!("ignored registers carry no value"),
        }
    }
}

/// Quantize `value` to `lsb` steps, clamped to `±max`.
///
/// Returns `None` for non-finite input, which is encoded as the integer
/// type's minimum.
pub(crate) fn saturate(value: f64, lsb: f64, max: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Some((value / lsb).round().clamp(-max, max))
}
