/// Number of low bits reserved for the runtime tag in the boxed integer
/// encoding. A boxed integer register holds `value << TAG_BITS`; the tag
/// bit pattern of zero marks the inline (non-heap) case, which is the only
/// case this crate reasons about.
pub const TAG_BITS: u32 = 1;

/// Width of a native fixed-width signed integer representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }

    /// Smallest encoded value representable at this width: `-2^W`.
    ///
    /// The bound is over the tagged encoding, which carries one extra low
    /// bit, so it is twice the untagged two's-complement minimum.
    pub fn min_value(self) -> i128 {
        -(1i128 << self.bits())
    }

    /// Largest encoded value representable at this width: `2^W - 1`.
    pub fn max_value(self) -> i128 {
        (1i128 << self.bits()) - 1
    }
}

impl std::fmt::Display for IntWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.bits())
    }
}

/// Declared type of a register or operation result.
///
/// The narrowing pass only distinguishes the boxed universal integer, the
/// native widths it can narrow to, and "anything else".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RType {
    /// Tag-bit-encoded universal integer (the dynamic default).
    BoxedInt,
    /// Native fixed-width signed integer.
    Native(IntWidth),
    /// Any other IR type. Opaque to this pass.
    Object,
}

impl std::fmt::Display for RType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RType::BoxedInt => f.write_str("int"),
            RType::Native(w) => write!(f, "{}", w),
            RType::Object => f.write_str("object"),
        }
    }
}
