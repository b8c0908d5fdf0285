//! Customer segments and their naming conventions.
//!
//! Every segment is known under three interchangeable keys:
//!   - full name    ("Loyal Customer")
//!   - underscored  ("Loyal_Customer")
//!   - abbreviation ("LC")
//!
//! Serialized records carry all three at once. Rehydration accepts
//! whichever one a caller sent back.

use crate::types::{ACTIVE_SEGMENT_COUNT, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Segment {
    ImmediateRepurchase,
    LoyalCustomer,
    OccasionalBuyer,
    DiscountBuyer,
    NoRepurchase,
}

/// Key-naming convention used for segment fields in a serialized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyConvention {
    FullName,
    Underscored,
    Abbreviated,
}

impl KeyConvention {
    /// Probe order used when detecting the convention of a record.
    pub const PRIORITY: [KeyConvention; 3] = [
        KeyConvention::FullName,
        KeyConvention::Underscored,
        KeyConvention::Abbreviated,
    ];
}

impl Segment {
    /// All segments, in matrix/vector index order.
    pub const ALL: [Segment; SEGMENT_COUNT] = [
        Segment::ImmediateRepurchase,
        Segment::LoyalCustomer,
        Segment::OccasionalBuyer,
        Segment::DiscountBuyer,
        Segment::NoRepurchase,
    ];

    pub const ACTIVE: [Segment; ACTIVE_SEGMENT_COUNT] = [
        Segment::ImmediateRepurchase,
        Segment::LoyalCustomer,
        Segment::OccasionalBuyer,
        Segment::DiscountBuyer,
    ];

    /// The absorbing segment.
    pub const TERMINAL: Segment = Segment::NoRepurchase;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ImmediateRepurchase => "Immediate Repurchase",
            Self::LoyalCustomer       => "Loyal Customer",
            Self::OccasionalBuyer     => "Occasional Buyer",
            Self::DiscountBuyer       => "Discount Buyer",
            Self::NoRepurchase        => "No Repurchase",
        }
    }

    pub fn underscored(self) -> &'static str {
        match self {
            Self::ImmediateRepurchase => "Immediate_Repurchase",
            Self::LoyalCustomer       => "Loyal_Customer",
            Self::OccasionalBuyer     => "Occasional_Buyer",
            Self::DiscountBuyer       => "Discount_Buyer",
            Self::NoRepurchase        => "No_Repurchase",
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::ImmediateRepurchase => "IR",
            Self::LoyalCustomer       => "LC",
            Self::OccasionalBuyer     => "OB",
            Self::DiscountBuyer       => "DB",
            Self::NoRepurchase        => "NR",
        }
    }

    pub fn key(self, convention: KeyConvention) -> &'static str {
        match convention {
            KeyConvention::FullName    => self.name(),
            KeyConvention::Underscored => self.underscored(),
            KeyConvention::Abbreviated => self.abbreviation(),
        }
    }

    /// Resolve a segment from any of its three keys.
    pub fn from_key(key: &str) -> Option<Segment> {
        Self::ALL.into_iter().find(|s| {
            KeyConvention::PRIORITY.iter().any(|c| s.key(*c) == key)
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Segment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Segment::from_key(&value).ok_or_else(|| format!("unknown segment '{value}'"))
    }
}

impl From<Segment> for String {
    fn from(segment: Segment) -> Self {
        segment.name().to_string()
    }
}
