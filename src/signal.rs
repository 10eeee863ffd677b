//! Inbound signal model
//!
//! Signals arrive as independently-updating named scalars. Names follow
//! `{base}_{suffix}` or `{base}_{direction}_{suffix}`; the base groups the
//! signals of one leash, the optional middle component carries the anchor
//! facing, and the trailing suffix selects the role.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LeashError, Result};

/// Payload carried by a single inbound sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalValue {
    /// Boolean signal (grab state).
    Bool(bool),
    /// Scalar signal (stretch, directional pulls, facing index).
    Float(f32),
}

impl SignalValue {
    /// Kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalValue::Bool(_) => "bool",
            SignalValue::Float(_) => "float",
        }
    }
}

/// One inbound signal update, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    /// Full signal name, e.g. `Leash_IsGrabbed` or `Leash_North_Stretch`.
    pub name: String,
    /// Sampled value.
    pub value: SignalValue,
}

impl SignalSample {
    /// Boolean sample.
    pub fn bool(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            value: SignalValue::Bool(value),
        }
    }

    /// Float sample.
    pub fn float(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value: SignalValue::Float(value),
        }
    }
}

/// Cardinal facing of the leash anchor relative to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeashDirection {
    /// No directional context.
    #[default]
    None,
    /// Anchor ahead of the actor.
    North,
    /// Anchor behind the actor.
    South,
    /// Anchor to the actor's right.
    East,
    /// Anchor to the actor's left.
    West,
}

impl LeashDirection {
    /// Parse a direction name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(LeashDirection::None),
            "north" => Some(LeashDirection::North),
            "south" => Some(LeashDirection::South),
            "east" => Some(LeashDirection::East),
            "west" => Some(LeashDirection::West),
            _ => None,
        }
    }

    /// Direction selected by a numeric facing signal.
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(LeashDirection::North),
            1 => Some(LeashDirection::South),
            2 => Some(LeashDirection::East),
            3 => Some(LeashDirection::West),
            _ => None,
        }
    }
}

impl fmt::Display for LeashDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LeashDirection::None => "None",
            LeashDirection::North => "North",
            LeashDirection::South => "South",
            LeashDirection::East => "East",
            LeashDirection::West => "West",
        };
        write!(f, "{name}")
    }
}

/// Axis component addressed by a directional pull signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceChannel {
    /// Pull toward +x (actor's right).
    XPositive,
    /// Pull toward -x (actor's left).
    XNegative,
    /// Pull toward +y (up).
    YPositive,
    /// Pull toward -y (down).
    YNegative,
    /// Pull toward +z (forward).
    ZPositive,
    /// Pull toward -z (backward).
    ZNegative,
}

/// Role a signal name resolves to, taken from its trailing suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRole {
    /// Grab state toggle (`IsGrabbed`, bool).
    Grab,
    /// Physbone stretch magnitude (`Stretch`, float in [0, 1]).
    Stretch,
    /// Directional pull strength (float >= 0).
    Force(ForceChannel),
    /// Dynamic facing selection (`Direction`, numeric index 0..=3).
    Direction,
}

impl SignalRole {
    /// Parse a role from the trailing suffix of a signal name.
    ///
    /// The short `X+`/`X-` forms are accepted alongside the long names for
    /// compatibility with older leash prefabs.
    pub fn parse(suffix: &str) -> Option<Self> {
        match suffix {
            "IsGrabbed" => Some(SignalRole::Grab),
            "Stretch" => Some(SignalRole::Stretch),
            "Direction" => Some(SignalRole::Direction),
            "XPositive" | "X+" => Some(SignalRole::Force(ForceChannel::XPositive)),
            "XNegative" | "X-" => Some(SignalRole::Force(ForceChannel::XNegative)),
            "YPositive" | "Y+" => Some(SignalRole::Force(ForceChannel::YPositive)),
            "YNegative" | "Y-" => Some(SignalRole::Force(ForceChannel::YNegative)),
            "ZPositive" | "Z+" => Some(SignalRole::Force(ForceChannel::ZPositive)),
            "ZNegative" | "Z-" => Some(SignalRole::Force(ForceChannel::ZNegative)),
            _ => None,
        }
    }
}

/// Structural decomposition of a signal name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalName<'a> {
    /// Leading component, grouping the signals of one leash.
    pub base: &'a str,
    /// Directional context embedded in the name, if any.
    pub direction: LeashDirection,
    /// Trailing role suffix.
    pub suffix: &'a str,
}

impl<'a> SignalName<'a> {
    /// Split a raw signal name into base, optional direction and suffix.
    ///
    /// The middle component is read as a direction only when it parses as
    /// one; otherwise it is part of neither base nor suffix.
    pub fn parse(name: &'a str) -> Self {
        let parts: Vec<&str> = name.split('_').collect();
        let base = parts[0];
        let direction = parts
            .get(1)
            .and_then(|p| LeashDirection::parse(p))
            .unwrap_or(LeashDirection::None);
        let suffix = if parts.len() > 1 {
            parts[parts.len() - 1]
        } else {
            ""
        };
        Self {
            base,
            direction,
            suffix,
        }
    }
}

/// Directional context of the most recently active leash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacingPoint {
    /// Facing applied to resolved turn targets.
    pub direction: LeashDirection,
    /// Base name of the signal group the facing came from.
    pub base_name: String,
    /// Whether any directional context has been established.
    pub active: bool,
}

impl Default for FacingPoint {
    fn default() -> Self {
        Self {
            direction: LeashDirection::None,
            base_name: String::new(),
            active: false,
        }
    }
}

impl FacingPoint {
    /// Facing established up front, before any signal carries its own.
    pub fn new(direction: LeashDirection, base_name: impl Into<String>) -> Self {
        Self {
            direction,
            base_name: base_name.into(),
            active: true,
        }
    }

    /// Adopt directional context observed in a signal name.
    ///
    /// The facing is replaced only when none is established yet or when the
    /// sample belongs to a different signal group; within one group the
    /// first observed direction wins. Returns true when replaced.
    pub fn observe(&mut self, direction: LeashDirection, base: &str) -> bool {
        if direction == LeashDirection::None {
            return false;
        }
        if self.direction != LeashDirection::None && self.base_name == base {
            return false;
        }
        self.direction = direction;
        self.base_name = base.to_string();
        self.active = true;
        true
    }

    /// Replace the facing outright (facing signal or settings change).
    pub fn set(&mut self, direction: LeashDirection, base: &str) {
        self.direction = direction;
        self.base_name = base.to_string();
        self.active = true;
    }
}

/// Validate an inbound sample before it may touch engine state.
///
/// Returns the parsed role on success. Rejected samples carry the reason;
/// the caller logs and drops them. Rejections cover empty names, non-finite
/// floats, kind mismatches, unrecognized suffixes and out-of-range facing
/// indices.
pub fn validate_sample(sample: &SignalSample) -> Result<SignalRole> {
    if sample.name.is_empty() {
        return Err(LeashError::InvalidSample("empty signal name".into()));
    }
    if let SignalValue::Float(v) = sample.value {
        if !v.is_finite() {
            return Err(LeashError::InvalidSample(format!(
                "non-finite value for '{}'",
                sample.name
            )));
        }
    }
    let parsed = SignalName::parse(&sample.name);
    let role = SignalRole::parse(parsed.suffix).ok_or_else(|| {
        LeashError::InvalidSample(format!("unrecognized signal '{}'", sample.name))
    })?;
    match (role, sample.value) {
        (SignalRole::Grab, SignalValue::Bool(_)) => Ok(role),
        (SignalRole::Direction, SignalValue::Float(v)) => {
            let index = v.round();
            if !(0.0..=3.0).contains(&index) {
                return Err(LeashError::InvalidSample(format!(
                    "facing index {v} out of range for '{}'",
                    sample.name
                )));
            }
            Ok(role)
        }
        (SignalRole::Stretch | SignalRole::Force(_), SignalValue::Float(_)) => Ok(role),
        _ => Err(LeashError::InvalidSample(format!(
            "{} value for '{}'",
            sample.value.kind(),
            sample.name
        ))),
    }
}
