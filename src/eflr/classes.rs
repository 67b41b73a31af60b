//! The registry of explicitly formatted logical record classes.
//!
//! Each class pins down three things: the set type written in the set
//! component, the logical record type code carried in segment headers, and
//! the attribute template its items are built from. Templates are const
//! tables; items can only be instantiated from them, which is what makes
//! the template-agreement invariant hold by construction.

use crate::eflr::standards;
use crate::kernels::RepCode;

//==================================================================================
// I. Class Enum
//==================================================================================

/// All EFLR object classes this writer can emit, in no particular order.
/// Use `EMISSION_ORDER` for the dependency-safe file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EflrClass {
    FileHeader,
    Origin,
    WellReferencePoint,
    Axis,
    LongName,
    Channel,
    Frame,
    Zone,
    Parameter,
    Equipment,
    Tool,
    CalibrationCoefficient,
    CalibrationMeasurement,
    Calibration,
    Computation,
    Process,
    Splice,
    Path,
    Group,
    Message,
    Comment,
    NoFormat,
}

/// Order in which sets are emitted: referents strictly before referrers.
pub const EMISSION_ORDER: [EflrClass; 22] = [
    EflrClass::FileHeader,
    EflrClass::Origin,
    EflrClass::WellReferencePoint,
    EflrClass::Axis,
    EflrClass::LongName,
    EflrClass::Channel,
    EflrClass::Frame,
    EflrClass::Zone,
    EflrClass::Parameter,
    EflrClass::Equipment,
    EflrClass::Tool,
    EflrClass::CalibrationCoefficient,
    EflrClass::CalibrationMeasurement,
    EflrClass::Calibration,
    EflrClass::Computation,
    EflrClass::Process,
    EflrClass::Splice,
    EflrClass::Path,
    EflrClass::Group,
    EflrClass::Message,
    EflrClass::Comment,
    EflrClass::NoFormat,
];

impl EflrClass {
    /// The set type string written in the set component.
    pub fn set_type(self) -> &'static str {
        match self {
            EflrClass::FileHeader => "FILE-HEADER",
            EflrClass::Origin => "ORIGIN",
            EflrClass::WellReferencePoint => "WELL-REFERENCE",
            EflrClass::Axis => "AXIS",
            EflrClass::LongName => "LONG-NAME",
            EflrClass::Channel => "CHANNEL",
            EflrClass::Frame => "FRAME",
            EflrClass::Zone => "ZONE",
            EflrClass::Parameter => "PARAMETER",
            EflrClass::Equipment => "EQUIPMENT",
            EflrClass::Tool => "TOOL",
            EflrClass::CalibrationCoefficient => "CALIBRATION-COEFFICIENT",
            EflrClass::CalibrationMeasurement => "CALIBRATION-MEASUREMENT",
            EflrClass::Calibration => "CALIBRATION",
            EflrClass::Computation => "COMPUTATION",
            EflrClass::Process => "PROCESS",
            EflrClass::Splice => "SPLICE",
            EflrClass::Path => "PATH",
            EflrClass::Group => "GROUP",
            EflrClass::Message => "MESSAGE",
            EflrClass::Comment => "COMMENT",
            EflrClass::NoFormat => "NO-FORMAT",
        }
    }

    /// Logical record type code for the segment header.
    pub fn record_type(self) -> u8 {
        match self {
            EflrClass::FileHeader => 0,
            EflrClass::Origin | EflrClass::WellReferencePoint => 1,
            EflrClass::Axis => 2,
            EflrClass::Channel => 3,
            EflrClass::Frame | EflrClass::Path => 4,
            EflrClass::Zone
            | EflrClass::Parameter
            | EflrClass::Equipment
            | EflrClass::Tool
            | EflrClass::CalibrationCoefficient
            | EflrClass::CalibrationMeasurement
            | EflrClass::Calibration
            | EflrClass::Computation
            | EflrClass::Process
            | EflrClass::Splice
            | EflrClass::Group => 5,
            EflrClass::Message | EflrClass::Comment => 6,
            EflrClass::NoFormat => 8,
            EflrClass::LongName => 9,
        }
    }

    /// Attribute template of this class.
    pub fn template(self) -> &'static [AttrSpec] {
        match self {
            EflrClass::FileHeader => &[], // fixed-layout record, see eflr::file_header
            EflrClass::Origin => ORIGIN,
            EflrClass::WellReferencePoint => WELL_REFERENCE_POINT,
            EflrClass::Axis => AXIS,
            EflrClass::LongName => LONG_NAME,
            EflrClass::Channel => CHANNEL,
            EflrClass::Frame => FRAME,
            EflrClass::Zone => ZONE,
            EflrClass::Parameter => PARAMETER,
            EflrClass::Equipment => EQUIPMENT,
            EflrClass::Tool => TOOL,
            EflrClass::CalibrationCoefficient => CALIBRATION_COEFFICIENT,
            EflrClass::CalibrationMeasurement => CALIBRATION_MEASUREMENT,
            EflrClass::Calibration => CALIBRATION,
            EflrClass::Computation => COMPUTATION,
            EflrClass::Process => PROCESS,
            EflrClass::Splice => SPLICE,
            EflrClass::Path => PATH,
            EflrClass::Group => GROUP,
            EflrClass::Message => MESSAGE,
            EflrClass::Comment => COMMENT,
            EflrClass::NoFormat => NO_FORMAT,
        }
    }
}

impl std::fmt::Display for EflrClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.set_type())
    }
}

//==================================================================================
// II. Attribute Specifications
//==================================================================================

/// Validation rule attached to an attribute slot. Subtyping is for
/// validation only; every attribute encodes through the same kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Any scalar kind; the code is inferred from the value when not set.
    Any,
    /// ASCII text.
    Text,
    /// Short identifier (IDENT charset).
    Ident,
    /// Numbers only, optionally restricted to integers or floats.
    Numeric { int_only: bool, float_only: bool },
    /// Vector of positive integers (dimension or element limit).
    Dimension,
    /// A 0/1 flag.
    Status,
    /// Calendar instant, or an elapsed-time number when `allow_numeric`.
    DTime { allow_numeric: bool },
    /// Reference to another object, optionally of a fixed class. Units are
    /// forbidden on reference attributes.
    Reference { class: Option<EflrClass> },
    /// Either a reference or free text (e.g. a long name).
    ReferenceOrText,
}

/// One slot of a class template.
#[derive(Debug, Clone, Copy)]
pub struct AttrSpec {
    pub label: &'static str,
    pub constraint: Constraint,
    pub multivalued: bool,
    pub multidimensional: bool,
    /// Code used when the user does not set one. `None` means infer from
    /// the value at emission time.
    pub code: Option<RepCode>,
    /// Closed value set for enum-bound attributes.
    pub enum_values: Option<&'static [&'static str]>,
    /// Soft enums warn on unknown members instead of failing (upgraded to
    /// an error in high-compatibility mode).
    pub enum_is_soft: bool,
}

impl AttrSpec {
    const fn new(label: &'static str, constraint: Constraint) -> Self {
        let code = match constraint {
            Constraint::Text => Some(RepCode::Ascii),
            Constraint::Ident => Some(RepCode::Ident),
            Constraint::Dimension => Some(RepCode::Uvari),
            Constraint::Status => Some(RepCode::Status),
            Constraint::DTime { .. } => None,
            Constraint::Reference { .. } => Some(RepCode::Obname),
            _ => None,
        };
        Self {
            label,
            constraint,
            multivalued: matches!(constraint, Constraint::Dimension),
            multidimensional: false,
            code,
            enum_values: None,
            enum_is_soft: false,
        }
    }

    const fn multi(mut self) -> Self {
        self.multivalued = true;
        self
    }

    const fn multidim(mut self) -> Self {
        self.multivalued = true;
        self.multidimensional = true;
        self
    }

    const fn with_code(mut self, code: RepCode) -> Self {
        self.code = Some(code);
        self
    }

    const fn values(mut self, v: &'static [&'static str]) -> Self {
        self.enum_values = Some(v);
        self
    }

    const fn soft_values(mut self, v: &'static [&'static str]) -> Self {
        self.enum_values = Some(v);
        self.enum_is_soft = true;
        self
    }
}

// Shorthands keeping the tables readable.
const fn text(label: &'static str) -> AttrSpec {
    AttrSpec::new(label, Constraint::Text)
}
const fn ident(label: &'static str) -> AttrSpec {
    AttrSpec::new(label, Constraint::Ident)
}
const fn number(label: &'static str) -> AttrSpec {
    AttrSpec::new(
        label,
        Constraint::Numeric {
            int_only: false,
            float_only: false,
        },
    )
}
const fn integer(label: &'static str) -> AttrSpec {
    AttrSpec::new(
        label,
        Constraint::Numeric {
            int_only: true,
            float_only: false,
        },
    )
}
const fn refer(label: &'static str, class: EflrClass) -> AttrSpec {
    AttrSpec::new(label, Constraint::Reference { class: Some(class) })
}
const fn refer_any(label: &'static str) -> AttrSpec {
    AttrSpec::new(label, Constraint::Reference { class: None })
}
const fn dtime(label: &'static str) -> AttrSpec {
    AttrSpec::new(label, Constraint::DTime { allow_numeric: true })
}

//==================================================================================
// III. Class Templates
//==================================================================================

const ORIGIN: &[AttrSpec] = &[
    text("FILE-ID"),
    ident("FILE-SET-NAME"),
    integer("FILE-SET-NUMBER").with_code(RepCode::Uvari),
    integer("FILE-NUMBER").with_code(RepCode::Uvari),
    ident("FILE-TYPE"),
    text("PRODUCT"),
    text("VERSION"),
    text("PROGRAMS").multi(),
    AttrSpec::new("CREATION-TIME", Constraint::DTime { allow_numeric: false })
        .with_code(RepCode::Dtime),
    text("ORDER-NUMBER"),
    integer("DESCENT-NUMBER").with_code(RepCode::UNorm),
    integer("RUN-NUMBER").with_code(RepCode::UNorm),
    integer("WELL-ID").with_code(RepCode::UNorm),
    text("WELL-NAME"),
    text("FIELD-NAME"),
    integer("PRODUCER-CODE").with_code(RepCode::UNorm),
    text("PRODUCER-NAME"),
    text("COMPANY"),
    ident("NAME-SPACE-NAME"),
    integer("NAME-SPACE-VERSION").with_code(RepCode::Uvari),
];

const WELL_REFERENCE_POINT: &[AttrSpec] = &[
    text("PERMANENT-DATUM"),
    text("VERTICAL-ZERO"),
    number("PERMANENT-DATUM-ELEVATION").with_code(RepCode::FDoubl),
    number("ABOVE-PERMANENT-DATUM").with_code(RepCode::FDoubl),
    number("MAGNETIC-DECLINATION").with_code(RepCode::FDoubl),
    text("COORDINATE-1-NAME"),
    number("COORDINATE-1-VALUE").with_code(RepCode::FDoubl),
    text("COORDINATE-2-NAME"),
    number("COORDINATE-2-VALUE").with_code(RepCode::FDoubl),
    text("COORDINATE-3-NAME"),
    number("COORDINATE-3-VALUE").with_code(RepCode::FDoubl),
];

const AXIS: &[AttrSpec] = &[
    ident("AXIS-ID"),
    AttrSpec::new("COORDINATES", Constraint::Any).multi(),
    number("SPACING"),
];

const LONG_NAME: &[AttrSpec] = &[
    text("GENERAL-MODIFIER").multi(),
    text("QUANTITY"),
    text("QUANTITY-MODIFIER").multi(),
    text("ALTERED-FORM"),
    text("ENTITY"),
    text("ENTITY-MODIFIER").multi(),
    text("ENTITY-NUMBER"),
    text("ENTITY-PART"),
    text("ENTITY-PART-NUMBER"),
    text("GENERIC-SOURCE"),
    text("SOURCE-PART").multi(),
    text("SOURCE-PART-NUMBER").multi(),
    text("CONDITIONS").multi(),
    text("STANDARD-SYMBOL"),
    text("PRIVATE-SYMBOL"),
];

const CHANNEL: &[AttrSpec] = &[
    AttrSpec::new("LONG-NAME", Constraint::ReferenceOrText),
    ident("PROPERTIES").multi().values(standards::PROPERTIES),
    integer("REPRESENTATION-CODE").with_code(RepCode::UShort),
    ident("UNITS").soft_values(standards::UNITS),
    AttrSpec::new("DIMENSION", Constraint::Dimension),
    refer("AXIS", EflrClass::Axis).multi(),
    AttrSpec::new("ELEMENT-LIMIT", Constraint::Dimension),
    refer_any("SOURCE").with_code(RepCode::Objref),
    number("MINIMUM-VALUE").multi().with_code(RepCode::FDoubl),
    number("MAXIMUM-VALUE").multi().with_code(RepCode::FDoubl),
];

const FRAME: &[AttrSpec] = &[
    text("DESCRIPTION"),
    refer("CHANNELS", EflrClass::Channel).multi(),
    ident("INDEX-TYPE").soft_values(standards::FRAME_INDEX_TYPES),
    ident("DIRECTION").values(standards::DIRECTIONS),
    number("SPACING"),
    integer("ENCRYPTED").with_code(RepCode::UShort),
    number("INDEX-MIN"),
    number("INDEX-MAX"),
];

const ZONE: &[AttrSpec] = &[
    text("DESCRIPTION"),
    ident("DOMAIN").values(standards::ZONE_DOMAINS),
    dtime("MAXIMUM"),
    dtime("MINIMUM"),
];

const PARAMETER: &[AttrSpec] = &[
    AttrSpec::new("LONG-NAME", Constraint::ReferenceOrText),
    AttrSpec::new("DIMENSION", Constraint::Dimension),
    refer("AXIS", EflrClass::Axis).multi(),
    refer("ZONES", EflrClass::Zone).multi(),
    AttrSpec::new("VALUES", Constraint::Any).multi(),
];

const EQUIPMENT: &[AttrSpec] = &[
    text("TRADEMARK-NAME"),
    AttrSpec::new("STATUS", Constraint::Status),
    ident("TYPE").values(standards::EQUIPMENT_TYPES),
    ident("SERIAL-NUMBER"),
    ident("LOCATION").values(standards::EQUIPMENT_LOCATIONS),
    number("HEIGHT"),
    number("LENGTH"),
    number("MINIMUM-DIAMETER"),
    number("MAXIMUM-DIAMETER"),
    number("VOLUME"),
    number("WEIGHT"),
    number("HOLE-SIZE"),
    number("PRESSURE"),
    number("TEMPERATURE"),
    number("VERTICAL-DEPTH"),
    number("RADIAL-DRIFT"),
    number("ANGULAR-DRIFT"),
];

const TOOL: &[AttrSpec] = &[
    text("DESCRIPTION"),
    text("TRADEMARK-NAME"),
    text("GENERIC-NAME"),
    refer("PARTS", EflrClass::Equipment).multi(),
    AttrSpec::new("STATUS", Constraint::Status),
    refer("CHANNELS", EflrClass::Channel).multi(),
    refer("PARAMETERS", EflrClass::Parameter).multi(),
];

const CALIBRATION_COEFFICIENT: &[AttrSpec] = &[
    ident("LABEL"),
    number("COEFFICIENTS").multi(),
    number("REFERENCES").multi(),
    number("PLUS-TOLERANCES").multi(),
    number("MINUS-TOLERANCES").multi(),
];

const CALIBRATION_MEASUREMENT: &[AttrSpec] = &[
    ident("PHASE").values(standards::CALIBRATION_PHASES),
    refer_any("MEASUREMENT-SOURCE").with_code(RepCode::Objref),
    ident("TYPE"),
    AttrSpec::new("DIMENSION", Constraint::Dimension),
    refer("AXIS", EflrClass::Axis).multi(),
    number("MEASUREMENT").multidim(),
    integer("SAMPLE-COUNT"),
    number("MAXIMUM-DEVIATION").multidim(),
    number("STANDARD-DEVIATION").multidim(),
    dtime("BEGIN-TIME"),
    number("DURATION"),
    number("REFERENCE").multidim(),
    number("STANDARD").multidim(),
    number("PLUS-TOLERANCE").multidim(),
    number("MINUS-TOLERANCE").multidim(),
];

const CALIBRATION: &[AttrSpec] = &[
    refer("CALIBRATED-CHANNELS", EflrClass::Channel).multi(),
    refer("UNCALIBRATED-CHANNELS", EflrClass::Channel).multi(),
    refer("COEFFICIENTS", EflrClass::CalibrationCoefficient).multi(),
    refer("MEASUREMENTS", EflrClass::CalibrationMeasurement).multi(),
    refer("PARAMETERS", EflrClass::Parameter).multi(),
    ident("METHOD"),
];

const COMPUTATION: &[AttrSpec] = &[
    AttrSpec::new("LONG-NAME", Constraint::ReferenceOrText),
    ident("PROPERTIES").multi().values(standards::PROPERTIES),
    AttrSpec::new("DIMENSION", Constraint::Dimension),
    refer("AXIS", EflrClass::Axis).multi(),
    refer("ZONES", EflrClass::Zone).multi(),
    number("VALUES").multidim(),
    refer_any("SOURCE").with_code(RepCode::Objref),
];

const PROCESS: &[AttrSpec] = &[
    text("DESCRIPTION"),
    text("TRADEMARK-NAME"),
    text("VERSION"),
    ident("PROPERTIES").multi().values(standards::PROPERTIES),
    ident("STATUS").values(standards::PROCESS_STATUSES),
    refer("INPUT-CHANNELS", EflrClass::Channel).multi(),
    refer("OUTPUT-CHANNELS", EflrClass::Channel).multi(),
    refer("INPUT-COMPUTATIONS", EflrClass::Computation).multi(),
    refer("OUTPUT-COMPUTATIONS", EflrClass::Computation).multi(),
    refer("PARAMETERS", EflrClass::Parameter).multi(),
    text("COMMENTS").multi(),
];

const SPLICE: &[AttrSpec] = &[
    refer("OUTPUT-CHANNEL", EflrClass::Channel),
    refer("INPUT-CHANNELS", EflrClass::Channel).multi(),
    refer("ZONES", EflrClass::Zone).multi(),
];

const PATH: &[AttrSpec] = &[
    refer("FRAME-TYPE", EflrClass::Frame),
    refer("WELL-REFERENCE-POINT", EflrClass::WellReferencePoint),
    refer("VALUE", EflrClass::Channel).multi(),
    number("BOREHOLE-DEPTH"),
    number("VERTICAL-DEPTH"),
    number("RADIAL-DRIFT"),
    number("ANGULAR-DRIFT"),
    number("TIME"),
    number("DEPTH-OFFSET"),
    number("MEASURE-POINT-OFFSET"),
    number("TOOL-ZERO-OFFSET"),
];

const GROUP: &[AttrSpec] = &[
    text("DESCRIPTION"),
    ident("OBJECT-TYPE"),
    refer_any("OBJECT-LIST").multi(),
    refer("GROUP-LIST", EflrClass::Group).multi(),
];

const MESSAGE: &[AttrSpec] = &[
    dtime("TIME"),
    number("BOREHOLE-DRIFT"),
    number("VERTICAL-DEPTH"),
    number("RADIAL-DRIFT"),
    number("ANGULAR-DRIFT"),
    text("TEXT").multi(),
];

const COMMENT: &[AttrSpec] = &[text("TEXT").multi()];

const NO_FORMAT: &[AttrSpec] = &[ident("CONSUMER-NAME"), text("DESCRIPTION")];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_order_covers_every_class_once() {
        for (i, a) in EMISSION_ORDER.iter().enumerate() {
            for b in &EMISSION_ORDER[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(EMISSION_ORDER.len(), 22);
    }

    #[test]
    fn referents_precede_referrers() {
        let pos = |c: EflrClass| EMISSION_ORDER.iter().position(|x| *x == c).unwrap();
        for class in EMISSION_ORDER {
            for spec in class.template() {
                if let Constraint::Reference { class: Some(target) } = spec.constraint {
                    if target != class {
                        assert!(
                            pos(target) < pos(class),
                            "{target} must be emitted before {class}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn record_type_codes_match_the_standard() {
        assert_eq!(EflrClass::FileHeader.record_type(), 0);
        assert_eq!(EflrClass::Origin.record_type(), 1);
        assert_eq!(EflrClass::Channel.record_type(), 3);
        assert_eq!(EflrClass::Frame.record_type(), 4);
        assert_eq!(EflrClass::Zone.record_type(), 5);
    }

    #[test]
    fn templates_have_unique_labels() {
        for class in EMISSION_ORDER {
            let t = class.template();
            for (i, a) in t.iter().enumerate() {
                for b in &t[i + 1..] {
                    assert_ne!(a.label, b.label, "duplicate label in {class}");
                }
            }
        }
    }

    #[test]
    fn reference_slots_never_default_to_units_bearing_codes() {
        for class in EMISSION_ORDER {
            for spec in class.template() {
                if matches!(spec.constraint, Constraint::Reference { .. }) {
                    assert!(matches!(
                        spec.code,
                        Some(RepCode::Obname) | Some(RepCode::Objref)
                    ));
                }
            }
        }
    }
}
