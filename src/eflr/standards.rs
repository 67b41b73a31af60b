//! Value sets declared by the RP66 v1 standard.
//!
//! Enum-bound attributes (zone domains, process statuses, property
//! indicators, unit symbols, ...) are checked against these tables. Outside
//! high-compatibility mode, an unknown unit is only a warning; the other
//! sets are enforced.

/// Unit symbols explicitly allowed by the standard.
pub const UNITS: &[&str] = &[
    "A", "K", "cd", "dAPI", "dB", "gAPI", "kg", "m", "mol", "nAPI", "rad", "s", "sr", "Btu",
    "C", "D", "GPa", "Gal", "Hz", "J", "L", "MHz", "MPa", "MeV", "Mg", "Mpsi", "N", "Oe", "P",
    "Pa", "S", "T", "V", "W", "Wb", "a", "acre", "atm", "b", "bar", "bbl", "c", "cP", "cal",
    "cm", "cu", "d", "daN", "deg", "degC", "degF", "dm", "eV", "fC", "ft", "g", "gal", "h",
    "in", "kHz", "kPa", "kV", "keV", "kgf", "km", "lbf", "lbm", "mA", "mC", "mD", "mGal", "mL",
    "mS", "mT", "mV", "mW", "mg", "min", "mm", "mohm", "ms", "nC", "nW", "ns", "ohm", "pC",
    "pPa", "ppdk", "ppk", "ppm", "psi", "pu", "t", "ton", "uA", "uC", "uPa", "uV", "um",
    "uohm", "upsi", "us",
];

/// Property indicators for Channel, Computation, and Process objects.
pub const PROPERTIES: &[&str] = &[
    "AVERAGED",
    "CALIBRATED",
    "CHANGED-INDEX",
    "COMPUTED",
    "DEPTH-MATCHED",
    "DERIVED",
    "FILTERED",
    "HOLE-SIZE-CORRECTED",
    "INCLINOMETRY-CORRECTD",
    "LITHOLOGY-CORRECTED",
    "LOCAL-COMPUTATION",
    "LOCALLY-DEFINED",
    "MODELLED",
    "MUDCAKE-CORRECTED",
    "NORMALIZED",
    "OVER-SAMPLED",
    "PATCHED",
    "PRESSURE-CORRECTED",
    "RE-SAMPLED",
    "SALINITY-CORRECTED",
    "SAMPLED-DOWNWARD",
    "SAMPLED-UPWARD",
    "SPEED-CORRECTED",
    "SPLICED",
    "SQUARED",
    "STACKED",
    "STANDARD-DEVIATION",
    "STANDOFF-CORRECTED",
    "TEMPERATURE-CORRECTED",
    "UNDER-SAMPLED",
];

/// Allowed values of the `phase` attribute of a calibration measurement.
pub const CALIBRATION_PHASES: &[&str] = &["AFTER", "BEFORE", "MASTER"];

/// Generic equipment types allowed by the standard.
pub const EQUIPMENT_TYPES: &[&str] = &[
    "Adapter",
    "Board",
    "Bottom-Nose",
    "Bridle",
    "Cable",
    "Calibrator",
    "Cartridge",
    "Centralizer",
    "Chamber",
    "Cushion",
    "Depth-Device",
    "Display",
    "Drawer",
    "Excentralizer",
    "Explosive-Source",
    "Flask",
    "Geophone",
    "Gun",
    "Head",
    "Housing",
    "Jig",
    "Joint",
    "Nuclear-Detector",
    "Packer",
    "Pad",
    "Pane",
    "Positioning",
    "Printer",
    "Radioactive-Source",
    "Shield",
    "Simulator",
    "Skid",
    "Sonde",
    "Spacer",
    "Standoff",
    "System",
    "Tool",
    "Tool-Module",
    "Transducer",
    "Vibration-Source",
];

/// General equipment locations allowed by the standard.
pub const EQUIPMENT_LOCATIONS: &[&str] = &["Logging-System", "Remote", "Rig", "Well"];

/// Frame index types allowed by the standard. Other values are accepted
/// with a warning outside high-compatibility mode.
pub const FRAME_INDEX_TYPES: &[&str] = &[
    "ANGULAR-DRIFT",
    "BOREHOLE-DEPTH",
    "NON-STANDARD",
    "RADIAL-DRIFT",
    "VERTICAL-DEPTH",
];

/// Allowed values of the `status` attribute of a Process.
pub const PROCESS_STATUSES: &[&str] = &["COMPLETE", "ABORTED", "IN-PROGRESS"];

/// Allowed values of the `domain` attribute of a Zone.
pub const ZONE_DOMAINS: &[&str] = &["BOREHOLE-DEPTH", "TIME", "VERTICAL-DEPTH"];

/// Frame index direction indicators.
pub const DIRECTIONS: &[&str] = &["INCREASING", "DECREASING"];
