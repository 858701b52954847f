//! Architecture tags
//!
//! The header and partition extra areas store the target architecture as a
//! two-digit code in a 3-byte NUL-terminated field. The public API deals in
//! conventional architecture names ("amd64", "arm64", ...); the mapping
//! below translates between the two.

/// Code stored when the architecture is unknown or not applicable.
pub const ARCH_UNKNOWN: &str = "00";

const ARCH_TABLE: &[(&str, &str)] = &[
    ("386", "01"),
    ("amd64", "02"),
    ("arm", "03"),
    ("arm64", "04"),
    ("ppc64", "05"),
    ("ppc64le", "06"),
    ("mips", "07"),
    ("mipsle", "08"),
    ("mips64", "09"),
    ("mips64le", "10"),
    ("s390x", "11"),
    ("riscv64", "12"),
];

/// Returns the on-disk code for an architecture name, or [`ARCH_UNKNOWN`]
/// for names outside the supported set.
pub fn arch_code(name: &str) -> &'static str {
    ARCH_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
        .unwrap_or(ARCH_UNKNOWN)
}

/// Returns the architecture name for an on-disk code, or "unknown".
pub fn arch_name(code: &str) -> &'static str {
    ARCH_TABLE
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(n, _)| *n)
        .unwrap_or("unknown")
}
