use std::sync::LazyLock;

use regex::Regex;

/// Sort sentinel for activities whose name carries no day token; keeps
/// unlabeled activities last among same-date, same-block peers.
pub const UNNUMBERED_DAY: u32 = 999;

/// Field naming conventions embed the block number in free text. Ordered:
/// the spaced `Bloque N` forms run before the bare `BN` shorthand so a
/// two-digit block is never truncated by a shorter prefix pattern.
static BLOCK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Bloque\s+(\d+)",
        r"(?i)Block\s+(\d+)",
        r"(?i)B(\d+)",
        r"(?i)bloque\s*(\d+)",
        r"(?i)sector\s+(\d+)",
        r"(?i)-\s*Bloque\s+(\d+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("block pattern should compile"))
    .collect()
});

static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Día (\d+)").expect("day pattern should compile"));

static BUFFER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)remanente|último|ultimo|final|restante|comodín|comodin|buffer")
        .expect("buffer pattern should compile")
});

/// Structured facts parsed out of an activity name, extracted once on
/// load so decision points never re-scan the raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameFacts {
    pub block: Option<u32>,
    pub day_index: u32,
    pub is_buffer: bool,
}

impl NameFacts {
    pub fn parse(name: &str) -> Self {
        Self {
            block: extract_block_number(name),
            day_index: extract_day_number(name),
            is_buffer: is_buffer_day(name),
        }
    }
}

pub fn extract_block_number(name: &str) -> Option<u32> {
    for pattern in BLOCK_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(name) {
            if let Ok(block) = captures[1].parse::<u32>() {
                return Some(block);
            }
        }
    }
    None
}

pub fn extract_day_number(name: &str) -> u32 {
    DAY_PATTERN
        .captures(name)
        .and_then(|captures| captures[1].parse::<u32>().ok())
        .unwrap_or(UNNUMBERED_DAY)
}

/// The buffer ("comodín") day is the block's shock absorber; it is only
/// recognizable by keyword.
pub fn is_buffer_day(name: &str) -> bool {
    BUFFER_PATTERN.is_match(name)
}
