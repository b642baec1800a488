use anyhow::{Context, Result, bail};

/// Upper bound on how many seeds a single range token may expand to.
const MAX_RANGE_LEN: i64 = 10_000;

/// Map seed metadata for a tester run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: i64,
    /// Token the seed came from, kept for reports.
    pub source: String,
}

impl SeedInfo {
    #[must_use]
    pub fn from_numeric(seed: i64) -> Self {
        Self {
            seed,
            source: seed.to_string(),
        }
    }
}

fn parse_seed(token: &str) -> Result<i64> {
    token
        .trim()
        .parse::<i64>()
        .with_context(|| format!("invalid seed '{token}'"))
}

fn expand_range(token: &str, start: &str, end: &str, inclusive: bool) -> Result<Vec<SeedInfo>> {
    let start = parse_seed(start)?;
    let end = parse_seed(end)?;
    let end = if inclusive { end.saturating_add(1) } else { end };
    if end <= start {
        bail!("seed range '{token}' is empty");
    }
    if end.saturating_sub(start) > MAX_RANGE_LEN {
        bail!("seed range '{token}' expands to more than {MAX_RANGE_LEN} seeds");
    }
    Ok((start..end)
        .map(|seed| SeedInfo {
            seed,
            source: token.to_string(),
        })
        .collect())
}

/// Resolve CLI seed tokens into map seeds.
///
/// Accepts integers (negative included), `a..b`, and `a..=b`. Duplicates keep
/// their first occurrence.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut resolved: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let expanded = if let Some((start, end)) = token.split_once("..=") {
            expand_range(token, start, end, true)?
        } else if let Some((start, end)) = token.split_once("..") {
            expand_range(token, start, end, false)?
        } else {
            vec![SeedInfo::from_numeric(parse_seed(token)?)]
        };

        for info in expanded {
            if !resolved.iter().any(|existing| existing.seed == info.seed) {
                resolved.push(info);
            }
        }
    }

    if resolved.is_empty() {
        bail!("no seeds provided");
    }
    Ok(resolved)
}
