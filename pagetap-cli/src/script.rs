use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pagetap_core::{PointerEvent, Size};

/// Reads a gesture script: a JSON array of pointer events in replay order.
pub fn load(path: &Path) -> Result<Vec<PointerEvent>> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read script {:?}", path))?;
    parse(&source).with_context(|| format!("invalid script {:?}", path))
}

pub fn parse(source: &str) -> Result<Vec<PointerEvent>> {
    let events: Vec<PointerEvent> = serde_json::from_str(source)?;
    if let Some(pair) = events.windows(2).find(|pair| pair[1].at() < pair[0].at()) {
        bail!(
            "timestamps go backwards: {} ms after {} ms",
            pair[1].at().as_millis(),
            pair[0].at().as_millis()
        );
    }
    Ok(events)
}

/// Parses a `WIDTHxHEIGHT` container size in view pixels.
pub fn parse_container(value: &str) -> Result<Size, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| format!("invalid dimension {part:?} in {value:?}"))
    };
    Ok(Size::new(parse(width)?, parse(height)?))
}
