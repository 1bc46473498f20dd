//! Parser for detector-error-model text.
//!
//! Handles `error(p) D.. L..`, `detector D..`, `repeat N { .. }`,
//! `shift_detectors N`, `^` separators on correlated errors, comments and
//! blank lines. Unknown instructions are skipped.

use crate::driver::weighted::WeightedGraph;
use crate::error::DemError;

pub fn parse_dem(text: &str) -> Result<WeightedGraph, DemError> {
    let mut graph = WeightedGraph::new();
    let lines: Vec<&str> = text.lines().collect();
    parse_block(&lines, &mut graph, 0)?;
    Ok(graph)
}

/// Parse lines into `graph`, shifting all detector ids by
/// `detector_offset`. Returns the largest raw detector id seen, which
/// `repeat` uses to compute its per-iteration shift.
fn parse_block(
    lines: &[&str],
    graph: &mut WeightedGraph,
    detector_offset: usize,
) -> Result<usize, DemError> {
    let mut max_detector = 0;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with('#') {
            i += 1;
            continue;
        }
        if line.starts_with("error") {
            max_detector = max_detector.max(parse_error_line(line, graph, detector_offset)?);
        } else if line.starts_with("detector") {
            max_detector = max_detector.max(parse_detector_line(line, graph, detector_offset)?);
        } else if line.starts_with("repeat") {
            let (max, consumed) = parse_repeat(&lines[i..], graph, detector_offset)?;
            max_detector = max_detector.max(max);
            i += consumed;
            continue;
        }
        i += 1;
    }
    Ok(max_detector)
}

/// `error(p) D<i> [D<j>] [L<k>..] [^ ..]`. The `^`-separated tail of a
/// correlated error is dropped. Returns the largest raw detector id.
fn parse_error_line(
    line: &str,
    graph: &mut WeightedGraph,
    detector_offset: usize,
) -> Result<usize, DemError> {
    let line = line.split('^').next().unwrap_or(line);

    let open = line
        .find('(')
        .ok_or_else(|| DemError::InvalidSyntax(format!("error line missing '(': {line}")))?;
    let close = line
        .find(')')
        .ok_or_else(|| DemError::InvalidSyntax(format!("error line missing ')': {line}")))?;
    let p: f64 = line[open + 1..close]
        .trim()
        .parse()
        .map_err(|_| DemError::InvalidProbability(line[open + 1..close].trim().to_string()))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(DemError::InvalidProbability(p.to_string()));
    }

    let mut detectors = Vec::new();
    let mut observables = Vec::new();
    let mut max_detector = 0;

    for token in line[close + 1..].split_whitespace() {
        if let Some(rest) = token.strip_prefix('D') {
            let id: usize = rest
                .parse()
                .map_err(|_| DemError::InvalidDetectorId(token.to_string()))?;
            max_detector = max_detector.max(id);
            detectors.push(id + detector_offset);
        } else if let Some(rest) = token.strip_prefix('L') {
            let id: usize = rest
                .parse()
                .map_err(|_| DemError::InvalidObservableId(token.to_string()))?;
            observables.push(id);
        } else {
            return Err(DemError::InvalidSyntax(format!(
                "unexpected token {token:?} in error line"
            )));
        }
    }

    graph.handle_dem_instruction(p, &detectors, &observables);
    Ok(max_detector)
}

/// `detector D<i> [coords..]`: make sure the node exists. Coordinates are
/// ignored. Returns the raw detector id.
fn parse_detector_line(
    line: &str,
    graph: &mut WeightedGraph,
    detector_offset: usize,
) -> Result<usize, DemError> {
    for token in line.split_whitespace().skip(1) {
        if let Some(rest) = token.strip_prefix('D') {
            let id: usize = rest
                .parse()
                .map_err(|_| DemError::InvalidDetectorId(token.to_string()))?;
            let shifted = id + detector_offset;
            if shifted >= graph.nodes.len() {
                graph.nodes.resize_with(shifted + 1, Default::default);
            }
            return Ok(id);
        }
    }
    Ok(0)
}

/// `repeat N { .. }` starting at `lines[0]`. Replays the body N times with
/// an increasing detector offset; the shift per iteration is an explicit
/// `shift_detectors` in the body, or one past the body's largest detector.
/// Returns `(largest shifted detector id, lines consumed)`.
fn parse_repeat(
    lines: &[&str],
    graph: &mut WeightedGraph,
    detector_offset: usize,
) -> Result<(usize, usize), DemError> {
    let header = lines[0].trim();
    let count: usize = header
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| DemError::InvalidSyntax("repeat missing count".into()))?
        .parse()
        .map_err(|_| DemError::InvalidSyntax(format!("bad repeat count: {header}")))?;

    let mut body = Vec::new();
    let mut depth = 0u32;
    let mut end = None;
    for (j, &l) in lines.iter().enumerate() {
        let trimmed = l.trim();
        if trimmed.contains('{') {
            depth += 1;
        }
        if trimmed.contains('}') {
            depth = depth.checked_sub(1).ok_or(DemError::UnbalancedRepeat)?;
            if depth == 0 {
                end = Some(j);
                break;
            }
        }
        if j > 0 && depth > 0 {
            body.push(l);
        }
    }
    let end = end.ok_or(DemError::UnbalancedRepeat)?;

    let explicit_shift = body.iter().find_map(|l| {
        let t = l.trim();
        t.strip_prefix("shift_detectors")
            .and_then(|rest| rest.trim().parse::<usize>().ok())
    });
    // Dry pass over a scratch graph to learn the body's detector span.
    let span = {
        let mut scratch = WeightedGraph::new();
        parse_block(&body, &mut scratch, 0)?
    };
    let shift = explicit_shift.unwrap_or(span + 1);

    let mut overall_max = 0;
    for iteration in 0..count {
        let offset = detector_offset + iteration * shift;
        let max = parse_block(&body, graph, offset)?;
        overall_max = overall_max.max(max + offset);
    }
    Ok((overall_max, end + 1))
}
