use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use crate::{
    Error, Result,
    geometry::{Point, Polyline},
};

/// Reads paths from `path`, or from stdin when `None`.
pub fn read_paths(path: Option<&Path>) -> Result<Vec<Polyline>> {
    let text = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            Error::invalid_input(format!("failed to read {}: {e}", path.display()))
        })?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    parse_paths(&text)
}

/// One path per line as whitespace-separated `x,y` tokens. Blank lines and
/// lines starting with `#` are skipped.
pub fn parse_paths(input: &str) -> Result<Vec<Polyline>> {
    let mut paths = Vec::new();

    for (line_idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let points = line
            .split_whitespace()
            .enumerate()
            .map(|(tok_idx, tok)| {
                parse_point(tok).map_err(|e| {
                    Error::invalid_input(format!(
                        "Line {} token {}: {}",
                        line_idx + 1,
                        tok_idx + 1,
                        detail(e)
                    ))
                })
            })
            .collect::<Result<Vec<Point>>>()?;
        paths.push(Polyline::new(points));
    }

    if paths.is_empty() {
        return Err(Error::invalid_input("No paths provided."));
    }

    Ok(paths)
}

/// Parses a single `x,y` coordinate with finite components.
pub fn parse_point(raw: &str) -> Result<Point> {
    let mut it = raw.trim().split(',');
    let (Some(x_s), Some(y_s), None) = (it.next(), it.next(), it.next()) else {
        return Err(Error::invalid_input(format!("expected 'x,y' but got: {raw}")));
    };

    let x: f64 = x_s
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input(format!("invalid x coordinate: {x_s}")))?;
    let y: f64 = y_s
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input(format!("invalid y coordinate: {y_s}")))?;

    let point = Point::new(x, y);
    if !point.is_finite() {
        return Err(Error::invalid_input(format!("non-finite coordinate: {raw}")));
    }
    Ok(point)
}

fn detail(err: Error) -> String {
    match err {
        Error::InvalidInput(message) => message,
        other => other.to_string(),
    }
}
