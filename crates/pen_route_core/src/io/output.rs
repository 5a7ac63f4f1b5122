use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::{Error, Result, geometry::Polyline};

/// Writes `route` in the input format, to `path` or stdout when `None`.
pub fn write_route(route: &[Polyline], path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                Error::other(format!("failed to create output file {}: {e}", path.display()))
            })?;
            write_paths(BufWriter::new(file), route)
        }
        None => write_paths(BufWriter::new(io::stdout().lock()), route),
    }
}

pub fn write_paths<W: Write>(mut out: W, route: &[Polyline]) -> Result<()> {
    for path in route {
        writeln!(out, "{path}")?;
    }
    out.flush()?;
    Ok(())
}
