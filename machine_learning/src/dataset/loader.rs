use std::io::BufRead;

use ndarray::{Array2, ArrayView2, s};

use super::{InMemoryDataset, LoadErr};
use crate::{Result, error::MlError};

/// Builds a dataset out of flat rows, each holding `x_size` inputs followed by `y_size` targets.
///
/// # Returns
/// An error if the sizes are zero or `data` doesn't hold a whole amount of rows.
pub fn from_rows(data: &[f32], x_size: usize, y_size: usize) -> Result<InMemoryDataset> {
    let row_size = x_size + y_size;
    if x_size == 0 || y_size == 0 {
        return Err(MlError::InvalidInput("x_size and y_size must be positive"));
    }

    if data.is_empty() || data.len() % row_size != 0 {
        return Err(MlError::ShapeMismatch {
            what: "dataset rows",
            got: data.len(),
            expected: (data.len() / row_size).max(1) * row_size,
        });
    }

    let rows = ArrayView2::from_shape((data.len() / row_size, row_size), data)
        .map_err(|_| MlError::InvalidInput("dataset rows shape"))?;

    let x: Array2<f32> = rows.slice(s![.., ..x_size]).to_owned();
    let y: Array2<f32> = rows.slice(s![.., x_size..]).to_owned();
    InMemoryDataset::new(x, y)
}

/// Reads a comma separated file of `x_size + y_size` values per line.
///
/// Blank lines are skipped.
pub fn read_csv<R: BufRead>(
    reader: R,
    x_size: usize,
    y_size: usize,
) -> std::result::Result<InMemoryDataset, LoadErr> {
    let row_size = x_size + y_size;
    let mut data = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values = line
            .split(',')
            .map(|v| {
                v.trim().parse::<f32>().map_err(|_| LoadErr::Parse {
                    line: i + 1,
                    msg: format!("cannot parse '{v}' as f32"),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if values.len() != row_size {
            return Err(LoadErr::Parse {
                line: i + 1,
                msg: format!(
                    "expected {row_size} values (x_size={x_size} + y_size={y_size}), got {}",
                    values.len()
                ),
            });
        }

        data.extend(values);
    }

    Ok(from_rows(&data, x_size, y_size)?)
}
