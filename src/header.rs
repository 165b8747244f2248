/// CellTable Schema Headers
///
/// Column headers that carry full type and cell shape information, one per
/// output field. Each header is a one-character type tag followed by the
/// column name. A tensor column spans one field per cell element: the first
/// header also gives the cell shape, the rest only the element's index.
///
/// ```text
/// _H:  $method  #year  %image[2:0,0]<2:2,3>  %image[2:0,1]  ...  %image[2:1,2]
/// ```
///
/// Integer types without a tag of their own are written as the nearest tag
/// (`|` for 64-bit integers, `@` for bytes) and read back as that type.

use crate::column::ColumnType;
use crate::error::{Result, TableError};
use crate::table::{ColumnSpec, Schema};

/// Marker that starts a header line.
pub const HEADER_MARKER: &str = "_H:";

/// Tag written for `column_type`.
pub fn type_tag(column_type: ColumnType) -> char {
    match column_type {
        ColumnType::String => '$',
        ColumnType::Float32 => '%',
        ColumnType::Float64 => '#',
        ColumnType::Int16
        | ColumnType::Int32
        | ColumnType::Int64
        | ColumnType::UInt16
        | ColumnType::UInt32
        | ColumnType::UInt64 => '|',
        ColumnType::Int8 | ColumnType::UInt8 => '@',
        ColumnType::Bool => '^',
    }
}

/// Column type for a header tag. `&` is an older spelling of `$`.
pub fn type_from_tag(tag: char) -> Result<ColumnType> {
    match tag {
        '$' | '&' => Ok(ColumnType::String),
        '%' => Ok(ColumnType::Float32),
        '#' => Ok(ColumnType::Float64),
        '|' => Ok(ColumnType::Int64),
        '@' => Ok(ColumnType::UInt8),
        '^' => Ok(ColumnType::Bool),
        other => Err(TableError::Header(format!("unknown type tag '{}'", other))),
    }
}

fn join_dims(dims: &[usize]) -> String {
    dims.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Headers for every column of `schema`, starting with `_H:`.
pub fn schema_headers(schema: &Schema) -> Vec<String> {
    let mut headers = vec![HEADER_MARKER.to_string()];
    for spec in schema.columns() {
        let name = format!("{}{}", type_tag(spec.column_type), spec.name);
        if spec.cell_shape.is_empty() {
            headers.push(name);
            continue;
        }
        let dims = spec.cell_shape.len();
        let prefix = format!("{}[{}:", name, dims);
        headers.push(format!(
            "{}{}]<{}:{}>",
            prefix,
            vec!["0"; dims].join(","),
            dims,
            join_dims(&spec.cell_shape)
        ));

        let mut index = vec![0usize; dims];
        for _ in 1..spec.cell_size() {
            // row-major increment
            for d in (0..dims).rev() {
                index[d] += 1;
                if index[d] < spec.cell_shape[d] {
                    break;
                }
                index[d] = 0;
            }
            headers.push(format!("{}{}]", prefix, join_dims(&index)));
        }
    }
    headers
}

/// Parses an `N:d1,..,dN` shape string.
pub fn shape_from_string(dims: &str) -> Result<Vec<usize>> {
    let bad = || TableError::Header(format!("malformed shape '{}'", dims));
    let (count, sizes) = dims.split_once(':').ok_or_else(bad)?;
    let count: usize = count.trim().parse().map_err(|_| bad())?;
    let shape = sizes
        .split(',')
        .map(|d| d.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| bad())?;
    if shape.len() != count {
        return Err(bad());
    }
    Ok(shape)
}

/// Rebuilds a schema from headers written by `schema_headers`. The `_H:`
/// marker and empty fields are skipped, as are the per-element headers that
/// follow a tensor column's first header. A name without a known tag is a
/// string column.
pub fn schema_from_headers(headers: &[&str]) -> Result<Schema> {
    let mut specs = Vec::new();
    for &header in headers {
        if header.is_empty() || header == HEADER_MARKER {
            continue;
        }
        let (column_type, rest) = match header.chars().next().map(type_from_tag) {
            Some(Ok(t)) => (t, &header[1..]),
            _ => (ColumnType::String, header),
        };

        if let Some(dim_start) = rest.find("]<") {
            let bracket = rest.find('[').unwrap_or(dim_start);
            let shape_str = rest[dim_start + 2..]
                .strip_suffix('>')
                .ok_or_else(|| TableError::Header(format!("unterminated shape in '{}'", header)))?;
            let cell_shape = shape_from_string(shape_str)?;
            specs.push(ColumnSpec::tensor(
                &rest[..bracket],
                column_type,
                cell_shape,
                Vec::new(),
            ));
        } else if rest.find('[').map_or(false, |i| i > 0) {
            continue;
        } else {
            specs.push(ColumnSpec::scalar(rest, column_type));
        }
    }
    log::trace!("parsed {} columns from {} headers", specs.len(), headers.len());
    Ok(Schema::new(specs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::scalar("method", ColumnType::String),
            ColumnSpec::scalar("year", ColumnType::Float64),
            ColumnSpec::tensor("image", ColumnType::Float32, vec![2, 3], Vec::new()),
            ColumnSpec::scalar("ok", ColumnType::Bool),
        ])
    }

    #[test]
    fn test_tags() {
        assert_eq!(type_tag(ColumnType::String), '$');
        assert_eq!(type_tag(ColumnType::Int32), '|');
        assert_eq!(type_tag(ColumnType::Int8), '@');
        assert_eq!(type_from_tag('#').unwrap(), ColumnType::Float64);
        assert_eq!(type_from_tag('&').unwrap(), ColumnType::String);
        assert!(matches!(type_from_tag('!'), Err(TableError::Header(_))));
    }

    #[test]
    fn test_schema_headers() {
        let headers = schema_headers(&sample_schema());
        assert_eq!(headers.len(), 1 + 2 + 6 + 1);
        assert_eq!(headers[0], "_H:");
        assert_eq!(headers[1], "$method");
        assert_eq!(headers[2], "#year");
        assert_eq!(headers[3], "%image[2:0,0]<2:2,3>");
        assert_eq!(headers[4], "%image[2:0,1]");
        assert_eq!(headers[6], "%image[2:1,0]");
        assert_eq!(headers[8], "%image[2:1,2]");
        assert_eq!(headers[9], "^ok");
    }

    #[test]
    fn test_schema_round_trip() {
        let schema = sample_schema();
        let headers = schema_headers(&schema);
        let refs: Vec<&str> = headers.iter().map(|s| s.as_str()).collect();
        assert_eq!(schema_from_headers(&refs).unwrap(), schema);
    }

    #[test]
    fn test_narrow_ints_widen() {
        let schema = Schema::new(vec![
            ColumnSpec::scalar("a", ColumnType::Int16),
            ColumnSpec::scalar("b", ColumnType::Int8),
        ]);
        let headers = schema_headers(&schema);
        let refs: Vec<&str> = headers.iter().map(|s| s.as_str()).collect();
        let back = schema_from_headers(&refs).unwrap();
        assert_eq!(back.columns()[0].column_type, ColumnType::Int64);
        assert_eq!(back.columns()[1].column_type, ColumnType::UInt8);
    }

    #[test]
    fn test_untagged_and_bad_headers() {
        let schema = schema_from_headers(&["_H:", "plain", "", "#x"]).unwrap();
        assert_eq!(schema.get_column_names(), vec!["plain", "x"]);
        assert_eq!(schema.columns()[0].column_type, ColumnType::String);

        assert!(schema_from_headers(&["%img[2:0,0]<2:x,3>"]).is_err());
        assert!(schema_from_headers(&["%img[2:0,0]<2:2,3"]).is_err());
    }

    #[test]
    fn test_shape_from_string() {
        assert_eq!(shape_from_string("2:3,4").unwrap(), vec![3, 4]);
        assert_eq!(shape_from_string("1:5").unwrap(), vec![5]);
        assert!(shape_from_string("3:1,2").is_err());
        assert!(shape_from_string("34").is_err());
    }
}
