/// STL model parser for binary and ASCII formats
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::ParseError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, ParseError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(ParseError::TooSmall(data.len()));
    }

    let count_bytes: [u8; 4] = [data[80], data[81], data[82], data[83]];
    let declared = u32::from_le_bytes(count_bytes) as usize;
    let body = &data[HEADER_LEN + 4..];

    let mut mesh = Mesh::with_capacity(declared.min(body.len() / FACET_LEN));
    let mut facets = body.chunks_exact(FACET_LEN);
    for index in 0..declared {
        let facet = facets
            .next()
            .ok_or(ParseError::Truncated { index, declared })?;

        let [nx, ny, nz] = read_vec3(&facet[0..12]);
        let mut vertices = [Vertex::new(0.0, 0.0, 0.0, nx, ny, nz); 3];
        for (i, vertex) in vertices.iter_mut().enumerate() {
            let start = 12 + i * 12;
            let [x, y, z] = read_vec3(&facet[start..start + 12]);
            *vertex = Vertex::new(x, y, z, nx, ny, nz);
        }
        // Trailing 2-byte attribute count is ignored

        mesh.add_triangle(Triangle::new(vertices[0], vertices[1], vertices[2]));
    }

    Ok(mesh)
}

fn read_vec3(bytes: &[u8]) -> [f32; 3] {
    let f = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    [f(0), f(4), f(8)]
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, ParseError> {
    match parse_solid(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(ParseError::Ascii(e.to_string())),
    }
}

fn parse_solid(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = not_line_ending(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse an STL model (ASCII first when the header says `solid`).
///
/// Binary exporters sometimes start their header with `solid`, so a failed
/// ASCII parse falls through to the binary reader.
pub fn parse_stl(data: &[u8]) -> Result<Mesh, ParseError> {
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            match parse_ascii_stl(text) {
                Ok(mesh) => return Ok(mesh),
                Err(e) => tracing::debug!("ASCII STL parse failed, trying binary: {e}"),
            }
        }
    }

    parse_binary_stl(data)
}
