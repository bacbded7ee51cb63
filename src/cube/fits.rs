//! Minimal FITS primary-HDU reader/writer for spectral cubes.

use std::path::Path;

use ndarray::Array3;

use crate::{
    cube::{AxisMeta, Cube, CubeMeta},
    foundation::{
        core::CubeShape,
        error::{PvError, PvResult},
    },
};

const BLOCK: usize = 2880;
const CARD: usize = 80;
const MAX_NAXIS: i64 = 999;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum HeaderValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            HeaderValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Header {
    cards: Vec<(String, HeaderValue)>,
}

impl Header {
    pub(crate) fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn int(&self, key: &str) -> PvResult<i64> {
        self.get(key)
            .and_then(HeaderValue::as_i64)
            .ok_or_else(|| PvError::format(format!("missing or non-integer header card {key}")))
    }

    fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(HeaderValue::as_text)
            .map(str::to_string)
    }

    fn axis(&self, n: usize) -> AxisMeta {
        AxisMeta {
            ctype: self.text(&format!("CTYPE{n}")),
            cunit: self.text(&format!("CUNIT{n}")),
            crval: self.float(&format!("CRVAL{n}")),
            cdelt: self.float(&format!("CDELT{n}")),
            crpix: self.float(&format!("CRPIX{n}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bitpix {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Bitpix {
    fn from_card(v: i64) -> PvResult<Self> {
        Ok(match v {
            8 => Self::U8,
            16 => Self::I16,
            32 => Self::I32,
            64 => Self::I64,
            -32 => Self::F32,
            -64 => Self::F64,
            other => {
                return Err(PvError::format(format!("unsupported BITPIX {other}")));
            }
        })
    }

    fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64)
    }
}

/// Parse header cards up to `END`. Returns the header and the byte offset of the data unit.
pub(crate) fn parse_header(bytes: &[u8]) -> PvResult<(Header, usize)> {
    let mut header = Header::default();

    for (i, raw) in bytes.chunks(CARD).enumerate() {
        if raw.len() < CARD {
            break;
        }
        if !raw.is_ascii() {
            return Err(PvError::format(format!("header card {i} is not ASCII")));
        }
        let card = std::str::from_utf8(raw)
            .map_err(|_| PvError::format(format!("header card {i} is not ASCII")))?;
        let key = card[..8].trim_end();

        if i == 0 && key != "SIMPLE" {
            return Err(PvError::format("not a FITS file (first card is not SIMPLE)"));
        }
        if key == "END" {
            let header_len = (i + 1) * CARD;
            let data_offset = header_len.div_ceil(BLOCK) * BLOCK;
            return Ok((header, data_offset));
        }
        if &card[8..10] != "= " {
            continue;
        }
        if let Some(value) = parse_value(&card[10..])? {
            header.cards.push((key.to_string(), value));
        }
    }

    Err(PvError::format("FITS header has no END card"))
}

fn parse_value(field: &str) -> PvResult<Option<HeaderValue>> {
    let field = field.trim_start();

    if let Some(rest) = field.strip_prefix('\'') {
        let mut out = String::new();
        let mut chars = rest.chars().peekable();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    out.push('\'');
                }
                Some('\'') => break,
                Some(c) => out.push(c),
                None => return Err(PvError::format("unterminated string in header card")),
            }
        }
        return Ok(Some(HeaderValue::Text(out.trim_end().to_string())));
    }

    let value = field.split('/').next().unwrap_or("").trim();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(match value {
        "T" => HeaderValue::Logical(true),
        "F" => HeaderValue::Logical(false),
        _ => {
            if let Ok(i) = value.parse::<i64>() {
                HeaderValue::Integer(i)
            } else if let Ok(f) = value.replace(['D', 'd'], "E").parse::<f64>() {
                HeaderValue::Float(f)
            } else {
                HeaderValue::Text(value.to_string())
            }
        }
    }))
}

/// Read the primary HDU of `path` as a (spectral, rows, cols) cube.
pub fn read_cube(path: &Path) -> PvResult<Cube> {
    let bytes = std::fs::read(path).map_err(|e| PvError::io(path, e))?;
    decode_cube(&bytes).map_err(|e| match e {
        PvError::Format(msg) => PvError::format(format!("'{}': {msg}", path.display())),
        other => other,
    })
}

pub(crate) fn decode_cube(bytes: &[u8]) -> PvResult<Cube> {
    let (header, data_offset) = parse_header(bytes)?;

    if header.get("SIMPLE") != Some(&HeaderValue::Logical(true)) {
        return Err(PvError::format("SIMPLE must be T"));
    }

    let bitpix = Bitpix::from_card(header.int("BITPIX")?)?;
    let naxis = header.int("NAXIS")?;
    if naxis < 3 {
        return Err(PvError::format(format!(
            "primary array has {naxis} axes, expected a 3-D cube"
        )));
    }
    if naxis > MAX_NAXIS {
        return Err(PvError::format(format!(
            "NAXIS = {naxis} exceeds the FITS limit of {MAX_NAXIS}"
        )));
    }

    let mut dims = Vec::with_capacity(naxis as usize);
    for n in 1..=naxis {
        let len = header.int(&format!("NAXIS{n}"))?;
        if len <= 0 {
            return Err(PvError::format(format!("NAXIS{n} = {len}, expected > 0")));
        }
        dims.push(len as usize);
    }
    if let Some((n, len)) = dims.iter().enumerate().skip(3).find(|(_, len)| **len != 1) {
        return Err(PvError::format(format!(
            "NAXIS{} = {len}; only degenerate axes are allowed beyond the third",
            n + 1
        )));
    }

    let shape = CubeShape::new(dims[2], dims[1], dims[0])?;
    let need = shape
        .spectral
        .checked_mul(shape.rows)
        .and_then(|n| n.checked_mul(shape.cols))
        .and_then(|n| n.checked_mul(bitpix.bytes()))
        .ok_or_else(|| PvError::format("cube size overflows"))?;
    let end = data_offset
        .checked_add(need)
        .ok_or_else(|| PvError::format("cube size overflows"))?;
    let data = bytes
        .get(data_offset..end)
        .ok_or_else(|| {
            PvError::format(format!(
                "data unit truncated: need {need} bytes at offset {data_offset}, file has {}",
                bytes.len()
            ))
        })?;

    let bscale = header.float("BSCALE").unwrap_or(1.0);
    let bzero = header.float("BZERO").unwrap_or(0.0);
    let blank = if bitpix.is_integer() {
        header.get("BLANK").and_then(HeaderValue::as_i64)
    } else {
        None
    };

    let values = decode_samples(data, bitpix, bscale, bzero, blank);
    let array = Array3::from_shape_vec(shape.as_tuple(), values)
        .map_err(|e| PvError::format(format!("cannot shape data unit: {e}")))?;

    let meta = CubeMeta {
        cols: header.axis(1),
        rows: header.axis(2),
        spectral: header.axis(3),
        object: header.text("OBJECT"),
        bunit: header.text("BUNIT"),
    };
    Cube::from_array(array, meta)
}

fn decode_samples(
    data: &[u8],
    bitpix: Bitpix,
    bscale: f64,
    bzero: f64,
    blank: Option<i64>,
) -> Vec<f64> {
    let scale = |raw: f64| bzero + bscale * raw;
    let int = |raw: i64| {
        if blank == Some(raw) {
            f64::NAN
        } else {
            scale(raw as f64)
        }
    };

    match bitpix {
        Bitpix::U8 => data.iter().map(|b| int(i64::from(*b))).collect(),
        Bitpix::I16 => data
            .chunks_exact(2)
            .map(|c| int(i64::from(i16::from_be_bytes([c[0], c[1]]))))
            .collect(),
        Bitpix::I32 => data
            .chunks_exact(4)
            .map(|c| int(i64::from(i32::from_be_bytes([c[0], c[1], c[2], c[3]]))))
            .collect(),
        Bitpix::I64 => data
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                int(i64::from_be_bytes(b))
            })
            .collect(),
        Bitpix::F32 => data
            .chunks_exact(4)
            .map(|c| scale(f64::from(f32::from_be_bytes([c[0], c[1], c[2], c[3]]))))
            .collect(),
        Bitpix::F64 => data
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                scale(f64::from_be_bytes(b))
            })
            .collect(),
    }
}

pub(crate) fn card(key: &str, value: &HeaderValue) -> String {
    let value = match value {
        HeaderValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        HeaderValue::Integer(i) => format!("{i:>20}"),
        HeaderValue::Float(f) => format!("{f:>20.12E}"),
        HeaderValue::Text(s) => format!("'{:<8}'", s.replace('\'', "''")),
    };
    let mut out = format!("{key:<8}= {value}");
    out.truncate(CARD);
    format!("{out:<80}")
}

fn end_card() -> String {
    format!("{:<80}", "END")
}

/// Serialise `cube` as a FITS primary HDU with `BITPIX = -64`.
pub fn write_cube(path: &Path, cube: &Cube) -> PvResult<()> {
    let bytes = encode_cube(cube);
    std::fs::write(path, bytes).map_err(|e| PvError::io(path, e))
}

pub(crate) fn encode_cube(cube: &Cube) -> Vec<u8> {
    let shape = cube.shape();
    let meta = cube.meta();

    let mut cards = vec![
        card("SIMPLE", &HeaderValue::Logical(true)),
        card("BITPIX", &HeaderValue::Integer(-64)),
        card("NAXIS", &HeaderValue::Integer(3)),
        card("NAXIS1", &HeaderValue::Integer(shape.cols as i64)),
        card("NAXIS2", &HeaderValue::Integer(shape.rows as i64)),
        card("NAXIS3", &HeaderValue::Integer(shape.spectral as i64)),
    ];
    for (n, axis) in [(1, &meta.cols), (2, &meta.rows), (3, &meta.spectral)] {
        push_axis_cards(&mut cards, n, axis);
    }
    if let Some(object) = &meta.object {
        cards.push(card("OBJECT", &HeaderValue::Text(object.clone())));
    }
    if let Some(bunit) = &meta.bunit {
        cards.push(card("BUNIT", &HeaderValue::Text(bunit.clone())));
    }
    cards.push(end_card());

    let mut out: Vec<u8> = cards.concat().into_bytes();
    out.resize(out.len().div_ceil(BLOCK) * BLOCK, b' ');

    let data_start = out.len();
    for v in cube.view().iter() {
        out.extend_from_slice(&v.to_be_bytes());
    }
    let data_len = out.len() - data_start;
    out.resize(data_start + data_len.div_ceil(BLOCK) * BLOCK, 0);
    out
}

fn push_axis_cards(cards: &mut Vec<String>, n: usize, axis: &AxisMeta) {
    if let Some(ctype) = &axis.ctype {
        cards.push(card(&format!("CTYPE{n}"), &HeaderValue::Text(ctype.clone())));
    }
    if let Some(cunit) = &axis.cunit {
        cards.push(card(&format!("CUNIT{n}"), &HeaderValue::Text(cunit.clone())));
    }
    for (key, value) in [("CRVAL", axis.crval), ("CDELT", axis.cdelt), ("CRPIX", axis.crpix)] {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            cards.push(card(&format!("{key}{n}"), &HeaderValue::Float(v)));
        }
    }
}
