//! GeoTIFF reading and writing on top of the pure-Rust `tiff` crate.
//!
//! Georeferencing is carried in the standard GeoTIFF tags:
//! 33550 ModelPixelScale, 33922 ModelTiepoint, 34735 GeoKeyDirectory,
//! 34736 GeoDoubleParams and 42113 GDAL_NODATA.
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;

use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

use super::crs::{Crs, MODIS_SPHERE_RADIUS};
use super::{GeoTransform, Raster};
use crate::error::{Error, Result};

// The tiff crate parses these codes into named variants; `Tag::Unknown(code)`
// never matches them.
const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GEO_DOUBLE_PARAMS: Tag = Tag::GeoDoubleParamsTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

// GeoKey ids.
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const GEOG_SEMI_MAJOR_AXIS: u16 = 2057;
const PROJECTED_CS_TYPE: u16 = 3072;
const PROJ_COORD_TRANS: u16 = 3075;
const PROJ_NAT_ORIGIN_LONG: u16 = 3080;
const PROJ_FALSE_EASTING: u16 = 3082;
const PROJ_FALSE_NORTHING: u16 = 3083;
const PROJ_CENTER_LONG: u16 = 3088;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;
const CT_SINUSOIDAL: u16 = 24;

/// Georeferencing read from a GeoTIFF header.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMeta {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Option<Crs>,
    pub nodata: Option<f64>,
}

fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

fn tag_f64s<R: std::io::Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<f64>>> {
    Ok(decoder.find_tag(tag)?.map(Value::into_f64_vec).transpose()?)
}

fn tag_u32s<R: std::io::Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<u32>>> {
    Ok(decoder.find_tag(tag)?.map(Value::into_u32_vec).transpose()?)
}

fn read_meta<R: std::io::Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoMeta> {
    let (width, height) = decoder.dimensions()?;

    let scale = tag_f64s(decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = tag_f64s(decoder, MODEL_TIEPOINT)?;
    let transform = match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 6 => {
            GeoTransform::new(t[3] - t[0] * s[0], t[4] + t[1] * s[1], s[0], -s[1])
        }
        _ => GeoTransform::default(),
    };

    let crs = match tag_u32s(decoder, GEO_KEY_DIRECTORY)? {
        Some(keys) => {
            let doubles = tag_f64s(decoder, GEO_DOUBLE_PARAMS)?.unwrap_or_default();
            parse_geokeys(&keys, &doubles)?
        }
        None => None,
    };

    let nodata = match decoder.find_tag(GDAL_NODATA)? {
        Some(Value::Ascii(s)) => s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse::<f64>().ok(),
        _ => None,
    };

    Ok(GeoMeta { width: width as usize, height: height as usize, transform, crs, nodata })
}

/// Read only the georeferencing of a GeoTIFF.
pub fn read_meta_from(path: &Path) -> Result<GeoMeta> {
    let mut decoder = open(path)?;
    read_meta(&mut decoder)
}

/// Resolve a GeoKey value, following GeoDoubleParams references.
fn geokey(keys: &[u32], doubles: &[f64], id: u16) -> Option<f64> {
    keys.get(4..)?.chunks_exact(4).find(|e| e[0] == id as u32).and_then(|e| {
        let (location, count, value) = (e[1], e[2], e[3] as usize);
        match location {
            0 => Some(value as f64),
            l if l == GEO_DOUBLE_PARAMS.to_u16() as u32 && count >= 1 => doubles.get(value).copied(),
            _ => None,
        }
    })
}

/// CRS described by a GeoKeyDirectory. An EPSG code outside the supported
/// set is an error; a directory naming no CRS at all yields `None`.
fn parse_geokeys(keys: &[u32], doubles: &[f64]) -> Result<Option<Crs>> {
    if let Some(code) = geokey(keys, doubles, PROJECTED_CS_TYPE) {
        if code as u16 != USER_DEFINED {
            return Crs::from_epsg(code as u32).map(Some);
        }
    }
    if geokey(keys, doubles, PROJ_COORD_TRANS) == Some(CT_SINUSOIDAL as f64) {
        let central_meridian = geokey(keys, doubles, PROJ_CENTER_LONG)
            .or_else(|| geokey(keys, doubles, PROJ_NAT_ORIGIN_LONG))
            .unwrap_or(0.0);
        return Ok(Some(Crs::Sinusoidal {
            radius: geokey(keys, doubles, GEOG_SEMI_MAJOR_AXIS).unwrap_or(MODIS_SPHERE_RADIUS),
            central_meridian,
            false_easting: geokey(keys, doubles, PROJ_FALSE_EASTING).unwrap_or(0.0),
            false_northing: geokey(keys, doubles, PROJ_FALSE_NORTHING).unwrap_or(0.0),
        }));
    }
    if let Some(code) = geokey(keys, doubles, GEOGRAPHIC_TYPE) {
        return Crs::from_epsg(code as u32).map(Some);
    }
    debug!("GeoKeyDirectory names no CRS");
    Ok(None)
}

fn unsupported(path: &Path, result: &DecodingResult) -> Error {
    let kind = match result {
        DecodingResult::U8(_) => "u8",
        DecodingResult::U16(_) => "u16",
        DecodingResult::U32(_) => "u32",
        DecodingResult::U64(_) => "u64",
        DecodingResult::I8(_) => "i8",
        DecodingResult::I16(_) => "i16",
        DecodingResult::I32(_) => "i32",
        DecodingResult::I64(_) => "i64",
        DecodingResult::F32(_) => "f32",
        DecodingResult::F64(_) => "f64",
        #[allow(unreachable_patterns)]
        _ => "unknown",
    };
    Error::UnsupportedPixelType { path: path.to_path_buf(), kind: kind.to_string() }
}

/// Read an 8-bit classified raster (first band).
pub fn read_u8(path: &Path) -> Result<Raster<u8>> {
    let mut decoder = open(path)?;
    let meta = read_meta(&mut decoder)?;
    let data = match decoder.read_image()? {
        DecodingResult::U8(v) => v,
        other => return Err(unsupported(path, &other)),
    };
    // Multi-sample images interleave bands; keep the first one.
    let samples = data.len() / (meta.width * meta.height).max(1);
    let data = if samples > 1 { data.into_iter().step_by(samples).collect() } else { data };

    Ok(Raster::from_vec(data, meta.width, meta.height, meta.transform)?
        .with_crs(meta.crs)
        .with_nodata(meta.nodata))
}

/// Read any numeric single-band raster as `f32`. Pixels equal to the declared
/// nodata value become NaN.
pub fn read_f32(path: &Path) -> Result<Raster<f32>> {
    let mut decoder = open(path)?;
    let meta = read_meta(&mut decoder)?;
    let data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        other => return Err(unsupported(path, &other)),
    };
    let samples = data.len() / (meta.width * meta.height).max(1);
    let mut data: Vec<f32> = if samples > 1 { data.into_iter().step_by(samples).collect() } else { data };

    if let Some(nd) = meta.nodata {
        let nd = nd as f32;
        for v in data.iter_mut().filter(|v| **v == nd) {
            *v = f32::NAN;
        }
    }

    Ok(Raster::from_vec(data, meta.width, meta.height, meta.transform)?
        .with_crs(meta.crs)
        .with_nodata(meta.nodata))
}

fn geokey_directory(crs: &Crs) -> (Vec<u16>, Vec<f64>) {
    let mut entries: Vec<[u16; 4]> = vec![[GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]];
    let mut doubles = Vec::new();
    match crs.epsg() {
        Some(code) if crs.is_geographic() => {
            entries.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            entries.push([GEOGRAPHIC_TYPE, 0, 1, code as u16]);
        }
        Some(code) => {
            entries.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
            entries.push([PROJECTED_CS_TYPE, 0, 1, code as u16]);
        }
        None => {
            if let Crs::Sinusoidal { radius, central_meridian, false_easting, false_northing } = *crs {
                let mut double_key = |id: u16, v: f64| {
                    entries.push([id, GEO_DOUBLE_PARAMS.to_u16(), 1, doubles.len() as u16]);
                    doubles.push(v);
                };
                double_key(GEOG_SEMI_MAJOR_AXIS, radius);
                double_key(PROJ_FALSE_EASTING, false_easting);
                double_key(PROJ_FALSE_NORTHING, false_northing);
                double_key(PROJ_CENTER_LONG, central_meridian);
                entries.push([GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
                entries.push([PROJECTED_CS_TYPE, 0, 1, USER_DEFINED]);
                entries.push([PROJ_COORD_TRANS, 0, 1, CT_SINUSOIDAL]);
            }
        }
    }
    entries.sort_by_key(|e| e[0]);

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    (keys, doubles)
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Option<&Crs>,
    nodata: Option<&str>,
) -> Result<()> {
    let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(MODEL_PIXEL_SCALE, &scale[..])?;
    dir.write_tag(MODEL_TIEPOINT, &tiepoint[..])?;

    if let Some(crs) = crs {
        let (keys, doubles) = geokey_directory(crs);
        dir.write_tag(GEO_KEY_DIRECTORY, &keys[..])?;
        if !doubles.is_empty() {
            dir.write_tag(GEO_DOUBLE_PARAMS, &doubles[..])?;
        }
    }
    if let Some(nd) = nodata {
        dir.write_tag(GDAL_NODATA, nd)?;
    }
    Ok(())
}

fn write_raster<C>(raster: &Raster<C::Inner>, path: &Path, nodata: Option<String>) -> Result<()>
where
    C: colortype::ColorType,
    C::Inner: Copy,
    [C::Inner]: TiffValue,
{
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut image = encoder.new_image::<C>(raster.width as u32, raster.height as u32)?;
    write_geo_tags(image.encoder(), &raster.transform, raster.crs.as_ref(), nodata.as_deref())?;
    image.write_data(&raster.data)?;
    Ok(())
}

/// Write an 8-bit classified raster.
pub fn write_u8(raster: &Raster<u8>, path: &Path) -> Result<()> {
    let nodata = raster.nodata.map(|nd| format!("{}", nd as i64));
    write_raster::<colortype::Gray8>(raster, path, nodata)
}

/// Write a float raster; NaN is declared as nodata.
pub fn write_f32(raster: &Raster<f32>, path: &Path) -> Result<()> {
    write_raster::<colortype::Gray32Float>(raster, path, Some("nan".to_string()))
}
