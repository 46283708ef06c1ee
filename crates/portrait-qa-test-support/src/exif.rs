//! JPEGs with embedded EXIF tags.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};

/// Adds an EXIF APP1 segment to an existing JPEG.
#[derive(Debug, Clone, Default)]
pub struct ExifJpegBuilder {
    gps: Option<(f64, f64)>,
    software: Option<String>,
    copyright: Option<String>,
    taken: Option<String>,
}

impl ExifJpegBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a GPS position in decimal degrees.
    #[must_use]
    pub const fn gps(mut self, latitude: f64, longitude: f64) -> Self {
        self.gps = Some((latitude, longitude));
        self
    }

    /// Adds a `Software` tag.
    #[must_use]
    pub fn software(mut self, software: impl Into<String>) -> Self {
        self.software = Some(software.into());
        self
    }

    /// Adds a `Copyright` tag.
    #[must_use]
    pub fn copyright(mut self, notice: impl Into<String>) -> Self {
        self.copyright = Some(notice.into());
        self
    }

    /// Adds `DateTimeOriginal`, formatted `YYYY:MM:DD HH:MM:SS`.
    #[must_use]
    pub fn taken(mut self, datetime: impl Into<String>) -> Self {
        self.taken = Some(datetime.into());
        self
    }

    /// Inserts the tags into `jpeg`, right after the SOI marker.
    ///
    /// # Errors
    ///
    /// Returns an error when the tags cannot be serialised.
    ///
    /// # Panics
    ///
    /// Panics if `jpeg` does not start with a SOI marker.
    pub fn apply(&self, jpeg: &[u8]) -> Result<Vec<u8>, exif::Error> {
        assert!(jpeg.starts_with(&[0xFF, 0xD8]), "not a JPEG");

        let fields = self.fields();
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false)?;

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(tiff.get_ref());
        let len = u16::try_from(payload.len() + 2)
            .map_err(|_| exif::Error::TooBig("EXIF segment exceeds 64 KiB"))?;

        let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        Ok(out)
    }

    fn fields(&self) -> Vec<Field> {
        let ascii = |tag, text: &str| Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        };
        let mut fields = Vec::new();
        if let Some(software) = &self.software {
            fields.push(ascii(Tag::Software, software));
        }
        if let Some(notice) = &self.copyright {
            fields.push(ascii(Tag::Copyright, notice));
        }
        if let Some(taken) = &self.taken {
            fields.push(ascii(Tag::DateTimeOriginal, taken));
        }
        if let Some((lat, lon)) = self.gps {
            fields.push(ascii(Tag::GPSLatitudeRef, if lat >= 0.0 { "N" } else { "S" }));
            fields.push(Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(dms(lat)),
            });
            fields.push(ascii(Tag::GPSLongitudeRef, if lon >= 0.0 { "E" } else { "W" }));
            fields.push(Field {
                tag: Tag::GPSLongitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(dms(lon)),
            });
        }
        fields
    }
}

/// Degrees, minutes and hundredths of seconds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn dms(decimal: f64) -> Vec<Rational> {
    let value = decimal.abs();
    let degrees = value.trunc();
    let minutes = ((value - degrees) * 60.0).trunc();
    let seconds = ((value - degrees) * 60.0 - minutes) * 60.0;
    vec![
        Rational::from((degrees as u32, 1)),
        Rational::from((minutes as u32, 1)),
        Rational::from(((seconds * 100.0).round() as u32, 100)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortraitBuilder;

    #[test]
    fn test_tags_are_readable() {
        let jpeg = PortraitBuilder::new(64, 64).jpeg();
        let tagged = ExifJpegBuilder::new()
            .gps(52.52, -13.405)
            .software("PhotoEditor 2.0")
            .apply(&jpeg)
            .unwrap_or_else(|e| panic!("{e}"));

        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(&tagged))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(exif.get_field(Tag::GPSLatitude, In::PRIMARY).is_some());
        let reference = exif
            .get_field(Tag::GPSLongitudeRef, In::PRIMARY)
            .map(|f| f.display_value().to_string());
        assert_eq!(reference.as_deref(), Some("W"));
        assert!(exif.get_field(Tag::Software, In::PRIMARY).is_some());
        assert!(image::load_from_memory(&tagged).is_ok());
    }

    #[test]
    fn test_dms_conversion() {
        let parts = dms(52.5);
        assert_eq!(parts[0].num, 52);
        assert_eq!(parts[1].num, 30);
        assert_eq!(parts[2].num, 0);
    }
}
