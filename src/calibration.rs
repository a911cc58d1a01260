//! Camera calibration document access
//!
//! The vision module keeps its settings in XML files laid out as
//!
//! ```text
//! <base>/Module/General.xml          lists the module parts; one has <Type>Camera</Type>
//! <base>/Part/Camera/<Name>.xml      flat list of <Item><Name/><Value/></Item>
//! ```
//!
//! [`CalibrationLocator`] resolves the camera document and
//! [`XmlCalibrationStore`] reads and rewrites single values in it. Writes
//! are read-modify-write over the whole document and land through a rename,
//! so a failed write never leaves a half-written file behind.
//!
//! # Example
//!
//! ```rust,no_run
//! use vision_cal::calibration::{CalibrationLocator, CalibrationStore};
//!
//! let (camera, store) = CalibrationLocator::new("/opt/vision").open().unwrap();
//! let gain = store.read_gain().unwrap();
//! println!("{}: {:.2}", camera.camera_name, gain);
//! store.write_gain(0.57).unwrap();
//! ```

use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{xml, DEFAULT_GAIN, GAIN_MAX, GAIN_MIN, KEY_LIGHT_STRENGTH_GAIN};
use crate::util::write_atomic;

/// Calibration document error types
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("General.xml not found: {0}")]
    GeneralNotFound(PathBuf),

    #[error("No part of type Camera in {0}")]
    NoCameraPart(PathBuf),

    #[error("Camera document for '{camera}' not found: {path}")]
    CameraDocumentNotFound { camera: String, path: PathBuf },

    #[error("Calibration document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("XML error in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("Key '{key}' not found in {path}")]
    MissingKey { key: String, path: PathBuf },

    #[error("Value '{value}' of key '{key}' is not a number")]
    InvalidValue { key: String, value: String },

    #[error("Gain {0} is outside [0, 1]")]
    OutOfRange(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Keyed float storage
///
/// Implementations must not leave a partially updated store behind when
/// `write` fails.
pub trait CalibrationStore {
    fn read(&self, key: &str) -> Result<f64>;

    fn write(&self, key: &str, value: f64) -> Result<()>;

    /// Read LightStrengthGain
    fn read_gain(&self) -> Result<f64> {
        self.read(KEY_LIGHT_STRENGTH_GAIN)
    }

    /// Write LightStrengthGain after range validation
    fn write_gain(&self, gain: f64) -> Result<()> {
        if !(GAIN_MIN..=GAIN_MAX).contains(&gain) {
            return Err(CalibrationError::OutOfRange(gain));
        }
        self.write(KEY_LIGHT_STRENGTH_GAIN, gain)
    }
}

/// Read the gain, falling back to [`DEFAULT_GAIN`] on any error
///
/// The value is clamped to [0, 1] so it can go straight into
/// [`crate::recommend::recommend`].
pub fn load_gain_or_default(store: &dyn CalibrationStore) -> f64 {
    match store.read_gain() {
        Ok(gain) => gain.clamp(GAIN_MIN, GAIN_MAX),
        Err(e) => {
            tracing::warn!(error = %e, default = DEFAULT_GAIN, "using default gain");
            DEFAULT_GAIN
        }
    }
}

/// Resolved camera document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDocument {
    pub camera_name: String,
    pub path: PathBuf,
}

/// Finds the camera document below the module base directory
#[derive(Debug, Clone)]
pub struct CalibrationLocator {
    base: PathBuf,
}

impl CalibrationLocator {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn general_path(&self) -> PathBuf {
        self.base.join("Module").join("General.xml")
    }

    pub fn camera_path(&self, camera_name: &str) -> PathBuf {
        self.base
            .join("Part")
            .join("Camera")
            .join(format!("{camera_name}.xml"))
    }

    /// Resolve the camera document named in General.xml
    pub fn locate(&self) -> Result<CameraDocument> {
        let general = self.general_path();
        if !general.is_file() {
            return Err(CalibrationError::GeneralNotFound(general));
        }

        let content = std::fs::read_to_string(&general)?;
        let parts = collect_children(&content, xml::PART, &general)?;

        let camera_name = parts
            .iter()
            .find(|children| child_text(children, xml::TYPE) == Some(xml::TYPE_CAMERA))
            .and_then(|children| child_text(children, xml::NAME))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CalibrationError::NoCameraPart(general.clone()))?;

        let path = self.camera_path(&camera_name);
        if !path.is_file() {
            return Err(CalibrationError::CameraDocumentNotFound {
                camera: camera_name,
                path,
            });
        }

        tracing::debug!(camera = %camera_name, path = %path.display(), "camera document located");
        Ok(CameraDocument { camera_name, path })
    }

    /// Locate and open the camera document
    pub fn open(&self) -> Result<(CameraDocument, XmlCalibrationStore)> {
        let doc = self.locate()?;
        let store = XmlCalibrationStore::new(&doc.path);
        Ok((doc, store))
    }
}

/// Calibration values kept as `<Item><Name>k</Name><Value>v</Value></Item>`
#[derive(Debug, Clone)]
pub struct XmlCalibrationStore {
    path: PathBuf,
}

impl XmlCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<String> {
        if !self.path.is_file() {
            return Err(CalibrationError::DocumentNotFound(self.path.clone()));
        }
        Ok(std::fs::read_to_string(&self.path)?)
    }

    fn missing_key(&self, key: &str) -> CalibrationError {
        CalibrationError::MissingKey {
            key: key.to_string(),
            path: self.path.clone(),
        }
    }
}

impl CalibrationStore for XmlCalibrationStore {
    fn read(&self, key: &str) -> Result<f64> {
        let content = self.load()?;
        let items = collect_children(&content, xml::ITEM, &self.path)?;

        let raw = items
            .iter()
            .find(|children| child_text(children, xml::NAME) == Some(key))
            .and_then(|children| child_text(children, xml::VALUE))
            .ok_or_else(|| self.missing_key(key))?;

        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| CalibrationError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            })
    }

    fn write(&self, key: &str, value: f64) -> Result<()> {
        let content = self.load()?;
        let formatted = format!("{value:.2}");

        let updated = rewrite_values(&content, key, &formatted)
            .map_err(|message| CalibrationError::Xml {
                path: self.path.clone(),
                message,
            })?
            .ok_or_else(|| self.missing_key(key))?;

        write_atomic(&self.path, &updated)?;
        tracing::info!(key, value = %formatted, path = %self.path.display(), "calibration value written");
        Ok(())
    }
}

type Children = Vec<(String, String)>;

fn xml_error(path: &Path, err: impl Display) -> CalibrationError {
    CalibrationError::Xml {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Trimmed text of the first direct child called `name`
fn child_text<'a>(children: &'a Children, name: &str) -> Option<&'a str> {
    children
        .iter()
        .find(|(child, _)| child == name)
        .map(|(_, text)| text.trim())
}

/// Direct-child texts of every `tag` element, in document order
fn collect_children(content: &str, tag: &str, path: &Path) -> Result<Vec<Children>> {
    let mut reader = Reader::from_str(content);
    let tag = tag.as_bytes();

    let mut depth = 0usize;
    // (depth of the open `tag` element, its children so far)
    let mut open: Vec<(usize, Children)> = Vec::new();
    let mut entries = Vec::new();

    loop {
        match reader.read_event().map_err(|e| xml_error(path, e))? {
            Event::Start(e) => {
                let name = e.local_name();
                if let Some((d, children)) = open.last_mut() {
                    if depth == *d + 1 {
                        children.push((String::from_utf8_lossy(name.as_ref()).into_owned(), String::new()));
                    }
                }
                if name.as_ref() == tag {
                    open.push((depth, Vec::new()));
                }
                depth += 1;
            }
            Event::Empty(e) => {
                let name = e.local_name();
                if name.as_ref() == tag {
                    entries.push(Vec::new());
                } else if let Some((d, children)) = open.last_mut() {
                    if depth == *d + 1 {
                        children.push((String::from_utf8_lossy(name.as_ref()).into_owned(), String::new()));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((d, children)) = open.last_mut() {
                    if depth == *d + 2 {
                        let text = t.unescape().map_err(|e| xml_error(path, e))?;
                        if let Some((_, value)) = children.last_mut() {
                            value.push_str(&text);
                        }
                    }
                }
            }
            Event::CData(c) => {
                if let Some((d, children)) = open.last_mut() {
                    if depth == *d + 2 {
                        if let Some((_, value)) = children.last_mut() {
                            value.push_str(&String::from_utf8_lossy(&c));
                        }
                    }
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if open.last().is_some_and(|(d, _)| *d == depth) {
                    if let Some((_, children)) = open.pop() {
                        entries.push(children);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Replace the `Value` of every `Item` whose `Name` is `key`
///
/// Everything else is written back event for event. Returns `None` when no
/// item matched, so the caller can leave the document alone.
fn rewrite_values(
    content: &str,
    key: &str,
    value: &str,
) -> std::result::Result<Option<Vec<u8>>, String> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::with_capacity(content.len()));
    let item = xml::ITEM.as_bytes();

    let mut pending: Vec<Event<'static>> = Vec::new();
    let mut depth = 0usize;
    let mut replaced = false;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        if matches!(event, Event::Eof) {
            break;
        }

        if pending.is_empty() {
            let opens_item =
                matches!(&event, Event::Start(e) if e.local_name().as_ref() == item);
            if opens_item {
                depth = 1;
                pending.push(event.into_owned());
            } else {
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
            continue;
        }

        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            _ => {}
        }
        pending.push(event.into_owned());

        if depth == 0 {
            let events = std::mem::take(&mut pending);
            let events = if item_name(&events)?.as_deref() == Some(key) {
                replaced = true;
                replace_value(events, value)
            } else {
                events
            };
            for ev in events {
                writer.write_event(ev).map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(replaced.then(|| writer.into_inner()))
}

fn is_element(name: quick_xml::name::LocalName<'_>, expected: &str) -> bool {
    name.as_ref() == expected.as_bytes()
}

/// Trimmed text of the `Name` child of a buffered item
fn item_name(events: &[Event<'static>]) -> std::result::Result<Option<String>, String> {
    let mut depth = 0usize;
    let mut in_name = false;
    let mut name: Option<String> = None;

    for ev in events {
        match ev {
            Event::Start(e) => {
                if depth == 1 && name.is_none() && is_element(e.local_name(), xml::NAME) {
                    in_name = true;
                    name = Some(String::new());
                }
                depth += 1;
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 1 {
                    in_name = false;
                }
            }
            Event::Text(t) if in_name && depth == 2 => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if let Some(n) = name.as_mut() {
                    n.push_str(&text);
                }
            }
            Event::CData(c) if in_name && depth == 2 => {
                if let Some(n) = name.as_mut() {
                    n.push_str(&String::from_utf8_lossy(c));
                }
            }
            _ => {}
        }
    }

    Ok(name.map(|n| n.trim().to_string()))
}

/// Swap the content of the item's direct `Value` children for `value`
fn replace_value(events: Vec<Event<'static>>, value: &str) -> Vec<Event<'static>> {
    let mut out = Vec::with_capacity(events.len() + 2);
    let mut depth = 0usize;
    let mut skipping = false;

    for ev in events {
        if skipping {
            match ev {
                Event::Start(_) => depth += 1,
                Event::End(end) => {
                    depth -= 1;
                    if depth == 1 {
                        skipping = false;
                        out.push(Event::End(end));
                    }
                }
                _ => {}
            }
            continue;
        }

        match &ev {
            Event::Start(e) if depth == 1 && is_element(e.local_name(), xml::VALUE) => {
                out.push(ev.clone());
                out.push(Event::Text(BytesText::new(value).into_owned()));
                depth += 1;
                skipping = true;
                continue;
            }
            Event::Empty(e) if depth == 1 && is_element(e.local_name(), xml::VALUE) => {
                let start = e.clone().into_owned();
                let end = start.to_end().into_owned();
                out.push(Event::Start(start));
                out.push(Event::Text(BytesText::new(value).into_owned()));
                out.push(Event::End(end));
                continue;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            _ => {}
        }
        out.push(ev);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GENERAL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Module>
  <Parts>
    <Part><Type>Stage</Type><Name>XY</Name></Part>
    <Part><Type>Camera</Type><Name>Cam01</Name></Part>
  </Parts>
</Module>"#;

    const CAMERA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Camera>
  <Items>
    <Item><Name>Exposure</Name><Value>12.5</Value></Item>
    <Item>
      <Name>LightStrengthGain</Name>
      <Value>0.80</Value>
      <Unit>ratio</Unit>
    </Item>
    <Item><Value>3</Value><Name>ContrastOffset</Name></Item>
  </Items>
</Camera>"#;

    fn module_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("Module");
        let camera = dir.path().join("Part").join("Camera");
        std::fs::create_dir_all(&module).unwrap();
        std::fs::create_dir_all(&camera).unwrap();
        std::fs::write(module.join("General.xml"), GENERAL).unwrap();
        std::fs::write(camera.join("Cam01.xml"), CAMERA).unwrap();
        dir
    }

    fn store_with(content: &str) -> (TempDir, XmlCalibrationStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cam.xml");
        std::fs::write(&path, content).unwrap();
        (dir, XmlCalibrationStore::new(path))
    }

    #[test]
    fn test_locate_camera_document() {
        let dir = module_tree();
        let doc = CalibrationLocator::new(dir.path()).locate().unwrap();
        assert_eq!(doc.camera_name, "Cam01");
        assert!(doc.path.ends_with("Part/Camera/Cam01.xml"));
    }

    #[test]
    fn test_locate_missing_general() {
        let dir = TempDir::new().unwrap();
        let err = CalibrationLocator::new(dir.path()).locate().unwrap_err();
        assert!(matches!(err, CalibrationError::GeneralNotFound(_)));
    }

    #[test]
    fn test_locate_without_camera_part() {
        let dir = module_tree();
        std::fs::write(
            dir.path().join("Module").join("General.xml"),
            "<Module><Part><Type>Stage</Type><Name>XY</Name></Part></Module>",
        )
        .unwrap();
        let err = CalibrationLocator::new(dir.path()).locate().unwrap_err();
        assert!(matches!(err, CalibrationError::NoCameraPart(_)));
    }

    #[test]
    fn test_locate_missing_camera_document() {
        let dir = module_tree();
        std::fs::remove_file(dir.path().join("Part").join("Camera").join("Cam01.xml")).unwrap();
        let err = CalibrationLocator::new(dir.path()).locate().unwrap_err();
        match err {
            CalibrationError::CameraDocumentNotFound { camera, .. } => assert_eq!(camera, "Cam01"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_values() {
        let (_dir, store) = store_with(CAMERA);
        assert_eq!(store.read_gain().unwrap(), 0.80);
        assert_eq!(store.read("Exposure").unwrap(), 12.5);
        // Value listed before Name
        assert_eq!(store.read("ContrastOffset").unwrap(), 3.0);
    }

    #[test]
    fn test_read_missing_key_and_bad_value() {
        let (_dir, store) = store_with(CAMERA);
        assert!(matches!(
            store.read("Nope"),
            Err(CalibrationError::MissingKey { .. })
        ));

        let (_dir, store) = store_with(
            "<C><Item><Name>LightStrengthGain</Name><Value>bright</Value></Item></C>",
        );
        assert!(matches!(
            store.read_gain(),
            Err(CalibrationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_read_rejects_non_finite_values() {
        for raw in ["NaN", "inf", "-inf"] {
            let (_dir, store) = store_with(&format!(
                "<C><Item><Name>LightStrengthGain</Name><Value>{raw}</Value></Item></C>"
            ));
            assert!(matches!(
                store.read_gain(),
                Err(CalibrationError::InvalidValue { .. })
            ));
            assert_eq!(load_gain_or_default(&store), DEFAULT_GAIN);
        }
    }

    #[test]
    fn test_read_malformed_document() {
        let (_dir, store) = store_with("<C><Item><Name>LightStrengthGain</Name></Value></C>");
        assert!(matches!(store.read_gain(), Err(CalibrationError::Xml { .. })));
    }

    #[test]
    fn test_write_round_trip_two_decimals() {
        let (_dir, store) = store_with(CAMERA);
        store.write_gain(0.574_117_647).unwrap();
        assert_eq!(store.read_gain().unwrap(), 0.57);

        store.write_gain(1.0).unwrap();
        assert_eq!(store.read_gain().unwrap(), 1.0);
    }

    #[test]
    fn test_write_touches_only_matching_value() {
        let (_dir, store) = store_with(CAMERA);
        store.write_gain(0.25).unwrap();

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(written, CAMERA.replace("<Value>0.80</Value>", "<Value>0.25</Value>"));
    }

    #[test]
    fn test_write_fills_empty_value() {
        let (_dir, store) =
            store_with("<C><Item><Name>LightStrengthGain</Name><Value/></Item></C>");
        store.write_gain(0.4).unwrap();
        assert_eq!(store.read_gain().unwrap(), 0.4);
    }

    #[test]
    fn test_write_missing_key_leaves_file_untouched() {
        let original = "<C><Item><Name>Exposure</Name><Value>1</Value></Item></C>";
        let (_dir, store) = store_with(original);

        let err = store.write_gain(0.5).unwrap_err();
        assert!(matches!(err, CalibrationError::MissingKey { .. }));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), original);
    }

    #[test]
    fn test_write_rejects_out_of_range() {
        let (_dir, store) = store_with(CAMERA);
        assert!(matches!(
            store.write_gain(1.5),
            Err(CalibrationError::OutOfRange(_))
        ));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), CAMERA);
    }

    #[test]
    fn test_missing_document() {
        let store = XmlCalibrationStore::new("/nonexistent/cam.xml");
        assert!(matches!(
            store.read_gain(),
            Err(CalibrationError::DocumentNotFound(_))
        ));
        assert!(matches!(
            store.write_gain(0.5),
            Err(CalibrationError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_load_gain_or_default() {
        let (_dir, store) = store_with(CAMERA);
        assert_eq!(load_gain_or_default(&store), 0.80);

        let missing = XmlCalibrationStore::new("/nonexistent/cam.xml");
        assert_eq!(load_gain_or_default(&missing), DEFAULT_GAIN);

        let (_dir, over) =
            store_with("<C><Item><Name>LightStrengthGain</Name><Value>1.7</Value></Item></C>");
        assert_eq!(load_gain_or_default(&over), 1.0);
    }

    #[test]
    fn test_open_through_locator() {
        let dir = module_tree();
        let (doc, store) = CalibrationLocator::new(dir.path()).open().unwrap();
        assert_eq!(doc.camera_name, "Cam01");
        store.write_gain(0.33).unwrap();
        assert_eq!(store.read_gain().unwrap(), 0.33);
    }
}
