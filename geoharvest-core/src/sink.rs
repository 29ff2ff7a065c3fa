use crate::error::{HarvestError, SinkError};
use crate::record::OutputRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Geographic WGS84, the only coordinate system the sinks write.
pub const WGS84_WKT: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]]"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub width: usize,
}

/// Append-only destination for harvested points.
///
/// Fields must be added before any record carrying them is appended.
/// Nothing is ever rewritten or rolled back.
pub trait FeatureSink {
    fn add_text_field(&mut self, name: &str, max_len: usize) -> Result<(), SinkError>;

    fn append_record(&mut self, record: &OutputRecord) -> Result<(), SinkError>;

    fn fields(&self) -> &[FieldDef];

    fn records_written(&self) -> usize;
}

fn check_new_field(fields: &[FieldDef], name: &str) -> Result<(), SinkError> {
    if fields.iter().any(|f| f.name == name) {
        return Err(SinkError::DuplicateField(name.to_string()));
    }
    Ok(())
}

fn check_record(fields: &[FieldDef], record: &OutputRecord) -> Result<(), SinkError> {
    for name in record.attributes.keys() {
        if !fields.iter().any(|f| &f.name == name) {
            return Err(SinkError::UnknownField(name.clone()));
        }
    }
    Ok(())
}

/// Keeps everything in memory. Used by library callers and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    fields: Vec<FieldDef>,
    records: Vec<OutputRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

impl FeatureSink for MemorySink {
    fn add_text_field(&mut self, name: &str, max_len: usize) -> Result<(), SinkError> {
        check_new_field(&self.fields, name)?;
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type: FieldType::Text,
            width: max_len,
        });
        Ok(())
    }

    fn append_record(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        check_record(&self.fields, record)?;
        self.records.push(record.clone());
        Ok(())
    }

    fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    fn records_written(&self) -> usize {
        self.records.len()
    }
}

/// Newline-delimited GeoJSON features, flushed one per record so whatever
/// has been written survives an aborted run.
///
/// Two sidecars sit next to the data file: `<stem>.prj` with the WGS84 WKT
/// and `<stem>.fields.json` with the field list, rewritten as fields appear.
pub struct GeoJsonSeqSink {
    path: PathBuf,
    fields_path: PathBuf,
    writer: BufWriter<File>,
    fields: Vec<FieldDef>,
    written: usize,
}

impl GeoJsonSeqSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let prj_path = path.with_extension("prj");
        let fields_path = path.with_extension("fields.json");
        if prj_path == path || fields_path == path {
            return Err(SinkError::SidecarClash(path));
        }

        let file = File::create(&path)?;
        fs::write(&prj_path, WGS84_WKT)?;

        let mut sink = Self {
            fields_path,
            path,
            writer: BufWriter::new(file),
            fields: Vec::new(),
            written: 0,
        };
        sink.write_field_list()?;

        debug!("Created point dataset at {}", sink.path.display());
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fields_path(&self) -> &Path {
        &self.fields_path
    }

    pub fn prj_path(&self) -> PathBuf {
        self.path.with_extension("prj")
    }

    fn write_field_list(&self) -> Result<(), SinkError> {
        let schema = json!({
            "geometry": GeometryType::Point,
            "crs": WGS84_WKT,
            "fields": self.fields,
        });
        fs::write(&self.fields_path, serde_json::to_vec_pretty(&schema)?)?;
        Ok(())
    }

    /// Properties follow field order; fields the record lacks are `null`.
    pub fn feature(&self, record: &OutputRecord) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let value = match record.attributes.get(&field.name) {
                Some(text) => Value::String(text.chars().take(field.width).collect()),
                None => Value::Null,
            };
            properties.insert(field.name.clone(), value);
        }

        json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [record.longitude, record.latitude],
            },
            "properties": properties,
        })
    }
}

impl FeatureSink for GeoJsonSeqSink {
    fn add_text_field(&mut self, name: &str, max_len: usize) -> Result<(), SinkError> {
        check_new_field(&self.fields, name)?;
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type: FieldType::Text,
            width: max_len,
        });
        self.write_field_list()
    }

    fn append_record(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        check_record(&self.fields, record)?;
        let feature = self.feature(record);
        serde_json::to_writer(&mut self.writer, &feature)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    fn records_written(&self) -> usize {
        self.written
    }
}

/// Create the directory the dataset will live in. An existing directory is
/// fine; anything else that stops creation is fatal.
pub fn prepare_output_dir(output: &Path) -> Result<(), HarvestError> {
    let Some(parent) = output.parent() else {
        return Ok(());
    };

    match fs::create_dir_all(parent) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && parent.is_dir() => Ok(()),
        Err(source) => Err(HarvestError::Directory {
            path: parent.to_path_buf(),
            source,
        }),
    }
}
