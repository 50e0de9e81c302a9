//! Read-only table store over a NetCDF-4/HDF5 file.
//!
//! Every variable of the file is a table; its path is the slash-separated
//! chain of enclosing groups followed by the variable name, e.g.
//! `/hydro/data/channel stage`. The file is opened per call and never held
//! open between calls.

use std::path::{Path, PathBuf};

use netcdf::AttributeValue as NcValue;
use tracing::debug;

use super::TableError;
use super::store::TableSource;
use super::table::{AttributeValue, Table};

/// Table store backed by a NetCDF-4/HDF5 file.
#[derive(Clone, Debug)]
pub struct NetCdfStore {
    path: PathBuf,
}

impl NetCdfStore {
    /// Open the file at `path`, checking that it is readable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref().to_path_buf();
        netcdf::open(&path)?;
        Ok(Self { path })
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for NetCdfStore {
    fn load(&self, path: &str) -> Result<Table, TableError> {
        let file = netcdf::open(&self.path)?;
        let var = file
            .variable(path.trim_start_matches('/'))
            .ok_or_else(|| TableError::TableNotFound(path.to_string()))?;

        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let data: Vec<f64> = var.get_values(..)?;
        let mut table = Table::new(path, shape, data)?;
        for attr in var.attributes() {
            if let Some(value) = convert_attribute(attr.value()?) {
                table = table.with_attribute(attr.name(), value);
            }
        }
        debug!(file = %self.path.display(), table = path, "loaded NetCDF table");
        Ok(table)
    }

    fn table_paths(&self) -> Result<Vec<String>, TableError> {
        let file = netcdf::open(&self.path)?;
        let mut paths: Vec<String> = file.variables().map(|v| format!("/{}", v.name())).collect();
        for group in file.groups()? {
            collect_group_paths(&group, String::new(), &mut paths);
        }
        Ok(paths)
    }
}

fn collect_group_paths(group: &netcdf::Group<'_>, prefix: String, paths: &mut Vec<String>) {
    let prefix = format!("{prefix}/{}", group.name());
    paths.extend(group.variables().map(|v| format!("{prefix}/{}", v.name())));
    for child in group.groups() {
        collect_group_paths(&child, prefix.clone(), paths);
    }
}

fn convert_attribute(value: NcValue) -> Option<AttributeValue> {
    let list = |items: Vec<AttributeValue>| Some(AttributeValue::List(items));
    match value {
        NcValue::Str(s) => Some(AttributeValue::Text(s)),
        NcValue::Strs(v) => list(v.into_iter().map(AttributeValue::Text).collect()),
        NcValue::Uchars(b) => Some(AttributeValue::Bytes(b)),
        NcValue::Int(i) => Some(AttributeValue::Int(i64::from(i))),
        NcValue::Ints(v) => list(
            v.into_iter()
                .map(|i| AttributeValue::Int(i64::from(i)))
                .collect(),
        ),
        NcValue::Longlong(i) => Some(AttributeValue::Int(i)),
        NcValue::Float(f) => Some(AttributeValue::Float(f64::from(f))),
        NcValue::Floats(v) => list(
            v.into_iter()
                .map(|f| AttributeValue::Float(f64::from(f)))
                .collect(),
        ),
        NcValue::Double(d) => Some(AttributeValue::Float(d)),
        NcValue::Doubles(v) => list(v.into_iter().map(AttributeValue::Float).collect()),
        _ => None,
    }
}
