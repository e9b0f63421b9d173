//! # TOML 场景配置
//!
//! 场景文件的每个表对应经典引擎的一个节（`[General]`、`[Figure0]`、`[Light0]` ...）。
//! [`Section`] 提供按类型取值的访问器：`required_*` 在缺失时报告
//! [`RenderError::MissingValue`]，`*_or` 在缺失时返回默认值；类型不符一律是
//! [`RenderError::MalformedValue`]。

use crate::error::{RenderError, Result};
use crate::material_system::color::Color;
use log::debug;
use nalgebra::{Point3, Vector3};
use std::path::{Path, PathBuf};
use toml::Value;

/// 已解析的场景文件
#[derive(Debug, Clone)]
pub struct SceneConfig {
    root: toml::Table,
    /// 场景文件所在目录，用于解析相对路径（L-系统文法文件）
    base_dir: PathBuf,
}

impl SceneConfig {
    /// 从TOML文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("加载场景文件: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::load_from_content(&content, base_dir)
    }

    /// 从TOML内容字符串加载配置
    pub fn load_from_content(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let root: toml::Table = toml::from_str(content)?;
        Ok(Self {
            root,
            base_dir: base_dir.into(),
        })
    }

    /// 取一个节；不存在的节表现为空节
    pub fn section<'a>(&'a self, name: &'a str) -> Section<'a> {
        Section {
            name,
            table: self.root.get(name).and_then(|v| v.as_table()),
        }
    }

    /// 相对于场景文件目录解析路径
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// 配置中的一个节
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    name: &'a str,
    table: Option<&'a toml::Table>,
}

impl<'a> Section<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    fn value(&self, key: &str) -> Option<&'a Value> {
        self.table.and_then(|t| t.get(key))
    }

    fn required(&self, key: &str) -> Result<&'a Value> {
        self.value(key)
            .ok_or_else(|| RenderError::missing(self.name, key))
    }

    fn malformed(&self, key: &str, expected: &str, found: &Value) -> RenderError {
        RenderError::malformed(
            self.name,
            key,
            format!("expected {expected}, found {}", found.type_str()),
        )
    }

    fn as_int(&self, key: &str, value: &Value) -> Result<i64> {
        value
            .as_integer()
            .ok_or_else(|| self.malformed(key, "an integer", value))
    }

    /// 整数也作为浮点数接受
    fn as_float(&self, key: &str, value: &Value) -> Result<f64> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(self.malformed(key, "a number", other)),
        }
    }

    fn as_float_tuple(&self, key: &str, value: &Value) -> Result<Vec<f64>> {
        let array = value
            .as_array()
            .ok_or_else(|| self.malformed(key, "an array of numbers", value))?;
        array.iter().map(|v| self.as_float(key, v)).collect()
    }

    fn as_int_tuple(&self, key: &str, value: &Value) -> Result<Vec<i64>> {
        let array = value
            .as_array()
            .ok_or_else(|| self.malformed(key, "an array of integers", value))?;
        array.iter().map(|v| self.as_int(key, v)).collect()
    }

    // ===== 标量 =====

    pub fn required_int(&self, key: &str) -> Result<i64> {
        self.as_int(key, self.required(key)?)
    }

    /// 非负整数
    pub fn required_count(&self, key: &str) -> Result<usize> {
        let value = self.required_int(key)?;
        usize::try_from(value)
            .map_err(|_| RenderError::malformed(self.name, key, format!("{value} is negative")))
    }

    pub fn count_or(&self, key: &str, default: usize) -> Result<usize> {
        if self.contains(key) {
            self.required_count(key)
        } else {
            Ok(default)
        }
    }

    pub fn required_float(&self, key: &str) -> Result<f64> {
        self.as_float(key, self.required(key)?)
    }

    pub fn float_or(&self, key: &str, default: f64) -> Result<f64> {
        self.value(key).map_or(Ok(default), |v| self.as_float(key, v))
    }

    pub fn required_bool(&self, key: &str) -> Result<bool> {
        let value = self.required(key)?;
        value
            .as_bool()
            .ok_or_else(|| self.malformed(key, "a boolean", value))
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        if self.contains(key) {
            self.required_bool(key)
        } else {
            Ok(default)
        }
    }

    pub fn required_string(&self, key: &str) -> Result<&'a str> {
        let value = self.required(key)?;
        value
            .as_str()
            .ok_or_else(|| self.malformed(key, "a string", value))
    }

    // ===== 元组 =====

    pub fn required_float_tuple(&self, key: &str) -> Result<Vec<f64>> {
        self.as_float_tuple(key, self.required(key)?)
    }

    pub fn required_int_tuple(&self, key: &str) -> Result<Vec<i64>> {
        self.as_int_tuple(key, self.required(key)?)
    }

    fn triple(&self, key: &str, values: Vec<f64>) -> Result<Vector3<f64>> {
        match values.as_slice() {
            [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
            _ => Err(RenderError::malformed(
                self.name,
                key,
                format!("expected 3 components, found {}", values.len()),
            )),
        }
    }

    pub fn required_vector3(&self, key: &str) -> Result<Vector3<f64>> {
        let values = self.required_float_tuple(key)?;
        self.triple(key, values)
    }

    pub fn vector3_or(&self, key: &str, default: Vector3<f64>) -> Result<Vector3<f64>> {
        if self.contains(key) {
            self.required_vector3(key)
        } else {
            Ok(default)
        }
    }

    pub fn required_point3(&self, key: &str) -> Result<Point3<f64>> {
        self.required_vector3(key).map(Point3::from)
    }

    pub fn point3_or(&self, key: &str, default: Point3<f64>) -> Result<Point3<f64>> {
        self.vector3_or(key, default.coords).map(Point3::from)
    }

    pub fn color_or(&self, key: &str, default: Color) -> Result<Color> {
        self.vector3_or(key, default)
    }
}
