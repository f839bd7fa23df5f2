// ==========================================
// 会议截稿数据集 - YAML 文件读写
// ==========================================
// 支持: YAML (.yml/.yaml)，顶层必须是映射序列
// 写出: serde_yaml 按规范字段顺序序列化，空的可选字段省略
//       先全部写入同目录临时文件，全部成功后再逐个替换目标文件
// ==========================================

use crate::domain::{ConferenceRecord, RawConferenceRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::pipeline_trait::DatasetParser;
use indexmap::IndexMap;
use serde_yaml::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

// ==========================================
// YAML Parser 实现
// ==========================================
pub struct YamlDatasetParser;

impl DatasetParser for YamlDatasetParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawConferenceRecord>> {
        let path = file_path;

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "yml" && ext != "yaml" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document: Value = serde_yaml::from_str(&content)?;

        let entries = match document {
            Value::Null => Vec::new(),
            Value::Sequence(entries) => entries,
            other => {
                return Err(shape_error(
                    path,
                    format!("顶层必须是序列，实际为 {}", value_kind(&other)),
                ))
            }
        };

        let mut records = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            let entry_number = idx + 1;
            let mapping = match entry {
                Value::Mapping(mapping) => mapping,
                other => {
                    return Err(shape_error(
                        path,
                        format!("第 {} 条必须是映射，实际为 {}", entry_number, value_kind(&other)),
                    ))
                }
            };

            let mut fields = IndexMap::with_capacity(mapping.len());
            for (key, value) in mapping {
                let Value::String(key) = key else {
                    return Err(shape_error(
                        path,
                        format!("第 {} 条存在非字符串字段名", entry_number),
                    ));
                };
                fields.insert(key.trim().to_string(), value);
            }

            records.push(RawConferenceRecord::new(entry_number, fields));
        }

        debug!(path = %path.display(), count = records.len(), "YAML 数据集解析完成");
        Ok(records)
    }
}

impl YamlDatasetParser {
    /// 解析可选数据集（文件不存在视为空）
    pub fn parse_optional(&self, file_path: &Path) -> ImportResult<Vec<RawConferenceRecord>> {
        if !file_path.exists() {
            debug!(path = %file_path.display(), "数据集不存在，按空处理");
            return Ok(Vec::new());
        }
        self.parse_to_raw_records(file_path)
    }
}

/// 写出多个数据集（全有或全无）
///
/// 任一文件序列化或写入临时文件失败时不替换任何目标文件。
/// 替换按参数顺序进行。
pub fn write_datasets(datasets: &[(&Path, &[ConferenceRecord])]) -> ImportResult<()> {
    let staged = datasets
        .iter()
        .map(|(path, records)| StagedDataset::stage(path, records))
        .collect::<ImportResult<Vec<_>>>()?;

    for dataset in staged {
        dataset.commit()?;
    }
    Ok(())
}

// ==========================================
// StagedDataset - 已写入临时文件、待替换的数据集
// ==========================================
struct StagedDataset {
    target: PathBuf,
    file: NamedTempFile,
    count: usize,
}

impl StagedDataset {
    fn stage(file_path: &Path, records: &[ConferenceRecord]) -> ImportResult<Self> {
        let content = serde_yaml::to_string(records)
            .map_err(|e| ImportError::YamlWriteError(e.to_string()))?;

        let parent = file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| write_error(parent, e))?;

        // 临时文件与目标同目录，保证 rename 不跨文件系统
        let mut file = NamedTempFile::new_in(parent).map_err(|e| write_error(parent, e))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| write_error(file_path, e))?;

        Ok(Self {
            target: file_path.to_path_buf(),
            file,
            count: records.len(),
        })
    }

    fn commit(self) -> ImportResult<()> {
        self.file
            .persist(&self.target)
            .map_err(|e| write_error(&self.target, e.error))?;
        debug!(path = %self.target.display(), count = self.count, "数据集已写出");
        Ok(())
    }
}

fn write_error(path: &Path, error: std::io::Error) -> ImportError {
    ImportError::FileWriteError(format!("{}: {}", path.display(), error))
}

fn shape_error(path: &Path, message: String) -> ImportError {
    ImportError::DatasetShapeError {
        path: path.display().to_string(),
        message,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "布尔",
        Value::Number(_) => "数字",
        Value::String(_) => "字符串",
        Value::Sequence(_) => "序列",
        Value::Mapping(_) => "映射",
        Value::Tagged(_) => "标签值",
    }
}
