// ==========================================
// 会议截稿数据集 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 数据违规不是错误（见 domain::report::Violation），
//       这里只描述文件/配置/网络等运行错误
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .yml/.yaml）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("文件写入失败: {0}")]
    FileWriteError(String),

    #[error("YAML 解析失败: {0}")]
    YamlParseError(String),

    #[error("YAML 序列化失败: {0}")]
    YamlWriteError(String),

    #[error("数据集结构错误 ({path}): {message}")]
    DatasetShapeError { path: String, message: String },

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 网络错误 =====
    #[error("HTTP 客户端错误: {0}")]
    HttpClientError(String),

    #[error("地理编码失败 ({place}): {message}")]
    GeocodingError { place: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<serde_yaml::Error>
impl From<serde_yaml::Error> for ImportError {
    fn from(err: serde_yaml::Error) -> Self {
        ImportError::YamlParseError(err.to_string())
    }
}

// 实现 From<toml::de::Error>
impl From<toml::de::Error> for ImportError {
    fn from(err: toml::de::Error) -> Self {
        ImportError::ConfigReadError {
            key: "<file>".to_string(),
            message: err.to_string(),
        }
    }
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::HttpClientError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
