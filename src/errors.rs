use std::fmt;

#[derive(Debug, Clone)]
pub enum ShortpushError {
    FileOperation(String),
    Serialization(String),
    Validation(String),
    NotFound(String),
    DateParse(String),
    Channel(String),
    CodeGeneration(String),
}

impl ShortpushError {
    pub fn code(&self) -> &'static str {
        match self {
            ShortpushError::FileOperation(_) => "E001",
            ShortpushError::Serialization(_) => "E002",
            ShortpushError::Validation(_) => "E003",
            ShortpushError::NotFound(_) => "E004",
            ShortpushError::DateParse(_) => "E005",
            ShortpushError::Channel(_) => "E006",
            ShortpushError::CodeGeneration(_) => "E007",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ShortpushError::FileOperation(_) => "File Operation Error",
            ShortpushError::Serialization(_) => "Serialization Error",
            ShortpushError::Validation(_) => "Validation Error",
            ShortpushError::NotFound(_) => "Resource Not Found",
            ShortpushError::DateParse(_) => "Date Parse Error",
            ShortpushError::Channel(_) => "Channel Error",
            ShortpushError::CodeGeneration(_) => "Code Generation Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ShortpushError::FileOperation(msg) => msg,
            ShortpushError::Serialization(msg) => msg,
            ShortpushError::Validation(msg) => msg,
            ShortpushError::NotFound(msg) => msg,
            ShortpushError::DateParse(msg) => msg,
            ShortpushError::Channel(msg) => msg,
            ShortpushError::CodeGeneration(msg) => msg,
        }
    }
}

impl fmt::Display for ShortpushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for ShortpushError {}

impl ShortpushError {
    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortpushError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortpushError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortpushError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortpushError::NotFound(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        ShortpushError::DateParse(msg.into())
    }

    pub fn channel<T: Into<String>>(msg: T) -> Self {
        ShortpushError::Channel(msg.into())
    }

    pub fn code_generation<T: Into<String>>(msg: T) -> Self {
        ShortpushError::CodeGeneration(msg.into())
    }
}

impl From<std::io::Error> for ShortpushError {
    fn from(err: std::io::Error) -> Self {
        ShortpushError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ShortpushError {
    fn from(err: serde_json::Error) -> Self {
        ShortpushError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for ShortpushError {
    fn from(err: chrono::ParseError) -> Self {
        ShortpushError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortpushError>;
