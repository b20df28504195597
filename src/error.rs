use thiserror::Error;

/// Result type for lowering and class emission.
pub type Result<T> = std::result::Result<T, LowerError>;

/// Everything that can abort the emission of a class.
///
/// Emission is all-or-nothing: any of these stops the current class before
/// bytes are produced.
#[derive(Error, Debug)]
pub enum LowerError {
    #[error("unsupported variant: {message}")]
    UnsupportedVariant { message: String },

    #[error("type contract violation: {message}")]
    TypeContractViolation { message: String },

    #[error("structural ambiguity: {message}")]
    StructuralAmbiguity { message: String },

    #[error("code generation error: {message}")]
    CodeGen { message: String },

    #[error("encoding error: {0}")]
    Encoding(#[from] binrw::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "jar")]
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl LowerError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedVariant {
            message: message.into(),
        }
    }

    pub fn type_contract(message: impl Into<String>) -> Self {
        Self::TypeContractViolation {
            message: message.into(),
        }
    }

    pub fn ambiguity(message: impl Into<String>) -> Self {
        Self::StructuralAmbiguity {
            message: message.into(),
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        Self::CodeGen {
            message: message.into(),
        }
    }
}
