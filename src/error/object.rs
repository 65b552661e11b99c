//! `ffi.Error` - an error materialized as a runtime object

use crate::any::{FromAny, IntoAny, RawAny};
use crate::object::{make_object, Object};
use crate::registry::{type_index, StructuralKind};

use super::{Error, ErrorKind};

#[repr(C)]
pub struct ErrorNode {
    base: Object,
    kind: String,
    message: String,
    backtrace: String,
}

crate::object_type! {
    ErrorNode: "ffi.Error" extends Object {
        const STATIC_TYPE_INDEX: i32 = type_index::ERROR;
        const TYPE_FINAL: bool = true;
        const STRUCTURAL_KIND: StructuralKind = StructuralKind::UniqueInstance;
    }
}

crate::object_ref! {
    /// Reference to an error object
    pub struct ErrorObj(ErrorNode) {
        const NULLABLE: bool = false;
    }
}

impl ErrorNode {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }
}

impl ErrorObj {
    pub fn new(error: &Error) -> Self {
        Self::from_ptr(make_object(ErrorNode {
            base: Object::new(),
            kind: error.kind().as_str().to_string(),
            message: error.message().to_string(),
            backtrace: error.backtrace().to_string(),
        }))
    }

    pub fn to_error(&self) -> Error {
        Error::new(ErrorKind::from_name(&self.kind), self.message.clone())
            .with_backtrace(self.backtrace.clone())
    }
}

impl From<Error> for ErrorObj {
    fn from(error: Error) -> Self {
        Self::new(&error)
    }
}

impl IntoAny for Error {
    fn into_raw_any(self) -> RawAny {
        ErrorObj::new(&self).into_raw_any()
    }
}

impl FromAny for Error {
    fn check_raw_strict(raw: &RawAny) -> bool {
        raw.type_index == type_index::ERROR
    }

    unsafe fn copy_from_raw_after_check(raw: &RawAny) -> Self {
        ErrorObj::copy_from_raw_after_check(raw).to_error()
    }

    fn type_str() -> String {
        "ffi.Error".to_string()
    }

    fn static_type_index() -> i32 {
        type_index::ERROR
    }
}
