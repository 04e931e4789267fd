use crate::host::GenerationHost;
use clientgen_schema::resolve::ResolvedModel;
use std::{fmt, rc::Rc};
use thiserror::Error as ThisError;

///
/// BackendDescriptor
///
/// `name` is the logical name hosts select by; `type_id` is the
/// fully-qualified identity that stays unique when names collide.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackendDescriptor {
    pub name: String,
    pub type_id: String,
    pub languages: Vec<String>,
}

impl BackendDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            languages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    #[must_use]
    pub fn supports(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }
}

impl fmt::Display for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.type_id)
    }
}

///
/// BackendError
///
/// Failure raised by a backend while constructing or emitting. `partial`
/// carries whatever text was produced before the failure.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub partial: Option<String>,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            partial: None,
        }
    }

    #[must_use]
    pub fn with_partial(mut self, partial: impl Into<String>) -> Self {
        self.partial = Some(partial.into());
        self
    }
}

///
/// CodeGenerator
///

pub trait CodeGenerator {
    fn generate(
        &mut self,
        model: &ResolvedModel,
        host: &GenerationHost<'_>,
    ) -> Result<String, BackendError>;
}

type Constructor = dyn Fn() -> Result<Box<dyn CodeGenerator>, BackendError>;

///
/// BackendFactory
///

#[derive(Clone)]
pub struct BackendFactory {
    descriptor: BackendDescriptor,
    ctor: Rc<Constructor>,
}

impl BackendFactory {
    pub fn new<F>(descriptor: BackendDescriptor, ctor: F) -> Self
    where
        F: Fn() -> Result<Box<dyn CodeGenerator>, BackendError> + 'static,
    {
        Self {
            descriptor,
            ctor: Rc::new(ctor),
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    pub fn instantiate(&self) -> Result<Box<dyn CodeGenerator>, BackendError> {
        (self.ctor)()
    }
}

impl fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendFactory")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
