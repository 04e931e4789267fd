use crate::prelude::*;

///
/// Annotation
///
/// Declarative metadata attached to a type, property, operation or
/// parameter. Read once from the graph and never mutated.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Annotation {
    pub type_name: QualifiedName,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<AnnotationArg>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named: Vec<(String, AnnotationArg)>,
}

impl Annotation {
    #[must_use]
    pub fn new(type_name: impl Into<QualifiedName>) -> Self {
        Self {
            type_name: type_name.into(),
            args: Vec::new(),
            named: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: AnnotationArg) -> Self {
        self.args.push(arg);
        self
    }

    #[must_use]
    pub fn with_named(mut self, name: impl Into<String>, arg: AnnotationArg) -> Self {
        self.named.push((name.into(), arg));
        self
    }

    /// Every type referenced by an argument value, in argument order and
    /// without duplicates.
    #[must_use]
    pub fn referenced_types(&self) -> Vec<&QualifiedName> {
        let mut out = Vec::new();
        for arg in self.args.iter().chain(self.named.iter().map(|(_, arg)| arg)) {
            arg.collect_types(&mut out);
        }

        out
    }
}

///
/// AnnotationArg
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationArg {
    Bool(bool),
    Int(i64),
    Text(String),
    Type(QualifiedName),
    List(Vec<AnnotationArg>),
}

impl AnnotationArg {
    fn collect_types<'a>(&'a self, out: &mut Vec<&'a QualifiedName>) {
        match self {
            Self::Type(name) => {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
            Self::List(items) => {
                for item in items {
                    item.collect_types(out);
                }
            }
            Self::Bool(_) | Self::Int(_) | Self::Text(_) => {}
        }
    }
}
