use clientgen_schema::node::{AnnotationArg, Annotation, QualifiedName, TypeRef};
use convert_case::{Case, Casing};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::parse_str;

/// Module emitted for names outside any namespace.
pub const ROOT_MODULE: &str = "client";

///
/// ModulePaths
///
/// Maps namespaces to flat module names, minus the client root namespace.
///

pub struct ModulePaths<'a> {
    root: Option<&'a str>,
}

impl<'a> ModulePaths<'a> {
    #[must_use]
    pub const fn new(root: Option<&'a str>) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn module_of(&self, name: &QualifiedName) -> String {
        let namespace = name.namespace().unwrap_or_default();
        let relative = match self.root {
            Some(root) if namespace == root => "",
            Some(root) => namespace
                .strip_prefix(root)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(namespace),
            None => namespace,
        };

        if relative.is_empty() {
            ROOT_MODULE.to_string()
        } else {
            relative.replace('.', "_").to_case(Case::Snake)
        }
    }

    /// `super::<module>::<Type>`, usable from any emitted module.
    pub fn type_path(&self, name: &QualifiedName) -> Result<TokenStream, String> {
        let module = ident(&self.module_of(name))?;
        let ty = type_ident(name.short_name())?;

        Ok(quote!(super::#module::#ty))
    }

    /// Field or parameter type. Entity references are boxed to allow cycles.
    pub fn value_type(&self, ty: &TypeRef) -> Result<TokenStream, String> {
        Ok(match ty {
            TypeRef::Scalar(name) => scalar(name)?,
            TypeRef::Complex(name) => self.type_path(name)?,
            TypeRef::Entity(name) => {
                let path = self.type_path(name)?;
                quote!(Option<Box<#path>>)
            }
            TypeRef::Collection(inner) => {
                let inner = match inner.as_ref() {
                    TypeRef::Entity(name) => self.type_path(name)?,
                    other => self.value_type(other)?,
                };
                quote!(Vec<#inner>)
            }
        })
    }

    /// Return or parameter type of a context operation.
    pub fn signature_type(&self, ty: &TypeRef) -> Result<TokenStream, String> {
        match ty {
            TypeRef::Entity(name) => self.type_path(name),
            other => self.value_type(other),
        }
    }
}

/// Rust spelling of a scalar type name.
pub fn scalar(name: &str) -> Result<TokenStream, String> {
    let tokens = match name {
        "bool" | "Boolean" => quote!(bool),
        "i8" | "SByte" => quote!(i8),
        "u8" | "Byte" => quote!(u8),
        "i16" | "Int16" => quote!(i16),
        "i32" | "Int32" => quote!(i32),
        "i64" | "Int64" => quote!(i64),
        "f32" | "Single" => quote!(f32),
        "f64" | "Double" | "Decimal" => quote!(f64),
        "String" | "Guid" | "DateTime" | "DateTimeOffset" | "TimeSpan" => quote!(String),
        "Binary" => quote!(Vec<u8>),
        other => {
            let ty: syn::Type = parse_str(&other.replace('.', "::"))
                .map_err(|_| format!("scalar type '{other}' has no Rust spelling"))?;
            quote!(#ty)
        }
    };

    Ok(tokens)
}

/// An identifier, made raw (or suffixed) when it collides with a keyword.
pub fn ident(name: &str) -> Result<Ident, String> {
    if let Ok(ident) = parse_str::<Ident>(name) {
        return Ok(ident);
    }
    if matches!(name, "self" | "Self" | "super" | "crate" | "_") {
        return Ok(format_ident!("{name}_"));
    }

    parse_str::<Ident>(&format!("r#{name}"))
        .map_err(|_| format!("'{name}' is not a valid Rust identifier"))
}

pub fn type_ident(name: &str) -> Result<Ident, String> {
    ident(&name.to_case(Case::Pascal))
}

pub fn member_ident(name: &str) -> Result<Ident, String> {
    ident(&name.to_case(Case::Snake))
}

/// Doc-line rendering of an annotation, e.g. `@Range(1, 10)`.
#[must_use]
pub fn render_annotation(annotation: &Annotation) -> String {
    let positional = annotation.args.iter().map(render_arg);
    let named = annotation
        .named
        .iter()
        .map(|(name, arg)| format!("{name} = {}", render_arg(arg)));
    let args: Vec<String> = positional.chain(named).collect();

    if args.is_empty() {
        format!("@{}", annotation.type_name)
    } else {
        format!("@{}({})", annotation.type_name, args.join(", "))
    }
}

fn render_arg(arg: &AnnotationArg) -> String {
    match arg {
        AnnotationArg::Bool(v) => v.to_string(),
        AnnotationArg::Int(v) => v.to_string(),
        AnnotationArg::Text(v) => format!("{v:?}"),
        AnnotationArg::Type(name) => format!("typeof({name})"),
        AnnotationArg::List(items) => {
            let items: Vec<_> = items.iter().map(render_arg).collect();
            format!("[{}]", items.join(", "))
        }
    }
}
