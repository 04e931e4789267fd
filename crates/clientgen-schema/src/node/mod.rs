mod annotation;
mod complex;
mod entity;
mod graph;
mod name;
mod operation;
mod property;
mod service;
mod r#type;

pub use self::annotation::*;
pub use self::complex::*;
pub use self::entity::*;
pub use self::graph::*;
pub use self::name::*;
pub use self::operation::*;
pub use self::property::*;
pub use self::service::*;
pub use self::r#type::*;
